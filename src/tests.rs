#![allow(unused)]
use voxell_rng::rng::XorShift128;

use crate::record::{MutationKind, MutationRecord, NodeRef};

const SENSITIVE_MARKER: &str = "sensitive-data";
const TEMP_PREFIX: &str = "temp-";

// a small page worth of changes, in the shape an observer would coalesce them
const PAGE_BATCH_JSON: &str = r#"[
    { "kind": "attribute_change", "target": { "id": "header", "markers": ["sticky"] }, "attribute_name": "class", "previous_value": "" },
    { "kind": "text_change", "target": { "id": "title" }, "previous_value": "Loading..." },
    { "kind": "child_list_change", "target": { "id": "list" }, "added_nodes": [{ "id": "temp-row-1" }] },
    { "kind": "attribute_change", "target": { "id": "temp-spinner" }, "attribute_name": "style" },
    { "kind": "text_change", "target": { "id": "card-number", "markers": ["sensitive-data"] }, "previous_value": "4111" }
]"#;

pub fn page_batch() -> Vec<MutationRecord> {
    serde_json::from_str(PAGE_BATCH_JSON).expect("page batch fixture is valid json")
}

pub fn node(index: usize) -> NodeRef {
    NodeRef::with_id(format!("node-{index}"))
}

pub fn text_batch(len: usize) -> Vec<MutationRecord> {
    (0..len).map(|i| MutationRecord::text(node(i), Some(format!("text {i}")))).collect()
}

pub fn attribute_batch(len: usize) -> Vec<MutationRecord> {
    (0..len)
        .map(|i| MutationRecord::attribute(node(i), "data-index", Some(i.to_string())))
        .collect()
}

pub fn child_list_batch(len: usize) -> Vec<MutationRecord> {
    (0..len)
        .map(|i| MutationRecord::child_list(node(i), vec![NodeRef::with_id(format!("child-{i}"))], vec![]))
        .collect()
}

/// A batch of up to 31 records of mixed kinds, some marked sensitive or temporary.
pub fn random_batch(seed: u64) -> Vec<MutationRecord> {
    let mut rng = XorShift128::new(seed);
    let len = (seed % 32) as usize;
    let mut batch = Vec::with_capacity(len);

    for i in 0..len {
        let data = rng.peek_next_u64();
        rng = XorShift128::new(data);

        let mut target = if data & 0b1000 == 0 {
            node(i)
        } else {
            NodeRef::with_id(format!("{TEMP_PREFIX}{i}"))
        };
        if data & 0b1_0000 != 0 {
            target = target.with_marker(SENSITIVE_MARKER);
        }

        let record = match MutationKind::ALL[(data % 3) as usize] {
            MutationKind::AttributeChange => MutationRecord::attribute(target, "class", None),
            MutationKind::TextChange => MutationRecord::text(target, Some(String::new())),
            MutationKind::ChildListChange => MutationRecord::child_list(target, vec![], vec![node(i + 1)]),
        };
        batch.push(record);
    }

    batch
}

pub fn ids(records: &[MutationRecord]) -> Vec<&str> {
    records.iter().filter_map(|r| r.target.id.as_deref()).collect()
}

#[test]
fn fixtures_are_valid_records() {
    let mut seed = 0x5eed;
    let mut all = page_batch();
    all.extend(text_batch(3));
    all.extend(attribute_batch(3));
    all.extend(child_list_batch(3));
    for _ in 0..16 {
        all.extend(random_batch(seed));
        seed = XorShift128::new(seed).peek_next_u64();
    }

    for record in &all {
        assert_eq!(record.validate(), Ok(()), "invalid fixture record {record:?}");
    }
}

#[test]
fn if_tracing_bindings_outlive_the_macro() {
    let mut seen = None;
    if_tracing! {
        let value = 7;
    }
    if_tracing! {
        seen = Some(value);
    }

    if cfg!(feature = "tracing") {
        assert_eq!(seen, Some(7));
    } else {
        assert_eq!(seen, None);
    }
}

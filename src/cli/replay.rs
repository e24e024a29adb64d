use std::fs;

use anyhow::{Context, Result};
use mutation_dispatch::{
    DispatchOutcome, MutationBatch, MutationBatchDispatcher, MutationRecord, PreprocessPipeline,
    rules::{self, DEFAULT_PRESET, RuleSet},
};

use crate::cli::{CliError, ReplayArgs, RuleSelection};

pub fn build_preprocessor(selection: RuleSelection) -> Result<PreprocessPipeline<'static>> {
    let pipeline = match selection {
        RuleSelection::Inline(chain) => rules::parse_chain(&chain)?,
        RuleSelection::FromFile(path) => {
            let rules = RuleSet::from_file(&path).with_context(|| format!("couldn't load rules from {}", path.display()))?;
            PreprocessPipeline::new().with_stage(rules)
        }
        RuleSelection::Preset(name) => PreprocessPipeline::new().with_stage(rules::get_preset(&name)?),
        RuleSelection::Default => PreprocessPipeline::new().with_stage(rules::get_preset(DEFAULT_PRESET)?),
    };

    if_tracing! {
        tracing::debug!(event = "rules_selected", stages = pipeline.len(), rules = %mutation_dispatch::Preprocessor::debug_name(&pipeline));
    }

    Ok(pipeline)
}

/// Reads batches from json and checks every record against its kind.
pub fn load_batches(json: &str) -> Result<Vec<MutationBatch>> {
    let batches: Vec<MutationBatch> = serde_json::from_str(json)?;

    for (batch_index, batch) in batches.iter().enumerate() {
        for (record_index, record) in batch.iter().enumerate() {
            record.validate().map_err(|source| CliError::InvalidRecord {
                batch: batch_index,
                record: record_index,
                source,
            })?;
        }
    }

    Ok(batches)
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    pub skipped: usize,
    pub passed_through: usize,
    pub replaced: usize,
    pub records_in: usize,
    pub records_out: usize,
}

impl ReplaySummary {
    fn record(&mut self, batch_len: usize, outcome: DispatchOutcome) {
        self.records_in += batch_len;
        match outcome {
            DispatchOutcome::Skipped => self.skipped += 1,
            DispatchOutcome::PassedThrough => {
                self.passed_through += 1;
                self.records_out += batch_len;
            }
            DispatchOutcome::Replaced { forwarded } => {
                self.replaced += 1;
                self.records_out += forwarded;
            }
        }
    }
}

/// Dispatches every batch in order and collects what reaches the handler.
pub fn run_batches(batches: &[MutationBatch], selection: RuleSelection) -> Result<(Vec<MutationBatch>, ReplaySummary)> {
    let preprocess = build_preprocessor(selection)?;
    let mut forwarded = Vec::new();
    let mut summary = ReplaySummary::default();

    let mut dispatcher = MutationBatchDispatcher::with_preprocessor(
        |records: &[MutationRecord]| -> Result<()> {
            forwarded.push(records.to_vec());
            Ok(())
        },
        preprocess,
    );
    for (index, batch) in batches.iter().enumerate() {
        let outcome = dispatcher.dispatch(batch).with_context(|| format!("dispatching batch {index}"))?;
        summary.record(batch.len(), outcome);
    }
    drop(dispatcher);

    Ok((forwarded, summary))
}

pub fn replay(args: ReplayArgs) -> Result<()> {
    let input = fs::read_to_string(&args.input).with_context(|| format!("couldn't read {}", args.input.display()))?;
    let batches = load_batches(&input).with_context(|| format!("{} is not a valid batches file", args.input.display()))?;

    let (forwarded, summary) = run_batches(&batches, args.selection.rule_selection())?;

    let json = serde_json::to_string_pretty(&forwarded)?;
    match &args.output {
        Some(path) => fs::write(path, json).with_context(|| format!("couldn't write {}", path.display()))?,
        None => println!("{json}"),
    }

    if_tracing! {
        tracing::info!(event = "replay_complete", input = %args.input.display(), batches = batches.len(), ?summary, "replay finished");
    }
    eprintln!(
        "{} batches: {} passed through, {} replaced, {} skipped\n{} records in, {} records out",
        batches.len(),
        summary.passed_through,
        summary.replaced,
        summary.skipped,
        summary.records_in,
        summary.records_out,
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::RuleSelectionArgs;

    const BATCHES_JSON: &str = r#"[
        [
            { "kind": "text_change", "target": { "id": "title" }, "previous_value": "old" },
            { "kind": "text_change", "target": { "id": "subtitle" } }
        ],
        [
            { "kind": "attribute_change", "target": { "id": "a" }, "attribute_name": "href" },
            { "kind": "attribute_change", "target": { "id": "temp-element" }, "attribute_name": "href" },
            { "kind": "child_list_change", "target": { "id": "b", "markers": ["sensitive-data"] } }
        ],
        []
    ]"#;

    #[test]
    fn default_selection_forwards_everything() {
        let batches = load_batches(BATCHES_JSON).unwrap();
        let (forwarded, summary) = run_batches(&batches, RuleSelection::Default).unwrap();

        assert_eq!(forwarded, batches);
        assert_eq!(summary.passed_through, 3);
        assert_eq!(summary.records_in, summary.records_out);
    }

    #[test]
    fn chained_presets_filter_batches() {
        let batches = load_batches(BATCHES_JSON).unwrap();
        let (forwarded, summary) =
            run_batches(&batches, RuleSelection::Inline("transient -> privacy".to_string())).unwrap();

        // privacy always hands back its own copy, so nothing counts as passed through
        assert_eq!(forwarded.len(), 3);
        assert_eq!(forwarded[0], batches[0]);
        assert_eq!(forwarded[1], vec![batches[1][0].clone()]);
        assert!(forwarded[2].is_empty());
        assert_eq!(
            summary,
            ReplaySummary {
                skipped: 0,
                passed_through: 0,
                replaced: 3,
                records_in: 5,
                records_out: 3,
            }
        );
    }

    #[test]
    fn rejects_records_that_disagree_with_their_kind() {
        let json = r#"[[{ "kind": "attribute_change", "target": {} }]]"#;
        let err = load_batches(json).unwrap_err();

        assert!(matches!(
            err.downcast_ref::<CliError>(),
            Some(CliError::InvalidRecord { batch: 0, record: 0, .. })
        ));
    }

    #[test]
    fn replay_writes_forwarded_batches_to_the_output_file() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("batches.json");
        let output = dir.path().join("forwarded.json");
        fs::write(&input, BATCHES_JSON).unwrap();

        replay(ReplayArgs {
            input,
            output: Some(output.clone()),
            selection: RuleSelectionArgs {
                preset: Some("privacy".to_string()),
                ..RuleSelectionArgs::default()
            },
        })
        .unwrap();

        let forwarded: Vec<MutationBatch> = serde_json::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
        let batches = load_batches(BATCHES_JSON).unwrap();
        assert_eq!(forwarded, vec![batches[0].clone(), batches[1][..2].to_vec(), vec![]]);
    }

    #[test]
    fn replay_reports_a_missing_input_file() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("forwarded.json");

        let err = replay(ReplayArgs {
            input: dir.path().join("missing.json"),
            output: Some(output.clone()),
            selection: RuleSelectionArgs::default(),
        })
        .unwrap_err();

        assert!(err.to_string().starts_with("couldn't read"));
        assert!(!output.exists());
    }

    #[test]
    fn unknown_preset_fails_before_dispatching() {
        let batches = load_batches(BATCHES_JSON).unwrap();
        assert!(run_batches(&batches, RuleSelection::Preset("nope".to_string())).is_err());
    }
}

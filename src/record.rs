use core::fmt;
use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// An ordered group of records delivered together in one observation cycle.
///
/// Batches are only ever borrowed by the dispatcher. Any transformation produces a new vector.
pub type MutationBatch = Vec<MutationRecord>;

/// The kind of change a [`MutationRecord`] describes.
#[derive(Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum MutationKind {
    AttributeChange,
    TextChange,
    ChildListChange,
}

impl MutationKind {
    pub const ALL: [MutationKind; 3] = [Self::AttributeChange, Self::TextChange, Self::ChildListChange];

    /// Whether records of this kind may carry a previous value.
    pub const fn tracks_previous_value(self) -> bool {
        matches!(self, Self::AttributeChange | Self::TextChange)
    }
}

impl fmt::Display for MutationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AttributeChange => write!(f, "attribute change"),
            Self::TextChange => write!(f, "text change"),
            Self::ChildListChange => write!(f, "child list change"),
        }
    }
}

/// Reference to the observed node a change happened on.
///
/// `markers` is the set callbacks classify targets by, such as class names or data flags.
#[derive(Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Clone, Default)]
pub struct NodeRef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub markers: BTreeSet<String>,
}

impl NodeRef {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_id(id: impl Into<String>) -> Self {
        NodeRef {
            id: Some(id.into()),
            markers: BTreeSet::new(),
        }
    }

    /// Chain this method to add several markers in a shorter way.
    pub fn with_marker(mut self, marker: impl Into<String>) -> Self {
        self.markers.insert(marker.into());
        self
    }

    pub fn has_marker(&self, marker: &str) -> bool {
        self.markers.contains(marker)
    }

    /// Nodes without an id never match.
    pub fn id_starts_with(&self, prefix: &str) -> bool {
        self.id.as_deref().is_some_and(|id| id.starts_with(prefix))
    }
}

/// A single reported change on an observed node.
#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone)]
pub struct MutationRecord {
    pub kind: MutationKind,
    pub target: NodeRef,
    /// Only meaningful for [`MutationKind::AttributeChange`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribute_name: Option<String>,
    /// Only meaningful for kinds that track value history.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_value: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub added_nodes: Vec<NodeRef>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub removed_nodes: Vec<NodeRef>,
}

impl MutationRecord {
    pub fn attribute(target: NodeRef, attribute_name: impl Into<String>, previous_value: Option<String>) -> Self {
        MutationRecord {
            kind: MutationKind::AttributeChange,
            target,
            attribute_name: Some(attribute_name.into()),
            previous_value,
            added_nodes: Vec::new(),
            removed_nodes: Vec::new(),
        }
    }

    pub fn text(target: NodeRef, previous_value: Option<String>) -> Self {
        MutationRecord {
            kind: MutationKind::TextChange,
            target,
            attribute_name: None,
            previous_value,
            added_nodes: Vec::new(),
            removed_nodes: Vec::new(),
        }
    }

    pub fn child_list(target: NodeRef, added_nodes: Vec<NodeRef>, removed_nodes: Vec<NodeRef>) -> Self {
        MutationRecord {
            kind: MutationKind::ChildListChange,
            target,
            attribute_name: None,
            previous_value: None,
            added_nodes,
            removed_nodes,
        }
    }

    /// Checks that the optional fields are only populated for the kinds they belong to.
    ///
    /// Child list changes never need an attribute name or a previous value.
    ///
    /// # Errors
    ///
    /// Returns the first inconsistency found.
    pub fn validate(&self) -> Result<(), RecordError> {
        match self.kind {
            MutationKind::AttributeChange if self.attribute_name.is_none() => return Err(RecordError::MissingAttributeName),
            MutationKind::TextChange | MutationKind::ChildListChange if self.attribute_name.is_some() => {
                return Err(RecordError::UnexpectedAttributeName(self.kind));
            }
            _ => {}
        }

        if !self.kind.tracks_previous_value() && self.previous_value.is_some() {
            return Err(RecordError::UnexpectedPreviousValue(self.kind));
        }

        if self.kind != MutationKind::ChildListChange && !(self.added_nodes.is_empty() && self.removed_nodes.is_empty()) {
            return Err(RecordError::UnexpectedNodeList(self.kind));
        }

        Ok(())
    }
}

/// A record whose fields do not agree with its kind.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RecordError {
    #[error("attribute change is missing its attribute name")]
    MissingAttributeName,

    #[error("{0} must not carry an attribute name")]
    UnexpectedAttributeName(MutationKind),

    #[error("{0} must not carry a previous value")]
    UnexpectedPreviousValue(MutationKind),

    #[error("{0} must not carry added or removed nodes")]
    UnexpectedNodeList(MutationKind),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors_produce_valid_records() {
        let records = [
            MutationRecord::attribute(NodeRef::with_id("a"), "class", Some("old".to_string())),
            MutationRecord::attribute(NodeRef::new(), "hidden", None),
            MutationRecord::text(NodeRef::new(), Some("before".to_string())),
            MutationRecord::child_list(NodeRef::with_id("list"), vec![NodeRef::with_id("item")], vec![]),
            MutationRecord::child_list(NodeRef::new(), vec![], vec![]),
        ];

        for record in &records {
            assert_eq!(record.validate(), Ok(()), "{record:?}");
        }
    }

    #[test]
    fn child_list_does_not_need_optional_fields() {
        let json = r#"{ "kind": "child_list_change", "target": { "id": "root" } }"#;
        let record: MutationRecord = serde_json::from_str(json).unwrap();

        assert_eq!(record.kind, MutationKind::ChildListChange);
        assert_eq!(record.attribute_name, None);
        assert_eq!(record.previous_value, None);
        assert!(record.validate().is_ok());
    }

    #[test]
    fn rejects_fields_on_the_wrong_kind() {
        let mut missing_name = MutationRecord::attribute(NodeRef::new(), "id", None);
        missing_name.attribute_name = None;
        assert_eq!(missing_name.validate(), Err(RecordError::MissingAttributeName));

        let mut text_with_name = MutationRecord::text(NodeRef::new(), None);
        text_with_name.attribute_name = Some("title".to_string());
        assert_eq!(
            text_with_name.validate(),
            Err(RecordError::UnexpectedAttributeName(MutationKind::TextChange))
        );

        let mut child_with_value = MutationRecord::child_list(NodeRef::new(), vec![], vec![]);
        child_with_value.previous_value = Some("x".to_string());
        assert_eq!(
            child_with_value.validate(),
            Err(RecordError::UnexpectedPreviousValue(MutationKind::ChildListChange))
        );

        let mut text_with_nodes = MutationRecord::text(NodeRef::new(), None);
        text_with_nodes.added_nodes.push(NodeRef::with_id("stray"));
        assert_eq!(
            text_with_nodes.validate(),
            Err(RecordError::UnexpectedNodeList(MutationKind::TextChange))
        );
    }

    #[test]
    fn node_ref_predicates() {
        let node = NodeRef::with_id("temp-element").with_marker("sensitive-data");

        assert!(node.id_starts_with("temp-"));
        assert!(!node.id_starts_with("perm-"));
        assert!(node.has_marker("sensitive-data"));
        assert!(!node.has_marker("public"));
        assert!(!NodeRef::new().id_starts_with(""));
    }

    #[test]
    fn serializes_without_empty_fields() {
        let record = MutationRecord::text(NodeRef::with_id("p"), None);
        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(json, serde_json::json!({ "kind": "text_change", "target": { "id": "p" } }));
    }
}

//! Declarative preprocessing rules, loadable from JSON and available as named presets.
//!
//! A [`RuleSet`] is evaluated top to bottom:
//!
//! 1. a batch longer than `max_batch_len` is skipped,
//! 2. a batch made up only of `pass_through_kinds` passes through untouched,
//! 3. a rule set without drop rules passes everything through,
//! 4. otherwise the batch is replaced by the records that survive every drop rule.
//!
//! Presets can be chained with the same arrow syntax a pipeline string uses:
//! `"privacy -> transient"` runs the `privacy` rules first, then `transient`.

use core::fmt;
use std::{fs, path::Path};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    pipeline::PreprocessPipeline,
    preprocess::{PreprocessResult, Preprocessor, Result},
    record::{MutationKind, MutationRecord},
};

#[derive(Debug, Error)]
pub enum RulesError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unknown preset: {0}")]
    UnknownPreset(String),

    #[error("Invalid rule chain: {0}")]
    ChainFormat(String),
}

#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone, Default)]
#[serde(default, deny_unknown_fields)]
pub struct RuleSet {
    /// Batches with more records than this are skipped.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_batch_len: Option<usize>,

    /// Batches consisting only of these kinds are passed through without filtering.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub pass_through_kinds: Vec<MutationKind>,

    /// Drops records whose target id starts with any of these.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub drop_id_prefixes: Vec<String>,

    /// Drops records whose target carries any of these markers.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub drop_markers: Vec<String>,

    /// Drops attribute changes to any of these attributes.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub drop_attributes: Vec<String>,
}

impl RuleSet {
    pub fn from_json(json: &str) -> Result<Self, RulesError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file(path: &Path) -> Result<Self, RulesError> {
        let data = fs::read_to_string(path)?;
        Self::from_json(&data)
    }

    pub fn to_json_pretty(&self) -> Result<String, RulesError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn has_drop_rules(&self) -> bool {
        !(self.drop_id_prefixes.is_empty() && self.drop_markers.is_empty() && self.drop_attributes.is_empty())
    }

    /// Whether a record survives every drop rule.
    pub fn keeps(&self, record: &MutationRecord) -> bool {
        let target = &record.target;

        if self.drop_id_prefixes.iter().any(|prefix| target.id_starts_with(prefix)) {
            return false;
        }
        if self.drop_markers.iter().any(|marker| target.has_marker(marker)) {
            return false;
        }
        if record.kind == MutationKind::AttributeChange
            && let Some(name) = record.attribute_name.as_deref()
            && self.drop_attributes.iter().any(|dropped| dropped == name)
        {
            return false;
        }

        true
    }

    fn evaluate(&self, records: &[MutationRecord]) -> PreprocessResult {
        if let Some(max) = self.max_batch_len
            && records.len() > max
        {
            return PreprocessResult::Skip;
        }

        if !self.pass_through_kinds.is_empty() && records.iter().all(|r| self.pass_through_kinds.contains(&r.kind)) {
            return PreprocessResult::PassThrough;
        }

        if !self.has_drop_rules() {
            return PreprocessResult::PassThrough;
        }

        PreprocessResult::Replace(records.iter().filter(|r| self.keeps(r)).cloned().collect())
    }
}

impl Preprocessor for RuleSet {
    fn preprocess(&mut self, records: &[MutationRecord]) -> Result<PreprocessResult> {
        let result = self.evaluate(records);
        if_tracing! {
            tracing::trace!(
                event = "rules_evaluated",
                input_len = records.len(),
                output_len = ?result.as_replacement().map(<[MutationRecord]>::len),
                skipped = result.is_skip(),
                "rule set evaluated"
            );
        }
        Ok(result)
    }

    fn debug_name(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for RuleSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if let Some(max) = self.max_batch_len {
            parts.push(format!("max {max}"));
        }
        if !self.pass_through_kinds.is_empty() {
            let kinds = self.pass_through_kinds.iter().map(ToString::to_string).collect::<Vec<_>>();
            parts.push(format!("pass {}", kinds.join("/")));
        }
        for prefix in &self.drop_id_prefixes {
            parts.push(format!("drop id {prefix}*"));
        }
        for marker in &self.drop_markers {
            parts.push(format!("drop marker {marker}"));
        }
        for attribute in &self.drop_attributes {
            parts.push(format!("drop attribute {attribute}"));
        }

        if parts.is_empty() {
            write!(f, "rules(pass through)")
        } else {
            write!(f, "rules({})", parts.join(", "))
        }
    }
}

pub struct Preset {
    pub name: &'static str,
    pub short_description: &'static str,
    pub rules: fn() -> RuleSet,
}

/// Rule sets available by name in the current build.
#[rustfmt::skip]
pub static PRESETS: &[Preset] = &[
    Preset { name: "passthrough", short_description: "forwards every batch unchanged", rules: passthrough },
    Preset { name: "privacy", short_description: "drops changes on nodes marked sensitive-data", rules: privacy },
    Preset { name: "transient", short_description: "skips bursts over 100 records, keeps text-only batches, drops temp- nodes", rules: transient },
    Preset { name: "no-style", short_description: "drops style and class attribute changes", rules: no_style },
];

pub const DEFAULT_PRESET: &str = "passthrough";

fn passthrough() -> RuleSet {
    RuleSet::default()
}

fn privacy() -> RuleSet {
    RuleSet {
        drop_markers: vec!["sensitive-data".to_string()],
        ..RuleSet::default()
    }
}

fn transient() -> RuleSet {
    RuleSet {
        max_batch_len: Some(100),
        pass_through_kinds: vec![MutationKind::TextChange],
        drop_id_prefixes: vec!["temp-".to_string()],
        ..RuleSet::default()
    }
}

fn no_style() -> RuleSet {
    RuleSet {
        drop_attributes: vec!["style".to_string(), "class".to_string()],
        ..RuleSet::default()
    }
}

pub fn get_preset(name: &str) -> Result<RuleSet, RulesError> {
    PRESETS
        .iter()
        .find(|preset| preset.name == name)
        .map(|preset| (preset.rules)())
        .ok_or_else(|| RulesError::UnknownPreset(name.to_string()))
}

/// Parses `"preset_a -> preset_b -> ..."` into a pipeline running the presets in order.
pub fn parse_chain(chain: &str) -> Result<PreprocessPipeline<'static>, RulesError> {
    let names = chain.split("->").map(str::trim).collect::<Vec<_>>();
    if names.iter().all(|name| name.is_empty()) {
        return Err(RulesError::ChainFormat("empty rule chain".to_string()));
    }

    let mut pipeline = PreprocessPipeline::new();
    for name in names {
        if name.is_empty() {
            return Err(RulesError::ChainFormat(format!("empty stage in {chain:?}")));
        }
        pipeline.push_stage(get_preset(name)?);
    }

    Ok(pipeline)
}

//! Input records: automation definitions handed over by the retrieval side.
//!
//! Records are treated as opaque JSON bodies with a stable id and a display
//! name. The pipeline only borrows them; ownership stays with the caller.
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

const CATEGORY_KEYS: &[&str] = &["processType", "type", "category"];
const TRIGGER_KEYS: &[&str] = &["triggerType", "trigger"];

/// One automation definition to analyze.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Stable identifier, unique within a set. Numbers are normalized to strings.
    #[serde(deserialize_with = "id_from_string_or_number")]
    pub id: String,
    /// Display name used in prompts and to match model output back to records.
    pub name: String,
    /// Arbitrary definition body of unbounded depth.
    #[serde(default)]
    pub metadata: Value,
}

impl Record {
    pub fn new(id: impl Into<String>, name: impl Into<String>, metadata: Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            metadata,
        }
    }

    /// Declared process type/category, if the definition carries one.
    pub fn category(&self) -> Option<&str> {
        lookup_str(&self.metadata, CATEGORY_KEYS)
            .or_else(|| lookup_str(self.metadata.get("metadata")?, CATEGORY_KEYS))
    }

    /// Declared trigger kind (record change, schedule, platform event, ...).
    pub fn trigger(&self) -> Option<&str> {
        lookup_str(&self.metadata, TRIGGER_KEYS)
            .or_else(|| lookup_str(self.metadata.get("start")?, TRIGGER_KEYS))
    }
}

fn lookup_str<'a>(value: &'a Value, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .filter_map(|key| value.get(key)?.as_str())
        .map(str::trim)
        .find(|text| !text.is_empty())
}

fn id_from_string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(text) => Ok(text),
        Value::Number(number) => Ok(number.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "record id must be a string or number (got {other})"
        ))),
    }
}

/// Ordered set of records from one source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordSet {
    /// Label of the org/environment the records were pulled from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    pub records: Vec<Record>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RecordSetInput {
    Bare(Vec<Record>),
    Wrapped(RecordSet),
}

impl RecordSet {
    pub fn new(alias: Option<String>, records: Vec<Record>) -> Self {
        Self { alias, records }
    }

    pub fn count(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Display name for prompts and fallback text.
    pub fn label(&self) -> &str {
        self.alias.as_deref().unwrap_or("the organization")
    }

    /// Parse either a bare JSON array of records or `{ "alias", "records" }`.
    pub fn from_json(text: &str) -> Result<Self> {
        let input: RecordSetInput =
            serde_json::from_str(text).context("parse record set JSON")?;
        Ok(match input {
            RecordSetInput::Bare(records) => Self::new(None, records),
            RecordSetInput::Wrapped(set) => set,
        })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text =
            fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
        Self::from_json(&text).with_context(|| format!("load records from {}", path.display()))
    }

    /// Reject sets the pipeline cannot promise full coverage for.
    pub fn validate(&self) -> Result<()> {
        if self.records.is_empty() {
            return Err(anyhow!("record set is empty"));
        }
        let mut seen = BTreeSet::new();
        for (index, record) in self.records.iter().enumerate() {
            if record.id.trim().is_empty() {
                return Err(anyhow!("record #{index} has an empty id"));
            }
            if record.name.trim().is_empty() {
                return Err(anyhow!("record {:?} has an empty name", record.id));
            }
            if !seen.insert(record.id.as_str()) {
                return Err(anyhow!("duplicate record id {:?}", record.id));
            }
        }
        Ok(())
    }
}

//! Structured analysis output.
use crate::records::Record;
use crate::sizing::AnalysisStrategy;
use serde::{Deserialize, Serialize};

/// Used when a parsed section has no recognizable description.
pub const PLACEHOLDER_DESCRIPTION: &str =
    "Automates a business process; the analysis did not include a detailed description.";
/// Used when a parsed section has no recognizable improvement text.
pub const PLACEHOLDER_IMPROVEMENTS: &str =
    "Review this automation for error handling, bulk-safety and maintainability.";

const UNAVAILABLE_DESCRIPTION: &str =
    "Analysis unavailable: the completion request for this automation failed.";
const UNAVAILABLE_IMPROVEMENTS: &str = "Retry the analysis to obtain recommendations.";

/// Where an entry's text came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryOrigin {
    /// Extracted from the model response.
    Parsed,
    /// Filled in because the response never mentioned the record.
    Synthesized,
    /// The request covering the record failed.
    Unavailable,
}

/// Per-record analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisEntry {
    pub record_name: String,
    pub business_description: String,
    pub improvements: String,
    pub origin: EntryOrigin,
}

impl AnalysisEntry {
    pub fn parsed(
        record_name: impl Into<String>,
        business_description: impl Into<String>,
        improvements: impl Into<String>,
    ) -> Self {
        Self {
            record_name: record_name.into(),
            business_description: business_description.into(),
            improvements: improvements.into(),
            origin: EntryOrigin::Parsed,
        }
    }

    /// Templated stand-in for a record the model skipped.
    pub fn synthesized(record: &Record) -> Self {
        let kind = record.category().map(humanize_category);
        let business_description = match &kind {
            Some(kind) => format!(
                "{} is a {kind} automation. The model response did not include a dedicated analysis for it.",
                record.name
            ),
            None => format!(
                "{} automates a business process. The model response did not include a dedicated analysis for it.",
                record.name
            ),
        };
        let improvements = match &kind {
            Some(kind) => format!(
                "Review this {kind} automation for fault handling, bulk-safe design and documentation."
            ),
            None => PLACEHOLDER_IMPROVEMENTS.to_string(),
        };
        Self {
            record_name: record.name.clone(),
            business_description,
            improvements,
            origin: EntryOrigin::Synthesized,
        }
    }

    /// Stand-in for a record whose request failed outright.
    pub fn unavailable(record: &Record) -> Self {
        Self {
            record_name: record.name.clone(),
            business_description: UNAVAILABLE_DESCRIPTION.to_string(),
            improvements: UNAVAILABLE_IMPROVEMENTS.to_string(),
            origin: EntryOrigin::Unavailable,
        }
    }
}

/// `AutoLaunchedFlow` -> `auto launched flow`, `record_triggered` -> `record triggered`.
fn humanize_category(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len() + 4);
    let mut prev_lower = false;
    for ch in raw.chars() {
        if ch == '_' || ch == '-' {
            out.push(' ');
            prev_lower = false;
            continue;
        }
        if ch.is_uppercase() && prev_lower {
            out.push(' ');
        }
        prev_lower = ch.is_lowercase() || ch.is_ascii_digit();
        out.extend(ch.to_lowercase());
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Run bookkeeping surfaced next to the narrative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunStats {
    pub strategy: AnalysisStrategy,
    pub record_count: usize,
    pub chunk_count: usize,
    pub failed_chunks: usize,
    pub synthesized_entries: usize,
    pub unavailable_entries: usize,
    /// True when the narrative sections are fallback text.
    pub narrative_fallback: bool,
}

/// Complete result of one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub organization_overview: String,
    pub potential_risks: String,
    pub organization_improvements: String,
    pub entries: Vec<AnalysisEntry>,
    pub stats: RunStats,
}

impl AnalysisResult {
    pub fn count_origin(&self, origin: EntryOrigin) -> usize {
        count_origin(&self.entries, origin)
    }
}

/// Entries in `entries` with the given origin.
pub fn count_origin(entries: &[AnalysisEntry], origin: EntryOrigin) -> usize {
    entries.iter().filter(|entry| entry.origin == origin).count()
}

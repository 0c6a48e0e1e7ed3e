//! Recover structured sections and per-record entries from free-form
//! model output.
//!
//! Entry splitting is a cascade; each step runs only when the previous one
//! produced no usable split:
//!
//! 1. global `## ` sections, classified by header synonyms;
//! 2. `### ` entry headers inside the individual section (or the whole
//!    text when that section is missing);
//! 3. per-record name anchors ([`anchors::split_by_names`]);
//! 4. a prefix shared by all record names ([`anchors::split_by_shared_token`]).
//!
//! A response without any heading becomes the overview. Field extraction
//! inside each entry is table-driven, see [`fields`].
mod anchors;
mod fields;
mod sections;

pub use fields::{first_match, FieldStrategy, DESCRIPTION_STRATEGIES, IMPROVEMENT_STRATEGIES};
pub use sections::{classify_header, split_sections, strip_fences, GlobalKind};

use crate::analysis::{AnalysisEntry, PLACEHOLDER_DESCRIPTION, PLACEHOLDER_IMPROVEMENTS};
use crate::records::Record;
use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

/// How per-record entries were located.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitMethod {
    EntryHeaders,
    NameAnchors,
    SharedToken,
    None,
}

impl std::fmt::Display for SplitMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EntryHeaders => write!(f, "entry_headers"),
            Self::NameAnchors => write!(f, "name_anchors"),
            Self::SharedToken => write!(f, "shared_token"),
            Self::None => write!(f, "none"),
        }
    }
}

/// Global narrative sections found in a response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GlobalSections<'a> {
    pub overview: Option<String>,
    pub risks: Option<String>,
    pub improvements: Option<String>,
    pub individual: Option<&'a str>,
}

/// Parser output. Entries may be incomplete; the reconciler fills the gaps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedResponse {
    pub overview: Option<String>,
    pub risks: Option<String>,
    pub improvements: Option<String>,
    pub entries: Vec<AnalysisEntry>,
    pub method: SplitMethod,
}

/// Section name plus the raw text that belongs to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RawEntry {
    pub name: String,
    pub body: String,
}

static NUMBERING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:\d+[.):]|[-*+])\s*").expect("numbering regex is valid")
});
static NAME_LABEL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:flow|automation|process|record)(?:[ \t]+name)?(?:[ \t]*:|[ \t]+[-–][ \t])[ \t]*")
        .expect("name label regex is valid")
});

/// Strip inline markup from a header or label.
pub(crate) fn clean_markup(text: &str) -> String {
    let mut out = text.trim().replace(['*', '`'], "");
    // Underscores inside names are meaningful; only a wrapping pair is bold.
    if out.len() > 4 && out.starts_with("__") && out.ends_with("__") {
        out = out[2..out.len() - 2].to_string();
    }
    out.trim().trim_end_matches(':').trim().to_string()
}

/// Header text of an entry reduced to the record name it announces.
pub(crate) fn clean_entry_name(raw: &str) -> String {
    let cleaned = clean_markup(raw);
    let cleaned = NUMBERING_RE.replace(&cleaned, "");
    let cleaned = NAME_LABEL_RE.replace(&cleaned, "");
    clean_markup(&cleaned)
}

/// First section of each global kind at level 2, or level 1 when the
/// response has no level-2 headings.
pub fn parse_global_sections(text: &str) -> GlobalSections<'_> {
    let mut found = sections::split_sections(text, 2);
    if found.is_empty() {
        found = sections::split_sections(text, 1);
    }
    let mut globals = GlobalSections::default();
    for section in found {
        let body = section.body.trim();
        let slot = match classify_header(&section.header) {
            Some(GlobalKind::Individual) => {
                globals.individual.get_or_insert(section.body);
                continue;
            }
            Some(GlobalKind::Overview) => &mut globals.overview,
            Some(GlobalKind::Risks) => &mut globals.risks,
            Some(GlobalKind::Improvements) => &mut globals.improvements,
            None => continue,
        };
        if slot.is_none() && !body.is_empty() {
            *slot = Some(body.to_string());
        }
    }
    globals
}

/// Parse one response against the records it was asked to cover.
pub fn parse_response(text: &str, records: &[&Record]) -> ParsedResponse {
    let text = strip_fences(text);
    tracing::trace!(response = text, "parsing response");

    let mut parsed = ParsedResponse {
        overview: None,
        risks: None,
        improvements: None,
        entries: Vec::new(),
        method: SplitMethod::None,
    };

    let (raw, method) = if sections::has_any_heading(text) {
        let globals = parse_global_sections(text);
        parsed.overview = globals.overview;
        parsed.risks = globals.risks;
        parsed.improvements = globals.improvements;
        split_entries(globals.individual.unwrap_or(text), records)
    } else {
        if !text.is_empty() {
            parsed.overview = Some(text.to_string());
        }
        split_without_headers(text, records)
    };

    parsed.method = method;
    parsed.entries = raw.into_iter().map(build_entry).collect();
    tracing::debug!(
        method = %method,
        entries = parsed.entries.len(),
        records = records.len(),
        "response split"
    );
    parsed
}

fn split_entries(scope: &str, records: &[&Record]) -> (Vec<RawEntry>, SplitMethod) {
    let headed: Vec<RawEntry> = sections::split_sections(scope, 3)
        .into_iter()
        .map(|section| RawEntry {
            name: clean_entry_name(&section.header),
            body: section.body.trim().to_string(),
        })
        .filter(|entry| !entry.name.is_empty())
        .collect();
    if headed.len() > 1 || (headed.len() == 1 && records.len() == 1) {
        return (headed, SplitMethod::EntryHeaders);
    }

    let (fallback, method) = split_without_headers(scope, records);
    if !fallback.is_empty() {
        return (fallback, method);
    }
    if headed.is_empty() {
        (headed, SplitMethod::None)
    } else {
        (headed, SplitMethod::EntryHeaders)
    }
}

fn split_without_headers(text: &str, records: &[&Record]) -> (Vec<RawEntry>, SplitMethod) {
    let anchored = anchors::split_by_names(text, records);
    if !anchored.is_empty() {
        return (anchored, SplitMethod::NameAnchors);
    }
    let shared = anchors::split_by_shared_token(text, records);
    if !shared.is_empty() {
        return (shared, SplitMethod::SharedToken);
    }
    (Vec::new(), SplitMethod::None)
}

fn build_entry(raw: RawEntry) -> AnalysisEntry {
    let description = match first_match(DESCRIPTION_STRATEGIES, &raw.body) {
        Some((strategy, text)) => {
            tracing::debug!(entry = %raw.name, strategy, "description extracted");
            text
        }
        None => {
            tracing::debug!(entry = %raw.name, "no description found, using placeholder");
            PLACEHOLDER_DESCRIPTION.to_string()
        }
    };
    let improvements = match first_match(IMPROVEMENT_STRATEGIES, &raw.body) {
        Some((strategy, text)) => {
            tracing::debug!(entry = %raw.name, strategy, "improvements extracted");
            text
        }
        None => {
            tracing::debug!(entry = %raw.name, "no improvements found, using placeholder");
            PLACEHOLDER_IMPROVEMENTS.to_string()
        }
    };
    AnalysisEntry::parsed(raw.name, description, improvements)
}

#[cfg(test)]
#[path = "parse_tests.rs"]
mod tests;

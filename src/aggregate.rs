//! Organization-level narrative over the collected entries.
//!
//! The summary prompt carries counts and short excerpts only, never the
//! record bodies. A failed or unusable narrative call falls back to fixed
//! text built from counts; entries are never touched here.
use crate::analysis::{AnalysisEntry, EntryOrigin};
use crate::parse::parse_response;
use crate::prompts::{build_summary_prompt, SummaryInput};
use crate::provider::CompletionClient;
use crate::records::RecordSet;
use crate::util::truncate_chars;
use std::collections::BTreeMap;

const UNSPECIFIED: &str = "unspecified";

/// The three global sections of a result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Narrative {
    pub overview: String,
    pub risks: String,
    pub improvements: String,
    /// True when at least one section is fallback text.
    pub fallback: bool,
}

/// `(label, count)` pairs, most frequent first, ties by label.
fn tally<'a>(labels: impl Iterator<Item = Option<&'a str>>) -> Vec<(String, usize)> {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for label in labels {
        *counts
            .entry(label.unwrap_or(UNSPECIFIED).to_string())
            .or_default() += 1;
    }
    let mut counts: Vec<(String, usize)> = counts.into_iter().collect();
    counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    counts
}

/// Compacted cross-chunk signal for the narrative prompt.
pub fn summary_input(set: &RecordSet, entries: &[AnalysisEntry], excerpt_chars: usize) -> SummaryInput {
    SummaryInput {
        record_count: set.count(),
        category_counts: tally(set.records.iter().map(|record| record.category())),
        trigger_counts: tally(set.records.iter().map(|record| record.trigger())),
        excerpts: entries
            .iter()
            .filter(|entry| entry.origin != EntryOrigin::Unavailable)
            .map(|entry| {
                (
                    entry.record_name.clone(),
                    truncate_chars(&entry.business_description, excerpt_chars),
                )
            })
            .collect(),
    }
}

/// Fixed narrative that only references counts.
pub fn fallback_narrative(set: &RecordSet, entries: &[AnalysisEntry]) -> Narrative {
    let count = set.count();
    let categories = tally(set.records.iter().map(|record| record.category())).len();
    let unavailable = entries
        .iter()
        .filter(|entry| entry.origin == EntryOrigin::Unavailable)
        .count();
    Narrative {
        overview: format!(
            "{} has {count} automations across {categories} categories. An organization-level narrative could not be generated for this run.",
            set.label()
        ),
        risks: format!(
            "Risk assessment unavailable. {unavailable} of {count} automations could not be analyzed; review their entries individually."
        ),
        improvements: format!(
            "Organization-level recommendations unavailable. See the {count} individual entries for per-automation improvement opportunities."
        ),
        fallback: true,
    }
}

/// Fill sections the response did not provide from the fallback.
pub fn complete_narrative(
    overview: Option<String>,
    risks: Option<String>,
    improvements: Option<String>,
    fallback: Narrative,
) -> Narrative {
    let missing = overview.is_none() || risks.is_none() || improvements.is_none();
    Narrative {
        overview: overview.unwrap_or(fallback.overview),
        risks: risks.unwrap_or(fallback.risks),
        improvements: improvements.unwrap_or(fallback.improvements),
        fallback: missing,
    }
}

/// One completion call for the global sections over the compacted summary.
pub fn summarize(
    client: &dyn CompletionClient,
    set: &RecordSet,
    entries: &[AnalysisEntry],
    excerpt_chars: usize,
) -> Narrative {
    let input = summary_input(set, entries, excerpt_chars);
    let prompt = build_summary_prompt(&input, set.label());
    tracing::info!(
        prompt_bytes = prompt.len(),
        excerpts = input.excerpts.len(),
        "requesting organization narrative"
    );
    let fallback = fallback_narrative(set, entries);
    match client.complete(&prompt) {
        Ok(text) => {
            let parsed = parse_response(&text, &[]);
            let narrative =
                complete_narrative(parsed.overview, parsed.risks, parsed.improvements, fallback);
            if narrative.fallback {
                tracing::warn!("narrative response missing sections, using fallback text");
            }
            narrative
        }
        Err(err) => {
            tracing::warn!(error = %err, code = %err.code(), "narrative request failed, using fallback text");
            fallback
        }
    }
}

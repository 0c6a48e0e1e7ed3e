//! Prompt assembly for record analysis and the aggregate narrative.
//!
//! Every prompt states the exact record count, lists the names, embeds the
//! record JSON verbatim and spells out the response grammar. The grammar
//! constants below are shared with [`crate::parse`], which matches against
//! them first before falling back to looser heuristics.
use crate::chunking::Chunk;
use crate::records::Record;
use anyhow::{Context, Result};

/// Marks a global section heading.
pub const SECTION_MARKER: &str = "## ";
/// Marks a per-record heading inside the individual section.
pub const ENTRY_MARKER: &str = "### ";
pub const DESCRIPTION_LABEL: &str = "Business Description";
pub const IMPROVEMENTS_LABEL: &str = "Improvement Opportunities";

pub const OVERVIEW_TITLE: &str = "Organization Overview";
pub const RISKS_TITLE: &str = "Potential Risks";
pub const IMPROVEMENTS_TITLE: &str = "Organization Improvements";
pub const INDIVIDUAL_TITLE: &str = "Individual Flow Analysis";

// Prompt templates loaded at compile time
const ANALYSIS_FULL: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/prompts/analysis_full.md"
));
const ANALYSIS_CHUNK: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/prompts/analysis_chunk.md"
));
const SUMMARY: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/prompts/summary.md"));

/// Which slice of the run a prompt covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptScope {
    /// Whole set in one call, including the organization sections.
    Full,
    /// One chunk out of `total`, individual sections only. `index` is 0-based.
    Chunk { index: usize, total: usize },
}

/// Aggregate signal for the narrative prompt.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SummaryInput {
    pub record_count: usize,
    pub category_counts: Vec<(String, usize)>,
    pub trigger_counts: Vec<(String, usize)>,
    /// `(record name, truncated description)` pairs.
    pub excerpts: Vec<(String, String)>,
}

/// Render one record section in the canonical response grammar.
pub fn render_entry(name: &str, description: &str, improvements: &str) -> String {
    format!(
        "{ENTRY_MARKER}{name}\n**{DESCRIPTION_LABEL}:** {description}\n**{IMPROVEMENTS_LABEL}:** {improvements}\n"
    )
}

/// Render one global section heading plus body.
pub fn render_section(title: &str, body: &str) -> String {
    format!("{SECTION_MARKER}{title}\n{body}\n")
}

/// Grammar block that tells the model what headings to emit.
pub fn output_grammar(names: &[&str], include_global: bool) -> String {
    let mut grammar = String::new();
    if include_global {
        grammar.push_str(&render_global_grammar());
    }
    grammar.push_str(&format!("{SECTION_MARKER}{INDIVIDUAL_TITLE}\n"));
    for name in names {
        grammar.push_str(&render_entry(
            name,
            "<what this automation does for the business, 2-4 sentences>",
            "<concrete improvement opportunities, 2-4 sentences>",
        ));
    }
    grammar
}

fn render_global_grammar() -> String {
    let mut grammar = String::new();
    grammar.push_str(&render_section(
        OVERVIEW_TITLE,
        "<how the automations fit together and what business areas they cover>",
    ));
    grammar.push_str(&render_section(
        RISKS_TITLE,
        "<operational, data-quality and maintainability risks>",
    ));
    grammar.push_str(&render_section(
        IMPROVEMENTS_TITLE,
        "<organization-wide recommendations>",
    ));
    grammar
}

/// Build the analysis prompt for a full set or one chunk.
pub fn build_analysis_prompt(records: &[&Record], alias: &str, scope: PromptScope) -> Result<String> {
    let names: Vec<&str> = records.iter().map(|record| record.name.as_str()).collect();
    let record_names = names
        .iter()
        .enumerate()
        .map(|(i, name)| format!("{}. {name}", i + 1))
        .collect::<Vec<_>>()
        .join("\n");
    let records_json =
        serde_json::to_string_pretty(records).context("serialize records for prompt")?;
    let record_count = records.len().to_string();

    let prompt = match scope {
        PromptScope::Full => fill_template(
            ANALYSIS_FULL,
            &[
                ("alias", alias),
                ("record_count", &record_count),
                ("record_names", &record_names),
                ("records_json", &records_json),
                ("output_grammar", &output_grammar(&names, true)),
            ],
        ),
        PromptScope::Chunk { index, total } => fill_template(
            ANALYSIS_CHUNK,
            &[
                ("alias", alias),
                ("chunk_number", &(index + 1).to_string()),
                ("chunk_total", &total.to_string()),
                ("record_count", &record_count),
                ("record_names", &record_names),
                ("records_json", &records_json),
                ("output_grammar", &output_grammar(&names, false)),
            ],
        ),
    };
    Ok(prompt)
}

/// Convenience wrapper for one planned chunk.
pub fn build_chunk_prompt(chunk: &Chunk<'_>, alias: &str, index: usize, total: usize) -> Result<String> {
    build_analysis_prompt(&chunk.records, alias, PromptScope::Chunk { index, total })
}

/// Build the narrative prompt from the compacted cross-chunk summary.
pub fn build_summary_prompt(summary: &SummaryInput, alias: &str) -> String {
    let excerpts = if summary.excerpts.is_empty() {
        "(none)".to_string()
    } else {
        summary
            .excerpts
            .iter()
            .map(|(name, excerpt)| format!("- {name}: {excerpt}"))
            .collect::<Vec<_>>()
            .join("\n")
    };
    fill_template(
        SUMMARY,
        &[
            ("alias", alias),
            ("record_count", &summary.record_count.to_string()),
            ("category_counts", &render_counts(&summary.category_counts)),
            ("trigger_counts", &render_counts(&summary.trigger_counts)),
            ("excerpts", &excerpts),
            ("output_grammar", &render_global_grammar()),
        ],
    )
}

fn render_counts(counts: &[(String, usize)]) -> String {
    if counts.is_empty() {
        return "- (unknown)".to_string();
    }
    counts
        .iter()
        .map(|(label, count)| format!("- {label}: {count}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Single-pass `{key}` substitution; substituted text is never rescanned,
/// so record JSON containing braces is embedded untouched.
fn fill_template(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let replaced = after.find('}').and_then(|close| {
            let key = &after[..close];
            values
                .iter()
                .find(|(name, _)| *name == key)
                .map(|(_, value)| (*value, close))
        });
        match replaced {
            Some((value, close)) => {
                out.push_str(value);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

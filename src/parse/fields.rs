//! Description and improvement extraction from one record's section.
//!
//! Each field has an ordered table of pure extractors. The first one whose
//! output clears its own minimum length wins.
use regex::Regex;
use std::sync::LazyLock;

/// One try-extract step.
pub struct FieldStrategy {
    pub name: &'static str,
    pub min_chars: usize,
    pub extract: fn(&str) -> Option<String>,
}

const DESCRIPTION_PRIMARY: &[&str] = &["business description"];
const DESCRIPTION_SYNONYMS: &[&str] = &[
    "business purpose",
    "what it does",
    "description",
    "functionality",
    "purpose",
    "summary",
    "overview",
];
const IMPROVEMENTS_PRIMARY: &[&str] = &["improvement opportunities"];
const IMPROVEMENTS_SYNONYMS: &[&str] = &[
    "optimization opportunities",
    "suggested improvements",
    "areas for improvement",
    "recommended improvements",
    "recommendations",
    "recommendation",
    "improvements",
    "improvement",
    "optimizations",
    "enhancements",
];
// Labels that end a field without being one we extract.
const OTHER_LABELS: &[&str] = &[
    "potential risks",
    "key components",
    "technical details",
    "complexity",
    "trigger",
    "risks",
    "risk",
    "notes",
    "note",
];

const PARAGRAPH_MIN_CHARS: usize = 40;
const LOOSE_MIN_CHARS: usize = 15;
const LIST_MIN_ITEMS: usize = 2;

fn label_regex(labels: &[&str]) -> Regex {
    let alternation = labels
        .iter()
        .map(|label| regex::escape(label).replace(r"\ ", r"[ \t]+").replace(' ', r"[ \t]+"))
        .collect::<Vec<_>>()
        .join("|");
    // Optional heading/bullet prefix, optional bold around the label and/or
    // colon, then either a colon or end of line.
    let pattern = format!(
        r"(?imR)^[ \t]*(?:#{{1,6}}[ \t]*|[-*+][ \t]+)?(?:\*\*|__)?[ \t]*(?:{alternation})[ \t]*(?:\*\*|__)?[ \t]*(?::|$)[ \t]*(?:\*\*|__)?[ \t]*"
    );
    Regex::new(&pattern).expect("field label regex is valid")
}

static DESCRIPTION_PRIMARY_RE: LazyLock<Regex> = LazyLock::new(|| label_regex(DESCRIPTION_PRIMARY));
static DESCRIPTION_SYNONYMS_RE: LazyLock<Regex> =
    LazyLock::new(|| label_regex(DESCRIPTION_SYNONYMS));
static IMPROVEMENTS_PRIMARY_RE: LazyLock<Regex> =
    LazyLock::new(|| label_regex(IMPROVEMENTS_PRIMARY));
static IMPROVEMENTS_SYNONYMS_RE: LazyLock<Regex> =
    LazyLock::new(|| label_regex(IMPROVEMENTS_SYNONYMS));
static IMPROVEMENTS_ANY_RE: LazyLock<Regex> = LazyLock::new(|| {
    let labels: Vec<&str> = IMPROVEMENTS_PRIMARY
        .iter()
        .chain(IMPROVEMENTS_SYNONYMS)
        .copied()
        .collect();
    label_regex(&labels)
});
static ANY_LABEL_RE: LazyLock<Regex> = LazyLock::new(|| {
    let mut labels: Vec<&str> = DESCRIPTION_PRIMARY
        .iter()
        .chain(DESCRIPTION_SYNONYMS)
        .chain(IMPROVEMENTS_PRIMARY)
        .chain(IMPROVEMENTS_SYNONYMS)
        .chain(OTHER_LABELS)
        .copied()
        .collect();
    // Longest first so "business description" beats "description".
    labels.sort_by_key(|label| std::cmp::Reverse(label.len()));
    label_regex(&labels)
});
static IMPROVEMENT_CUE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:could be improved|consider|recommend|should|would benefit)")
        .expect("improvement cue regex is valid")
});
static NUMBERED_ITEM_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^[ \t]*\d+[.)][ \t]+\S.*$").expect("numbered item regex is valid")
});

pub const DESCRIPTION_STRATEGIES: &[FieldStrategy] = &[
    FieldStrategy {
        name: "labeled_description",
        min_chars: 1,
        extract: labeled_description,
    },
    FieldStrategy {
        name: "synonym_description",
        min_chars: 1,
        extract: synonym_description,
    },
    FieldStrategy {
        name: "first_paragraph",
        min_chars: PARAGRAPH_MIN_CHARS,
        extract: first_substantial_paragraph,
    },
    FieldStrategy {
        name: "before_improvements",
        min_chars: LOOSE_MIN_CHARS,
        extract: paragraph_before_improvements,
    },
];

pub const IMPROVEMENT_STRATEGIES: &[FieldStrategy] = &[
    FieldStrategy {
        name: "labeled_improvements",
        min_chars: 1,
        extract: labeled_improvements,
    },
    FieldStrategy {
        name: "synonym_improvements",
        min_chars: 1,
        extract: synonym_improvements,
    },
    FieldStrategy {
        name: "improvement_cue_paragraph",
        min_chars: LOOSE_MIN_CHARS,
        extract: improvement_cue_paragraph,
    },
    FieldStrategy {
        name: "numbered_list",
        min_chars: 1,
        extract: numbered_list,
    },
];

/// Run `strategies` in order; returns the winning strategy name and text.
pub fn first_match(strategies: &[FieldStrategy], body: &str) -> Option<(&'static str, String)> {
    strategies.iter().find_map(|strategy| {
        let text = (strategy.extract)(body)?;
        (text.chars().count() >= strategy.min_chars).then_some((strategy.name, text))
    })
}

/// Text after the first `label` match up to the next known label.
fn labeled_field(body: &str, label: &Regex) -> Option<String> {
    let found = label.find(body)?;
    let rest = &body[found.end()..];
    normalize(before_label(rest))
}

fn labeled_description(body: &str) -> Option<String> {
    labeled_field(body, &DESCRIPTION_PRIMARY_RE)
}

fn synonym_description(body: &str) -> Option<String> {
    labeled_field(body, &DESCRIPTION_SYNONYMS_RE)
}

fn labeled_improvements(body: &str) -> Option<String> {
    labeled_field(body, &IMPROVEMENTS_PRIMARY_RE)
}

fn synonym_improvements(body: &str) -> Option<String> {
    labeled_field(body, &IMPROVEMENTS_SYNONYMS_RE)
}

fn paragraphs(body: &str) -> impl Iterator<Item = &str> {
    body.split("\n\n").map(str::trim).filter(|p| !p.is_empty())
}

/// Text up to the first known label; labels end a paragraph.
fn before_label(text: &str) -> &str {
    ANY_LABEL_RE
        .find(text)
        .map_or(text, |label| &text[..label.start()])
}

fn first_substantial_paragraph(body: &str) -> Option<String> {
    paragraphs(body)
        .filter(|p| !p.starts_with('#'))
        .map(|p| before_label(p).trim())
        .find(|p| p.chars().count() >= PARAGRAPH_MIN_CHARS)
        .and_then(normalize)
}

fn paragraph_before_improvements(body: &str) -> Option<String> {
    let cut = IMPROVEMENTS_ANY_RE.find(body)?.start();
    paragraphs(&body[..cut])
        .filter(|p| !p.starts_with('#'))
        .last()
        .and_then(normalize)
}

/// First paragraph with improvement wording. The opening paragraph is
/// skipped when there are others, since it is usually the description.
fn improvement_cue_paragraph(body: &str) -> Option<String> {
    let candidates: Vec<&str> = paragraphs(body).filter(|p| !p.starts_with('#')).collect();
    let skip = usize::from(candidates.len() > 1);
    candidates
        .into_iter()
        .skip(skip)
        .find(|p| IMPROVEMENT_CUE_RE.is_match(p))
        .and_then(normalize)
}

/// Widest heuristic: any numbered list with at least two items.
fn numbered_list(body: &str) -> Option<String> {
    let items: Vec<&str> = NUMBERED_ITEM_RE
        .find_iter(body)
        .map(|m| m.as_str().trim())
        .collect();
    if items.len() < LIST_MIN_ITEMS {
        return None;
    }
    Some(items.join("\n"))
}

/// Trim, drop stray bold markers at the edges, collapse blank runs.
fn normalize(text: &str) -> Option<String> {
    let trimmed = text
        .trim()
        .trim_start_matches("**")
        .trim_end_matches("**")
        .trim();
    if trimmed.is_empty() {
        return None;
    }
    let mut out = String::with_capacity(trimmed.len());
    let mut blank_run = false;
    for line in trimmed.lines() {
        let line = line.trim_end();
        if line.trim().is_empty() {
            blank_run = true;
            continue;
        }
        if !out.is_empty() {
            out.push_str(if blank_run { "\n\n" } else { "\n" });
        }
        blank_run = false;
        out.push_str(line);
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_labels_split_cleanly() {
        let body = "**Business Description:** foo\n**Improvement Opportunities:** bar\n";
        assert_eq!(
            first_match(DESCRIPTION_STRATEGIES, body),
            Some(("labeled_description", "foo".to_string()))
        );
        assert_eq!(
            first_match(IMPROVEMENT_STRATEGIES, body),
            Some(("labeled_improvements", "bar".to_string()))
        );
    }

    #[test]
    fn bold_label_with_outside_colon_and_multiline_value() {
        let body = "- **Business Description**: Routes new leads\nto the right queue.\n\n- **Recommendations**: Add a fault path.";
        assert_eq!(
            labeled_description(body).as_deref(),
            Some("Routes new leads\nto the right queue.")
        );
        assert_eq!(labeled_improvements(body), None);
        assert_eq!(synonym_improvements(body).as_deref(), Some("Add a fault path."));
    }

    #[test]
    fn heading_style_label_takes_following_lines() {
        let body = "#### Purpose\nSends renewal reminders to account owners.\n#### Improvements\nBatch the emails.";
        assert_eq!(
            synonym_description(body).as_deref(),
            Some("Sends renewal reminders to account owners.")
        );
        assert_eq!(synonym_improvements(body).as_deref(), Some("Batch the emails."));
    }

    #[test]
    fn description_falls_back_to_first_substantial_paragraph() {
        let body = "Short.\n\nThis flow synchronizes opportunity stages with the billing platform nightly.\n\nConsider adding retries.";
        assert_eq!(
            first_match(DESCRIPTION_STRATEGIES, body).map(|(name, _)| name),
            Some("first_paragraph")
        );
        assert_eq!(
            first_match(IMPROVEMENT_STRATEGIES, body),
            Some(("improvement_cue_paragraph", "Consider adding retries.".to_string()))
        );
    }

    #[test]
    fn short_lead_text_falls_through_to_text_before_improvements() {
        let body = "Flags stale cases for review.\nImprovements: Use a scheduled path.";
        assert_eq!(first_substantial_paragraph(body), None);
        assert_eq!(
            first_match(DESCRIPTION_STRATEGIES, body),
            Some(("before_improvements", "Flags stale cases for review.".to_string()))
        );
        assert_eq!(
            first_match(IMPROVEMENT_STRATEGIES, body),
            Some(("synonym_improvements", "Use a scheduled path.".to_string()))
        );
    }

    #[test]
    fn paragraph_text_stops_at_a_label_line() {
        let body = "This flow keeps account ownership aligned with territory changes.\nRisks: none noted";
        assert_eq!(
            first_substantial_paragraph(body).as_deref(),
            Some("This flow keeps account ownership aligned with territory changes.")
        );
    }

    #[test]
    fn numbered_list_needs_two_items() {
        assert_eq!(numbered_list("1. Only one item"), None);
        assert_eq!(
            numbered_list("Intro\n1. Add fault paths\n2) Remove hardcoded ids\n").as_deref(),
            Some("1. Add fault paths\n2) Remove hardcoded ids")
        );
    }

    #[test]
    fn nothing_matches_on_empty_body() {
        assert_eq!(first_match(DESCRIPTION_STRATEGIES, "  \n"), None);
        assert_eq!(first_match(IMPROVEMENT_STRATEGIES, ""), None);
    }
}

//! Markdown heading splits and global section classification.
use super::clean_markup;

/// Heading text plus everything up to the next heading of the same level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section<'a> {
    pub header: String,
    pub body: &'a str,
}

/// Global narrative sections the prompt asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GlobalKind {
    Overview,
    Risks,
    Improvements,
    Individual,
}

// Checked in this order: "Individual Flow Analysis" must not fall into
// overview, and "Organization Improvements" must not fall into individual.
const INDIVIDUAL_SYNONYMS: &[&str] = &[
    "individual",
    "flow analysis",
    "per-flow",
    "per flow",
    "detailed analysis",
    "automation analysis",
    "flow-by-flow",
    "flow by flow",
];
const RISK_SYNONYMS: &[&str] = &["risk", "concern", "vulnerabilit", "issues"];
const IMPROVEMENT_SYNONYMS: &[&str] = &[
    "improvement",
    "recommendation",
    "optimization",
    "optimisation",
    "next step",
];
const OVERVIEW_SYNONYMS: &[&str] = &["overview", "summary", "introduction", "executive", "landscape"];

pub fn classify_header(header: &str) -> Option<GlobalKind> {
    let lower = header.to_lowercase();
    let has = |synonyms: &[&str]| synonyms.iter().any(|s| lower.contains(s));
    if has(INDIVIDUAL_SYNONYMS) {
        Some(GlobalKind::Individual)
    } else if has(RISK_SYNONYMS) {
        Some(GlobalKind::Risks)
    } else if has(IMPROVEMENT_SYNONYMS) {
        Some(GlobalKind::Improvements)
    } else if has(OVERVIEW_SYNONYMS) {
        Some(GlobalKind::Overview)
    } else {
        None
    }
}

/// Number of leading `#` if the line is an ATX heading, else `None`.
pub fn heading_level(line: &str) -> Option<usize> {
    let trimmed = line.trim_start();
    if line.len() - trimmed.len() > 3 {
        return None;
    }
    let level = trimmed.bytes().take_while(|b| *b == b'#').count();
    if level == 0 || level > 6 {
        return None;
    }
    match trimmed[level..].chars().next() {
        Some(ch) if ch.is_whitespace() => Some(level),
        _ => None,
    }
}

pub fn has_any_heading(text: &str) -> bool {
    text.lines().any(|line| heading_level(line).is_some())
}

/// Byte offsets of every heading line at `level` or shallower.
pub fn heading_offsets(text: &str, max_level: usize) -> Vec<usize> {
    line_spans(text)
        .filter(|span| heading_level(span.line).is_some_and(|level| level <= max_level))
        .map(|span| span.start)
        .collect()
}

/// Split on headings of exactly `level`. Text before the first heading is dropped.
pub fn split_sections(text: &str, level: usize) -> Vec<Section<'_>> {
    let mut sections = Vec::new();
    let mut current: Option<(String, usize)> = None;
    for LineSpan { start, end, line } in line_spans(text) {
        let Some(found) = heading_level(line) else {
            continue;
        };
        // A shallower heading closes the current section without opening one.
        if found > level {
            continue;
        }
        if let Some((header, body_start)) = current.take() {
            sections.push(Section {
                header,
                body: &text[body_start.min(start)..start],
            });
        }
        if found == level {
            let header = clean_markup(line.trim_start()[level..].trim().trim_end_matches('#'));
            current = Some((header, end));
        }
    }
    if let Some((header, body_start)) = current {
        sections.push(Section {
            header,
            body: &text[body_start.min(text.len())..],
        });
    }
    sections
}

struct LineSpan<'a> {
    /// Offset of the first byte of the line.
    start: usize,
    /// Offset just past the line terminator.
    end: usize,
    /// Line text without terminator.
    line: &'a str,
}

fn line_spans(text: &str) -> impl Iterator<Item = LineSpan<'_>> {
    let mut offset = 0;
    text.split_inclusive('\n').map(move |raw| {
        let start = offset;
        offset += raw.len();
        LineSpan {
            start,
            end: offset,
            line: raw.trim_end_matches(['\n', '\r']),
        }
    })
}

/// Drop a fence that wraps the whole response.
pub fn strip_fences(text: &str) -> &str {
    let trimmed = text.trim();
    if !trimmed.starts_with("```") || !trimmed.ends_with("```") || trimmed.len() < 6 {
        return trimmed;
    }
    let inner = &trimmed[3..trimmed.len() - 3];
    // Skip a language tag such as ```markdown
    match inner.find('\n') {
        Some(newline) if !inner[..newline].contains(' ') => inner[newline + 1..].trim(),
        _ => inner.trim(),
    }
}

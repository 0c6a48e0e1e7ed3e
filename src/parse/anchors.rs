//! Fallback splits keyed on the known record names.
//!
//! Used when the response ignores the per-record heading grammar. Each
//! record gets a list of candidate patterns tried in order; the first one
//! whose content clears [`MIN_ANCHORED_CHARS`] wins. Content runs from the
//! anchor to the next anchor of another record or the next global heading.
use super::sections::heading_offsets;
use super::RawEntry;
use crate::reconcile::names_match;
use crate::records::Record;
use regex::Regex;

const MIN_ANCHORED_CHARS: usize = 20;
const MIN_SHARED_PREFIX_CHARS: usize = 3;

const BOLD: &str = r"(?:\*\*|__)?";

/// Candidate patterns for one record name, most specific first.
fn candidate_patterns(name: &str) -> Vec<Regex> {
    let escaped = regex::escape(name.trim());
    let mut patterns = vec![
        // Heading that is exactly the name, optionally numbered.
        format!(
            r"(?imR)^[ \t]*#{{1,6}}[ \t]*(?:\d+[.)][ \t]*)?{BOLD}[ \t]*{escaped}[ \t]*{BOLD}[ \t]*:?[ \t]*$"
        ),
    ];
    let tokens: Vec<String> = name
        .split(|ch: char| !ch.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(regex::escape)
        .collect();
    if tokens.len() > 1 {
        // Separators normalized: "Lead_Assignment" == "Lead Assignment" == "Lead-Assignment".
        let joined = tokens.join(r"[\s_\-]+");
        patterns.push(format!(
            r"(?imR)^[ \t]*(?:#{{1,6}}[ \t]*)?(?:\d+[.)][ \t]*)?{BOLD}[ \t]*{joined}[ \t]*{BOLD}[ \t]*:?[ \t]*$"
        ));
    }
    // Name at line start followed by a colon, value inline.
    patterns.push(format!(
        r"(?imR)^[ \t]*(?:[-*+][ \t]+)?{BOLD}[ \t]*{escaped}[ \t]*{BOLD}[ \t]*:[ \t]*{BOLD}"
    ));
    // Numbered list item starting with the name.
    patterns.push(format!(
        r"(?imR)^[ \t]*\d+[.)][ \t]*{BOLD}[ \t]*{escaped}[ \t]*{BOLD}[ \t]*(?::|-|–|$)[ \t]*"
    ));
    patterns
        .iter()
        .filter_map(|pattern| Regex::new(pattern).ok())
        .collect()
}

/// `(start, end)` of the first match of each pattern that matches.
fn anchor_candidates(text: &str, name: &str) -> Vec<(usize, usize)> {
    candidate_patterns(name)
        .iter()
        .filter_map(|pattern| pattern.find(text))
        .map(|found| (found.start(), found.end()))
        .collect()
}

/// Step 3: per-record name anchors.
pub fn split_by_names(text: &str, records: &[&Record]) -> Vec<RawEntry> {
    let candidates: Vec<Vec<(usize, usize)>> = records
        .iter()
        .map(|record| anchor_candidates(text, &record.name))
        .collect();
    let mut cuts: Vec<usize> = candidates
        .iter()
        .filter_map(|options| options.first().map(|(start, _)| *start))
        .collect();
    cuts.extend(heading_offsets(text, 2));
    cuts.sort_unstable();
    cuts.dedup();

    let mut entries = Vec::new();
    for (record, options) in records.iter().zip(&candidates) {
        let chosen = options.iter().find_map(|(start, end)| {
            let stop = cuts
                .iter()
                .copied()
                .find(|cut| *cut > *start && *cut >= *end)
                .unwrap_or(text.len());
            let body = text.get(*end..stop)?.trim();
            (body.chars().count() >= MIN_ANCHORED_CHARS).then_some(body)
        });
        if let Some(body) = chosen {
            entries.push(RawEntry {
                name: record.name.clone(),
                body: body.to_string(),
            });
        }
    }
    entries
}

/// Longest common prefix of all names, cut back to the last separator when
/// it ends mid-word.
fn shared_prefix(records: &[&Record]) -> Option<String> {
    let first = records.first()?.name.as_str();
    let mut len = first.len();
    for record in &records[1..] {
        len = first
            .char_indices()
            .zip(record.name.chars())
            .take_while(|((_, a), b)| a == b)
            .map(|((idx, ch), _)| idx + ch.len_utf8())
            .last()
            .unwrap_or(0)
            .min(len);
    }
    let prefix = &first[..len];
    let all_equal = records.iter().all(|record| record.name == first);
    let prefix = if all_equal {
        prefix
    } else {
        match prefix
            .char_indices()
            .rev()
            .find(|(_, ch)| !ch.is_alphanumeric())
        {
            Some((idx, ch)) => &prefix[..idx + ch.len_utf8()],
            None => prefix,
        }
    };
    let prefix = prefix.trim_start();
    (prefix.trim().chars().count() >= MIN_SHARED_PREFIX_CHARS).then(|| prefix.to_string())
}

fn is_markup_lead(lead: &str) -> bool {
    lead.chars()
        .all(|ch| ch.is_whitespace() || ch.is_ascii_digit() || "#*-+.)`_>".contains(ch))
}

/// Step 4: split on line-leading occurrences of a prefix all names share.
pub fn split_by_shared_token(text: &str, records: &[&Record]) -> Vec<RawEntry> {
    if records.len() < 2 {
        return Vec::new();
    }
    let Some(prefix) = shared_prefix(records) else {
        return Vec::new();
    };

    // (line start, prefix start) per qualifying line.
    let mut starts = Vec::new();
    let mut offset = 0;
    for line in text.split_inclusive('\n') {
        if let Some(pos) = line.find(&prefix) {
            if is_markup_lead(&line[..pos]) {
                starts.push((offset, offset + pos));
            }
        }
        offset += line.len();
    }
    if starts.len() < 2 {
        return Vec::new();
    }

    let mut entries = Vec::new();
    for (i, (_, start)) in starts.iter().enumerate() {
        let stop = starts.get(i + 1).map_or(text.len(), |(line, _)| *line);
        let segment = &text[*start..stop];
        let (head, rest) = segment.split_once('\n').unwrap_or((segment, ""));
        let (name_part, inline) = split_name_line(head);
        let name = super::clean_entry_name(name_part);
        if !records.iter().any(|record| names_match(&record.name, &name)) {
            continue;
        }
        let body = format!("{inline}\n{rest}");
        entries.push(RawEntry {
            name,
            body: body.trim().to_string(),
        });
    }
    entries
}

/// Split a name line at the first `:` or ` - ` into name and inline value.
fn split_name_line(line: &str) -> (&str, &str) {
    let colon = line.find(':');
    let dash = line.find(" - ");
    match (colon, dash) {
        (Some(c), Some(d)) if d < c => (&line[..d], &line[d + 3..]),
        (Some(c), _) => (&line[..c], &line[c + 1..]),
        (None, Some(d)) => (&line[..d], &line[d + 3..]),
        (None, None) => (line, ""),
    }
}

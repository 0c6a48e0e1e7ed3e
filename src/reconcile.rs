//! Completeness guarantee: exactly one entry per input record.
//!
//! Parsed entries are attributed to records by name, exact matches first,
//! then case-insensitive substring matches in either direction. Matched
//! entries take the record's canonical name. Records left without an entry
//! get a synthesized one; parsed entries nobody claims are dropped.
use crate::analysis::AnalysisEntry;
use crate::records::Record;

/// Lowercase, with every run of non-alphanumerics collapsed to one space.
fn normalize_name(name: &str) -> String {
    name.split(|ch: char| !ch.is_alphanumeric())
        .filter(|part| !part.is_empty())
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Case-insensitive substring match in either direction. Separators
/// (`_`, `-`, spaces) are treated as equivalent.
pub fn names_match(a: &str, b: &str) -> bool {
    let a = normalize_name(a);
    let b = normalize_name(b);
    if a.is_empty() || b.is_empty() {
        return false;
    }
    a.contains(&b) || b.contains(&a)
}

/// One entry per record, in record order.
pub fn reconcile(entries: Vec<AnalysisEntry>, records: &[&Record]) -> Vec<AnalysisEntry> {
    let entry_names: Vec<String> = entries
        .iter()
        .map(|entry| normalize_name(&entry.record_name))
        .collect();
    let mut claimed = vec![false; entries.len()];
    let mut assignment: Vec<Option<usize>> = vec![None; records.len()];

    // Exact pass first so a short record name cannot steal a longer one's entry.
    for (slot, record) in assignment.iter_mut().zip(records) {
        let wanted = normalize_name(&record.name);
        if wanted.is_empty() {
            continue;
        }
        if let Some(idx) = (0..entries.len()).find(|idx| !claimed[*idx] && entry_names[*idx] == wanted)
        {
            claimed[idx] = true;
            *slot = Some(idx);
        }
    }

    // Substring pass, closest length wins.
    for (slot, record) in assignment.iter_mut().zip(records) {
        if slot.is_some() {
            continue;
        }
        let wanted = normalize_name(&record.name);
        let best = (0..entries.len())
            .filter(|idx| !claimed[*idx] && names_match(&entry_names[*idx], &wanted))
            .min_by_key(|idx| entry_names[*idx].len().abs_diff(wanted.len()));
        if let Some(idx) = best {
            claimed[idx] = true;
            *slot = Some(idx);
        }
    }

    let dropped = claimed.iter().filter(|taken| !**taken).count();
    if dropped > 0 {
        tracing::debug!(dropped, "parsed entries matched no record");
    }

    let mut pool: Vec<Option<AnalysisEntry>> = entries.into_iter().map(Some).collect();
    let mut synthesized = 0usize;
    let reconciled: Vec<AnalysisEntry> = records
        .iter()
        .zip(assignment)
        .map(|(record, slot)| {
            match slot.and_then(|idx| pool.get_mut(idx).and_then(Option::take)) {
                Some(mut entry) => {
                    entry.record_name = record.name.clone();
                    entry
                }
                None => {
                    synthesized += 1;
                    tracing::debug!(record = %record.name, "no parsed entry, synthesizing");
                    AnalysisEntry::synthesized(record)
                }
            }
        })
        .collect();
    if synthesized > 0 {
        tracing::info!(
            synthesized,
            records = records.len(),
            "filled records missing from the response"
        );
    }
    reconciled
}

use super::*;
use crate::prompts::{render_entry, render_section, INDIVIDUAL_TITLE, OVERVIEW_TITLE, RISKS_TITLE};
use serde_json::Value;

fn records(names: &[&str]) -> Vec<Record> {
    names
        .iter()
        .enumerate()
        .map(|(i, name)| Record::new((i + 1).to_string(), *name, Value::Null))
        .collect()
}

fn names(parsed: &ParsedResponse) -> Vec<&str> {
    parsed
        .entries
        .iter()
        .map(|entry| entry.record_name.as_str())
        .collect()
}

#[test]
fn canonical_entries_parse_with_labels() {
    let owned = records(&["A", "B"]);
    let refs: Vec<&Record> = owned.iter().collect();
    let text = "### A\n**Business Description:** foo\n**Improvement Opportunities:** bar\n### B\n**Business Description:** baz\n**Improvement Opportunities:** qux";
    let parsed = parse_response(text, &refs);

    assert_eq!(parsed.method, SplitMethod::EntryHeaders);
    assert_eq!(
        parsed.entries,
        vec![
            AnalysisEntry::parsed("A", "foo", "bar"),
            AnalysisEntry::parsed("B", "baz", "qux"),
        ]
    );
    assert_eq!(parsed.overview, None);
}

#[test]
fn rendered_grammar_round_trips_for_many_records() {
    let names_in: Vec<String> = (1..=7).map(|i| format!("Flow_{i}_Sync")).collect();
    let owned: Vec<Record> = names_in
        .iter()
        .enumerate()
        .map(|(i, name)| Record::new(i.to_string(), name.as_str(), Value::Null))
        .collect();
    let refs: Vec<&Record> = owned.iter().collect();

    let mut text = render_section(OVERVIEW_TITLE, "Seven sync flows.");
    text.push_str(&render_section(RISKS_TITLE, "Tight coupling."));
    text.push_str(&format!("## {INDIVIDUAL_TITLE}\n"));
    for name in &names_in {
        text.push_str(&render_entry(
            name,
            &format!("{name} copies data"),
            &format!("{name} needs retries"),
        ));
    }

    let parsed = parse_response(&text, &refs);
    assert_eq!(parsed.entries.len(), 7);
    for (entry, name) in parsed.entries.iter().zip(&names_in) {
        assert_eq!(&entry.record_name, name);
        assert_eq!(entry.business_description, format!("{name} copies data"));
        assert_eq!(entry.improvements, format!("{name} needs retries"));
    }
    assert_eq!(parsed.overview.as_deref(), Some("Seven sync flows."));
    assert_eq!(parsed.risks.as_deref(), Some("Tight coupling."));
    assert_eq!(parsed.improvements, None);
}

#[test]
fn global_sections_use_synonyms_and_stay_out_of_entries() {
    let owned = records(&["Lead Router", "Case Closer"]);
    let refs: Vec<&Record> = owned.iter().collect();
    let text = "## Executive Summary\nA small sales org.\n\n## Key Concerns\nNo fault paths.\n\n## Recommendations\nAdd logging.\n\n## Flow-by-Flow Analysis\n### 1. Lead Router\nDescription: Routes leads.\nImprovements: Add a queue.\n### 2. **Case Closer**\nDescription: Closes stale cases.\nImprovements: Notify owners.\n";
    let parsed = parse_response(text, &refs);

    assert_eq!(parsed.overview.as_deref(), Some("A small sales org."));
    assert_eq!(parsed.risks.as_deref(), Some("No fault paths."));
    assert_eq!(parsed.improvements.as_deref(), Some("Add logging."));
    assert_eq!(names(&parsed), vec!["Lead Router", "Case Closer"]);
    assert_eq!(parsed.entries[1].business_description, "Closes stale cases.");
    assert_eq!(parsed.entries[1].improvements, "Notify owners.");
}

#[test]
fn missing_fields_fall_back_to_placeholders() {
    let owned = records(&["A", "B"]);
    let refs: Vec<&Record> = owned.iter().collect();
    let parsed = parse_response("### A\nok\n### B\nfine", &refs);
    assert_eq!(parsed.entries.len(), 2);
    assert_eq!(parsed.entries[0].business_description, PLACEHOLDER_DESCRIPTION);
    assert_eq!(parsed.entries[0].improvements, PLACEHOLDER_IMPROVEMENTS);
}

#[test]
fn single_entry_header_falls_back_to_name_anchors() {
    let owned = records(&["Renewal Reminder", "Invoice Builder"]);
    let refs: Vec<&Record> = owned.iter().collect();
    let text = "### Analysis\n**Renewal Reminder**: Emails account owners before contracts lapse.\n\n**Invoice Builder**: Generates invoices when opportunities close.\n";
    let parsed = parse_response(text, &refs);

    assert_eq!(parsed.method, SplitMethod::NameAnchors);
    assert_eq!(names(&parsed), vec!["Renewal Reminder", "Invoice Builder"]);
    assert_eq!(
        parsed.entries[1].business_description,
        "Generates invoices when opportunities close."
    );
}

#[test]
fn headingless_response_becomes_overview() {
    let owned = records(&["A"]);
    let refs: Vec<&Record> = owned.iter().collect();
    let parsed = parse_response("The org relies on a handful of flows.", &refs);
    assert_eq!(
        parsed.overview.as_deref(),
        Some("The org relies on a handful of flows.")
    );
    assert!(parsed.entries.is_empty());
    assert_eq!(parsed.method, SplitMethod::None);
}

#[test]
fn fenced_response_is_unwrapped() {
    let owned = records(&["A"]);
    let refs: Vec<&Record> = owned.iter().collect();
    let text = "```markdown\n### A\n**Business Description:** foo\n**Improvement Opportunities:** bar\n```";
    let parsed = parse_response(text, &refs);
    assert_eq!(parsed.entries, vec![AnalysisEntry::parsed("A", "foo", "bar")]);
}

#[test]
fn entry_names_lose_numbering_and_labels() {
    assert_eq!(clean_entry_name("1. **Lead_Router**:"), "Lead_Router");
    assert_eq!(clean_entry_name("2) Case Closer"), "Case Closer");
    assert_eq!(clean_entry_name("Flow: Order Sync"), "Order Sync");
    assert_eq!(clean_entry_name("Flow Name - Order Sync"), "Order Sync");
    assert_eq!(clean_entry_name("__Order_Sync__"), "Order_Sync");
    assert_eq!(clean_entry_name("`Order_Sync`"), "Order_Sync");
}

#[test]
fn headingless_response_with_dash_separated_names_degrades() {
    let owned = records(&["Order–Create", "Order–Cancel"]);
    let refs: Vec<&Record> = owned.iter().collect();
    let parsed = parse_response("Nothing structured came back.", &refs);
    assert!(parsed.entries.is_empty());
    assert_eq!(parsed.method, SplitMethod::None);
    assert_eq!(parsed.overview.as_deref(), Some("Nothing structured came back."));
}

#[test]
fn accented_names_anchor_without_headings() {
    let owned = records(&["Überweisung–Import", "Café Rückruf"]);
    let refs: Vec<&Record> = owned.iter().collect();
    let text = "**Überweisung–Import**: liest alle eingehenden Zahlungen der Hausbank täglich ein.\n\n**Café Rückruf**: ruft Kundinnen nach einer Bestellung zurück.\n";
    let parsed = parse_response(text, &refs);

    assert_eq!(parsed.method, SplitMethod::NameAnchors);
    assert_eq!(names(&parsed), vec!["Überweisung–Import", "Café Rückruf"]);
    assert_eq!(
        parsed.entries[0].business_description,
        "liest alle eingehenden Zahlungen der Hausbank täglich ein."
    );
}

#[test]
fn shared_token_split_survives_multibyte_names() {
    let owned = records(&["Überweisung–Import", "Überweisung–Export"]);
    let refs: Vec<&Record> = owned.iter().collect();
    let text = "Kurzer Überblick.\n- Überweisung–Import - liest Zahlungen von der Bank ein.\n- Überweisung–Export - schreibt Zahlungsdateien für die Bank.\n";
    let parsed = parse_response(text, &refs);

    assert_eq!(parsed.method, SplitMethod::SharedToken);
    assert_eq!(names(&parsed), vec!["Überweisung–Import", "Überweisung–Export"]);
}

#[test]
fn entry_names_keep_multibyte_characters() {
    assert_eq!(clean_entry_name("1. **Überweisung–Import**:"), "Überweisung–Import");
    assert_eq!(clean_entry_name("__Café_Rückruf__"), "Café_Rückruf");
    assert_eq!(clean_entry_name("Flow – Größe prüfen"), "Größe prüfen");
}

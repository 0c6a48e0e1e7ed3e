//! Shared test infrastructure for integration tests.
#![allow(dead_code)]

use flowscope::provider::{
    CompletionClient, CompletionError, ErrorCode, ProviderKind, Transport,
};
use flowscope::records::{Record, RecordSet};
use serde_json::json;
use std::cell::RefCell;
use std::time::Duration;

/// Completion client that answers from a closure and keeps every prompt.
pub struct ScriptedClient<F> {
    respond: F,
    pub prompts: RefCell<Vec<String>>,
}

impl<F> ScriptedClient<F>
where
    F: Fn(&str) -> Result<String, CompletionError>,
{
    pub fn new(respond: F) -> Self {
        Self {
            respond,
            prompts: RefCell::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.prompts.borrow().len()
    }
}

impl<F> CompletionClient for ScriptedClient<F>
where
    F: Fn(&str) -> Result<String, CompletionError>,
{
    fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
        self.prompts.borrow_mut().push(prompt.to_string());
        (self.respond)(prompt)
    }
}

/// Transport that answers from a closure and keeps every attempted prompt.
pub struct ScriptedTransport<F> {
    respond: F,
    pub attempts: RefCell<Vec<String>>,
}

impl<F> ScriptedTransport<F>
where
    F: Fn(&str) -> Result<String, CompletionError>,
{
    pub fn new(respond: F) -> Self {
        Self {
            respond,
            attempts: RefCell::new(Vec::new()),
        }
    }

    /// Attempts whose prompt contains `needle`.
    pub fn attempts_matching(&self, needle: &str) -> usize {
        self.attempts
            .borrow()
            .iter()
            .filter(|prompt| prompt.contains(needle))
            .count()
    }
}

impl<F> Transport for ScriptedTransport<F>
where
    F: Fn(&str) -> Result<String, CompletionError>,
{
    fn provider(&self) -> ProviderKind {
        ProviderKind::Anthropic
    }

    fn send(&self, prompt: &str) -> Result<String, CompletionError> {
        self.attempts.borrow_mut().push(prompt.to_string());
        (self.respond)(prompt)
    }
}

pub fn overload() -> CompletionError {
    CompletionError::new(
        ErrorCode::Overload,
        ProviderKind::Anthropic,
        "HTTP 529: overloaded_error",
    )
}

pub fn no_sleep(_: Duration) {}

/// `count` small records named `Flow_01`, `Flow_02`, ...
pub fn trivial_set(count: usize) -> RecordSet {
    RecordSet::new(
        Some("test-org".to_string()),
        (1..=count)
            .map(|i| {
                Record::new(
                    i.to_string(),
                    format!("Flow_{i:02}"),
                    json!({"processType": "AutoLaunchedFlow"}),
                )
            })
            .collect(),
    )
}

pub fn named_set(names: &[&str]) -> RecordSet {
    RecordSet::new(
        None,
        names
            .iter()
            .enumerate()
            .map(|(i, name)| Record::new((i + 1).to_string(), *name, json!({})))
            .collect(),
    )
}

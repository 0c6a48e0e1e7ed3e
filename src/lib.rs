//! Adaptive batching and response reconciliation for LM-driven analysis of
//! business automation records.
//!
//! A run picks single-shot or chunked analysis from the record set's size,
//! sends one prompt at a time to a completion provider, recovers per-record
//! entries from free-form responses and guarantees one entry per record.
pub mod aggregate;
pub mod analysis;
pub mod chunking;
pub mod cli;
pub mod config;
pub mod orchestrate;
pub mod parse;
pub mod prompts;
pub mod provider;
pub mod reconcile;
pub mod records;
pub mod sizing;
pub mod util;

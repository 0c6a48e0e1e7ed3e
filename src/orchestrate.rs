//! Run driver: strategy selection, sequential chunk processing with
//! per-chunk failure isolation, then the narrative pass.
//!
//! Chunks move through [`ChunkState`]; there is never more than one
//! completion call in flight. Only input validation aborts a run.
use crate::aggregate::{complete_narrative, fallback_narrative, summarize, Narrative};
use crate::analysis::{count_origin, AnalysisEntry, AnalysisResult, EntryOrigin, RunStats};
use crate::chunking::{plan_chunks, Chunk};
use crate::config::AnalysisConfig;
use crate::parse::parse_response;
use crate::prompts::{build_analysis_prompt, build_chunk_prompt, PromptScope};
use crate::provider::CompletionClient;
use crate::reconcile::reconcile;
use crate::records::{Record, RecordSet};
use crate::sizing::{select_strategy, AnalysisStrategy};
use anyhow::{Context, Result};
use std::time::Duration;

/// Everything one run needs, passed explicitly.
pub struct RunContext<'a> {
    pub client: &'a dyn CompletionClient,
    pub config: &'a AnalysisConfig,
    pub sleep: fn(Duration),
}

impl<'a> RunContext<'a> {
    pub fn new(client: &'a dyn CompletionClient, config: &'a AnalysisConfig) -> Self {
        Self {
            client,
            config,
            sleep: std::thread::sleep,
        }
    }

    pub fn with_sleep(mut self, sleep: fn(Duration)) -> Self {
        self.sleep = sleep;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkState {
    Pending,
    InFlight,
    Succeeded,
    FailedIsolated,
    Done,
}

impl std::fmt::Display for ChunkState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::InFlight => write!(f, "in_flight"),
            Self::Succeeded => write!(f, "succeeded"),
            Self::FailedIsolated => write!(f, "failed_isolated"),
            Self::Done => write!(f, "done"),
        }
    }
}

/// Result of processing one chunk (or the whole set in single-shot mode).
struct Processed {
    state: ChunkState,
    entries: Vec<AnalysisEntry>,
    overview: Option<String>,
    risks: Option<String>,
    improvements: Option<String>,
}

impl Processed {
    fn failed(records: &[&Record]) -> Self {
        Self {
            state: ChunkState::FailedIsolated,
            entries: records
                .iter()
                .copied()
                .map(AnalysisEntry::unavailable)
                .collect(),
            overview: None,
            risks: None,
            improvements: None,
        }
    }
}

fn transition(chunk: usize, from: ChunkState, to: ChunkState) {
    tracing::info!(chunk, %from, %to, "chunk state");
}

/// Prompt, complete, parse, reconcile. Any failure becomes placeholders.
fn process(
    ctx: &RunContext<'_>,
    chunk_number: usize,
    records: &[&Record],
    prompt: Result<String>,
) -> Processed {
    transition(chunk_number, ChunkState::Pending, ChunkState::InFlight);
    let prompt = match prompt {
        Ok(prompt) => prompt,
        Err(err) => {
            let detail = format!("{err:#}");
            tracing::warn!(chunk = chunk_number, error = %detail, "prompt build failed");
            transition(chunk_number, ChunkState::InFlight, ChunkState::FailedIsolated);
            return Processed::failed(records);
        }
    };
    tracing::debug!(chunk = chunk_number, prompt_bytes = prompt.len(), "prompt built");

    match ctx.client.complete(&prompt) {
        Ok(text) => {
            let parsed = parse_response(&text, records);
            let entries = reconcile(parsed.entries, records);
            transition(chunk_number, ChunkState::InFlight, ChunkState::Succeeded);
            Processed {
                state: ChunkState::Succeeded,
                entries,
                overview: parsed.overview,
                risks: parsed.risks,
                improvements: parsed.improvements,
            }
        }
        Err(err) => {
            tracing::warn!(
                chunk = chunk_number,
                code = %err.code(),
                error = %err,
                "completion failed, substituting placeholders"
            );
            transition(chunk_number, ChunkState::InFlight, ChunkState::FailedIsolated);
            Processed::failed(records)
        }
    }
}

/// Analyze `set` end to end.
pub fn run_analysis(ctx: &RunContext<'_>, set: &RecordSet) -> Result<AnalysisResult> {
    set.validate().context("validate record set")?;
    let decision = select_strategy(set, ctx.config);
    tracing::info!(
        strategy = %decision.strategy,
        total_cost = decision.total_cost,
        count = decision.count,
        "analysis started"
    );

    let (entries, narrative, chunk_count, failed_chunks) = match decision.strategy {
        AnalysisStrategy::SingleShot => run_single_shot(ctx, set),
        AnalysisStrategy::Chunked => run_chunked(ctx, set),
    };

    let result = AnalysisResult {
        organization_overview: narrative.overview,
        potential_risks: narrative.risks,
        organization_improvements: narrative.improvements,
        stats: RunStats {
            strategy: decision.strategy,
            record_count: set.count(),
            chunk_count,
            failed_chunks,
            synthesized_entries: count_origin(&entries, EntryOrigin::Synthesized),
            unavailable_entries: count_origin(&entries, EntryOrigin::Unavailable),
            narrative_fallback: narrative.fallback,
        },
        entries,
    };
    tracing::info!(
        entries = result.entries.len(),
        failed_chunks = result.stats.failed_chunks,
        synthesized = result.stats.synthesized_entries,
        unavailable = result.stats.unavailable_entries,
        narrative_fallback = result.stats.narrative_fallback,
        "analysis finished"
    );
    Ok(result)
}

fn run_single_shot(
    ctx: &RunContext<'_>,
    set: &RecordSet,
) -> (Vec<AnalysisEntry>, Narrative, usize, usize) {
    let records: Vec<&Record> = set.records.iter().collect();
    let prompt = build_analysis_prompt(&records, set.label(), PromptScope::Full);
    let processed = process(ctx, 1, &records, prompt);
    transition(1, processed.state, ChunkState::Done);

    let failed = usize::from(processed.state == ChunkState::FailedIsolated);
    let fallback = fallback_narrative(set, &processed.entries);
    let narrative = if failed == 1 {
        fallback
    } else {
        complete_narrative(
            processed.overview,
            processed.risks,
            processed.improvements,
            fallback,
        )
    };
    (processed.entries, narrative, 1, failed)
}

fn run_chunked(
    ctx: &RunContext<'_>,
    set: &RecordSet,
) -> (Vec<AnalysisEntry>, Narrative, usize, usize) {
    let chunks: Vec<Chunk<'_>> = plan_chunks(&set.records, ctx.config.max_chunk_cost);
    let total = chunks.len();
    tracing::info!(chunks = total, max_chunk_cost = ctx.config.max_chunk_cost, "chunk plan ready");

    let mut entries = Vec::with_capacity(set.count());
    let mut failed = 0usize;
    for (index, chunk) in chunks.iter().enumerate() {
        let number = index + 1;
        let prompt = build_chunk_prompt(chunk, set.label(), index, total);
        let processed = process(ctx, number, &chunk.records, prompt);
        if processed.state == ChunkState::FailedIsolated {
            failed += 1;
        }
        entries.extend(processed.entries);
        if number == total {
            transition(number, processed.state, ChunkState::Done);
        }
        // The next completion is either another chunk or the narrative.
        (ctx.sleep)(ctx.config.inter_chunk_delay());
    }

    let narrative = summarize(ctx.client, set, &entries, ctx.config.excerpt_chars);
    (entries, narrative, total, failed)
}

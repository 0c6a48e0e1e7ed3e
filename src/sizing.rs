//! Payload cost estimation and single-shot vs chunked strategy selection.
//!
//! Cost is the length of the compact JSON encoding, which tracks what the
//! prompt builder embeds closely enough to stay under provider limits.
use crate::config::AnalysisConfig;
use crate::records::RecordSet;
use serde::{Deserialize, Serialize};
use std::io;

/// Byte sink that only counts.
#[derive(Default)]
struct ByteCounter(usize);

impl io::Write for ByteCounter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0 += buf.len();
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Approximate encoded length of any serializable value.
///
/// Values that refuse to serialize cost zero; the pipeline only feeds
/// `serde_json::Value`-backed records, which always encode.
pub fn estimate_cost<T: Serialize + ?Sized>(value: &T) -> usize {
    let mut counter = ByteCounter::default();
    match serde_json::to_writer(&mut counter, value) {
        Ok(()) => counter.0,
        Err(_) => 0,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisStrategy {
    /// One completion call over the full set.
    SingleShot,
    /// Bounded chunks plus an aggregate narrative call.
    Chunked,
}

impl std::fmt::Display for AnalysisStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SingleShot => write!(f, "single_shot"),
            Self::Chunked => write!(f, "chunked"),
        }
    }
}

/// Strategy together with the numbers it was decided on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StrategyDecision {
    pub strategy: AnalysisStrategy,
    pub total_cost: usize,
    pub count: usize,
}

pub fn select_strategy(set: &RecordSet, config: &AnalysisConfig) -> StrategyDecision {
    let total_cost = estimate_cost(set);
    let count = set.count();
    let strategy = if total_cost > config.size_threshold || count > config.count_threshold {
        AnalysisStrategy::Chunked
    } else {
        AnalysisStrategy::SingleShot
    };
    tracing::debug!(%strategy, total_cost, count, "strategy selected");
    StrategyDecision {
        strategy,
        total_cost,
        count,
    }
}

//! Greedy bin-packing of records into bounded chunks.
//!
//! Records are packed smallest-first. A chunk closes when the next record
//! would push it past `max_chunk_cost` or when it already holds
//! [`MAX_RECORDS_PER_CHUNK`] records. A record that is too large on its own
//! still gets a chunk of its own; nothing is dropped or split.
use crate::records::Record;
use crate::sizing::estimate_cost;
use serde::Serialize;

/// Hard cap on records per completion call, independent of cost headroom.
pub const MAX_RECORDS_PER_CHUNK: usize = 2;

/// A non-empty group of borrowed records sent together.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk<'a> {
    pub records: Vec<&'a Record>,
    pub cost: usize,
}

impl<'a> Chunk<'a> {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn names(&self) -> Vec<&'a str> {
        self.records.iter().map(|record| record.name.as_str()).collect()
    }

    pub fn summary(&self) -> ChunkSummary {
        ChunkSummary {
            ids: self.records.iter().map(|record| record.id.clone()).collect(),
            names: self.records.iter().map(|record| record.name.clone()).collect(),
            cost: self.cost,
        }
    }
}

/// Owned view of a chunk for plan output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChunkSummary {
    pub ids: Vec<String>,
    pub names: Vec<String>,
    pub cost: usize,
}

/// Partition `records` into chunks ordered by ascending cost.
pub fn plan_chunks(records: &[Record], max_chunk_cost: usize) -> Vec<Chunk<'_>> {
    let mut costed: Vec<(usize, &Record)> = records
        .iter()
        .map(|record| (estimate_cost(record), record))
        .collect();
    // Stable: equal-cost records keep their input order.
    costed.sort_by_key(|(cost, _)| *cost);

    let mut chunks = Vec::new();
    let mut current = Chunk {
        records: Vec::with_capacity(MAX_RECORDS_PER_CHUNK),
        cost: 0,
    };
    for (cost, record) in costed {
        let fits = current.cost.saturating_add(cost) <= max_chunk_cost
            && current.len() < MAX_RECORDS_PER_CHUNK;
        if !fits && !current.is_empty() {
            chunks.push(std::mem::replace(
                &mut current,
                Chunk {
                    records: Vec::with_capacity(MAX_RECORDS_PER_CHUNK),
                    cost: 0,
                },
            ));
        }
        current.records.push(record);
        current.cost += cost;
    }
    if !current.is_empty() {
        chunks.push(current);
    }

    tracing::debug!(
        records = records.len(),
        chunks = chunks.len(),
        max_chunk_cost,
        "chunk plan built"
    );
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::BTreeSet;

    fn record(id: usize, payload_len: usize) -> Record {
        Record::new(
            id.to_string(),
            format!("Flow {id}"),
            json!({"body": "x".repeat(payload_len)}),
        )
    }

    #[test]
    fn chunks_partition_the_input_with_at_most_two_records() {
        let records: Vec<Record> = (0..9).map(|i| record(i, (i * 37) % 200)).collect();
        let chunks = plan_chunks(&records, 12_000);

        let mut seen = BTreeSet::new();
        for chunk in &chunks {
            assert!(!chunk.is_empty());
            assert!(chunk.len() <= MAX_RECORDS_PER_CHUNK);
            for record in &chunk.records {
                assert!(seen.insert(record.id.clone()), "duplicate {}", record.id);
            }
        }
        let expected: BTreeSet<String> = records.iter().map(|r| r.id.clone()).collect();
        assert_eq!(seen, expected);
        assert_eq!(chunks.len(), 5);
    }

    #[test]
    fn oversized_record_becomes_singleton_chunk() {
        let records = vec![record(1, 10), record(2, 50_000), record(3, 20)];
        let chunks = plan_chunks(&records, 12_000);

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].names(), vec!["Flow 1", "Flow 3"]);
        assert_eq!(chunks[1].names(), vec!["Flow 2"]);
        assert!(chunks[1].cost > 12_000);
    }

    #[test]
    fn cost_bound_closes_chunk_before_record_cap() {
        let records = vec![record(1, 5_000), record(2, 8_000), record(3, 100)];
        let chunks = plan_chunks(&records, 12_000);

        let names: Vec<Vec<&str>> = chunks.iter().map(Chunk::names).collect();
        assert_eq!(names, vec![vec!["Flow 3", "Flow 1"], vec!["Flow 2"]]);
        for chunk in &chunks {
            assert!(chunk.cost <= 12_000 || chunk.len() == 1);
        }
    }

    #[test]
    fn chunks_are_ordered_by_ascending_cost() {
        let records = vec![record(1, 900), record(2, 10), record(3, 500), record(4, 20)];
        let chunks = plan_chunks(&records, 12_000);
        assert_eq!(chunks[0].names(), vec!["Flow 2", "Flow 4"]);
        assert_eq!(chunks[1].names(), vec!["Flow 3", "Flow 1"]);
    }

    #[test]
    fn empty_input_yields_no_chunks() {
        assert!(plan_chunks(&[], 12_000).is_empty());
    }
}

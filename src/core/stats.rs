use std::path::PathBuf;
use chrono::{DateTime, Utc};
use serde::{Serialize, Deserialize};
use uuid::Uuid;

/// Summary of a successful run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub num_reducers: usize,

    // Map phase
    pub documents: usize,
    pub postings_emitted: u64,

    // Reduce phase
    pub partitions_reduced: usize,
    pub partitions_skipped: usize,
    pub index_entries: u64,

    pub index_path: PathBuf,
    pub index_size_bytes: u64,
    pub timings: PhaseTimings,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PhaseTimings {
    pub map_ms: u64,
    pub shuffle_ms: u64,
    pub reduce_ms: u64,
    pub aggregate_ms: u64,
}

/// Output of one map task
#[derive(Debug, Clone, Default)]
pub struct MapStats {
    pub postings: u64,
    pub partitions_touched: usize,
}

/// Output of one reduce task
#[derive(Debug, Clone, Default)]
pub struct ReduceStats {
    pub lines_read: u64,
    pub entries_written: u64,
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Checkpoint {
    pub run_id: String,
    pub kind: String,
    /// Source document the run reads from.
    pub source: String,
    /// Number of the last batch the store acknowledged.
    pub last_batch: u64,
    pub records_done: u64,
    pub updated_at: DateTime<Utc>,
}

impl Checkpoint {
    /// Batch offset to pass as `resume_from_batch` when continuing this run.
    pub fn next_batch(&self) -> u64 {
        self.last_batch + 1
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub enum WalEntry {
    RunStart {
        run_id: String,
        kind: String,
        source: String,
        resume_from_batch: u64,
        at: DateTime<Utc>,
    },
    BatchCommit {
        run_id: String,
        batch_number: u64,
        records: u64,
        at: DateTime<Utc>,
    },
    RunDone {
        run_id: String,
        total_records: u64,
        at: DateTime<Utc>,
    },
    RunAborted {
        run_id: String,
        error: String,
        at: DateTime<Utc>,
    },
}

impl WalEntry {
    pub fn run_id(&self) -> &str {
        match self {
            WalEntry::RunStart { run_id, .. } => run_id,
            WalEntry::BatchCommit { run_id, .. } => run_id,
            WalEntry::RunDone { run_id, .. } => run_id,
            WalEntry::RunAborted { run_id, .. } => run_id,
        }
    }

    pub fn at(&self) -> DateTime<Utc> {
        match self {
            WalEntry::RunStart { at, .. }
            | WalEntry::BatchCommit { at, .. }
            | WalEntry::RunDone { at, .. }
            | WalEntry::RunAborted { at, .. } => *at,
        }
    }
}

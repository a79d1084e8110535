use crate::{
    error::ProgressError,
    state::{
        StateStore,
        models::{Checkpoint, WalEntry},
    },
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::{fmt, sync::Arc};

#[derive(Clone)]
pub struct ProgressService {
    pub store: Arc<dyn StateStore>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ProgressStage {
    Idle,
    Running,
    Done,
    Failed,
}

impl ProgressStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProgressStage::Idle => "Idle",
            ProgressStage::Running => "Running",
            ProgressStage::Done => "Done",
            ProgressStage::Failed => "Failed",
        }
    }
}

impl fmt::Display for ProgressStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProgressStatus {
    pub stage: ProgressStage,
    pub kind: Option<String>,
    pub source: Option<String>,
    pub last_batch: Option<u64>,
    pub records_done: u64,
    pub last_error: Option<String>,
    pub last_update: Option<DateTime<Utc>>,
}

impl ProgressStatus {
    /// Batch offset a resumed run should start from.
    pub fn resume_from_batch(&self) -> u64 {
        self.last_batch.map(|b| b + 1).unwrap_or(0)
    }
}

impl ProgressService {
    pub fn new(store: Arc<dyn StateStore>) -> Self {
        ProgressService { store }
    }

    pub async fn run_status(&self, run_id: &str) -> Result<ProgressStatus, ProgressError> {
        let wal_entries = self
            .store
            .iter_wal(run_id)
            .await
            .map_err(|e| ProgressError::Wal(e.to_string()))?;

        let checkpoint = self
            .store
            .load_checkpoint(run_id)
            .await
            .map_err(|e| ProgressError::LoadCheckpoint(e.to_string()))?;

        Ok(status_from(&wal_entries, checkpoint.as_ref()))
    }
}

/// Replays the WAL in order; the most recent start/finish event wins, so a
/// resumed run that aborted earlier reports its latest state.
fn status_from(entries: &[WalEntry], checkpoint: Option<&Checkpoint>) -> ProgressStatus {
    let mut stage = ProgressStage::Idle;
    let mut kind = None;
    let mut source = None;
    let mut last_error = None;
    let mut last_update = None;

    for entry in entries {
        match entry {
            WalEntry::RunStart {
                kind: k, source: s, ..
            } => {
                stage = ProgressStage::Running;
                kind = Some(k.clone());
                source = Some(s.clone());
                last_error = None;
            }
            WalEntry::BatchCommit { .. } => {
                stage = ProgressStage::Running;
            }
            WalEntry::RunDone { .. } => {
                stage = ProgressStage::Done;
            }
            WalEntry::RunAborted { error, .. } => {
                stage = ProgressStage::Failed;
                last_error = Some(error.clone());
            }
        }
        last_update = Some(entry.at());
    }

    if let Some(cp) = checkpoint {
        kind = kind.or_else(|| Some(cp.kind.clone()));
        source = source.or_else(|| Some(cp.source.clone()));
        last_update = last_update.max(Some(cp.updated_at));
    }

    ProgressStatus {
        stage,
        kind,
        source,
        last_batch: checkpoint.map(|cp| cp.last_batch),
        records_done: checkpoint.map(|cp| cp.records_done).unwrap_or(0),
        last_error,
        last_update,
    }
}

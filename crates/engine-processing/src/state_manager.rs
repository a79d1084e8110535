use crate::error::StateError;
use chrono::Utc;
use engine_core::state::{
    StateStore,
    models::{Checkpoint, WalEntry},
};
use model::core::kind::RecordKind;
use std::{path::Path, sync::Arc};
use tracing::{debug, info};

/// Stable id for importing `path` as `kind`: the same file imported again
/// maps to the same run, which is what `--resume` relies on.
pub fn derive_run_id(kind: RecordKind, path: &Path) -> String {
    let canonical = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
    let hash = blake3::hash(canonical.to_string_lossy().as_bytes());
    format!("{}-{}", kind.key(), &hash.to_hex()[..12])
}

/// Manages checkpoint and WAL writes for one run.
pub struct StateManager {
    run_id: String,
    kind: RecordKind,
    source: String,
    store: Arc<dyn StateStore>,
}

impl StateManager {
    pub fn new(
        run_id: impl Into<String>,
        kind: RecordKind,
        source: &Path,
        store: Arc<dyn StateStore>,
    ) -> Self {
        Self {
            run_id: run_id.into(),
            kind,
            source: source.display().to_string(),
            store,
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub async fn run_started(&self, resume_from_batch: u64) -> Result<(), StateError> {
        info!(run_id = %self.run_id, resume_from_batch, "Run started");
        self.append(WalEntry::RunStart {
            run_id: self.run_id.clone(),
            kind: self.kind.key().to_string(),
            source: self.source.clone(),
            resume_from_batch,
            at: Utc::now(),
        })
        .await
    }

    /// Logs the commit and moves the checkpoint forward.
    pub async fn batch_committed(&self, batch_number: u64, records: u64) -> Result<(), StateError> {
        let records_done = self.records_done_before(batch_number).await? + records;

        self.append(WalEntry::BatchCommit {
            run_id: self.run_id.clone(),
            batch_number,
            records,
            at: Utc::now(),
        })
        .await?;

        self.store
            .save_checkpoint(&Checkpoint {
                run_id: self.run_id.clone(),
                kind: self.kind.key().to_string(),
                source: self.source.clone(),
                last_batch: batch_number,
                records_done,
                updated_at: Utc::now(),
            })
            .await
            .map_err(|e| StateError::Checkpoint(e.to_string()))?;

        debug!(run_id = %self.run_id, batch_number, records_done, "Checkpoint saved");
        Ok(())
    }

    pub async fn run_done(&self, total_records: u64) -> Result<(), StateError> {
        self.append(WalEntry::RunDone {
            run_id: self.run_id.clone(),
            total_records,
            at: Utc::now(),
        })
        .await
    }

    pub async fn run_aborted(&self, error: &str) -> Result<(), StateError> {
        self.append(WalEntry::RunAborted {
            run_id: self.run_id.clone(),
            error: error.to_string(),
            at: Utc::now(),
        })
        .await
    }

    /// Batch number to resume from, 0 when the run never committed a batch.
    pub async fn resume_point(&self) -> Result<u64, StateError> {
        let checkpoint = self
            .store
            .load_checkpoint(&self.run_id)
            .await
            .map_err(|e| StateError::Checkpoint(e.to_string()))?;

        Ok(checkpoint.map(|cp| cp.next_batch()).unwrap_or(0))
    }

    /// Records committed by earlier batches of this run, possibly by an
    /// earlier invocation that was resumed.
    async fn records_done_before(&self, batch_number: u64) -> Result<u64, StateError> {
        let checkpoint = self
            .store
            .load_checkpoint(&self.run_id)
            .await
            .map_err(|e| StateError::Checkpoint(e.to_string()))?;

        Ok(checkpoint
            .filter(|cp| cp.last_batch < batch_number)
            .map(|cp| cp.records_done)
            .unwrap_or(0))
    }

    async fn append(&self, entry: WalEntry) -> Result<(), StateError> {
        self.store
            .append_wal(&entry)
            .await
            .map_err(|e| StateError::WalOperation(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine_core::{
        progress::{ProgressService, ProgressStage},
        state::sled_store::SledStateStore,
    };

    #[test]
    fn run_id_is_stable_and_kind_scoped() {
        let path = Path::new("/data/default-sets.json");
        let a = derive_run_id(RecordKind::Sets, path);
        let b = derive_run_id(RecordKind::Sets, path);
        let c = derive_run_id(RecordKind::Cards, path);

        assert_eq!(a, b);
        assert!(a.starts_with("sets-"));
        assert_eq!(a.len(), "sets-".len() + 12);
        assert!(c.starts_with("cards-"));
        assert_eq!(a[5..], c[6..]);
    }

    #[tokio::test]
    async fn commits_move_resume_point() {
        let dir = tempfile::tempdir().unwrap();
        let store: Arc<dyn StateStore> = Arc::new(SledStateStore::open(dir.path()).unwrap());
        let manager = StateManager::new("sets-abc", RecordKind::Sets, Path::new("sets.json"), store.clone());

        assert_eq!(manager.resume_point().await.unwrap(), 0);

        manager.run_started(0).await.unwrap();
        manager.batch_committed(0, 10).await.unwrap();
        manager.batch_committed(1, 10).await.unwrap();
        assert_eq!(manager.resume_point().await.unwrap(), 2);

        manager.run_aborted("Batch 2 failed").await.unwrap();
        let status = ProgressService::new(store).run_status("sets-abc").await.unwrap();
        assert_eq!(status.stage, ProgressStage::Failed);
        assert_eq!(status.records_done, 20);
        assert_eq!(status.resume_from_batch(), 2);
    }
}

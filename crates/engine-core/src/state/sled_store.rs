use crate::{
    error::StateStoreError,
    state::{
        StateStore,
        models::{Checkpoint, WalEntry},
    },
};
use async_trait::async_trait;
use sled::transaction::{ConflictableTransactionError, TransactionError};
use std::path::Path;
use tracing::debug;

pub struct SledStateStore {
    db: sled::Db,
}

impl SledStateStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StateStoreError> {
        let path = path.as_ref();
        let db = sled::open(path)?;
        debug!(path = %path.display(), "Opened state store");
        Ok(Self { db })
    }

    #[inline]
    fn chk_key(run_id: &str) -> String {
        format!("chk:{}", run_id)
    }

    #[inline]
    fn wal_prefix(run_id: &str) -> String {
        format!("wal:{}:", run_id)
    }
}

#[async_trait]
impl StateStore for SledStateStore {
    async fn save_checkpoint(&self, cp: &Checkpoint) -> Result<(), StateStoreError> {
        let key = Self::chk_key(&cp.run_id);
        let new_bytes =
            bincode::serialize(cp).map_err(|e| StateStoreError::SaveCheckpoint(e.to_string()))?;

        // Check-then-set in one transaction so a stale writer can never move
        // the checkpoint backwards.
        let result = self.db.transaction::<_, _, String>(|tx_db| {
            if let Some(existing_bytes) = tx_db.get(&key)? {
                let existing: Checkpoint = bincode::deserialize(&existing_bytes)
                    .map_err(|e| ConflictableTransactionError::Abort(e.to_string()))?;

                if cp.last_batch < existing.last_batch {
                    return Ok(());
                }
            }

            tx_db.insert(key.as_bytes(), new_bytes.as_slice())?;
            Ok(())
        });

        match result {
            Ok(()) => Ok(()),
            Err(TransactionError::Abort(e)) => Err(StateStoreError::SaveCheckpoint(e)),
            Err(TransactionError::Storage(e)) => {
                Err(StateStoreError::SaveCheckpoint(e.to_string()))
            }
        }
    }

    async fn load_checkpoint(&self, run_id: &str) -> Result<Option<Checkpoint>, StateStoreError> {
        let key = Self::chk_key(run_id);
        let bytes = self
            .db
            .get(key)
            .map_err(|e| StateStoreError::LoadCheckpoint(e.to_string()))?;

        match bytes {
            Some(bytes) => bincode::deserialize(&bytes)
                .map(Some)
                .map_err(|e| StateStoreError::LoadCheckpoint(e.to_string())),
            None => Ok(None),
        }
    }

    async fn append_wal(&self, entry: &WalEntry) -> Result<(), StateStoreError> {
        let seq = self
            .db
            .generate_id()
            .map_err(|e| StateStoreError::AppendWal(e.to_string()))?;
        let key = format!("{}{:020}", Self::wal_prefix(entry.run_id()), seq);
        let value =
            bincode::serialize(entry).map_err(|e| StateStoreError::AppendWal(e.to_string()))?;

        self.db
            .insert(key, value)
            .map_err(|e| StateStoreError::AppendWal(e.to_string()))?;
        self.db
            .flush_async()
            .await
            .map_err(|e| StateStoreError::AppendWal(e.to_string()))?;
        Ok(())
    }

    async fn iter_wal(&self, run_id: &str) -> Result<Vec<WalEntry>, StateStoreError> {
        let mut entries = Vec::new();

        for item in self.db.scan_prefix(Self::wal_prefix(run_id)) {
            let (_key, value) = item.map_err(|e| StateStoreError::IterateWal(e.to_string()))?;
            let entry: WalEntry = bincode::deserialize(&value)
                .map_err(|e| StateStoreError::IterateWal(e.to_string()))?;
            entries.push(entry);
        }

        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn mk_cp(last_batch: u64, records_done: u64) -> Checkpoint {
        Checkpoint {
            run_id: "run".into(),
            kind: "sets".into(),
            source: "sets.json".into(),
            last_batch,
            records_done,
            updated_at: chrono::Utc::now(),
        }
    }

    #[tokio::test]
    async fn checkpoint_never_moves_backwards() {
        let dir = tempdir().unwrap();
        let store = SledStateStore::open(dir.path()).unwrap();

        store.save_checkpoint(&mk_cp(4, 2500)).await.unwrap();
        store.save_checkpoint(&mk_cp(2, 1500)).await.unwrap();

        let cp = store.load_checkpoint("run").await.unwrap().unwrap();
        assert_eq!(cp.last_batch, 4);
        assert_eq!(cp.records_done, 2500);
        assert_eq!(cp.next_batch(), 5);
    }

    #[tokio::test]
    async fn advances_on_later_batch() {
        let dir = tempdir().unwrap();
        let store = SledStateStore::open(dir.path()).unwrap();

        store.save_checkpoint(&mk_cp(0, 500)).await.unwrap();
        store.save_checkpoint(&mk_cp(1, 1000)).await.unwrap();

        let cp = store.load_checkpoint("run").await.unwrap().unwrap();
        assert_eq!(cp.last_batch, 1);
    }

    #[tokio::test]
    async fn missing_checkpoint_is_none() {
        let dir = tempdir().unwrap();
        let store = SledStateStore::open(dir.path()).unwrap();
        assert!(store.load_checkpoint("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn wal_entries_are_scoped_and_ordered() {
        let dir = tempdir().unwrap();
        let store = SledStateStore::open(dir.path()).unwrap();
        let now = chrono::Utc::now();

        for batch_number in 0..3 {
            store
                .append_wal(&WalEntry::BatchCommit {
                    run_id: "run".into(),
                    batch_number,
                    records: 10,
                    at: now,
                })
                .await
                .unwrap();
        }
        store
            .append_wal(&WalEntry::RunDone {
                run_id: "other".into(),
                total_records: 1,
                at: now,
            })
            .await
            .unwrap();

        let entries = store.iter_wal("run").await.unwrap();
        assert_eq!(entries.len(), 3);
        let numbers: Vec<u64> = entries
            .iter()
            .filter_map(|e| match e {
                WalEntry::BatchCommit { batch_number, .. } => Some(*batch_number),
                _ => None,
            })
            .collect();
        assert_eq!(numbers, vec![0, 1, 2]);
    }
}

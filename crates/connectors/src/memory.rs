use crate::{error::StoreError, store::CatalogStore};
use async_trait::async_trait;
use model::{
    core::kind::RecordKind,
    records::{SerializedRecord, batch::BatchResult},
};
use serde_json::Value;
use std::collections::BTreeMap;
use tokio::sync::RwLock;
use tracing::debug;

/// In-process store keyed by record id.
///
/// Used for dry runs and tests. Writes are upserts, so resubmitting a batch
/// leaves the store unchanged.
pub struct MemoryStore {
    kind: RecordKind,
    records: RwLock<BTreeMap<String, Value>>,
}

impl MemoryStore {
    pub fn new(kind: RecordKind) -> Self {
        Self {
            kind,
            records: RwLock::new(BTreeMap::new()),
        }
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    pub async fn ids(&self) -> Vec<String> {
        self.records.read().await.keys().cloned().collect()
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    fn kind(&self) -> RecordKind {
        self.kind
    }

    async fn add_many(&self, records: &[SerializedRecord]) -> Result<BatchResult, StoreError> {
        let mut guard = self.records.write().await;
        let mut result = BatchResult::default();

        for record in records {
            if record.id.is_empty() {
                result.record_failure("record without id".to_string());
                continue;
            }
            guard.insert(record.id.clone(), record.payload.clone());
            result.record_success(record.id.clone());
        }

        debug!(
            kind = %self.kind,
            inserted = result.successful_inserts,
            total = guard.len(),
            "Applied batch to memory store"
        );
        Ok(result)
    }

    async fn get(&self, id: &str) -> Result<Value, StoreError> {
        self.records
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn list(&self, limit: usize, offset: usize) -> Result<Vec<Value>, StoreError> {
        Ok(self
            .records
            .read()
            .await
            .values()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }
}

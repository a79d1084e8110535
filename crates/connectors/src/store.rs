use crate::error::StoreError;
use async_trait::async_trait;
use model::{core::kind::RecordKind, records::SerializedRecord, records::batch::BatchResult};
use serde_json::Value;

/// Storage backend for one kind of catalog record.
///
/// `add_many` is the only call the ingestion pipeline depends on. Every call
/// is an independent unit: implementations never hold a transaction open
/// across calls, and must upsert on `id` so a retried batch does not
/// duplicate rows.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    fn kind(&self) -> RecordKind;

    /// Persists a batch, reporting per-record outcomes.
    ///
    /// `Err` means the batch as a whole was not applied; individual record
    /// rejections are reported inside `BatchResult` instead.
    async fn add_many(&self, records: &[SerializedRecord]) -> Result<BatchResult, StoreError>;

    async fn get(&self, id: &str) -> Result<Value, StoreError>;

    async fn list(&self, limit: usize, offset: usize) -> Result<Vec<Value>, StoreError>;
}

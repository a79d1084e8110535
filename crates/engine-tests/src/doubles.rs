//! Storage backends with scripted behavior.

use async_trait::async_trait;
use connectors::{CatalogStore, StoreError, memory::MemoryStore};
use model::{
    core::kind::RecordKind,
    records::{SerializedRecord, batch::BatchResult},
};
use serde_json::Value;
use std::sync::{
    Mutex,
    atomic::{AtomicUsize, Ordering},
};

/// In-memory store that remembers the ids of every accepted `add_many`
/// call. Calls numbered below `fail_first` or from `fail_from` on fail with
/// a transport error.
pub struct RecordingStore {
    inner: MemoryStore,
    fail_first: usize,
    fail_from: usize,
    calls: AtomicUsize,
    accepted: Mutex<Vec<Vec<String>>>,
}

impl RecordingStore {
    pub fn new(kind: RecordKind) -> Self {
        Self::flaky(kind, 0)
    }

    pub fn flaky(kind: RecordKind, failures: usize) -> Self {
        Self {
            inner: MemoryStore::new(kind),
            fail_first: failures,
            fail_from: usize::MAX,
            calls: AtomicUsize::new(0),
            accepted: Mutex::new(Vec::new()),
        }
    }

    /// Accepts `healthy_calls` calls, then fails every later one.
    pub fn failing_from(kind: RecordKind, healthy_calls: usize) -> Self {
        Self {
            fail_from: healthy_calls,
            ..Self::new(kind)
        }
    }

    pub fn always_failing(kind: RecordKind) -> Self {
        Self::flaky(kind, usize::MAX)
    }

    /// Number of `add_many` calls, failed ones included.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Ids of each accepted call, in call order.
    pub fn accepted(&self) -> Vec<Vec<String>> {
        self.accepted.lock().expect("accepted lock").clone()
    }

    pub fn batch_sizes(&self) -> Vec<usize> {
        self.accepted().iter().map(Vec::len).collect()
    }

    pub async fn stored(&self) -> usize {
        self.inner.len().await
    }
}

#[async_trait]
impl CatalogStore for RecordingStore {
    fn kind(&self) -> RecordKind {
        self.inner.kind()
    }

    async fn add_many(&self, records: &[SerializedRecord]) -> Result<BatchResult, StoreError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.fail_first || call >= self.fail_from {
            return Err(StoreError::TransportFailed(format!(
                "connection reset on call {}",
                call + 1
            )));
        }

        let result = self.inner.add_many(records).await?;
        self.accepted
            .lock()
            .expect("accepted lock")
            .push(records.iter().map(|r| r.id.clone()).collect());
        Ok(result)
    }

    async fn get(&self, id: &str) -> Result<Value, StoreError> {
        self.inner.get(id).await
    }

    async fn list(&self, limit: usize, offset: usize) -> Result<Vec<Value>, StoreError> {
        self.inner.list(limit, offset).await
    }
}

/// Accepts every call but rejects records whose id is listed, and
/// over-reports its successes to exercise statistics clamping.
pub struct PickyStore {
    pub rejected_ids: Vec<String>,
    pub over_report: u64,
}

#[async_trait]
impl CatalogStore for PickyStore {
    fn kind(&self) -> RecordKind {
        RecordKind::Sets
    }

    async fn add_many(&self, records: &[SerializedRecord]) -> Result<BatchResult, StoreError> {
        let mut result = BatchResult::default();
        for record in records {
            if self.rejected_ids.contains(&record.id) {
                result.record_failure(format!("{}: duplicate code", record.id));
            } else {
                result.record_success(record.id.clone());
            }
        }
        result.successful_inserts += self.over_report;
        Ok(result)
    }

    async fn get(&self, id: &str) -> Result<Value, StoreError> {
        Err(StoreError::NotFound(id.to_string()))
    }

    async fn list(&self, _limit: usize, _offset: usize) -> Result<Vec<Value>, StoreError> {
        Ok(Vec::new())
    }
}

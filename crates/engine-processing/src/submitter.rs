use crate::{artifacts::ArtifactWriter, error::ImportError, retry::classify_store_error};
use connectors::{CatalogStore, StoreError};
use engine_core::retry::RetryPolicy;
use model::{
    execution::failed_batch::FailedBatchArtifact,
    records::{
        CatalogRecord, SerializedRecord,
        batch::{Batch, BatchResult},
    },
};
use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Instant,
};
use tracing::{error, info, warn};

/// A batch the store accepted, possibly after retries.
#[derive(Debug, Clone)]
pub struct Submitted {
    pub result: BatchResult,
    pub retries: usize,
}

/// A batch the store never accepted.
///
/// `records` holds the payloads that were sent, in batch order. It is empty
/// when the batch could not be serialized.
#[derive(Debug)]
pub struct SubmitFailure {
    pub retries: usize,
    pub cause: ImportError,
    pub records: Vec<SerializedRecord>,
}

/// Pushes sealed batches to a [`CatalogStore`], retrying with the
/// configured backoff and recording exhausted batches as artifacts.
pub struct BatchSubmitter {
    store: Arc<dyn CatalogStore>,
    retry: RetryPolicy,
    artifacts: Option<ArtifactWriter>,
}

impl BatchSubmitter {
    pub fn new(store: Arc<dyn CatalogStore>, retry: RetryPolicy) -> Self {
        Self {
            store,
            retry,
            artifacts: None,
        }
    }

    pub fn with_artifacts(mut self, writer: ArtifactWriter) -> Self {
        self.artifacts = Some(writer);
        self
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    pub async fn submit<T: CatalogRecord>(
        &self,
        batch: &Batch<T>,
    ) -> Result<Submitted, SubmitFailure> {
        let records = batch.serialize_records().map_err(|source| SubmitFailure {
            retries: 0,
            cause: ImportError::Serialization {
                batch_number: batch.number,
                source,
            },
            records: Vec::new(),
        })?;

        let start = Instant::now();
        let retries = AtomicUsize::new(0);

        let outcome = self
            .retry
            .run_with_notify(
                || {
                    let store = self.store.clone();
                    let records = &records;
                    async move { store.add_many(records).await }
                },
                classify_store_error,
                |attempt, err: &StoreError, delay| {
                    retries.fetch_add(1, Ordering::Relaxed);
                    warn!(
                        batch_number = batch.number,
                        attempt,
                        max_attempts = self.retry.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Batch submission failed, retrying"
                    );
                },
            )
            .await;

        let retries = retries.into_inner();

        match outcome {
            Ok(result) => {
                info!(
                    batch_number = batch.number,
                    records = batch.len(),
                    successful = result.successful_inserts,
                    failed = result.failed_inserts,
                    retries,
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Batch submitted"
                );
                Ok(Submitted { result, retries })
            }
            Err(err) => {
                let attempts = retries + 1;
                let source = err.into_inner();

                error!(
                    batch_number = batch.number,
                    attempts,
                    error = %source,
                    "Batch submission exhausted its retries"
                );

                self.persist_failed_batch(batch.number, attempts, &source, &records)
                    .await;

                Err(SubmitFailure {
                    retries,
                    cause: ImportError::BatchSubmission {
                        batch_number: batch.number,
                        attempts,
                        source,
                    },
                    records,
                })
            }
        }
    }

    async fn persist_failed_batch(
        &self,
        batch_number: u64,
        attempts: usize,
        err: &StoreError,
        records: &[SerializedRecord],
    ) {
        let Some(writer) = &self.artifacts else {
            return;
        };

        let artifact = FailedBatchArtifact::new(
            batch_number,
            err.to_string(),
            attempts as u32,
            records.iter().map(|r| r.payload.clone()).collect(),
        );

        if let Err(e) = writer.write_failed_batch(&artifact).await {
            warn!(batch_number, error = %e, "Failed to write failed batch artifact");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use model::{core::kind::RecordKind, records::batch::BatchEntry};
    use serde::Serialize;
    use serde_json::Value;
    use std::time::Duration;

    #[derive(Debug, Clone, Serialize)]
    struct Rec {
        id: String,
    }

    impl CatalogRecord for Rec {
        const KIND: RecordKind = RecordKind::Sets;

        fn id(&self) -> &str {
            &self.id
        }
    }

    /// Fails the first `failures` calls, then accepts everything.
    struct Flaky {
        failures: usize,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl CatalogStore for Flaky {
        fn kind(&self) -> RecordKind {
            RecordKind::Sets
        }

        async fn add_many(&self, records: &[SerializedRecord]) -> Result<BatchResult, StoreError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                return Err(StoreError::TransportFailed(format!("reset #{call}")));
            }
            let mut result = BatchResult::default();
            for r in records {
                result.record_success(r.id.clone());
            }
            Ok(result)
        }

        async fn get(&self, id: &str) -> Result<Value, StoreError> {
            Err(StoreError::NotFound(id.to_string()))
        }

        async fn list(&self, _limit: usize, _offset: usize) -> Result<Vec<Value>, StoreError> {
            Ok(Vec::new())
        }
    }

    fn batch(number: u64, n: u64) -> Batch<Rec> {
        Batch::new(
            number,
            (0..n)
                .map(|i| BatchEntry {
                    position: i,
                    record: Rec { id: format!("s{i}") },
                })
                .collect(),
        )
    }

    fn flaky(failures: usize) -> Arc<Flaky> {
        Arc::new(Flaky {
            failures,
            calls: AtomicUsize::new(0),
        })
    }

    #[tokio::test(start_paused = true)]
    async fn succeeds_after_transient_failures() {
        let store = flaky(2);
        let submitter = BatchSubmitter::new(
            store.clone(),
            RetryPolicy::linear(3, Duration::from_secs(1)),
        );

        let submitted = submitter.submit(&batch(0, 3)).await.unwrap();
        assert_eq!(submitted.retries, 2);
        assert_eq!(submitted.result.successful_inserts, 3);
        assert_eq!(store.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn exhaustion_reports_attempts_and_writes_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let store = flaky(usize::MAX);
        let submitter = BatchSubmitter::new(
            store.clone(),
            RetryPolicy::linear(2, Duration::from_secs(1)),
        )
        .with_artifacts(ArtifactWriter::new(dir.path(), RecordKind::Sets));

        let failure = submitter.submit(&batch(4, 2)).await.unwrap_err();

        assert_eq!(failure.retries, 2);
        assert_eq!(store.calls.load(Ordering::SeqCst), 3);
        match &failure.cause {
            ImportError::BatchSubmission {
                batch_number,
                attempts,
                ..
            } => {
                assert_eq!(*batch_number, 4);
                assert_eq!(*attempts, 3);
            }
            other => panic!("unexpected cause: {other:?}"),
        }
        assert!(failure.cause.to_string().contains("Batch 4"));
        let sent: Vec<&str> = failure.records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(sent, vec!["s0", "s1"]);
        assert_eq!(failure.records[0].payload["id"], "s0");

        let written: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(written.len(), 1);
        assert!(written[0].starts_with("failed_batch_4_"));
    }

    #[tokio::test(start_paused = true)]
    async fn backoff_is_linear_in_attempt_number() {
        let store = flaky(3);
        let submitter = BatchSubmitter::new(
            store,
            RetryPolicy::linear(3, Duration::from_secs(2)),
        );

        let start = tokio::time::Instant::now();
        submitter.submit(&batch(0, 1)).await.unwrap();

        // 2s + 4s + 6s
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(12), "{elapsed:?}");
        assert!(elapsed < Duration::from_secs(13), "{elapsed:?}");
    }
}

use crate::{
    artifacts::ArtifactWriter,
    batcher::Batcher,
    config::ProcessingConfig,
    error::{ImportError, RunAborted},
    source::JsonArraySource,
    state_manager::StateManager,
    submitter::{BatchSubmitter, SubmitFailure, Submitted},
    validation::Validate,
};
use connectors::CatalogStore;
use engine_core::stats::RunStatistics;
use model::{
    execution::failed_record::FailedRecordEntry,
    records::{CatalogRecord, batch::Batch},
};
use serde_json::json;
use std::{marker::PhantomData, path::Path, sync::Arc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

/// Top-level field of the source document holding the records.
pub const DATA_FIELD: &str = "data";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    NotStarted,
    Validating,
    Batching,
    Submitting,
    Flushing,
    Finalizing,
    Done,
    Aborted,
}

/// Mutable state of one run, dropped when the run returns.
struct RunState<T> {
    stats: RunStatistics,
    batcher: Batcher<T>,
    failed: Vec<FailedRecordEntry>,
}

/// Drives one import run: stream, validate, batch, submit, report.
pub struct StreamController<T> {
    config: ProcessingConfig,
    submitter: BatchSubmitter,
    artifacts: Option<ArtifactWriter>,
    state: Option<StateManager>,
    cancel: CancellationToken,
    phase: RunPhase,
    _record: PhantomData<fn() -> T>,
}

impl<T: CatalogRecord + Validate> StreamController<T> {
    pub fn new(store: Arc<dyn CatalogStore>, config: ProcessingConfig) -> Self {
        if store.kind() != T::KIND {
            warn!(
                store_kind = %store.kind(),
                record_kind = %T::KIND,
                "Store kind does not match the records being imported"
            );
        }

        let artifacts = config
            .persist_failures
            .then(|| ArtifactWriter::new(config.artifact_dir.clone(), T::KIND));

        let mut submitter = BatchSubmitter::new(store, config.retry_policy());
        if let Some(writer) = &artifacts {
            submitter = submitter.with_artifacts(writer.clone());
        }

        Self {
            config,
            submitter,
            artifacts,
            state: None,
            cancel: CancellationToken::new(),
            phase: RunPhase::NotStarted,
            _record: PhantomData,
        }
    }

    /// Records checkpoints and run events for this controller's runs.
    pub fn with_state(mut self, state: StateManager) -> Self {
        self.state = Some(state);
        self
    }

    /// Stops the run at the next record or pending submission once `cancel`
    /// fires. The run then aborts like any other fatal error.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    pub fn config(&self) -> &ProcessingConfig {
        &self.config
    }

    /// Imports the `data` array of the document at `path`.
    ///
    /// Batches numbered below `resume_from_batch` are skipped without
    /// validation. Fatal errors come back as [`RunAborted`] carrying the
    /// statistics gathered up to that point.
    pub async fn process_large_json(
        &mut self,
        path: &Path,
        resume_from_batch: u64,
    ) -> Result<RunStatistics, RunAborted> {
        let batch_size = self.config.batch_size.max(1);
        let mut run = RunState {
            stats: RunStatistics::start(),
            batcher: Batcher::starting_at(batch_size, resume_from_batch),
            failed: Vec::new(),
        };
        self.set_phase(RunPhase::NotStarted);

        info!(
            path = %path.display(),
            kind = %T::KIND,
            batch_size,
            resume_from_batch,
            "Starting import"
        );

        if let Some(state) = &self.state {
            if let Err(e) = state.run_started(resume_from_batch).await {
                warn!(error = %e, "Failed to record run start");
            }
        }

        let mut source = match JsonArraySource::open(path, DATA_FIELD, batch_size).await {
            Ok(source) => source,
            Err(cause) => return Err(self.abort(run, cause).await),
        };

        let skip_items = resume_from_batch.saturating_mul(batch_size as u64);

        let cancel = self.cancel.clone();
        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                item = source.next() => Some(item),
            };
            let Some(next) = next else {
                stop_reader(source).await;
                return Err(self.abort(run, ImportError::Cancelled).await);
            };
            let Some(item) = next else {
                break;
            };

            if item.position < skip_items {
                continue;
            }

            self.set_phase(RunPhase::Validating);
            match T::validate(&item.value) {
                Ok(record) => {
                    run.stats.record_valid();
                    self.set_phase(RunPhase::Batching);

                    if let Some(batch) = run.batcher.push(item.position, record) {
                        if let Err(cause) = self.submit_batch(&mut run, batch).await {
                            stop_reader(source).await;
                            return Err(self.abort(run, cause).await);
                        }
                    }
                }
                Err(err) => {
                    run.stats.record_validation_error();
                    warn!(position = item.position, error = %err, "Record failed validation");
                    run.failed.push(FailedRecordEntry::from_validation_error(
                        item.position,
                        item.value,
                        err.to_string(),
                    ));

                    if !self.config.skip_validation_errors {
                        stop_reader(source).await;
                        let cause = ImportError::RecordValidation {
                            position: item.position,
                            source: err,
                        };
                        return Err(self.abort(run, cause).await);
                    }
                }
            }
        }

        match source.finish().await {
            Ok(summary) => {
                debug!(items = summary.items, skipped = skip_items.min(summary.items), "Source exhausted");
            }
            Err(e) => return Err(self.abort(run, e.into()).await),
        }

        self.set_phase(RunPhase::Flushing);
        if let Some(batch) = run.batcher.finish() {
            if let Err(cause) = self.submit_batch(&mut run, batch).await {
                return Err(self.abort(run, cause).await);
            }
        }

        Ok(self.finalize(run).await)
    }

    async fn submit_batch(
        &mut self,
        run: &mut RunState<T>,
        batch: Batch<T>,
    ) -> Result<(), ImportError> {
        self.set_phase(RunPhase::Submitting);
        let batch_len = batch.len() as u64;

        let cancel = self.cancel.clone();
        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!(batch_number = batch.number, "Batch left uncommitted by cancellation");
                return Err(ImportError::Cancelled);
            }
            outcome = self.submitter.submit(&batch) => outcome,
        };

        match outcome {
            Ok(Submitted { result, retries }) => {
                run.stats.record_retries(retries as u64);

                if !result.is_consistent() {
                    warn!(
                        batch_number = batch.number,
                        total = result.total_processed,
                        successful = result.successful_inserts,
                        failed = result.failed_inserts,
                        "Store reported inconsistent counts, clamping to batch size"
                    );
                }
                for detail in &result.error_details {
                    warn!(batch_number = batch.number, detail = %detail, "Store rejected record");
                }
                debug!(
                    batch_number = batch.number,
                    inserted_ids = result.inserted_ids.len(),
                    "Folding batch result"
                );

                run.stats.record_batch(batch_len, &result);

                info!(
                    batch_number = batch.number,
                    records = batch_len,
                    total_records = run.stats.total_records,
                    successful = run.stats.successful_inserts,
                    failed = run.stats.failed_inserts,
                    "Processed batch"
                );

                if let Some(progress) = &self.config.progress {
                    progress(&run.stats);
                }

                if let Some(state) = &self.state {
                    if let Err(e) = state.batch_committed(batch.number, batch_len).await {
                        warn!(batch_number = batch.number, error = %e, "Failed to save checkpoint");
                    }
                }

                tokio::task::yield_now().await;
                Ok(())
            }
            Err(SubmitFailure {
                retries,
                cause,
                records,
            }) => {
                run.stats.record_retries(retries as u64);
                run.stats.record_failed_batch(batch_len);

                // An unserializable batch has no payloads, only ids.
                let mut payloads = records.into_iter().map(|r| r.payload);
                let message = cause.to_string();
                for entry in &batch.entries {
                    let raw = payloads
                        .next()
                        .unwrap_or_else(|| json!({ "id": entry.record.id() }));
                    run.failed.push(FailedRecordEntry::from_failed_batch(
                        entry.position,
                        raw,
                        batch.number,
                        message.clone(),
                    ));
                }

                Err(cause)
            }
        }
    }

    async fn finalize(&mut self, mut run: RunState<T>) -> RunStatistics {
        self.set_phase(RunPhase::Finalizing);

        self.write_failed_records(&run.failed).await;
        run.stats.finish();

        let summary = run.stats.to_summary();
        info!(
            total_sets = summary.total_sets,
            successful_inserts = summary.successful_inserts,
            failed_inserts = summary.failed_inserts,
            batches_processed = summary.batches_processed,
            processing_errors = summary.processing_errors,
            success_rate = summary.success_rate,
            duration_seconds = summary.duration_seconds,
            sets_per_second = summary.sets_per_second,
            retries = run.stats.retry_count,
            "Import completed"
        );

        if let Some(state) = &self.state {
            if let Err(e) = state.run_done(run.stats.total_records).await {
                warn!(error = %e, "Failed to record run completion");
            }
        }

        self.set_phase(RunPhase::Done);
        run.stats
    }

    /// Fatal path: artifacts and the summary still go out before the error.
    async fn abort(&mut self, mut run: RunState<T>, cause: ImportError) -> RunAborted {
        self.set_phase(RunPhase::Aborted);

        self.write_failed_records(&run.failed).await;
        run.stats.finish();

        let summary = run.stats.to_summary();
        error!(
            error = %cause,
            batch_number = ?cause.batch_number(),
            total_sets = summary.total_sets,
            successful_inserts = summary.successful_inserts,
            failed_inserts = summary.failed_inserts,
            batches_processed = summary.batches_processed,
            processing_errors = summary.processing_errors,
            duration_seconds = summary.duration_seconds,
            "Import aborted"
        );

        if let Some(state) = &self.state {
            if let Err(e) = state.run_aborted(&cause.to_string()).await {
                warn!(error = %e, "Failed to record run abort");
            }
        }

        RunAborted {
            cause,
            stats: run.stats,
        }
    }

    async fn write_failed_records(&self, failed: &[FailedRecordEntry]) {
        if failed.is_empty() {
            return;
        }
        let Some(writer) = &self.artifacts else {
            return;
        };

        if let Err(e) = writer.write_failed_records(failed).await {
            warn!(count = failed.len(), error = %e, "Failed to write failed records artifact");
        }
    }

    fn set_phase(&mut self, phase: RunPhase) {
        if self.phase != phase {
            trace!(from = ?self.phase, to = ?phase, "Run phase");
            self.phase = phase;
        }
    }
}

async fn stop_reader(source: JsonArraySource) {
    if let Err(e) = source.cancel().await {
        debug!(error = %e, "Reader stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use connectors::memory::MemoryStore;
    use engine_core::state::{StateStore, models::WalEntry, sled_store::SledStateStore};
    use model::{core::kind::RecordKind, records::card_set::CardSet};
    use serde_json::{Value, json};
    use std::{io::Write, time::Duration};
    use tracing_test::traced_test;

    fn set(i: usize) -> Value {
        json!({
            "id": format!("set-{i:05}"),
            "name": format!("Set {i}"),
            "code": format!("s{i}"),
            "set_type": "expansion",
            "released_at": "2020-01-01"
        })
    }

    fn document(records: Vec<Value>) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let body = json!({ "object": "list", "data": records });
        file.write_all(body.to_string().as_bytes()).unwrap();
        file
    }

    fn config(dir: &Path, batch_size: usize) -> ProcessingConfig {
        ProcessingConfig::default()
            .with_batch_size(batch_size)
            .with_retry_delay(Duration::ZERO)
            .with_artifact_dir(dir)
    }

    #[tokio::test]
    async fn phases_end_in_done() {
        let dir = tempfile::tempdir().unwrap();
        let file = document((0..5).map(set).collect());
        let store = Arc::new(MemoryStore::new(RecordKind::Sets));

        let mut controller = StreamController::<CardSet>::new(store.clone(), config(dir.path(), 2));
        assert_eq!(controller.phase(), RunPhase::NotStarted);

        let stats = controller.process_large_json(file.path(), 0).await.unwrap();

        assert_eq!(controller.phase(), RunPhase::Done);
        assert_eq!(stats.batches_processed, 3);
        assert_eq!(stats.successful_inserts, 5);
        assert!(stats.is_finished());
        assert_eq!(store.len().await, 5);
    }

    #[tokio::test]
    async fn missing_file_aborts_before_streaming() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryStore::new(RecordKind::Sets));
        let mut controller = StreamController::<CardSet>::new(store, config(dir.path(), 10));

        let aborted = controller
            .process_large_json(&dir.path().join("absent.json"), 0)
            .await
            .unwrap_err();

        assert!(matches!(aborted.cause, ImportError::FileValidation { .. }));
        assert_eq!(controller.phase(), RunPhase::Aborted);
        assert_eq!(aborted.stats.total_records, 0);
        assert!(aborted.stats.is_finished());
    }

    #[tokio::test]
    async fn malformed_document_aborts_with_source_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(br#"{"data": [{"id": "a", "name": "A", "code": "a", "set_type": "core"}, "#)
            .unwrap();

        let store = Arc::new(MemoryStore::new(RecordKind::Sets));
        let mut controller = StreamController::<CardSet>::new(store.clone(), config(dir.path(), 10));

        let aborted = controller.process_large_json(file.path(), 0).await.unwrap_err();
        assert!(matches!(aborted.cause, ImportError::Source(_)));
        assert_eq!(aborted.stats.total_records, 1);
        assert!(store.is_empty().await);
    }

    #[traced_test]
    #[tokio::test]
    async fn invalid_record_is_logged_and_written_to_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let mut records: Vec<Value> = (0..3).map(set).collect();
        records[1] = json!({ "id": "broken", "code": "x", "set_type": "core" });
        let file = document(records);

        let store = Arc::new(MemoryStore::new(RecordKind::Sets));
        let mut controller = StreamController::<CardSet>::new(store, config(dir.path(), 10));
        let stats = controller.process_large_json(file.path(), 0).await.unwrap();

        assert_eq!(stats.processing_errors, 1);
        assert_eq!(stats.total_records, 2);
        assert!(logs_contain("Record failed validation"));
        assert!(logs_contain("missing required field 'name'"));

        let artifacts: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect();
        assert_eq!(artifacts.len(), 1);

        let body: Value = serde_json::from_slice(&std::fs::read(&artifacts[0]).unwrap()).unwrap();
        assert_eq!(body[0]["position"], 1);
        assert_eq!(body[0]["raw_data"]["id"], "broken");
    }

    #[tokio::test]
    async fn no_artifacts_when_persistence_disabled() {
        let dir = tempfile::tempdir().unwrap();
        let file = document(vec![json!({ "id": "only-id" })]);

        let store = Arc::new(MemoryStore::new(RecordKind::Sets));
        let cfg = config(dir.path(), 10).with_persist_failures(false);
        let mut controller = StreamController::<CardSet>::new(store, cfg);

        let stats = controller.process_large_json(file.path(), 0).await.unwrap();
        assert_eq!(stats.processing_errors, 1);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn resumed_run_commits_original_batch_numbers() {
        let dir = tempfile::tempdir().unwrap();
        let state_dir = tempfile::tempdir().unwrap();
        let file = document((0..23).map(set).collect());
        let state: Arc<dyn StateStore> = Arc::new(SledStateStore::open(state_dir.path()).unwrap());

        let store = Arc::new(MemoryStore::new(RecordKind::Sets));
        let manager = StateManager::new("sets-resume", RecordKind::Sets, file.path(), state.clone());
        let stats = StreamController::<CardSet>::new(store.clone(), config(dir.path(), 5))
            .with_state(manager)
            .process_large_json(file.path(), 2)
            .await
            .unwrap();

        assert_eq!(stats.batches_processed, 3);
        assert_eq!(stats.total_records, 13);
        assert!(store.get("set-00009").await.is_err());
        assert!(store.get("set-00010").await.is_ok());

        let committed: Vec<u64> = state
            .iter_wal("sets-resume")
            .await
            .unwrap()
            .into_iter()
            .filter_map(|entry| match entry {
                WalEntry::BatchCommit { batch_number, .. } => Some(batch_number),
                _ => None,
            })
            .collect();
        assert_eq!(committed, vec![2, 3, 4]);

        let checkpoint = state.load_checkpoint("sets-resume").await.unwrap().unwrap();
        assert_eq!(checkpoint.last_batch, 4);
        assert_eq!(checkpoint.records_done, 13);
        assert_eq!(checkpoint.next_batch(), 5);
    }

    #[tokio::test]
    async fn cancelled_run_aborts_before_reading() {
        let dir = tempfile::tempdir().unwrap();
        let file = document((0..3).map(set).collect());

        let cancel = CancellationToken::new();
        cancel.cancel();

        let store = Arc::new(MemoryStore::new(RecordKind::Sets));
        let mut controller = StreamController::<CardSet>::new(store.clone(), config(dir.path(), 10))
            .with_cancellation(cancel);
        let aborted = controller.process_large_json(file.path(), 0).await.unwrap_err();

        assert!(matches!(aborted.cause, ImportError::Cancelled));
        assert_eq!(controller.phase(), RunPhase::Aborted);
        assert!(aborted.stats.is_finished());
        assert_eq!(aborted.stats.total_records, 0);
        assert!(store.is_empty().await);
    }
}

use crate::error::RuntimeError;
use connectors::CatalogStore;
use engine_core::stats::RunStatistics;
use engine_processing::{
    ProcessingConfig, RunAborted, StreamController, state_manager::StateManager,
    validation::Validate,
};
use futures::future::BoxFuture;
use model::{
    core::kind::RecordKind,
    records::{CatalogRecord, card::Card, card_set::CardSet},
};
use std::{collections::HashMap, path::PathBuf, sync::Arc};
use tokio_util::sync::CancellationToken;
use tracing::debug;

pub type ImportOutcome = Result<RunStatistics, RunAborted>;

/// Runs one import job to completion.
pub type ImportFn = fn(ImportJob) -> BoxFuture<'static, ImportOutcome>;

/// Everything one import run needs, moved into the task that runs it.
pub struct ImportJob {
    pub kind: RecordKind,
    pub path: PathBuf,
    pub store: Arc<dyn CatalogStore>,
    pub config: ProcessingConfig,
    pub resume_from_batch: u64,
    pub state: Option<StateManager>,
    pub cancel: CancellationToken,
}

impl ImportJob {
    pub fn new(
        kind: RecordKind,
        path: impl Into<PathBuf>,
        store: Arc<dyn CatalogStore>,
        config: ProcessingConfig,
    ) -> Self {
        Self {
            kind,
            path: path.into(),
            store,
            config,
            resume_from_batch: 0,
            state: None,
            cancel: CancellationToken::new(),
        }
    }

    pub fn resume_from(mut self, batch: u64) -> Self {
        self.resume_from_batch = batch;
        self
    }

    pub fn with_state(mut self, state: StateManager) -> Self {
        self.state = Some(state);
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }
}

/// Maps record-kind keys to the function that imports that kind.
///
/// Built once at startup and passed by reference to whoever runs imports.
#[derive(Clone, Default)]
pub struct ImportRegistry {
    imports: HashMap<&'static str, ImportFn>,
}

impl ImportRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with an import for every [`RecordKind`].
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.register(RecordKind::Sets.key(), import::<CardSet>);
        registry.register(RecordKind::Cards.key(), import::<Card>);
        registry
    }

    pub fn register(&mut self, key: &'static str, import: ImportFn) {
        self.imports.insert(key, import);
    }

    pub fn get(&self, key: &str) -> Result<ImportFn, RuntimeError> {
        self.imports
            .get(key)
            .copied()
            .ok_or_else(|| RuntimeError::UnknownKind(key.to_string()))
    }

    pub fn contains(&self, key: &str) -> bool {
        self.imports.contains_key(key)
    }

    pub fn keys(&self) -> Vec<&'static str> {
        let mut keys: Vec<_> = self.imports.keys().copied().collect();
        keys.sort_unstable();
        keys
    }

    /// Resolves the import for the job's kind and returns its future.
    pub fn run(&self, job: ImportJob) -> Result<BoxFuture<'static, ImportOutcome>, RuntimeError> {
        let import = self.get(job.kind.key())?;
        debug!(kind = %job.kind, path = %job.path.display(), "Dispatching import");
        Ok(import(job))
    }
}

fn import<T: CatalogRecord + Validate>(job: ImportJob) -> BoxFuture<'static, ImportOutcome> {
    Box::pin(async move {
        let ImportJob {
            path,
            store,
            config,
            resume_from_batch,
            state,
            cancel,
            ..
        } = job;

        let mut controller = StreamController::<T>::new(store, config).with_cancellation(cancel);
        if let Some(state) = state {
            controller = controller.with_state(state);
        }
        controller.process_large_json(&path, resume_from_batch).await
    })
}

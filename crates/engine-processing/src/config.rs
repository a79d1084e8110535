use engine_core::{retry::RetryPolicy, stats::RunStatistics};
use std::{fmt, path::PathBuf, sync::Arc, time::Duration};

/// Invoked with the running statistics after every submitted batch.
pub type ProgressCallback = Arc<dyn Fn(&RunStatistics) + Send + Sync>;

/// Configuration for one ingestion run.
#[derive(Clone)]
pub struct ProcessingConfig {
    /// Maximum number of records per submitted batch
    pub batch_size: usize,

    /// Retries after the first failed submission of a batch
    pub max_retries: u32,

    /// Linear backoff unit: the n-th retry waits `retry_delay × n`
    pub retry_delay: Duration,

    /// Keep going after a record fails validation
    pub skip_validation_errors: bool,

    /// Write failed records and failed batches to `artifact_dir`
    pub persist_failures: bool,

    pub artifact_dir: PathBuf,

    pub progress: Option<ProgressCallback>,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            batch_size: 500,
            max_retries: 3,
            retry_delay: Duration::from_secs(1),
            skip_validation_errors: true,
            persist_failures: true,
            artifact_dir: PathBuf::from("."),
            progress: None,
        }
    }
}

impl ProcessingConfig {
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    pub fn with_skip_validation_errors(mut self, skip: bool) -> Self {
        self.skip_validation_errors = skip;
        self
    }

    pub fn with_persist_failures(mut self, persist: bool) -> Self {
        self.persist_failures = persist;
        self
    }

    pub fn with_artifact_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.artifact_dir = dir.into();
        self
    }

    pub fn with_progress_callback<F>(mut self, callback: F) -> Self
    where
        F: Fn(&RunStatistics) + Send + Sync + 'static,
    {
        self.progress = Some(Arc::new(callback));
        self
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::linear(self.max_retries, self.retry_delay)
    }
}

impl fmt::Debug for ProcessingConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessingConfig")
            .field("batch_size", &self.batch_size)
            .field("max_retries", &self.max_retries)
            .field("retry_delay", &self.retry_delay)
            .field("skip_validation_errors", &self.skip_validation_errors)
            .field("persist_failures", &self.persist_failures)
            .field("artifact_dir", &self.artifact_dir)
            .field("progress", &self.progress.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_catalog_import() {
        let config = ProcessingConfig::default();
        assert_eq!(config.batch_size, 500);
        assert_eq!(config.max_retries, 3);
        assert!(config.skip_validation_errors);
        assert_eq!(config.retry_policy().max_attempts, 4);
    }

    #[test]
    fn zero_batch_size_is_clamped() {
        let config = ProcessingConfig::default().with_batch_size(0);
        assert_eq!(config.batch_size, 1);
    }

    #[test]
    fn debug_hides_callback_body() {
        let config = ProcessingConfig::default().with_progress_callback(|_| {});
        let rendered = format!("{config:?}");
        assert!(rendered.contains("progress: true"));
    }
}

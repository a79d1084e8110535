use chrono::{DateTime, Utc};
use model::records::batch::BatchResult;
use serde::{Deserialize, Serialize};

/// Counters for one ingestion run.
///
/// Rates and durations are computed on demand from the counters and
/// timestamps, so they cannot drift from the underlying numbers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunStatistics {
    /// Records that passed validation and entered a batch.
    pub total_records: u64,
    pub successful_inserts: u64,
    pub failed_inserts: u64,
    pub batches_processed: u64,
    /// Records rejected by validation.
    pub processing_errors: u64,
    pub retry_count: u64,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

/// Flat summary handed back to the caller of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub total_sets: u64,
    pub successful_inserts: u64,
    pub failed_inserts: u64,
    pub batches_processed: u64,
    pub processing_errors: u64,
    pub success_rate: f64,
    pub duration_seconds: f64,
    pub sets_per_second: f64,
}

impl RunStatistics {
    pub fn start() -> Self {
        Self::started_at(Utc::now())
    }

    pub fn started_at(started_at: DateTime<Utc>) -> Self {
        Self {
            total_records: 0,
            successful_inserts: 0,
            failed_inserts: 0,
            batches_processed: 0,
            processing_errors: 0,
            retry_count: 0,
            started_at,
            finished_at: None,
        }
    }

    pub fn record_valid(&mut self) {
        self.total_records += 1;
    }

    pub fn record_validation_error(&mut self) {
        self.processing_errors += 1;
    }

    pub fn record_retries(&mut self, retries: u64) {
        self.retry_count += retries;
    }

    /// Folds a store-reported result for a batch of `batch_len` records.
    ///
    /// Counts are clamped to the batch length so a misreporting backend
    /// cannot push `successful + failed` past the records submitted.
    pub fn record_batch(&mut self, batch_len: u64, result: &BatchResult) {
        let successful = result.successful_inserts.min(batch_len);
        let failed = result.failed_inserts.min(batch_len - successful);

        self.successful_inserts += successful;
        self.failed_inserts += failed;
        self.batches_processed += 1;
    }

    /// Accounts for a batch that was never applied.
    pub fn record_failed_batch(&mut self, batch_len: u64) {
        self.failed_inserts += batch_len;
    }

    /// Freezes the end timestamp. Later calls keep the first value.
    pub fn finish(&mut self) {
        if self.finished_at.is_none() {
            self.finished_at = Some(Utc::now());
        }
    }

    pub fn is_finished(&self) -> bool {
        self.finished_at.is_some()
    }

    /// Percentage of validated records that were inserted, 0 for an empty run.
    pub fn success_rate(&self) -> f64 {
        if self.total_records == 0 {
            return 0.0;
        }
        self.successful_inserts as f64 / self.total_records as f64 * 100.0
    }

    /// Seconds between start and finish, or until now while running.
    pub fn duration_seconds(&self) -> f64 {
        let end = self.finished_at.unwrap_or_else(Utc::now);
        let micros = (end - self.started_at).num_microseconds().unwrap_or(i64::MAX);
        micros.max(0) as f64 / 1_000_000.0
    }

    /// Records per second, treating runs shorter than a second as one second.
    pub fn throughput(&self) -> f64 {
        self.total_records as f64 / self.duration_seconds().max(1.0)
    }

    pub fn to_summary(&self) -> RunSummary {
        RunSummary {
            total_sets: self.total_records,
            successful_inserts: self.successful_inserts,
            failed_inserts: self.failed_inserts,
            batches_processed: self.batches_processed,
            processing_errors: self.processing_errors,
            success_rate: round2(self.success_rate()),
            duration_seconds: round2(self.duration_seconds()),
            sets_per_second: self.throughput(),
        }
    }
}

impl Default for RunStatistics {
    fn default() -> Self {
        Self::start()
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A record that did not make it into the store, kept for manual replay.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailedRecordEntry {
    pub id: String,
    /// Index of the element in the source `data` array.
    pub position: u64,
    pub raw_data: Value,
    pub error_message: String,
    pub stage: ProcessingStage,
    pub batch_number: Option<u64>,
    pub failed_at: DateTime<Utc>,
}

/// The stage of the run where the record was rejected
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ProcessingStage {
    /// Rejected by record validation
    Validation,

    /// Its containing batch exhausted its submission retries
    Load,
}

impl FailedRecordEntry {
    pub fn new(
        position: u64,
        raw_data: Value,
        stage: ProcessingStage,
        error_message: impl Into<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            position,
            raw_data,
            error_message: error_message.into(),
            stage,
            batch_number: None,
            failed_at: Utc::now(),
        }
    }

    pub fn from_validation_error(position: u64, raw_data: Value, message: impl Into<String>) -> Self {
        Self::new(position, raw_data, ProcessingStage::Validation, message)
    }

    pub fn from_failed_batch(
        position: u64,
        record: Value,
        batch_number: u64,
        message: impl Into<String>,
    ) -> Self {
        Self::new(position, record, ProcessingStage::Load, message).with_batch(batch_number)
    }

    pub fn with_batch(mut self, batch_number: u64) -> Self {
        self.batch_number = Some(batch_number);
        self
    }
}

impl std::fmt::Display for ProcessingStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProcessingStage::Validation => write!(f, "Validation"),
            ProcessingStage::Load => write!(f, "Load"),
        }
    }
}

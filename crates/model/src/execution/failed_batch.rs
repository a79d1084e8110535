use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Contents of a `failed_batch_<n>_<label>_<timestamp>.json` artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailedBatchArtifact {
    pub batch_number: u64,
    pub error: String,
    pub attempts: u32,
    pub records: Vec<Value>,
    pub failed_at: DateTime<Utc>,
}

impl FailedBatchArtifact {
    pub fn new(batch_number: u64, error: impl Into<String>, attempts: u32, records: Vec<Value>) -> Self {
        Self {
            batch_number,
            error: error.into(),
            attempts,
            records,
            failed_at: Utc::now(),
        }
    }
}

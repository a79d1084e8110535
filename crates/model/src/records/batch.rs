use crate::records::{CatalogRecord, SerializedRecord};
use serde::{Deserialize, Serialize};

/// A validated record together with its position in the source array.
#[derive(Debug, Clone)]
pub struct BatchEntry<T> {
    pub position: u64,
    pub record: T,
}

/// A sealed group of validated records submitted to the store as one unit.
#[derive(Debug, Clone)]
pub struct Batch<T> {
    /// Monotonic batch number within the run (resume offsets count these).
    pub number: u64,
    pub entries: Vec<BatchEntry<T>>,
    pub sealed_at: chrono::DateTime<chrono::Utc>,
}

impl<T: CatalogRecord> Batch<T> {
    pub fn new(number: u64, entries: Vec<BatchEntry<T>>) -> Self {
        Self {
            number,
            entries,
            sealed_at: chrono::Utc::now(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn first_position(&self) -> Option<u64> {
        self.entries.first().map(|e| e.position)
    }

    pub fn serialize_records(&self) -> Result<Vec<SerializedRecord>, serde_json::Error> {
        self.entries
            .iter()
            .map(|entry| entry.record.to_serialized())
            .collect()
    }
}

/// Outcome of one `add_many` call as reported by the storage backend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchResult {
    pub total_processed: u64,
    pub successful_inserts: u64,
    pub failed_inserts: u64,
    pub inserted_ids: Vec<String>,
    pub error_details: Vec<String>,
}

impl BatchResult {
    pub fn is_consistent(&self) -> bool {
        self.successful_inserts + self.failed_inserts <= self.total_processed
    }

    pub fn record_success(&mut self, id: impl Into<String>) {
        self.total_processed += 1;
        self.successful_inserts += 1;
        self.inserted_ids.push(id.into());
    }

    pub fn record_failure(&mut self, detail: impl Into<String>) {
        self.total_processed += 1;
        self.failed_inserts += 1;
        self.error_details.push(detail.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recorded_outcomes_stay_consistent() {
        let mut result = BatchResult::default();
        result.record_success("a");
        result.record_success("b");
        result.record_failure("c: duplicate code");

        assert_eq!(result.total_processed, 3);
        assert_eq!(result.successful_inserts, 2);
        assert_eq!(result.failed_inserts, 1);
        assert_eq!(result.inserted_ids, vec!["a", "b"]);
        assert!(result.is_consistent());
    }

    #[test]
    fn over_reported_counts_are_inconsistent() {
        let result = BatchResult {
            total_processed: 2,
            successful_inserts: 2,
            failed_inserts: 1,
            ..Default::default()
        };
        assert!(!result.is_consistent());
    }
}

use connectors::StoreError;
use engine_core::stats::{RunStatistics, RunSummary};
use thiserror::Error;

/// Why a single raw record could not become a catalog record.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("record must be a JSON object, got {0}")]
    NotAnObject(&'static str),

    #[error("missing required field '{0}'")]
    MissingField(&'static str),

    #[error("field '{field}' must be {expected}, got {found}")]
    InvalidType {
        field: &'static str,
        expected: &'static str,
        found: String,
    },

    #[error("field '{field}' exceeds {max} characters ({actual})")]
    TooLong {
        field: &'static str,
        max: usize,
        actual: usize,
    },

    #[error("field '{field}' is not a valid YYYY-MM-DD date: '{value}'")]
    InvalidDate { field: &'static str, value: String },
}

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("I/O error while reading source: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed JSON document: {0}")]
    Json(#[from] serde_json::Error),

    #[error("The record consumer stopped before the document was fully read")]
    ReceiverClosed,

    #[error("Reader task failed: {0}")]
    Task(String),
}

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("Source file '{path}' cannot be used: {reason}")]
    FileValidation { path: String, reason: String },

    #[error("Record at position {position} failed validation: {source}")]
    RecordValidation {
        position: u64,
        #[source]
        source: ValidationError,
    },

    #[error("Batch {batch_number} failed after {attempts} attempts: {source}")]
    BatchSubmission {
        batch_number: u64,
        attempts: usize,
        #[source]
        source: StoreError,
    },

    #[error("Failed to serialize batch {batch_number}: {source}")]
    Serialization {
        batch_number: u64,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to read source document: {0}")]
    Source(#[from] SourceError),

    #[error("Import cancelled before the document was fully processed")]
    Cancelled,
}

impl ImportError {
    pub fn batch_number(&self) -> Option<u64> {
        match self {
            ImportError::BatchSubmission { batch_number, .. }
            | ImportError::Serialization { batch_number, .. } => Some(*batch_number),
            _ => None,
        }
    }
}

/// A run that stopped on a fatal error, with the statistics gathered so far.
#[derive(Error, Debug)]
#[error("Import run aborted: {cause}")]
pub struct RunAborted {
    #[source]
    pub cause: ImportError,
    pub stats: RunStatistics,
}

impl RunAborted {
    pub fn summary(&self) -> RunSummary {
        self.stats.to_summary()
    }
}

#[derive(Error, Debug)]
pub enum ArtifactError {
    #[error("Failed to write artifact file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize artifact: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum StateError {
    #[error("Checkpoint operation failed: {0}")]
    Checkpoint(String),

    #[error("WAL operation failed: {0}")]
    WalOperation(String),
}

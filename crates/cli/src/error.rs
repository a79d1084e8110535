use connectors::{StoreError, error::ConnectorError};
use engine_processing::error::StateError;
use engine_runtime::error::RuntimeError;
use model::core::kind::UnknownRecordKind;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize data to JSON: {0}")]
    JsonSerialize(#[from] serde_json::Error),

    #[error("{0}")]
    InvalidKind(#[from] UnknownRecordKind),

    #[error("Failed to run imports: {0}")]
    Runner(#[from] RuntimeError),

    #[error("Failed to connect to the store: {0}")]
    Connector(#[from] ConnectorError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Checkpoint error: {0}")]
    State(#[from] StateError),

    #[error("Failed to load progress: {0}")]
    Progress(String),

    #[error("{0} import(s) aborted")]
    ImportsAborted(usize),

    #[error("Shutdown requested")]
    ShutdownRequested,
}

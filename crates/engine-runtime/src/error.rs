use engine_core::error::StateStoreError;
use thiserror::Error;

/// Top-level errors for running imports.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// No import is registered under this key.
    #[error("Unknown import kind '{0}'")]
    UnknownKind(String),

    #[error("Initialization error: {0}")]
    InitializationError(String),

    #[error("State store error: {0}")]
    State(#[from] StateStoreError),

    /// An error occurred while joining an import task.
    /// This usually indicates that the task panicked.
    #[error("Task join error: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),

    #[error("Shutdown requested, running imports were cancelled")]
    ShutdownRequested,
}

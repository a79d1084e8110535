use thiserror::Error;

#[derive(Error, Debug)]
pub enum StateStoreError {
    #[error("Failed to save checkpoint: {0}")]
    SaveCheckpoint(String),

    #[error("Failed to load checkpoint: {0}")]
    LoadCheckpoint(String),

    #[error("Failed to append WAL entry: {0}")]
    AppendWal(String),

    #[error("Failed to iterate WAL entries: {0}")]
    IterateWal(String),

    #[error("Failed to open state store: {0}")]
    Open(#[from] sled::Error),
}

#[derive(Error, Debug)]
pub enum ProgressError {
    #[error("Failed to read WAL: {0}")]
    Wal(String),

    #[error("Failed to load checkpoint: {0}")]
    LoadCheckpoint(String),
}

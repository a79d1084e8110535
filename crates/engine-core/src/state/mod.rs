use crate::{
    error::StateStoreError,
    state::models::{Checkpoint, WalEntry},
};
use async_trait::async_trait;

pub mod models;
pub mod sled_store;

/// Durable run progress: the latest committed batch per run plus an
/// append-only log of run events.
#[async_trait]
pub trait StateStore: Send + Sync {
    async fn save_checkpoint(&self, cp: &Checkpoint) -> Result<(), StateStoreError>;
    async fn load_checkpoint(&self, run_id: &str) -> Result<Option<Checkpoint>, StateStoreError>;
    async fn append_wal(&self, entry: &WalEntry) -> Result<(), StateStoreError>;
    async fn iter_wal(&self, run_id: &str) -> Result<Vec<WalEntry>, StateStoreError>;
}

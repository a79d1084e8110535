use crate::error::RuntimeError;
use engine_core::state::sled_store::SledStateStore;
use std::{path::PathBuf, sync::Arc};

/// `~/.catalog/state`, where run checkpoints live unless configured otherwise.
pub fn default_state_dir() -> Result<PathBuf, RuntimeError> {
    let home_dir = dirs::home_dir().ok_or_else(|| {
        RuntimeError::InitializationError("Could not determine home directory".to_string())
    })?;
    Ok(home_dir.join(".catalog/state"))
}

pub fn open_state_store(dir: Option<PathBuf>) -> Result<Arc<SledStateStore>, RuntimeError> {
    let dir = match dir {
        Some(dir) => dir,
        None => default_state_dir()?,
    };
    Ok(Arc::new(SledStateStore::open(dir)?))
}

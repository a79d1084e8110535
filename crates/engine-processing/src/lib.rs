pub mod artifacts;
pub mod batcher;
pub mod config;
pub mod controller;
pub mod error;
pub mod retry;
pub mod source;
pub mod state_manager;
pub mod submitter;
pub mod validation;

pub use config::ProcessingConfig;
pub use controller::{RunPhase, StreamController};
pub use error::{ImportError, RunAborted};

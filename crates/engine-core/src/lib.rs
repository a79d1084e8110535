pub mod error;
pub mod progress;
pub mod retry;
pub mod state;
pub mod stats;

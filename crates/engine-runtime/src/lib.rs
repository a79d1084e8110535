pub mod error;
pub mod executor;
pub mod registry;
pub mod state;

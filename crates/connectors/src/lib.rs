pub mod error;
pub mod memory;
pub mod sql;
pub mod store;

pub use error::StoreError;
pub use store::CatalogStore;

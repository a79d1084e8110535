use crate::{commands::StoreKind, error::CliError, settings::Settings};
use connectors::{CatalogStore, memory::MemoryStore, sql::postgres::store::PostgresStore};
use model::core::kind::RecordKind;
use std::sync::Arc;
use tracing::info;

/// Opens the configured backend for `kind`, creating its table if needed.
pub async fn open_store(
    kind: RecordKind,
    settings: &Settings,
) -> Result<Arc<dyn CatalogStore>, CliError> {
    match settings.store {
        StoreKind::Memory => {
            info!(kind = %kind, "Using in-memory store");
            Ok(Arc::new(MemoryStore::new(kind)))
        }
        StoreKind::Postgres => open_postgres(kind, settings.database_url()?).await,
    }
}

pub async fn open_postgres(
    kind: RecordKind,
    database_url: &str,
) -> Result<Arc<dyn CatalogStore>, CliError> {
    let store = PostgresStore::connect(database_url, kind).await?;
    store.ensure_table().await?;
    info!(kind = %kind, table = kind.table_name(), "Connected to Postgres store");
    Ok(Arc::new(store))
}

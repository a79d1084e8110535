use crate::{
    error::{ConnectorError, StoreError},
    sql::postgres::utils::{connect_client, render},
    store::CatalogStore,
};
use async_trait::async_trait;
use model::{
    core::kind::RecordKind,
    records::{SerializedRecord, batch::BatchResult},
};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio_postgres::Client;
use tracing::{debug, info, warn};

const CREATE_TABLE_SQL: &str = include_str!("sql/create_table.sql");
const UPSERT_SQL: &str = include_str!("sql/upsert.sql");
const SELECT_ONE_SQL: &str = include_str!("sql/select_one.sql");
const SELECT_PAGE_SQL: &str = include_str!("sql/select_page.sql");

const RECORD_SAVEPOINT: &str = "catalog_record";

/// Postgres-backed store keeping each record as a JSONB payload keyed by id.
#[derive(Clone)]
pub struct PostgresStore {
    kind: RecordKind,
    client: Arc<RwLock<Client>>,
}

impl PostgresStore {
    pub async fn connect(url: &str, kind: RecordKind) -> Result<Self, ConnectorError> {
        let client = connect_client(url).await?;
        Ok(Self {
            kind,
            client: Arc::new(RwLock::new(client)),
        })
    }

    fn table(&self) -> &'static str {
        self.kind.table_name()
    }

    /// Creates the backing table when it does not exist yet.
    pub async fn ensure_table(&self) -> Result<(), StoreError> {
        let client = self.client.read().await;
        client
            .batch_execute(&render(CREATE_TABLE_SQL, self.table()))
            .await?;
        info!(table = self.table(), "Ensured catalog table");
        Ok(())
    }
}

fn transport(err: tokio_postgres::Error) -> StoreError {
    StoreError::TransportFailed(err.to_string())
}

#[async_trait]
impl CatalogStore for PostgresStore {
    fn kind(&self) -> RecordKind {
        self.kind
    }

    async fn add_many(&self, records: &[SerializedRecord]) -> Result<BatchResult, StoreError> {
        let mut client = self.client.write().await;
        if client.is_closed() {
            return Err(StoreError::TransportFailed(
                "connection to Postgres is closed".to_string(),
            ));
        }

        let mut tx = client.transaction().await.map_err(transport)?;
        let stmt = tx.prepare(&render(UPSERT_SQL, self.table())).await?;
        let mut result = BatchResult::default();

        for record in records {
            // A failed statement aborts the enclosing transaction, so every
            // record gets its own savepoint.
            let savepoint = tx.savepoint(RECORD_SAVEPOINT).await.map_err(transport)?;
            match savepoint
                .execute(&stmt, &[&record.id, &record.payload])
                .await
            {
                Ok(_) => {
                    savepoint.commit().await.map_err(transport)?;
                    result.record_success(record.id.clone());
                }
                Err(err) => {
                    savepoint.rollback().await.map_err(transport)?;
                    warn!(
                        table = self.table(),
                        id = %record.id,
                        error = %err,
                        "Record rejected by Postgres"
                    );
                    result.record_failure(format!("{}: {}", record.id, err));
                }
            }
        }

        tx.commit().await.map_err(transport)?;

        debug!(
            table = self.table(),
            inserted = result.successful_inserts,
            failed = result.failed_inserts,
            "Committed batch to Postgres"
        );
        Ok(result)
    }

    async fn get(&self, id: &str) -> Result<Value, StoreError> {
        let client = self.client.read().await;
        let row = client
            .query_opt(&render(SELECT_ONE_SQL, self.table()), &[&id])
            .await?;
        match row {
            Some(row) => Ok(row.try_get::<_, Value>(0)?),
            None => Err(StoreError::NotFound(id.to_string())),
        }
    }

    async fn list(&self, limit: usize, offset: usize) -> Result<Vec<Value>, StoreError> {
        let limit = i64::try_from(limit)
            .map_err(|_| StoreError::ValidationFailed(format!("limit {limit} out of range")))?;
        let offset = i64::try_from(offset)
            .map_err(|_| StoreError::ValidationFailed(format!("offset {offset} out of range")))?;

        let client = self.client.read().await;
        let rows = client
            .query(&render(SELECT_PAGE_SQL, self.table()), &[&limit, &offset])
            .await?;
        rows.iter()
            .map(|row| row.try_get::<_, Value>(0).map_err(StoreError::from))
            .collect()
    }
}

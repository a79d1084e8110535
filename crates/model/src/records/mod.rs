use crate::core::kind::RecordKind;
use serde::{Deserialize, Serialize};

pub mod batch;
pub mod card;
pub mod card_set;
pub mod raw;

/// A schema-conformant catalog entity produced by record validation.
///
/// Implementors are plain values: once built they are only read, cloned or
/// serialized, never mutated by the pipeline.
pub trait CatalogRecord: Serialize + Clone + Send + Sync + 'static {
    const KIND: RecordKind;

    /// Stable natural key used for upserts.
    fn id(&self) -> &str;

    fn to_serialized(&self) -> Result<SerializedRecord, serde_json::Error> {
        Ok(SerializedRecord {
            id: self.id().to_string(),
            payload: serde_json::to_value(self)?,
        })
    }
}

/// Wire form of a validated record as handed to a storage backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedRecord {
    pub id: String,
    pub payload: serde_json::Value,
}

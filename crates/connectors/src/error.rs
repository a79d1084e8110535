use thiserror::Error;

/// Outcome taxonomy of a storage backend call.
///
/// Callers match on the variant instead of inspecting driver errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No record exists under the requested id.
    #[error("Record '{0}' not found")]
    NotFound(String),

    /// The backend refused the request as malformed.
    #[error("Store rejected request: {0}")]
    ValidationFailed(String),

    /// The backend could not be reached or the call did not complete.
    #[error("Store transport failure: {0}")]
    TransportFailed(String),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}

impl From<tokio_postgres::Error> for StoreError {
    fn from(err: tokio_postgres::Error) -> Self {
        if err.is_closed() || err.code().is_none() {
            StoreError::TransportFailed(err.to_string())
        } else {
            StoreError::ValidationFailed(err.to_string())
        }
    }
}

/// Errors happening while establishing a backend connection.
#[derive(Debug, Error)]
pub enum ConnectorError {
    #[error("Invalid connection URL: {0}")]
    InvalidUrl(String),

    #[error("TLS configuration error: {0}")]
    TlsConfig(#[from] native_tls::Error),

    #[error("Connection failed: {0}")]
    Connection(#[from] tokio_postgres::Error),
}

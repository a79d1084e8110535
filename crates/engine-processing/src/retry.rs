use connectors::StoreError;
use engine_core::retry::RetryDisposition;

/// Every backend failure is worth another attempt: the store may reject a
/// batch transiently (lock timeouts, dropped connections) and upserts keep
/// resubmission idempotent.
pub fn classify_store_error(err: &StoreError) -> RetryDisposition {
    match err {
        StoreError::TransportFailed(_) => RetryDisposition::Retry,
        StoreError::ValidationFailed(_) => RetryDisposition::Retry,
        StoreError::NotFound(_) => RetryDisposition::Retry,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_store_errors_are_retried() {
        for err in [
            StoreError::TransportFailed("reset".into()),
            StoreError::ValidationFailed("check".into()),
            StoreError::NotFound("x".into()),
        ] {
            assert_eq!(classify_store_error(&err), RetryDisposition::Retry);
        }
    }
}

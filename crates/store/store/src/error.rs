use thiserror::Error;

/// Errors from repository operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The requested entity does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A uniqueness or concurrent-update conflict.
    #[error("conflict: {0}")]
    Conflict(String),

    /// A domain rule was violated at the store boundary (e.g. an invalid
    /// delivery status transition under the conditional update).
    #[error(transparent)]
    Domain(#[from] freightwatch_core::DomainError),

    /// A connection-level failure (pool exhausted, network down).
    #[error("connection error: {0}")]
    Connection(String),

    /// A backend failure (query error, constraint violation).
    #[error("backend error: {0}")]
    Backend(String),

    /// A serialization error while encoding or decoding a stored value.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl StoreError {
    /// Whether the error is transient and the operation may succeed on
    /// retry.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Connection(_))
    }
}

#[cfg(test)]
mod tests {
    use freightwatch_core::{DeliveryStatus, DomainError};

    use super::*;

    #[test]
    fn domain_errors_pass_through() {
        let err = StoreError::from(DomainError::InvalidTransition {
            from: DeliveryStatus::Delivered,
            to: DeliveryStatus::Delayed,
        });
        assert!(err.to_string().contains("invalid delivery status transition"));
        assert!(!err.is_retryable());
    }

    #[test]
    fn connection_errors_are_retryable() {
        assert!(StoreError::Connection("reset".into()).is_retryable());
        assert!(!StoreError::Backend("constraint".into()).is_retryable());
    }
}

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur during provider operations.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The adapter's configuration is incomplete or invalid.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// The adapter failed to execute the request.
    #[error("execution failed: {0}")]
    ExecutionFailed(String),

    /// The adapter did not respond within the allowed duration.
    #[error("timeout after {0:?}")]
    Timeout(Duration),

    /// A network or transport-level error occurred.
    #[error("connection error: {0}")]
    Connection(String),

    /// The upstream service rejected the request due to rate limiting.
    #[error("rate limited")]
    RateLimited,

    /// A serialization or deserialization error occurred.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Every adapter in a fallback chain was tried and failed. The message
    /// lists each attempt.
    #[error("all providers failed: {0}")]
    Exhausted(String),
}

impl ProviderError {
    /// Returns `true` if the error is transient and the operation may
    /// succeed on retry.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Timeout(_) | Self::Connection(_) | Self::RateLimited
        )
    }
}

/// Acknowledgement returned by a notifier adapter after a successful send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchReceipt {
    /// Name of the adapter that performed the send.
    pub provider: String,
    /// Provider-assigned message id.
    pub message_id: String,
}

use thiserror::Error;

use crate::delivery::DeliveryStatus;

/// Domain-rule violations: status-machine breaches and threshold
/// invariant breaches. Mapped to HTTP 409 at the API boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    /// The requested delivery status transition is not in the allowed table.
    #[error("invalid delivery status transition: {from} -> {to}")]
    InvalidTransition {
        from: DeliveryStatus,
        to: DeliveryStatus,
    },

    /// A threshold must enable at least one notification channel.
    #[error("threshold must enable at least one notification channel")]
    EmptyChannels,

    /// The default threshold and system thresholds cannot be deleted.
    #[error("threshold is protected: {0}")]
    ProtectedThreshold(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transition_error_display() {
        let err = DomainError::InvalidTransition {
            from: DeliveryStatus::Delivered,
            to: DeliveryStatus::Delayed,
        };
        assert_eq!(
            err.to_string(),
            "invalid delivery status transition: delivered -> delayed"
        );
    }
}

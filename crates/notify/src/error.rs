use freightwatch_core::NotificationChannel;
use thiserror::Error;

/// Errors from the notification service.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// The recipient is on the email blacklist; the send was skipped
    /// before any adapter attempt.
    #[error("recipient is blacklisted: {recipient}")]
    Blacklisted { recipient: String },

    /// Every available adapter on the channel failed; the message lists
    /// each attempt.
    #[error("all {channel} adapters failed: {detail}")]
    AllFailed {
        channel: NotificationChannel,
        detail: String,
    },

    /// No adapter on the channel was available at all.
    #[error("no available {channel} adapter")]
    NoAdapter { channel: NotificationChannel },
}

impl NotifyError {
    /// Whether this failure should persist as a skipped (rather than
    /// failed) notification row.
    #[must_use]
    pub fn is_skip(&self) -> bool {
        matches!(self, Self::Blacklisted { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blacklist_is_a_skip() {
        let err = NotifyError::Blacklisted {
            recipient: "blacklisted@example.com".into(),
        };
        assert!(err.is_skip());
        assert!(err.to_string().contains("blacklisted@example.com"));
    }

    #[test]
    fn channel_failures_are_not_skips() {
        let err = NotifyError::AllFailed {
            channel: NotificationChannel::Sms,
            detail: "twilio: rate limited".into(),
        };
        assert!(!err.is_skip());
        assert!(err.to_string().contains("sms"));
    }
}

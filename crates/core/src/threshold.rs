use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;

/// A notification delivery channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationChannel {
    Email,
    Sms,
}

impl NotificationChannel {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Sms => "sms",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "email" => Some(Self::Email),
            "sms" => Some(Self::Sms),
            _ => None,
        }
    }
}

impl std::fmt::Display for NotificationChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named delay threshold paired with the channels to notify on.
///
/// Exactly one threshold is the default at any time; system thresholds and
/// the current default cannot be deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Threshold {
    pub id: Uuid,
    pub name: String,
    pub delay_minutes: u32,
    pub notification_channels: Vec<NotificationChannel>,
    pub is_default: bool,
    pub is_system: bool,
}

impl Threshold {
    /// Create a threshold. Fails if no channel is enabled.
    pub fn new(
        name: impl Into<String>,
        delay_minutes: u32,
        notification_channels: Vec<NotificationChannel>,
    ) -> Result<Self, DomainError> {
        if notification_channels.is_empty() {
            return Err(DomainError::EmptyChannels);
        }
        Ok(Self {
            id: Uuid::new_v4(),
            name: name.into(),
            delay_minutes,
            notification_channels,
            is_default: false,
            is_system: false,
        })
    }

    /// Mark as the default threshold.
    #[must_use]
    pub fn as_default(mut self) -> Self {
        self.is_default = true;
        self
    }

    /// Mark as a system threshold (protected from deletion).
    #[must_use]
    pub fn as_system(mut self) -> Self {
        self.is_system = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_channels_rejected() {
        let err = Threshold::new("standard", 30, vec![]).unwrap_err();
        assert!(matches!(err, DomainError::EmptyChannels));
    }

    #[test]
    fn builder_flags() {
        let t = Threshold::new("standard", 30, vec![NotificationChannel::Email])
            .unwrap()
            .as_default()
            .as_system();
        assert!(t.is_default);
        assert!(t.is_system);
    }

    #[test]
    fn channel_serde_is_snake_case() {
        let json = serde_json::to_string(&NotificationChannel::Sms).unwrap();
        assert_eq!(json, "\"sms\"");
    }
}

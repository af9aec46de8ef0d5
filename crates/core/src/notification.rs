use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::threshold::NotificationChannel;

/// Outcome of one notification attempt on one channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationStatus {
    Pending,
    Sent,
    Failed,
    Skipped,
}

impl NotificationStatus {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Sent => "sent",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "sent" => Some(Self::Sent),
            "failed" => Some(Self::Failed),
            "skipped" => Some(Self::Skipped),
            _ => None,
        }
    }
}

/// A persisted record of one notification attempt. Rows are insert-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub delivery_id: Uuid,
    pub channel: NotificationChannel,
    pub recipient: String,
    pub message: String,
    pub status: NotificationStatus,
    /// Provider-assigned message id, when the send succeeded.
    #[serde(default)]
    pub external_id: Option<String>,
    #[serde(default)]
    pub sent_at: Option<DateTime<Utc>>,
    /// The delay in minutes at the time of the attempt; feeds the delta
    /// dedup gate.
    pub delay_minutes_at_send: u32,
    #[serde(default)]
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    /// A successfully sent notification.
    #[must_use]
    pub fn sent(
        delivery_id: Uuid,
        channel: NotificationChannel,
        recipient: impl Into<String>,
        message: impl Into<String>,
        external_id: impl Into<String>,
        delay_minutes: u32,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            delivery_id,
            channel,
            recipient: recipient.into(),
            message: message.into(),
            status: NotificationStatus::Sent,
            external_id: Some(external_id.into()),
            sent_at: Some(at),
            delay_minutes_at_send: delay_minutes,
            error_message: None,
            created_at: at,
        }
    }

    /// A failed notification attempt.
    #[must_use]
    pub fn failed(
        delivery_id: Uuid,
        channel: NotificationChannel,
        recipient: impl Into<String>,
        message: impl Into<String>,
        error: impl Into<String>,
        delay_minutes: u32,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            delivery_id,
            channel,
            recipient: recipient.into(),
            message: message.into(),
            status: NotificationStatus::Failed,
            external_id: None,
            sent_at: None,
            delay_minutes_at_send: delay_minutes,
            error_message: Some(error.into()),
            created_at: at,
        }
    }

    /// A skipped notification (e.g. blacklisted recipient, missing phone).
    #[must_use]
    pub fn skipped(
        delivery_id: Uuid,
        channel: NotificationChannel,
        recipient: impl Into<String>,
        message: impl Into<String>,
        reason: impl Into<String>,
        delay_minutes: u32,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            delivery_id,
            channel,
            recipient: recipient.into(),
            message: message.into(),
            status: NotificationStatus::Skipped,
            external_id: None,
            sent_at: None,
            delay_minutes_at_send: delay_minutes,
            error_message: Some(reason.into()),
            created_at: at,
        }
    }
}

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;

/// Lifecycle status of a delivery.
///
/// Allowed transitions:
/// pending → in_transit | cancelled;
/// in_transit → delayed | delivered | failed;
/// delayed → delivered | failed | cancelled;
/// delivered, cancelled, failed are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    Pending,
    InTransit,
    Delayed,
    Delivered,
    Cancelled,
    Failed,
}

impl DeliveryStatus {
    /// Whether the transition `self → to` appears in the allowed table.
    #[must_use]
    pub fn can_transition_to(self, to: Self) -> bool {
        use DeliveryStatus::{Cancelled, Delayed, Delivered, Failed, InTransit, Pending};
        matches!(
            (self, to),
            (Pending, InTransit | Cancelled)
                | (InTransit, Delayed | Delivered | Failed)
                | (Delayed, Delivered | Failed | Cancelled)
        )
    }

    /// Terminal statuses admit no further transitions.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled | Self::Failed)
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InTransit => "in_transit",
            Self::Delayed => "delayed",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
            Self::Failed => "failed",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "in_transit" => Some(Self::InTransit),
            "delayed" => Some(Self::Delayed),
            "delivered" => Some(Self::Delivered),
            "cancelled" => Some(Self::Cancelled),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

impl std::fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A freight delivery being monitored for traffic-induced delays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Delivery {
    pub id: Uuid,
    pub tracking_number: String,
    pub customer_id: Uuid,
    pub route_id: Uuid,
    pub status: DeliveryStatus,
    pub scheduled_delivery: DateTime<Utc>,
    #[serde(default)]
    pub actual_delivery: Option<DateTime<Utc>>,
    /// Per-delivery delay threshold override in minutes. Only positive
    /// values participate in threshold resolution.
    #[serde(default)]
    pub delay_threshold_minutes: Option<u32>,
    /// Run a traffic check when the delivery is created.
    pub auto_check_traffic: bool,
    /// Start the recurring traffic-check workflow instead of the one-shot.
    pub enable_recurring_checks: bool,
    /// Minutes between recurring checks.
    pub check_interval_minutes: u32,
    /// Maximum number of recurring checks; −1 means unlimited.
    pub max_checks: i32,
    /// Checks performed so far by the recurring workflow.
    pub checks_performed: u32,
    /// Minimum change in delay (minutes) before re-notifying.
    pub min_delay_change_threshold: u32,
    /// Minimum hours between successive notifications.
    pub min_hours_between_notifications: f64,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Delivery {
    /// Create a new pending delivery with a fresh id and default check
    /// settings.
    #[must_use]
    pub fn new(
        tracking_number: impl Into<String>,
        customer_id: Uuid,
        route_id: Uuid,
        scheduled_delivery: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            tracking_number: tracking_number.into(),
            customer_id,
            route_id,
            status: DeliveryStatus::Pending,
            scheduled_delivery,
            actual_delivery: None,
            delay_threshold_minutes: None,
            auto_check_traffic: true,
            enable_recurring_checks: false,
            check_interval_minutes: 30,
            max_checks: -1,
            checks_performed: 0,
            min_delay_change_threshold: 10,
            min_hours_between_notifications: 1.0,
            metadata: HashMap::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Set the per-delivery threshold override.
    #[must_use]
    pub fn with_threshold(mut self, minutes: u32) -> Self {
        self.delay_threshold_minutes = Some(minutes);
        self
    }

    /// Enable recurring checks with the given interval and check cap.
    #[must_use]
    pub fn with_recurring_checks(mut self, interval_minutes: u32, max_checks: i32) -> Self {
        self.enable_recurring_checks = true;
        self.check_interval_minutes = interval_minutes;
        self.max_checks = max_checks;
        self
    }

    /// Set the notification dedup gates.
    #[must_use]
    pub fn with_dedup_gates(mut self, min_delay_change: u32, min_hours_between: f64) -> Self {
        self.min_delay_change_threshold = min_delay_change;
        self.min_hours_between_notifications = min_hours_between;
        self
    }

    /// The check cap as an option; `None` means unlimited.
    #[must_use]
    pub fn effective_max_checks(&self) -> Option<u32> {
        u32::try_from(self.max_checks).ok()
    }

    /// Cooldown between notifications as a duration.
    #[must_use]
    pub fn notification_cooldown(&self) -> chrono::Duration {
        let seconds = (self.min_hours_between_notifications * 3600.0).round();
        chrono::Duration::seconds(seconds as i64)
    }

    /// Move to `to`, rejecting transitions outside the allowed table.
    /// On rejection the status is left unchanged.
    pub fn transition(&mut self, to: DeliveryStatus, now: DateTime<Utc>) -> Result<(), DomainError> {
        if !self.status.can_transition_to(to) {
            return Err(DomainError::InvalidTransition {
                from: self.status,
                to,
            });
        }
        self.status = to;
        self.updated_at = now;
        Ok(())
    }

    /// Mark the delivery as delayed. Valid only from pending or in_transit.
    pub fn mark_delayed(&mut self, now: DateTime<Utc>) -> Result<(), DomainError> {
        match self.status {
            DeliveryStatus::Pending | DeliveryStatus::InTransit => {
                self.status = DeliveryStatus::Delayed;
                self.updated_at = now;
                Ok(())
            }
            from => Err(DomainError::InvalidTransition {
                from,
                to: DeliveryStatus::Delayed,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn delivery() -> Delivery {
        Delivery::new(
            "TRK-1001",
            Uuid::new_v4(),
            Uuid::new_v4(),
            Utc::now() + chrono::Duration::hours(6),
            Utc::now(),
        )
    }

    #[test]
    fn allowed_transition_table() {
        use DeliveryStatus::{Cancelled, Delayed, Delivered, Failed, InTransit, Pending};

        let allowed = [
            (Pending, InTransit),
            (Pending, Cancelled),
            (InTransit, Delayed),
            (InTransit, Delivered),
            (InTransit, Failed),
            (Delayed, Delivered),
            (Delayed, Failed),
            (Delayed, Cancelled),
        ];
        let all = [Pending, InTransit, Delayed, Delivered, Cancelled, Failed];

        for from in all {
            for to in all {
                let expected = allowed.contains(&(from, to));
                assert_eq!(
                    from.can_transition_to(to),
                    expected,
                    "transition {from} -> {to}"
                );
            }
        }
    }

    #[test]
    fn rejected_transition_leaves_status_unchanged() {
        let mut d = delivery();
        let err = d.transition(DeliveryStatus::Delivered, Utc::now()).unwrap_err();
        assert!(matches!(err, DomainError::InvalidTransition { .. }));
        assert_eq!(d.status, DeliveryStatus::Pending);
    }

    #[test]
    fn mark_delayed_from_pending_and_in_transit() {
        let mut d = delivery();
        d.mark_delayed(Utc::now()).unwrap();
        assert_eq!(d.status, DeliveryStatus::Delayed);

        let mut d = delivery();
        d.transition(DeliveryStatus::InTransit, Utc::now()).unwrap();
        d.mark_delayed(Utc::now()).unwrap();
        assert_eq!(d.status, DeliveryStatus::Delayed);
    }

    #[test]
    fn mark_delayed_rejected_from_terminal() {
        let mut d = delivery();
        d.transition(DeliveryStatus::Cancelled, Utc::now()).unwrap();
        assert!(d.mark_delayed(Utc::now()).is_err());
        assert_eq!(d.status, DeliveryStatus::Cancelled);
    }

    #[test]
    fn terminal_statuses() {
        assert!(DeliveryStatus::Delivered.is_terminal());
        assert!(DeliveryStatus::Cancelled.is_terminal());
        assert!(DeliveryStatus::Failed.is_terminal());
        assert!(!DeliveryStatus::Pending.is_terminal());
        assert!(!DeliveryStatus::Delayed.is_terminal());
    }

    #[test]
    fn effective_max_checks() {
        let mut d = delivery();
        assert_eq!(d.effective_max_checks(), None);
        d.max_checks = 5;
        assert_eq!(d.effective_max_checks(), Some(5));
        d.max_checks = 0;
        assert_eq!(d.effective_max_checks(), Some(0));
    }

    #[test]
    fn notification_cooldown_handles_fractional_hours() {
        let mut d = delivery();
        d.min_hours_between_notifications = 0.5;
        assert_eq!(d.notification_cooldown(), chrono::Duration::minutes(30));
    }

    #[test]
    fn status_parse_roundtrip() {
        for s in [
            DeliveryStatus::Pending,
            DeliveryStatus::InTransit,
            DeliveryStatus::Delayed,
            DeliveryStatus::Delivered,
            DeliveryStatus::Cancelled,
            DeliveryStatus::Failed,
        ] {
            assert_eq!(DeliveryStatus::parse(s.as_str()), Some(s));
        }
        assert_eq!(DeliveryStatus::parse("lost"), None);
    }
}

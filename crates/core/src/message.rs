use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::traffic::TrafficCondition;

/// Context handed to a message generator when a delay breaches the
/// threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DelayContext {
    pub tracking_number: String,
    pub origin_address: String,
    pub destination_address: String,
    pub delay_minutes: u32,
    pub condition: TrafficCondition,
    /// The originally scheduled arrival.
    pub scheduled_arrival: DateTime<Utc>,
    /// The scheduled arrival shifted by the current delay.
    pub estimated_arrival: DateTime<Utc>,
}

impl DelayContext {
    /// Build a context, deriving the estimated arrival from the scheduled
    /// one plus the delay.
    #[must_use]
    pub fn new(
        tracking_number: impl Into<String>,
        origin_address: impl Into<String>,
        destination_address: impl Into<String>,
        delay_minutes: u32,
        condition: TrafficCondition,
        scheduled_arrival: DateTime<Utc>,
    ) -> Self {
        let estimated_arrival =
            scheduled_arrival + chrono::Duration::minutes(i64::from(delay_minutes));
        Self {
            tracking_number: tracking_number.into(),
            origin_address: origin_address.into(),
            destination_address: destination_address.into(),
            delay_minutes,
            condition,
            scheduled_arrival,
            estimated_arrival,
        }
    }

    /// The estimated arrival formatted for customer-facing text.
    #[must_use]
    pub fn eta_display(&self) -> String {
        self.estimated_arrival
            .format("%Y-%m-%d %H:%M UTC")
            .to_string()
    }
}

/// A customer-facing message produced by a generator adapter (or the
/// deterministic template fallback).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedMessage {
    pub subject: String,
    pub body: String,
    /// The model that produced the text, or `"template"` for the fallback.
    pub model_name: String,
    #[serde(default)]
    pub token_count: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn estimated_arrival_is_shifted_by_delay() {
        let scheduled = Utc::now();
        let ctx = DelayContext::new(
            "TRK-1",
            "A",
            "B",
            45,
            TrafficCondition::Severe,
            scheduled,
        );
        assert_eq!(ctx.estimated_arrival - scheduled, chrono::Duration::minutes(45));
    }

    #[test]
    fn eta_display_is_utc_formatted() {
        let scheduled = "2026-03-01T12:00:00Z".parse().unwrap();
        let ctx = DelayContext::new("TRK-1", "A", "B", 30, TrafficCondition::Heavy, scheduled);
        assert_eq!(ctx.eta_display(), "2026-03-01 12:30 UTC");
    }
}

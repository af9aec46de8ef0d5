use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use freightwatch_core::{Delivery, NotificationChannel};
use freightwatch_store::Repository;

use crate::error::WorkflowError;

/// Where the resolved threshold came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdSource {
    DeliveryOverride,
    SystemDefault,
    Fallback,
}

/// The threshold a pipeline run evaluates against, paired with the
/// channels to notify on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedThreshold {
    pub delay_minutes: u32,
    pub channels: Vec<NotificationChannel>,
    pub source: ThresholdSource,
}

/// Resolves the applicable threshold:
/// per-delivery positive override → stored default → fallback constant.
///
/// An override only replaces the minute value; channels always come from
/// the stored default, falling back to both channels when none exists.
pub struct ThresholdResolver {
    repo: Arc<dyn Repository>,
    fallback_minutes: u32,
}

impl ThresholdResolver {
    #[must_use]
    pub fn new(repo: Arc<dyn Repository>, fallback_minutes: u32) -> Self {
        Self {
            repo,
            fallback_minutes,
        }
    }

    pub async fn resolve(&self, delivery: &Delivery) -> Result<ResolvedThreshold, WorkflowError> {
        let default = self.repo.get_default_threshold().await?;
        let default_channels = default
            .as_ref()
            .map(|t| t.notification_channels.clone())
            .unwrap_or_else(|| vec![NotificationChannel::Email, NotificationChannel::Sms]);

        let resolved = match delivery.delay_threshold_minutes {
            Some(minutes) if minutes > 0 => ResolvedThreshold {
                delay_minutes: minutes,
                channels: default_channels,
                source: ThresholdSource::DeliveryOverride,
            },
            _ => match default {
                Some(threshold) => ResolvedThreshold {
                    delay_minutes: threshold.delay_minutes,
                    channels: threshold.notification_channels,
                    source: ThresholdSource::SystemDefault,
                },
                None => ResolvedThreshold {
                    delay_minutes: self.fallback_minutes,
                    channels: default_channels,
                    source: ThresholdSource::Fallback,
                },
            },
        };

        debug!(
            delivery_id = %delivery.id,
            threshold_minutes = resolved.delay_minutes,
            source = ?resolved.source,
            "threshold resolved"
        );
        Ok(resolved)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use freightwatch_core::{Customer, Route, Threshold};
    use freightwatch_store_memory::MemoryRepository;
    use uuid::Uuid;

    use super::*;

    async fn delivery_with_override(
        repo: &MemoryRepository,
        override_minutes: Option<u32>,
    ) -> Delivery {
        let now = Utc::now();
        let customer = repo
            .create_customer(Customer::new("Ada", format!("{}@example.com", Uuid::new_v4()), now))
            .await
            .unwrap();
        let route = repo.create_route(Route::new("A", "B", now)).await.unwrap();
        let mut delivery = Delivery::new(
            format!("TRK-{}", Uuid::new_v4()),
            customer.id,
            route.id,
            now + chrono::Duration::hours(6),
            now,
        );
        delivery.delay_threshold_minutes = override_minutes;
        repo.create_delivery(delivery).await.unwrap()
    }

    #[tokio::test]
    async fn positive_override_wins_but_channels_come_from_default() {
        let repo = Arc::new(MemoryRepository::new());
        repo.create_threshold(
            Threshold::new("default", 45, vec![NotificationChannel::Email])
                .unwrap()
                .as_default(),
        )
        .await
        .unwrap();
        let delivery = delivery_with_override(&repo, Some(20)).await;

        let resolver = ThresholdResolver::new(repo, 30);
        let resolved = resolver.resolve(&delivery).await.unwrap();
        assert_eq!(resolved.delay_minutes, 20);
        assert_eq!(resolved.channels, vec![NotificationChannel::Email]);
        assert_eq!(resolved.source, ThresholdSource::DeliveryOverride);
    }

    #[tokio::test]
    async fn zero_override_is_ignored() {
        let repo = Arc::new(MemoryRepository::new());
        repo.create_threshold(
            Threshold::new("default", 45, vec![NotificationChannel::Sms])
                .unwrap()
                .as_default(),
        )
        .await
        .unwrap();
        let delivery = delivery_with_override(&repo, Some(0)).await;

        let resolver = ThresholdResolver::new(repo, 30);
        let resolved = resolver.resolve(&delivery).await.unwrap();
        assert_eq!(resolved.delay_minutes, 45);
        assert_eq!(resolved.source, ThresholdSource::SystemDefault);
    }

    #[tokio::test]
    async fn fallback_when_no_default_exists() {
        let repo = Arc::new(MemoryRepository::new());
        let delivery = delivery_with_override(&repo, None).await;

        let resolver = ThresholdResolver::new(repo, 30);
        let resolved = resolver.resolve(&delivery).await.unwrap();
        assert_eq!(resolved.delay_minutes, 30);
        assert_eq!(
            resolved.channels,
            vec![NotificationChannel::Email, NotificationChannel::Sms]
        );
        assert_eq!(resolved.source, ThresholdSource::Fallback);
    }
}

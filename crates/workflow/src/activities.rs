use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use freightwatch_core::{
    Customer, DelayContext, Delivery, DeliveryStatus, GeneratedMessage, Notification, Route,
    TrafficEstimate, TrafficSnapshot,
};
use freightwatch_notify::{NotificationRequest, NotificationService, NotifyError};
use freightwatch_provider::{AttemptLog, MessageGenerator, TrafficProvider, sort_by_priority};
use freightwatch_store::{Repository, StoreError};

use crate::config::ActivityConfig;
use crate::error::WorkflowError;
use crate::retry::call_with_retry;
use crate::threshold::{ResolvedThreshold, ThresholdResolver};

/// Why a pipeline run decided not to notify.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The delay does not exceed the resolved threshold.
    BelowThreshold { threshold: u32 },
    /// A notification went out too recently (cooldown gate).
    Cooldown,
    /// The delay has not changed enough since the last send (delta gate).
    DeltaBelowMinimum,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BelowThreshold { .. } => f.write_str("below_threshold"),
            Self::Cooldown => f.write_str("dedup_cooldown"),
            Self::DeltaBelowMinimum => f.write_str("dedup_delta"),
        }
    }
}

/// Outcome of the delay-evaluation step.
#[derive(Debug, Clone)]
pub enum DelayDecision {
    Notify {
        threshold: ResolvedThreshold,
        delay_minutes: u32,
    },
    Skip {
        reason: SkipReason,
        delay_minutes: u32,
    },
}

/// Result of the notification-delivery step.
#[derive(Debug, Clone, Default)]
pub struct DeliveryReport {
    pub sent: usize,
    pub failed: usize,
    pub skipped: usize,
    pub failures: Vec<String>,
}

/// The side-effectful units invoked from workflow bodies.
///
/// Each method is one activity: it owns its adapter fallback chain, retry
/// budget, and repository writes. Time is always passed in from the
/// workflow context rather than read from the wall clock.
pub struct Activities {
    repo: Arc<dyn Repository>,
    traffic: Vec<Arc<dyn TrafficProvider>>,
    generators: Vec<Arc<dyn MessageGenerator>>,
    notifier: Arc<NotificationService>,
    resolver: ThresholdResolver,
    config: ActivityConfig,
}

impl Activities {
    #[must_use]
    pub fn new(
        repo: Arc<dyn Repository>,
        mut traffic: Vec<Arc<dyn TrafficProvider>>,
        mut generators: Vec<Arc<dyn MessageGenerator>>,
        notifier: Arc<NotificationService>,
        resolver: ThresholdResolver,
        config: ActivityConfig,
    ) -> Self {
        sort_by_priority(&mut traffic, |a| a.priority());
        sort_by_priority(&mut generators, |a| a.priority());
        Self {
            repo,
            traffic,
            generators,
            notifier,
            resolver,
            config,
        }
    }

    /// Step 1: fetch live traffic, persist the route update and a snapshot.
    pub async fn check_traffic(
        &self,
        route: &mut Route,
        now: DateTime<Utc>,
    ) -> Result<TrafficEstimate, WorkflowError> {
        let (Some(origin), Some(destination)) = (route.origin_coords, route.destination_coords)
        else {
            return Err(WorkflowError::MissingCoordinates(route.id));
        };

        let mut attempts = AttemptLog::new();
        for adapter in &self.traffic {
            if !adapter.is_available().await {
                debug!(adapter = adapter.name(), "traffic adapter unavailable, skipping");
                continue;
            }
            let result = call_with_retry(&self.config, "traffic lookup", || {
                adapter.get_traffic(&origin, &destination)
            })
            .await;
            match result {
                Ok(estimate) => {
                    route.apply_traffic(&estimate, now);
                    self.repo.update_route(route.clone()).await?;
                    let snapshot = TrafficSnapshot::from_estimate(route, &estimate, now);
                    self.repo.create_traffic_snapshot(snapshot).await?;
                    info!(
                        route_id = %route.id,
                        adapter = adapter.name(),
                        delay_minutes = estimate.delay_minutes,
                        condition = %estimate.condition,
                        "traffic check complete"
                    );
                    return Ok(estimate);
                }
                Err(error) => {
                    warn!(
                        route_id = %route.id,
                        adapter = adapter.name(),
                        error = %error,
                        "traffic adapter failed, trying next"
                    );
                    attempts.record(adapter.name(), &error);
                }
            }
        }
        Err(attempts.into_error("traffic lookup").into())
    }

    /// Step 2: resolve the threshold and apply the notify/skip gates.
    pub async fn evaluate_delay(
        &self,
        delivery: &Delivery,
        estimate: &TrafficEstimate,
        now: DateTime<Utc>,
    ) -> Result<DelayDecision, WorkflowError> {
        let threshold = self.resolver.resolve(delivery).await?;
        let delay_minutes = estimate.delay_minutes;

        if delay_minutes <= threshold.delay_minutes {
            debug!(
                delivery_id = %delivery.id,
                delay_minutes,
                threshold = threshold.delay_minutes,
                "delay within threshold, no notification needed"
            );
            return Ok(DelayDecision::Skip {
                reason: SkipReason::BelowThreshold {
                    threshold: threshold.delay_minutes,
                },
                delay_minutes,
            });
        }

        if let Some(last) = self.repo.latest_sent_notification(delivery.id).await? {
            if let Some(sent_at) = last.sent_at {
                let since_last = now - sent_at;
                if since_last < delivery.notification_cooldown() {
                    info!(
                        delivery_id = %delivery.id,
                        minutes_since_last = since_last.num_minutes(),
                        "cooldown gate active, skipping notification"
                    );
                    return Ok(DelayDecision::Skip {
                        reason: SkipReason::Cooldown,
                        delay_minutes,
                    });
                }
            }
            let delta =
                i64::from(delay_minutes).abs_diff(i64::from(last.delay_minutes_at_send));
            if delta < u64::from(delivery.min_delay_change_threshold) {
                info!(
                    delivery_id = %delivery.id,
                    delta_minutes = delta,
                    "delay change below minimum, skipping notification"
                );
                return Ok(DelayDecision::Skip {
                    reason: SkipReason::DeltaBelowMinimum,
                    delay_minutes,
                });
            }
        }

        Ok(DelayDecision::Notify {
            threshold,
            delay_minutes,
        })
    }

    /// Step 3: produce the customer-facing message. Falls back to a
    /// deterministic template when every generator fails, so this step
    /// never blocks the pipeline.
    pub async fn generate_message(
        &self,
        delivery: &Delivery,
        route: &Route,
        estimate: &TrafficEstimate,
    ) -> GeneratedMessage {
        let context = DelayContext::new(
            &delivery.tracking_number,
            &route.origin_address,
            &route.destination_address,
            estimate.delay_minutes,
            estimate.condition,
            delivery.scheduled_delivery,
        );

        for adapter in &self.generators {
            if !adapter.is_available().await {
                debug!(adapter = adapter.name(), "generator unavailable, skipping");
                continue;
            }
            match call_with_retry(&self.config, "message generation", || {
                adapter.generate(&context)
            })
            .await
            {
                Ok(message) => {
                    debug!(
                        delivery_id = %delivery.id,
                        adapter = adapter.name(),
                        model = %message.model_name,
                        "message generated"
                    );
                    return message;
                }
                Err(error) => {
                    warn!(
                        delivery_id = %delivery.id,
                        adapter = adapter.name(),
                        error = %error,
                        "generator failed, trying next"
                    );
                }
            }
        }

        debug!(delivery_id = %delivery.id, "all generators failed, using template message");
        Self::template_message(&context)
    }

    /// The deterministic template used when no generator is usable.
    #[must_use]
    pub fn template_message(context: &DelayContext) -> GeneratedMessage {
        GeneratedMessage {
            subject: format!("Delivery {} delay update", context.tracking_number),
            body: format!(
                "Delivery {}: expected delay of {} minutes due to {} traffic. New ETA {}.",
                context.tracking_number,
                context.delay_minutes,
                context.condition,
                context.eta_display()
            ),
            model_name: "template".into(),
            token_count: None,
        }
    }

    /// Step 4: fan the message out on the resolved channels, persisting one
    /// notification row per channel, and mark the delivery delayed on the
    /// first success.
    pub async fn deliver_notifications(
        &self,
        delivery: &Delivery,
        customer: &Customer,
        threshold: &ResolvedThreshold,
        message: &GeneratedMessage,
        delay_minutes: u32,
        now: DateTime<Utc>,
    ) -> Result<DeliveryReport, WorkflowError> {
        use freightwatch_core::NotificationChannel::{Email, Sms};

        let mut report = DeliveryReport::default();

        let email_request = NotificationRequest {
            delivery_id: delivery.id,
            recipient: customer.email.clone(),
            subject: message.subject.clone(),
            body: message.body.clone(),
        };
        let sms_request = customer.phone.as_ref().map(|phone| NotificationRequest {
            delivery_id: delivery.id,
            recipient: phone.clone(),
            subject: message.subject.clone(),
            body: message.body.clone(),
        });

        let wants_email = threshold.channels.contains(&Email);
        let wants_sms = threshold.channels.contains(&Sms);

        if wants_sms && sms_request.is_none() {
            let row = Notification::skipped(
                delivery.id,
                Sms,
                "",
                &message.body,
                "no phone number on file",
                delay_minutes,
                now,
            );
            self.repo.create_notification(row).await?;
            report.skipped += 1;
        }

        let sms_active = if wants_sms { sms_request } else { None };
        match (wants_email, sms_active) {
            (true, Some(sms_request)) => {
                let (email_result, sms_result) =
                    self.notifier.send_both(&email_request, &sms_request).await;
                self.record_channel(
                    &mut report,
                    delivery,
                    Email,
                    &email_request,
                    message,
                    delay_minutes,
                    now,
                    email_result,
                )
                .await?;
                self.record_channel(
                    &mut report,
                    delivery,
                    Sms,
                    &sms_request,
                    message,
                    delay_minutes,
                    now,
                    sms_result,
                )
                .await?;
            }
            (true, None) => {
                let result = self.notifier.send_email(&email_request).await;
                self.record_channel(
                    &mut report,
                    delivery,
                    Email,
                    &email_request,
                    message,
                    delay_minutes,
                    now,
                    result,
                )
                .await?;
            }
            (false, Some(sms_request)) => {
                let result = self.notifier.send_sms(&sms_request).await;
                self.record_channel(
                    &mut report,
                    delivery,
                    Sms,
                    &sms_request,
                    message,
                    delay_minutes,
                    now,
                    result,
                )
                .await?;
            }
            (false, None) => {}
        }

        if report.sent > 0 {
            self.mark_delayed(delivery, now).await?;
        }

        Ok(report)
    }

    #[allow(clippy::too_many_arguments)]
    async fn record_channel(
        &self,
        report: &mut DeliveryReport,
        delivery: &Delivery,
        channel: freightwatch_core::NotificationChannel,
        request: &NotificationRequest,
        message: &GeneratedMessage,
        delay_minutes: u32,
        now: DateTime<Utc>,
        result: Result<freightwatch_notify::ChannelReceipt, NotifyError>,
    ) -> Result<(), WorkflowError> {
        let row = match result {
            Ok(receipt) => {
                report.sent += 1;
                Notification::sent(
                    delivery.id,
                    channel,
                    &request.recipient,
                    &message.body,
                    receipt.message_id,
                    delay_minutes,
                    now,
                )
            }
            Err(error) if error.is_skip() => {
                report.skipped += 1;
                Notification::skipped(
                    delivery.id,
                    channel,
                    &request.recipient,
                    &message.body,
                    error.to_string(),
                    delay_minutes,
                    now,
                )
            }
            Err(error) => {
                report.failed += 1;
                report.failures.push(format!("{channel}: {error}"));
                Notification::failed(
                    delivery.id,
                    channel,
                    &request.recipient,
                    &message.body,
                    error.to_string(),
                    delay_minutes,
                    now,
                )
            }
        };
        self.repo.create_notification(row).await?;
        Ok(())
    }

    /// Move the delivery to delayed after the first successful send,
    /// respecting the status machine (already-delayed and terminal
    /// deliveries are left as they are).
    async fn mark_delayed(
        &self,
        delivery: &Delivery,
        now: DateTime<Utc>,
    ) -> Result<(), WorkflowError> {
        match self
            .repo
            .transition_delivery_status(delivery.id, DeliveryStatus::Delayed, now)
            .await
        {
            Ok(_) => {
                info!(delivery_id = %delivery.id, "delivery marked delayed");
                Ok(())
            }
            Err(StoreError::Domain(_)) => {
                debug!(
                    delivery_id = %delivery.id,
                    status = %delivery.status,
                    "delivery not eligible for delayed status, leaving as-is"
                );
                Ok(())
            }
            Err(other) => Err(other.into()),
        }
    }
}

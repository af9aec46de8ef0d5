use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use uuid::Uuid;

use freightwatch_core::WorkflowExecution;
use freightwatch_store::Repository;

use crate::activities::{Activities, DelayDecision};
use crate::error::WorkflowError;

/// Terminal result of one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum PipelineOutcome {
    /// The delay breached the threshold and at least one channel delivered.
    NotificationsSent {
        delay_minutes: u32,
        sent: usize,
        failed: usize,
    },
    /// No notification was needed for this run.
    NotNeeded { reason: String, delay_minutes: u32 },
}

/// Runs the four activity steps strictly in order, recording per-step
/// progress on the execution row after every change so polling callers see
/// it move.
pub struct Pipeline {
    repo: Arc<dyn Repository>,
    activities: Arc<Activities>,
}

impl Pipeline {
    #[must_use]
    pub fn new(repo: Arc<dyn Repository>, activities: Arc<Activities>) -> Self {
        Self { repo, activities }
    }

    #[instrument(skip(self, execution), fields(delivery_id = %delivery_id, run_id = %execution.run_id))]
    pub async fn run(
        &self,
        delivery_id: Uuid,
        now: DateTime<Utc>,
        execution: &mut WorkflowExecution,
    ) -> Result<PipelineOutcome, WorkflowError> {
        let delivery = self
            .repo
            .get_delivery(delivery_id)
            .await?
            .ok_or(WorkflowError::DeliveryNotFound(delivery_id))?;
        let mut route = self
            .repo
            .get_route(delivery.route_id)
            .await?
            .ok_or(WorkflowError::RouteNotFound(delivery.route_id))?;
        let customer = self
            .repo
            .get_customer(delivery.customer_id)
            .await?
            .ok_or(WorkflowError::CustomerNotFound(delivery.customer_id))?;

        // Step 1: traffic check.
        execution.steps.traffic_check.start();
        self.persist(execution).await?;
        let estimate = self.activities.check_traffic(&mut route, now).await?;
        execution.steps.traffic_check.complete();
        self.persist(execution).await?;

        // Step 2: delay evaluation.
        execution.steps.delay_evaluation.start();
        self.persist(execution).await?;
        let decision = self
            .activities
            .evaluate_delay(&delivery, &estimate, now)
            .await?;
        execution.steps.delay_evaluation.complete();
        self.persist(execution).await?;

        let (threshold, delay_minutes) = match decision {
            DelayDecision::Skip {
                reason,
                delay_minutes,
            } => {
                return Ok(PipelineOutcome::NotNeeded {
                    reason: reason.to_string(),
                    delay_minutes,
                });
            }
            DelayDecision::Notify {
                threshold,
                delay_minutes,
            } => (threshold, delay_minutes),
        };

        // Step 3: message generation (never fails; falls back to template).
        execution.steps.message_generation.start();
        self.persist(execution).await?;
        let message = self
            .activities
            .generate_message(&delivery, &route, &estimate)
            .await;
        execution.steps.message_generation.complete();
        self.persist(execution).await?;

        // Step 4: notification delivery.
        execution.steps.notification_delivery.start();
        self.persist(execution).await?;
        let report = self
            .activities
            .deliver_notifications(&delivery, &customer, &threshold, &message, delay_minutes, now)
            .await?;
        execution.steps.notification_delivery.complete();
        self.persist(execution).await?;

        if report.sent == 0 {
            let detail = if report.failures.is_empty() {
                "no channel delivered".to_owned()
            } else {
                report.failures.join("; ")
            };
            return Err(WorkflowError::AllChannelsFailed(detail));
        }

        Ok(PipelineOutcome::NotificationsSent {
            delay_minutes,
            sent: report.sent,
            failed: report.failed,
        })
    }

    async fn persist(&self, execution: &WorkflowExecution) -> Result<(), WorkflowError> {
        self.repo
            .update_workflow_execution(execution.clone())
            .await?;
        Ok(())
    }
}

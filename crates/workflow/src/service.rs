use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;

use freightwatch_core::{WorkflowExecution, WorkflowStatus};
use freightwatch_engine::{
    EngineError, RunDescription, RunStatus, StartOptions, WorkflowEngine, WorkflowHandle,
    WorkflowIdReusePolicy,
};
use freightwatch_store::Repository;

use crate::config::WorkflowConfig;
use crate::delay::{DELAY_NOTIFICATION_KIND, WorkflowInput};
use crate::error::WorkflowError;
use crate::recurring::RECURRING_CHECK_KIND;

/// The two workflow kinds keyed per delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowKind {
    DelayNotification,
    RecurringCheck,
}

impl WorkflowKind {
    /// Kind string registered on the engine.
    #[must_use]
    pub fn engine_kind(self) -> &'static str {
        match self {
            Self::DelayNotification => DELAY_NOTIFICATION_KIND,
            Self::RecurringCheck => RECURRING_CHECK_KIND,
        }
    }

    /// Stable workflow id for a delivery.
    #[must_use]
    pub fn workflow_id(self, delivery_id: Uuid) -> String {
        match self {
            Self::DelayNotification => format!("delay-notification-{delivery_id}"),
            Self::RecurringCheck => format!("recurring-check-{delivery_id}"),
        }
    }
}

/// Where a status report came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusSource {
    /// The engine still knows the run.
    Engine,
    /// The engine forgot the run; this is the persisted execution row.
    Store,
}

/// Workflow status as reported to callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowStatusReport {
    pub workflow_id: String,
    pub run_id: String,
    pub status: WorkflowStatus,
    pub source: StatusSource,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

impl WorkflowStatusReport {
    fn from_engine(description: RunDescription) -> Self {
        Self {
            workflow_id: description.workflow_id,
            run_id: description.run_id,
            status: map_run_status(description.status),
            source: StatusSource::Engine,
            started_at: description.start_time,
            completed_at: description.close_time,
            error: description.error,
        }
    }

    fn from_store(execution: WorkflowExecution) -> Self {
        Self {
            workflow_id: execution.workflow_id,
            run_id: execution.run_id,
            status: execution.status,
            source: StatusSource::Store,
            started_at: execution.started_at,
            completed_at: execution.completed_at,
            error: execution.error,
        }
    }
}

fn map_run_status(status: RunStatus) -> WorkflowStatus {
    match status {
        RunStatus::Running => WorkflowStatus::Running,
        RunStatus::Completed => WorkflowStatus::Completed,
        RunStatus::Failed => WorkflowStatus::Failed,
        RunStatus::Cancelled => WorkflowStatus::Cancelled,
        RunStatus::TimedOut => WorkflowStatus::TimedOut,
    }
}

/// Owns workflow-id derivation, idempotent starts, cancellation, and the
/// status fallback to persisted execution rows.
pub struct WorkflowService {
    engine: Arc<dyn WorkflowEngine>,
    repo: Arc<dyn Repository>,
    config: WorkflowConfig,
}

impl WorkflowService {
    #[must_use]
    pub fn new(
        engine: Arc<dyn WorkflowEngine>,
        repo: Arc<dyn Repository>,
        config: WorkflowConfig,
    ) -> Self {
        Self {
            engine,
            repo,
            config,
        }
    }

    /// Start the appropriate workflow for a delivery, dispatching one-shot
    /// or recurring based on `enable_recurring_checks`. Idempotent:
    /// concurrent duplicate calls return the current handle.
    #[instrument(skip(self), fields(delivery_id = %delivery_id))]
    pub async fn start_for_delivery(
        &self,
        delivery_id: Uuid,
    ) -> Result<WorkflowHandle, WorkflowError> {
        let delivery = self
            .repo
            .get_delivery(delivery_id)
            .await?
            .ok_or(WorkflowError::DeliveryNotFound(delivery_id))?;
        self.repo
            .get_route(delivery.route_id)
            .await?
            .ok_or(WorkflowError::RouteNotFound(delivery.route_id))?;
        self.repo
            .get_customer(delivery.customer_id)
            .await?
            .ok_or(WorkflowError::CustomerNotFound(delivery.customer_id))?;

        let kind = if delivery.enable_recurring_checks {
            WorkflowKind::RecurringCheck
        } else {
            WorkflowKind::DelayNotification
        };
        let workflow_id = kind.workflow_id(delivery_id);
        let input = serde_json::to_value(WorkflowInput { delivery_id })
            .map_err(|e| WorkflowError::InvalidInput(e.to_string()))?;
        let options = StartOptions::new(self.config.task_queue.clone())
            .with_reuse_policy(WorkflowIdReusePolicy::AllowDuplicate);

        let handle = self
            .engine
            .start_workflow(kind.engine_kind(), &workflow_id, input, options)
            .await?;
        info!(
            workflow_id = %handle.workflow_id,
            run_id = %handle.run_id,
            kind = kind.engine_kind(),
            "workflow started"
        );
        Ok(handle)
    }

    /// Engine status if the run is still known, else the last persisted
    /// execution row.
    pub async fn status(&self, workflow_id: &str) -> Result<WorkflowStatusReport, WorkflowError> {
        match self.engine.describe(workflow_id).await {
            Ok(description) => Ok(WorkflowStatusReport::from_engine(description)),
            Err(EngineError::NotFound(_)) => {
                let execution = self
                    .repo
                    .latest_execution_by_workflow_id(workflow_id)
                    .await?
                    .ok_or_else(|| WorkflowError::NotFound(workflow_id.to_owned()))?;
                Ok(WorkflowStatusReport::from_store(execution))
            }
            Err(error) => Err(error.into()),
        }
    }

    /// Cancel a workflow. Non-force requests a graceful stop at the next
    /// suspension point; force terminates the run immediately and records
    /// cause `"force"` on the execution row.
    #[instrument(skip(self))]
    pub async fn cancel(&self, workflow_id: &str, force: bool) -> Result<(), WorkflowError> {
        if force {
            self.engine.terminate(workflow_id, "force").await?;
            if let Some(mut execution) = self
                .repo
                .latest_execution_by_workflow_id(workflow_id)
                .await?
            {
                if execution.status == WorkflowStatus::Running {
                    execution.cancel("force", Utc::now());
                    self.repo.update_workflow_execution(execution).await?;
                }
            }
        } else {
            self.engine.cancel(workflow_id).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn workflow_ids_are_stable_per_kind() {
        let delivery_id = Uuid::nil();
        assert_eq!(
            WorkflowKind::DelayNotification.workflow_id(delivery_id),
            format!("delay-notification-{delivery_id}")
        );
        assert_eq!(
            WorkflowKind::RecurringCheck.workflow_id(delivery_id),
            format!("recurring-check-{delivery_id}")
        );
    }

    #[test]
    fn run_status_maps_one_to_one() {
        assert_eq!(map_run_status(RunStatus::Running), WorkflowStatus::Running);
        assert_eq!(
            map_run_status(RunStatus::Cancelled),
            WorkflowStatus::Cancelled
        );
        assert_eq!(map_run_status(RunStatus::TimedOut), WorkflowStatus::TimedOut);
    }
}

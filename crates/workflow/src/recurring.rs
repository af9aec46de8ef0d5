use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tracing::{info, warn};

use freightwatch_core::WorkflowExecution;
use freightwatch_engine::{SleepOutcome, Workflow, WorkflowContext, WorkflowRunError};
use freightwatch_store::Repository;

use crate::config::WorkflowConfig;
use crate::delay::WorkflowInput;
use crate::pipeline::Pipeline;

/// Engine kind for the long-lived recurring traffic-check workflow.
pub const RECURRING_CHECK_KIND: &str = "recurring-check";

/// Long-lived workflow: run the pipeline on a fixed interval until a check
/// cap, the delivery cutoff window, cancellation, or repeated failures end
/// it. `checks_performed` and `updated_at` are persisted after every check.
pub struct RecurringTrafficCheckWorkflow {
    repo: Arc<dyn Repository>,
    pipeline: Arc<Pipeline>,
    config: WorkflowConfig,
}

impl RecurringTrafficCheckWorkflow {
    #[must_use]
    pub fn new(repo: Arc<dyn Repository>, pipeline: Arc<Pipeline>, config: WorkflowConfig) -> Self {
        Self {
            repo,
            pipeline,
            config,
        }
    }
}

#[async_trait]
impl Workflow for RecurringTrafficCheckWorkflow {
    fn kind(&self) -> &str {
        RECURRING_CHECK_KIND
    }

    #[allow(clippy::too_many_lines)]
    async fn run(
        &self,
        ctx: WorkflowContext,
        input: serde_json::Value,
    ) -> Result<serde_json::Value, WorkflowRunError> {
        let input: WorkflowInput = serde_json::from_value(input)
            .map_err(|e| WorkflowRunError::Failed(format!("invalid input: {e}")))?;

        let mut delivery = match self.repo.get_delivery(input.delivery_id).await {
            Ok(Some(delivery)) => delivery,
            Ok(None) => {
                return Err(WorkflowRunError::Failed(format!(
                    "delivery not found: {}",
                    input.delivery_id
                )));
            }
            Err(error) => return Err(WorkflowRunError::Failed(error.to_string())),
        };

        let interval = Duration::from_secs(u64::from(delivery.check_interval_minutes) * 60);
        let cutoff = self.config.cutoff();
        let failure_budget = self.config.activity.max_attempts;

        let mut execution = WorkflowExecution::begin(
            ctx.workflow_id(),
            ctx.run_id(),
            input.delivery_id,
            ctx.now(),
        );
        if let Err(error) = self.repo.create_workflow_execution(execution.clone()).await {
            return Err(WorkflowRunError::Failed(format!(
                "failed to record execution: {error}"
            )));
        }

        let mut consecutive_failures: u32 = 0;
        let exit_reason: &str;

        loop {
            if ctx.is_cancelled() {
                execution.cancel("cancelled", ctx.now());
                let _ = self.repo.update_workflow_execution(execution).await;
                return Err(WorkflowRunError::Cancelled);
            }

            if let Some(max) = delivery.effective_max_checks() {
                if delivery.checks_performed >= max {
                    info!(
                        delivery_id = %delivery.id,
                        checks_performed = delivery.checks_performed,
                        "check cap reached, completing"
                    );
                    exit_reason = "max_checks_reached";
                    break;
                }
            }

            if delivery.scheduled_delivery - ctx.now() <= cutoff {
                info!(
                    delivery_id = %delivery.id,
                    "inside the delivery cutoff window, completing"
                );
                exit_reason = "cutoff_reached";
                break;
            }

            match self
                .pipeline
                .run(delivery.id, ctx.now(), &mut execution)
                .await
            {
                Ok(outcome) => {
                    consecutive_failures = 0;
                    ctx.set_query_state(
                        "last_outcome",
                        serde_json::to_value(&outcome).unwrap_or(serde_json::Value::Null),
                    );
                }
                Err(error) => {
                    consecutive_failures += 1;
                    warn!(
                        delivery_id = %delivery.id,
                        consecutive_failures,
                        error = %error,
                        "pipeline failed, will retry on the next tick"
                    );
                    if consecutive_failures > failure_budget {
                        execution.fail(
                            format!("{consecutive_failures} consecutive failures: {error}"),
                            ctx.now(),
                        );
                        let _ = self.repo.update_workflow_execution(execution).await;
                        return Err(WorkflowRunError::Failed(error.to_string()));
                    }
                }
            }

            delivery = match self
                .repo
                .increment_delivery_checks(delivery.id, ctx.now())
                .await
            {
                Ok(delivery) => delivery,
                Err(error) => {
                    execution.fail(error.to_string(), ctx.now());
                    let _ = self.repo.update_workflow_execution(execution).await;
                    return Err(WorkflowRunError::Failed(error.to_string()));
                }
            };
            ctx.set_query_state("checks_performed", json!(delivery.checks_performed));

            if ctx.sleep(interval).await == SleepOutcome::Cancelled {
                execution.cancel("cancelled", ctx.now());
                let _ = self.repo.update_workflow_execution(execution).await;
                return Err(WorkflowRunError::Cancelled);
            }
        }

        execution.complete(ctx.now());
        if let Err(error) = self.repo.update_workflow_execution(execution).await {
            return Err(WorkflowRunError::Failed(format!(
                "failed to close execution: {error}"
            )));
        }
        Ok(json!({
            "reason": exit_reason,
            "checks_performed": delivery.checks_performed,
        }))
    }
}

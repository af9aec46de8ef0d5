use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use freightwatch_core::WorkflowExecution;
use freightwatch_engine::{Workflow, WorkflowContext, WorkflowRunError};
use freightwatch_store::Repository;

use crate::pipeline::Pipeline;

/// Engine kind for the one-shot delay-notification workflow.
pub const DELAY_NOTIFICATION_KIND: &str = "delay-notification";

/// Input for both workflow kinds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowInput {
    pub delivery_id: Uuid,
}

/// One-shot workflow: run the pipeline once, record the execution row,
/// complete.
pub struct DelayNotificationWorkflow {
    repo: Arc<dyn Repository>,
    pipeline: Arc<Pipeline>,
}

impl DelayNotificationWorkflow {
    #[must_use]
    pub fn new(repo: Arc<dyn Repository>, pipeline: Arc<Pipeline>) -> Self {
        Self { repo, pipeline }
    }
}

#[async_trait]
impl Workflow for DelayNotificationWorkflow {
    fn kind(&self) -> &str {
        DELAY_NOTIFICATION_KIND
    }

    async fn run(
        &self,
        ctx: WorkflowContext,
        input: serde_json::Value,
    ) -> Result<serde_json::Value, WorkflowRunError> {
        let input: WorkflowInput = serde_json::from_value(input)
            .map_err(|e| WorkflowRunError::Failed(format!("invalid input: {e}")))?;

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

        if ctx.is_cancelled() {
            execution.cancel("cancelled", ctx.now());
            let _ = self.repo.update_workflow_execution(execution).await;
            return Err(WorkflowRunError::Cancelled);
        }

        match self
            .pipeline
            .run(input.delivery_id, ctx.now(), &mut execution)
            .await
        {
            Ok(outcome) => {
                execution.complete(ctx.now());
                if let Err(error) = self.repo.update_workflow_execution(execution).await {
                    return Err(WorkflowRunError::Failed(format!(
                        "failed to close execution: {error}"
                    )));
                }
                let value = serde_json::to_value(&outcome).unwrap_or(serde_json::Value::Null);
                ctx.set_query_state("outcome", value.clone());
                Ok(value)
            }
            Err(error) => {
                warn!(
                    delivery_id = %input.delivery_id,
                    error = %error,
                    "delay-notification pipeline failed"
                );
                execution.fail(error.to_string(), ctx.now());
                let _ = self.repo.update_workflow_execution(execution).await;
                Err(WorkflowRunError::Failed(error.to_string()))
            }
        }
    }
}

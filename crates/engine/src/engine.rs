use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::workflow::{RunDescription, WorkflowHandle};

/// Policy applied when a workflow id already has runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowIdReusePolicy {
    /// A new run may start as long as no run with this id is currently
    /// running; a start against a running id returns the existing handle.
    #[default]
    AllowDuplicate,
    /// A start against an id with any prior run is rejected.
    RejectDuplicate,
}

/// Options for starting a workflow.
#[derive(Debug, Clone)]
pub struct StartOptions {
    /// Task queue the run is dispatched on.
    pub task_queue: String,
    pub reuse_policy: WorkflowIdReusePolicy,
}

impl StartOptions {
    #[must_use]
    pub fn new(task_queue: impl Into<String>) -> Self {
        Self {
            task_queue: task_queue.into(),
            reuse_policy: WorkflowIdReusePolicy::default(),
        }
    }

    #[must_use]
    pub fn with_reuse_policy(mut self, policy: WorkflowIdReusePolicy) -> Self {
        self.reuse_policy = policy;
        self
    }
}

/// The durable-execution engine contract.
///
/// The rest of the system only talks to this trait; [`LocalEngine`]
/// (crate::LocalEngine) is the in-process implementation.
#[async_trait]
pub trait WorkflowEngine: Send + Sync {
    /// Start a run of the registered `kind` under `workflow_id`.
    ///
    /// With the allow-duplicate policy, a start against a currently running
    /// id is idempotent and returns the existing handle.
    async fn start_workflow(
        &self,
        kind: &str,
        workflow_id: &str,
        input: serde_json::Value,
        options: StartOptions,
    ) -> Result<WorkflowHandle, EngineError>;

    /// Handle for the current (latest) run of `workflow_id`, if the engine
    /// still knows it.
    async fn get_handle(&self, workflow_id: &str) -> Option<WorkflowHandle>;

    /// Describe the current run.
    async fn describe(&self, workflow_id: &str) -> Result<RunDescription, EngineError>;

    /// Read a named query value published by the workflow body.
    async fn query(&self, workflow_id: &str, name: &str)
    -> Result<serde_json::Value, EngineError>;

    /// Request graceful cancellation; the body observes the signal at its
    /// next suspension point and exits with status cancelled.
    async fn cancel(&self, workflow_id: &str) -> Result<(), EngineError>;

    /// Terminate the run immediately, recording `reason` as the cause.
    async fn terminate(&self, workflow_id: &str, reason: &str) -> Result<(), EngineError>;
}

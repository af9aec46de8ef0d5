use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::clock::{Clock, Timer};

/// Status of an engine run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
    Cancelled,
    TimedOut,
}

impl RunStatus {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Running)
    }
}

/// Handle to a workflow run: the stable workflow id plus the engine-assigned
/// run id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowHandle {
    pub workflow_id: String,
    pub run_id: String,
}

/// Engine-side description of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunDescription {
    pub workflow_id: String,
    pub run_id: String,
    /// The registered workflow kind that produced this run.
    pub kind: String,
    pub status: RunStatus,
    pub start_time: DateTime<Utc>,
    pub close_time: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

/// Result of a context sleep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SleepOutcome {
    /// The timer elapsed.
    Elapsed,
    /// A cancellation signal arrived while sleeping.
    Cancelled,
}

/// Error returned by a workflow body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowRunError {
    /// The body observed the cancellation signal and exited cleanly.
    Cancelled,
    /// The body failed; the message is recorded on the run.
    Failed(String),
}

/// A registered workflow definition.
///
/// Bodies must be free of direct side effects: no wall-clock reads (use
/// [`WorkflowContext::now`]), no raw sleeps (use [`WorkflowContext::sleep`]),
/// no id generation outside activities.
#[async_trait]
pub trait Workflow: Send + Sync {
    /// Registered kind, e.g. `"delay-notification"`.
    fn kind(&self) -> &str;

    /// Execute one run to a terminal result.
    async fn run(
        &self,
        ctx: WorkflowContext,
        input: serde_json::Value,
    ) -> Result<serde_json::Value, WorkflowRunError>;
}

/// Per-run context handed to a workflow body.
#[derive(Clone)]
pub struct WorkflowContext {
    workflow_id: String,
    run_id: String,
    clock: Arc<dyn Clock>,
    timer: Arc<dyn Timer>,
    cancel: CancellationToken,
    query_state: Arc<DashMap<String, serde_json::Value>>,
}

impl WorkflowContext {
    pub(crate) fn new(
        workflow_id: impl Into<String>,
        run_id: impl Into<String>,
        clock: Arc<dyn Clock>,
        timer: Arc<dyn Timer>,
        cancel: CancellationToken,
        query_state: Arc<DashMap<String, serde_json::Value>>,
    ) -> Self {
        Self {
            workflow_id: workflow_id.into(),
            run_id: run_id.into(),
            clock,
            timer,
            cancel,
            query_state,
        }
    }

    #[must_use]
    pub fn workflow_id(&self) -> &str {
        &self.workflow_id
    }

    #[must_use]
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Engine-owned current time.
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Whether a cancellation signal has been received.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Suspend for `duration`, waking early on cancellation.
    pub async fn sleep(&self, duration: Duration) -> SleepOutcome {
        tokio::select! {
            biased;
            () = self.cancel.cancelled() => SleepOutcome::Cancelled,
            () = self.timer.sleep(duration) => SleepOutcome::Elapsed,
        }
    }

    /// Publish a named value readable through the engine's `query`.
    pub fn set_query_state(&self, name: impl Into<String>, value: serde_json::Value) {
        self.query_state.insert(name.into(), value);
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Status of a workflow run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    Running,
    Completed,
    Failed,
    Cancelled,
    TimedOut,
}

impl WorkflowStatus {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Running)
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
            Self::TimedOut => "timed_out",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            "cancelled" => Some(Self::Cancelled),
            "timed_out" => Some(Self::TimedOut),
            _ => None,
        }
    }
}

/// Progress flags for one pipeline step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepState {
    pub started: bool,
    pub completed: bool,
}

impl StepState {
    pub fn start(&mut self) {
        self.started = true;
    }

    pub fn complete(&mut self) {
        self.started = true;
        self.completed = true;
    }
}

/// Per-step progress of the delay-notification pipeline, recorded on the
/// execution row so polling callers can show progress.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionSteps {
    #[serde(default)]
    pub traffic_check: StepState,
    #[serde(default)]
    pub delay_evaluation: StepState,
    #[serde(default)]
    pub message_generation: StepState,
    #[serde(default)]
    pub notification_delivery: StepState,
}

/// A persisted record of one workflow run.
///
/// Unique key: (`workflow_id`, `run_id`). Kept after the engine forgets the
/// run so terminal workflows remain queryable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowExecution {
    pub id: Uuid,
    /// Stable id derived from (kind, delivery): e.g.
    /// `delay-notification-{delivery_id}`.
    pub workflow_id: String,
    /// Engine-assigned id, unique per run.
    pub run_id: String,
    pub delivery_id: Uuid,
    pub status: WorkflowStatus,
    pub steps: ExecutionSteps,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub error: Option<String>,
}

impl WorkflowExecution {
    /// Create a running execution record.
    #[must_use]
    pub fn begin(
        workflow_id: impl Into<String>,
        run_id: impl Into<String>,
        delivery_id: Uuid,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            workflow_id: workflow_id.into(),
            run_id: run_id.into(),
            delivery_id,
            status: WorkflowStatus::Running,
            steps: ExecutionSteps::default(),
            started_at,
            completed_at: None,
            error: None,
        }
    }

    /// Close the record as completed.
    pub fn complete(&mut self, at: DateTime<Utc>) {
        self.status = WorkflowStatus::Completed;
        self.completed_at = Some(at);
    }

    /// Close the record as failed with an error message.
    pub fn fail(&mut self, error: impl Into<String>, at: DateTime<Utc>) {
        self.status = WorkflowStatus::Failed;
        self.error = Some(error.into());
        self.completed_at = Some(at);
    }

    /// Close the record as cancelled, recording the cause (e.g. `"force"`).
    pub fn cancel(&mut self, cause: impl Into<String>, at: DateTime<Utc>) {
        self.status = WorkflowStatus::Cancelled;
        self.error = Some(cause.into());
        self.completed_at = Some(at);
    }
}

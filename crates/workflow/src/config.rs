use std::time::Duration;

use crate::retry::RetryStrategy;

/// Per-activity execution limits.
#[derive(Debug, Clone)]
pub struct ActivityConfig {
    /// Wall-clock budget for one adapter call.
    pub timeout: Duration,
    /// Maximum attempts per adapter before falling through the chain.
    pub max_attempts: u32,
    /// Delay strategy between retry attempts.
    pub retry: RetryStrategy,
}

impl Default for ActivityConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_attempts: 3,
            retry: RetryStrategy::default(),
        }
    }
}

/// Workflow-layer configuration.
#[derive(Debug, Clone)]
pub struct WorkflowConfig {
    /// Stop recurring checks when the scheduled delivery is closer than
    /// this many hours.
    pub cutoff_hours: f64,
    /// Compile-time fallback threshold when neither the delivery nor the
    /// stored defaults provide one.
    pub default_threshold_minutes: u32,
    /// Task queue runs are dispatched on.
    pub task_queue: String,
    pub activity: ActivityConfig,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            cutoff_hours: 1.0,
            default_threshold_minutes: 30,
            task_queue: "freight-delay-queue".to_owned(),
            activity: ActivityConfig::default(),
        }
    }
}

impl WorkflowConfig {
    /// The cutoff window as a chrono duration.
    #[must_use]
    pub fn cutoff(&self) -> chrono::Duration {
        chrono::Duration::seconds((self.cutoff_hours * 3600.0).round() as i64)
    }
}

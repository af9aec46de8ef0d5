//! The delay-notification workflow layer.
//!
//! [`Activities`] are the side-effectful units (traffic fetch, threshold
//! evaluation, message generation, notification delivery) invoked from
//! workflow bodies. [`Pipeline`] runs them strictly in order, recording
//! per-step progress on the execution row. Two workflow kinds are
//! registered on the engine: the one-shot [`DelayNotificationWorkflow`]
//! and the long-lived [`RecurringTrafficCheckWorkflow`]. The
//! [`WorkflowService`] owns workflow-id derivation, idempotent starts,
//! cancel/force-cancel, and the status fallback to persisted execution
//! rows.

pub mod activities;
pub mod config;
pub mod delay;
pub mod error;
pub mod pipeline;
pub mod recurring;
pub mod retry;
pub mod service;
pub mod threshold;

pub use activities::{Activities, DelayDecision, DeliveryReport, SkipReason};
pub use config::{ActivityConfig, WorkflowConfig};
pub use delay::{DELAY_NOTIFICATION_KIND, DelayNotificationWorkflow, WorkflowInput};
pub use error::WorkflowError;
pub use pipeline::{Pipeline, PipelineOutcome};
pub use recurring::{RECURRING_CHECK_KIND, RecurringTrafficCheckWorkflow};
pub use retry::RetryStrategy;
pub use service::{StatusSource, WorkflowKind, WorkflowService, WorkflowStatusReport};
pub use threshold::{ResolvedThreshold, ThresholdResolver, ThresholdSource};

//! Durable-execution engine contract and in-process implementation.
//!
//! [`WorkflowEngine`] is the collaborator seam: start/cancel/terminate/
//! describe/query against stable workflow ids. Workflow bodies receive a
//! [`WorkflowContext`] that owns time and timers, so they never read the
//! wall clock or sleep directly; all side effects happen in activities
//! invoked from the body. [`LocalEngine`] is the tokio implementation used
//! by the server binary and tests: it tracks one run entry per workflow id,
//! enforces the allow-duplicate-only-if-not-running reuse rule, and
//! force-terminates runs by aborting their task.

pub mod clock;
pub mod engine;
pub mod error;
pub mod local;
pub mod workflow;

pub use clock::{Clock, InstantTimer, ManualClock, SystemClock, Timer, TokioTimer};
pub use engine::{StartOptions, WorkflowEngine, WorkflowIdReusePolicy};
pub use error::EngineError;
pub use local::{LocalEngine, LocalEngineBuilder};
pub use workflow::{
    RunDescription, RunStatus, SleepOutcome, Workflow, WorkflowContext, WorkflowHandle,
    WorkflowRunError,
};

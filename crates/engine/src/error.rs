use thiserror::Error;

/// Errors from engine operations.
#[derive(Debug, Clone, Error)]
pub enum EngineError {
    /// No workflow is registered under the requested kind.
    #[error("unknown workflow kind: {0}")]
    UnknownWorkflowKind(String),

    /// A start was rejected by the reject-duplicate reuse policy.
    #[error("workflow id already used: {workflow_id} (run {run_id})")]
    DuplicateWorkflow { workflow_id: String, run_id: String },

    /// The engine has no run under the requested workflow id.
    #[error("workflow not found: {0}")]
    NotFound(String),

    /// The requested query name was never published by the body.
    #[error("unknown query: {0}")]
    UnknownQuery(String),

    /// An internal engine failure.
    #[error("engine error: {0}")]
    Internal(String),
}

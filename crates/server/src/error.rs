use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use freightwatch_store::StoreError;
use freightwatch_sweep::SweepError;
use freightwatch_workflow::WorkflowError;

/// API error taxonomy; each kind maps to one HTTP status.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Caller input violates the schema (400).
    #[error("validation error: {0}")]
    Validation(String),

    /// Entity missing (404).
    #[error("not found: {0}")]
    NotFound(String),

    /// Missing or mismatched credentials (401).
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Domain-rule violation (409).
    #[error("conflict: {0}")]
    Domain(String),

    /// Adapter, repository, or engine failure (500).
    #[error("internal error: {0}")]
    Infrastructure(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            Self::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            Self::Domain(msg) => (StatusCode::CONFLICT, msg.clone()),
            Self::Infrastructure(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(msg) => Self::NotFound(msg),
            StoreError::Domain(domain) => Self::Domain(domain.to_string()),
            StoreError::Conflict(msg) => Self::Domain(msg),
            other => Self::Infrastructure(other.to_string()),
        }
    }
}

impl From<WorkflowError> for ApiError {
    fn from(err: WorkflowError) -> Self {
        match err {
            WorkflowError::DeliveryNotFound(_)
            | WorkflowError::RouteNotFound(_)
            | WorkflowError::CustomerNotFound(_)
            | WorkflowError::NotFound(_) => Self::NotFound(err.to_string()),
            WorkflowError::InvalidInput(msg) => Self::Validation(msg),
            WorkflowError::Store(store) => Self::from(store),
            WorkflowError::Engine(engine) => match engine {
                freightwatch_engine::EngineError::NotFound(id) => {
                    Self::NotFound(format!("workflow not found: {id}"))
                }
                other => Self::Infrastructure(other.to_string()),
            },
            other => Self::Infrastructure(other.to_string()),
        }
    }
}

impl From<SweepError> for ApiError {
    fn from(err: SweepError) -> Self {
        Self::Infrastructure(err.to_string())
    }
}

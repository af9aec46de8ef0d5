use axum::Json;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use freightwatch_workflow::WorkflowStatusReport;

use super::AppState;
use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct StartRequest {
    pub delivery_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct StartResponse {
    pub workflow_id: String,
    pub run_id: String,
}

/// `POST /api/workflows` -- start the appropriate workflow for a delivery.
///
/// Dispatches one-shot or recurring based on the delivery's
/// `enable_recurring_checks`; idempotent under concurrent duplicates.
pub async fn start(
    State(state): State<AppState>,
    Json(request): Json<StartRequest>,
) -> Result<Json<StartResponse>, ApiError> {
    let handle = state
        .workflows
        .start_for_delivery(request.delivery_id)
        .await?;
    Ok(Json(StartResponse {
        workflow_id: handle.workflow_id,
        run_id: handle.run_id,
    }))
}

#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    pub workflow_id: String,
}

/// `GET /api/workflows?workflow_id=…` -- engine status, falling back to the
/// last persisted execution row for runs the engine no longer knows.
pub async fn status(
    State(state): State<AppState>,
    Query(query): Query<StatusQuery>,
) -> Result<Json<WorkflowStatusReport>, ApiError> {
    if query.workflow_id.is_empty() {
        return Err(ApiError::Validation("workflow_id must not be empty".into()));
    }
    let report = state.workflows.status(&query.workflow_id).await?;
    Ok(Json(report))
}

#[derive(Debug, Deserialize)]
pub struct CancelRequest {
    pub workflow_id: String,
    #[serde(default)]
    pub force: bool,
}

/// `POST /api/workflows/cancel` -- request graceful cancellation, or force
/// termination when `force` is set.
pub async fn cancel(
    State(state): State<AppState>,
    Json(request): Json<CancelRequest>,
) -> Result<StatusCode, ApiError> {
    state
        .workflows
        .cancel(&request.workflow_id, request.force)
        .await?;
    Ok(StatusCode::ACCEPTED)
}

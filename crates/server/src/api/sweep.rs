use axum::Json;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use chrono::Utc;
use subtle::ConstantTimeEq;

use freightwatch_sweep::SweepSummary;

use super::AppState;
use crate::error::ApiError;

/// `GET /api/traffic/check-all` -- run the fleet sweep.
///
/// Authenticated with `Authorization: Bearer <CRON_SECRET>`; the secret is
/// compared in constant time. Missing or mismatched credentials answer 401.
pub async fn check_all(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<SweepSummary>, ApiError> {
    authorize(&headers, state.cron_secret.as_deref())?;
    let summary = state.sweep.run(Utc::now()).await?;
    Ok(Json(summary))
}

fn authorize(headers: &HeaderMap, secret: Option<&str>) -> Result<(), ApiError> {
    let Some(secret) = secret else {
        return Err(ApiError::Unauthorized("cron secret not configured".into()));
    };
    let token = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or_else(|| ApiError::Unauthorized("missing bearer token".into()))?;

    let matches: bool = token.as_bytes().ct_eq(secret.as_bytes()).into();
    if matches {
        Ok(())
    } else {
        Err(ApiError::Unauthorized("invalid cron secret".into()))
    }
}

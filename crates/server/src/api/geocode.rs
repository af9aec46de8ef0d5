use axum::Json;
use axum::extract::{Query, State};
use serde::Deserialize;
use tracing::warn;

use freightwatch_core::Coordinates;

use super::AppState;
use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct GeocodeQuery {
    pub address: String,
}

/// `GET /api/geocode?address=…` -- resolve an address through the geocoder
/// chain (used when a delivery is created from bare addresses).
pub async fn geocode(
    State(state): State<AppState>,
    Query(query): Query<GeocodeQuery>,
) -> Result<Json<Coordinates>, ApiError> {
    if query.address.trim().is_empty() {
        return Err(ApiError::Validation("address must not be empty".into()));
    }

    let mut last_error: Option<String> = None;
    for adapter in state.geocoders.iter() {
        if !adapter.is_available().await {
            continue;
        }
        match adapter.geocode(&query.address).await {
            Ok(coords) => return Ok(Json(coords)),
            Err(error) => {
                warn!(adapter = adapter.name(), error = %error, "geocoder failed");
                last_error = Some(format!("{}: {error}", adapter.name()));
            }
        }
    }

    Err(ApiError::Infrastructure(
        last_error.unwrap_or_else(|| "no geocoder available".into()),
    ))
}

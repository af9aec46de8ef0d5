pub mod geocode;
pub mod health;
pub mod sweep;
pub mod workflows;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;

use freightwatch_provider::Geocoder;
use freightwatch_sweep::FleetSweep;
use freightwatch_workflow::WorkflowService;

/// Shared handler state: the two long-lived services plus the cron secret.
#[derive(Clone)]
pub struct AppState {
    pub workflows: Arc<WorkflowService>,
    pub sweep: Arc<FleetSweep>,
    pub geocoders: Arc<Vec<Arc<dyn Geocoder>>>,
    pub cron_secret: Option<String>,
}

/// Build the API router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/api/traffic/check-all", get(sweep::check_all))
        .route("/api/workflows", post(workflows::start).get(workflows::status))
        .route("/api/workflows/cancel", post(workflows::cancel))
        .route("/api/geocode", get(geocode::geocode))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

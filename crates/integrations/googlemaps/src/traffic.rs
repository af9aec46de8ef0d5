use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, instrument, warn};

use freightwatch_core::{Coordinates, TrafficEstimate};
use freightwatch_provider::{ProviderError, TrafficProvider};

use crate::config::GoogleMapsConfig;
use crate::error::GoogleMapsError;

/// Traffic adapter backed by the Google Routes API (`computeRoutes`).
pub struct GoogleTrafficProvider {
    config: GoogleMapsConfig,
    client: Client,
}

#[derive(Debug, Deserialize)]
struct ComputeRoutesResponse {
    #[serde(default)]
    routes: Vec<RouteLeg>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RouteLeg {
    distance_meters: Option<u32>,
    /// Duration in traffic, e.g. `"1234s"`.
    duration: Option<String>,
    /// Free-flow duration, e.g. `"1100s"`.
    static_duration: Option<String>,
}

/// Parse a Routes API duration literal such as `"1234s"`.
fn parse_duration_seconds(raw: &str) -> Result<u32, GoogleMapsError> {
    raw.strip_suffix('s')
        .and_then(|digits| digits.parse::<f64>().ok())
        .map(|seconds| seconds.round() as u32)
        .ok_or_else(|| GoogleMapsError::InvalidResponse(format!("bad duration literal: {raw}")))
}

impl GoogleTrafficProvider {
    /// Create the adapter with a default HTTP client.
    pub fn new(config: GoogleMapsConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| ProviderError::Configuration(e.to_string()))?;
        Ok(Self { config, client })
    }

    /// Create the adapter with a shared HTTP client.
    #[must_use]
    pub fn with_client(config: GoogleMapsConfig, client: Client) -> Self {
        Self { config, client }
    }

    fn routes_url(&self) -> String {
        format!(
            "{}/directions/v2:computeRoutes",
            self.config.routes_base_url
        )
    }

    async fn compute_routes(
        &self,
        origin: &Coordinates,
        destination: &Coordinates,
    ) -> Result<TrafficEstimate, GoogleMapsError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or(GoogleMapsError::MissingApiKey)?;

        let body = json!({
            "origin": { "location": { "latLng": {
                "latitude": origin.lat, "longitude": origin.lng } } },
            "destination": { "location": { "latLng": {
                "latitude": destination.lat, "longitude": destination.lng } } },
            "travelMode": "DRIVE",
            "routingPreference": "TRAFFIC_AWARE",
        });

        debug!(url = %self.routes_url(), "requesting traffic-aware route");

        let response = self
            .client
            .post(self.routes_url())
            .header("X-Goog-Api-Key", api_key)
            .header(
                "X-Goog-FieldMask",
                "routes.duration,routes.staticDuration,routes.distanceMeters",
            )
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            warn!("Routes API rate limit hit");
            return Err(GoogleMapsError::RateLimited);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GoogleMapsError::Api(format!("HTTP {status}: {body}")));
        }

        let parsed: ComputeRoutesResponse = response
            .json()
            .await
            .map_err(|e| GoogleMapsError::InvalidResponse(e.to_string()))?;

        let leg = parsed
            .routes
            .into_iter()
            .next()
            .ok_or_else(|| GoogleMapsError::InvalidResponse("no routes in response".into()))?;

        let distance = leg.distance_meters.unwrap_or(0);
        let duration = leg
            .duration
            .as_deref()
            .ok_or_else(|| GoogleMapsError::InvalidResponse("missing duration".into()))?;
        let static_duration = leg
            .static_duration
            .as_deref()
            .ok_or_else(|| GoogleMapsError::InvalidResponse("missing staticDuration".into()))?;

        let estimated = parse_duration_seconds(duration)?;
        let normal = parse_duration_seconds(static_duration)?;

        Ok(TrafficEstimate::from_durations(
            distance, normal, estimated, "google-maps",
        ))
    }
}

#[async_trait]
impl TrafficProvider for GoogleTrafficProvider {
    fn name(&self) -> &str {
        "google-maps"
    }

    fn priority(&self) -> u16 {
        self.config.priority
    }

    async fn is_available(&self) -> bool {
        self.config.is_configured()
    }

    #[instrument(skip(self, origin, destination), fields(provider = "google-maps"))]
    async fn get_traffic(
        &self,
        origin: &Coordinates,
        destination: &Coordinates,
    ) -> Result<TrafficEstimate, ProviderError> {
        let estimate = self.compute_routes(origin, destination).await?;
        debug!(
            delay_minutes = estimate.delay_minutes,
            condition = %estimate.condition,
            "traffic estimate received"
        );
        Ok(estimate)
    }
}

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, instrument};

use freightwatch_core::Coordinates;
use freightwatch_provider::{Geocoder, ProviderError};

use crate::config::GoogleMapsConfig;
use crate::error::GoogleMapsError;

/// Geocoding adapter backed by the Google Geocoding API.
pub struct GoogleGeocoder {
    config: GoogleMapsConfig,
    client: Client,
}

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    status: String,
    #[serde(default)]
    results: Vec<GeocodeResult>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
    geometry: Geometry,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    location: Location,
}

#[derive(Debug, Deserialize)]
struct Location {
    lat: f64,
    lng: f64,
}

impl GoogleGeocoder {
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

    fn geocode_url(&self) -> String {
        format!("{}/maps/api/geocode/json", self.config.geocode_base_url)
    }

    async fn lookup(&self, address: &str) -> Result<Coordinates, GoogleMapsError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or(GoogleMapsError::MissingApiKey)?;

        debug!(address = %address, "geocoding address");

        let response = self
            .client
            .get(self.geocode_url())
            .query(&[("address", address), ("key", api_key)])
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(GoogleMapsError::RateLimited);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GoogleMapsError::Api(format!("HTTP {status}: {body}")));
        }

        let parsed: GeocodeResponse = response
            .json()
            .await
            .map_err(|e| GoogleMapsError::InvalidResponse(e.to_string()))?;

        if parsed.status != "OK" {
            return Err(GoogleMapsError::Unresolved(format!(
                "{address} ({})",
                parsed.status
            )));
        }

        parsed
            .results
            .into_iter()
            .next()
            .map(|result| Coordinates::new(result.geometry.location.lat, result.geometry.location.lng))
            .ok_or_else(|| GoogleMapsError::Unresolved(address.to_owned()))
    }
}

#[async_trait]
impl Geocoder for GoogleGeocoder {
    fn name(&self) -> &str {
        "google-geocoder"
    }

    fn priority(&self) -> u16 {
        self.config.priority
    }

    async fn is_available(&self) -> bool {
        self.config.is_configured()
    }

    #[instrument(skip(self, address), fields(provider = "google-geocoder"))]
    async fn geocode(&self, address: &str) -> Result<Coordinates, ProviderError> {
        if address.trim().is_empty() {
            return Err(ProviderError::ExecutionFailed(
                "cannot geocode an empty address".into(),
            ));
        }
        Ok(self.lookup(address).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct MockGeocodeServer {
        listener: tokio::net::TcpListener,
        base_url: String,
    }

    impl MockGeocodeServer {
        async fn start() -> Self {
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
                .await
                .expect("failed to bind mock server");
            let port = listener.local_addr().unwrap().port();
            let base_url = format!("http://127.0.0.1:{port}");
            Self { listener, base_url }
        }

        async fn respond_once(self, status_code: u16, body: &str) {
            let body = body.to_owned();
            let (mut stream, _) = self.listener.accept().await.unwrap();

            use tokio::io::{AsyncReadExt, AsyncWriteExt};

            let mut buf = vec![0u8; 8192];
            let _ = stream.read(&mut buf).await.unwrap();

            let response = format!(
                "HTTP/1.1 {status_code} OK\r\n\
                 Content-Type: application/json\r\n\
                 Content-Length: {}\r\n\
                 Connection: close\r\n\
                 \r\n\
                 {body}",
                body.len()
            );
            stream.write_all(response.as_bytes()).await.unwrap();
            stream.shutdown().await.unwrap();
        }
    }

    #[tokio::test]
    async fn geocode_parses_location() {
        let server = MockGeocodeServer::start().await;
        let config = GoogleMapsConfig::new()
            .with_api_key("test-key")
            .with_geocode_base_url(&server.base_url);
        let geocoder = GoogleGeocoder::new(config).unwrap();

        let body = r#"{"status":"OK","results":[{"geometry":{"location":{"lat":40.7357,"lng":-74.1724}}}]}"#;
        let server_handle = tokio::spawn(async move {
            server.respond_once(200, body).await;
        });

        let coords = geocoder.geocode("Newark, NJ").await.unwrap();
        server_handle.await.unwrap();

        assert!((coords.lat - 40.7357).abs() < 1e-9);
        assert!((coords.lng - -74.1724).abs() < 1e-9);
    }

    #[tokio::test]
    async fn zero_results_is_unresolved() {
        let server = MockGeocodeServer::start().await;
        let config = GoogleMapsConfig::new()
            .with_api_key("test-key")
            .with_geocode_base_url(&server.base_url);
        let geocoder = GoogleGeocoder::new(config).unwrap();

        let body = r#"{"status":"ZERO_RESULTS","results":[]}"#;
        let server_handle = tokio::spawn(async move {
            server.respond_once(200, body).await;
        });

        let err = geocoder.geocode("nowhere at all").await.unwrap_err();
        server_handle.await.unwrap();

        assert!(matches!(err, ProviderError::ExecutionFailed(_)));
    }

    #[tokio::test]
    async fn empty_address_fails_fast() {
        let config = GoogleMapsConfig::new().with_api_key("test-key");
        let geocoder = GoogleGeocoder::new(config).unwrap();
        let err = geocoder.geocode("   ").await.unwrap_err();
        assert!(matches!(err, ProviderError::ExecutionFailed(_)));
    }
}

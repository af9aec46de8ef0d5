use freightwatch_provider::ProviderError;
use thiserror::Error;

/// Errors from the Google Maps adapters.
#[derive(Debug, Error)]
pub enum GoogleMapsError {
    /// No API key is configured.
    #[error("no API key configured")]
    MissingApiKey,

    /// The API returned a non-success status or error payload.
    #[error("api error: {0}")]
    Api(String),

    /// The API rejected the request due to rate limiting.
    #[error("rate limited")]
    RateLimited,

    /// The response body could not be interpreted.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// The address could not be resolved to coordinates.
    #[error("address could not be resolved: {0}")]
    Unresolved(String),

    /// A transport-level error occurred.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}

impl From<GoogleMapsError> for ProviderError {
    fn from(err: GoogleMapsError) -> Self {
        match err {
            GoogleMapsError::MissingApiKey => Self::Configuration(err.to_string()),
            GoogleMapsError::RateLimited => Self::RateLimited,
            GoogleMapsError::Http(e) if e.is_timeout() => {
                Self::Timeout(std::time::Duration::from_secs(30))
            }
            GoogleMapsError::Http(e) if e.is_connect() => Self::Connection(e.to_string()),
            GoogleMapsError::InvalidResponse(msg) => Self::Serialization(msg),
            other => Self::ExecutionFailed(other.to_string()),
        }
    }
}

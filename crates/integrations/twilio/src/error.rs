use freightwatch_provider::ProviderError;
use thiserror::Error;

/// Errors from the Twilio adapter.
#[derive(Debug, Error)]
pub enum TwilioError {
    /// Account SID, auth token, or from-number is missing.
    #[error("incomplete configuration: {0}")]
    Configuration(String),

    /// The Twilio API returned an error payload or status.
    #[error("api error: {0}")]
    Api(String),

    /// The API rejected the request due to rate limiting.
    #[error("rate limited")]
    RateLimited,

    /// A transport-level error occurred.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}

impl From<TwilioError> for ProviderError {
    fn from(err: TwilioError) -> Self {
        match err {
            TwilioError::Configuration(msg) => Self::Configuration(msg),
            TwilioError::RateLimited => Self::RateLimited,
            TwilioError::Http(e) if e.is_timeout() => {
                Self::Timeout(std::time::Duration::from_secs(30))
            }
            TwilioError::Http(e) => Self::Connection(e.to_string()),
            TwilioError::Api(msg) => Self::ExecutionFailed(msg),
        }
    }
}

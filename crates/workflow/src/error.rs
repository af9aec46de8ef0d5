use thiserror::Error;
use uuid::Uuid;

use freightwatch_engine::EngineError;
use freightwatch_provider::ProviderError;
use freightwatch_store::StoreError;

/// Errors from the workflow layer.
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("delivery not found: {0}")]
    DeliveryNotFound(Uuid),

    #[error("route not found: {0}")]
    RouteNotFound(Uuid),

    #[error("customer not found: {0}")]
    CustomerNotFound(Uuid),

    /// The route has no resolved coordinates, so no traffic lookup is
    /// possible.
    #[error("route has no coordinates: {0}")]
    MissingCoordinates(Uuid),

    /// Every resolved channel failed to deliver.
    #[error("all notification channels failed: {0}")]
    AllChannelsFailed(String),

    #[error("invalid workflow input: {0}")]
    InvalidInput(String),

    /// Neither the engine nor the store knows this workflow id.
    #[error("workflow not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Engine(#[from] EngineError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transparent_sources_keep_their_message()  {
        let err = WorkflowError::from(ProviderError::RateLimited);
        assert_eq!(err.to_string(), "rate limited");

        let err = WorkflowError::from(StoreError::NotFound("route x".into()));
        assert_eq!(err.to_string(), "not found: route x");
    }
}

use async_trait::async_trait;

use freightwatch_core::{DelayContext, GeneratedMessage};

use crate::error::ProviderError;

/// Capability: generate a personalized delay message for a customer.
///
/// Consumers must never block on this chain: when every generator fails,
/// the pipeline falls back to a deterministic template message.
#[async_trait]
pub trait MessageGenerator: Send + Sync {
    /// Unique name of this adapter.
    fn name(&self) -> &str;

    /// Selection priority; lower values are tried first.
    fn priority(&self) -> u16;

    /// Whether the adapter is configured and ready to serve requests.
    async fn is_available(&self) -> bool;

    /// Generate subject and body text for the given delay context.
    async fn generate(&self, context: &DelayContext) -> Result<GeneratedMessage, ProviderError>;
}

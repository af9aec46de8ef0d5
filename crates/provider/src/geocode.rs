use async_trait::async_trait;

use freightwatch_core::Coordinates;

use crate::error::ProviderError;

/// Capability: resolve a postal address to coordinates.
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Unique name of this adapter.
    fn name(&self) -> &str;

    /// Selection priority; lower values are tried first.
    fn priority(&self) -> u16;

    /// Whether the adapter is configured and ready to serve requests.
    async fn is_available(&self) -> bool;

    /// Resolve `address` to coordinates. Fails if the address is empty or
    /// cannot be resolved.
    async fn geocode(&self, address: &str) -> Result<Coordinates, ProviderError>;
}

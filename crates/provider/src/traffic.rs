use async_trait::async_trait;

use freightwatch_core::{Coordinates, TrafficEstimate};

use crate::error::ProviderError;

/// Capability: live traffic lookup between two coordinates.
///
/// Adapters with unsatisfied configuration must report
/// `is_available() == false` so consumers skip them; runtime failures
/// return an error result rather than panicking.
#[async_trait]
pub trait TrafficProvider: Send + Sync {
    /// Unique name of this adapter (e.g. `"google-maps"`).
    fn name(&self) -> &str;

    /// Selection priority; lower values are tried first.
    fn priority(&self) -> u16;

    /// Whether the adapter is configured and ready to serve requests.
    async fn is_available(&self) -> bool;

    /// Fetch current traffic between `origin` and `destination`.
    async fn get_traffic(
        &self,
        origin: &Coordinates,
        destination: &Coordinates,
    ) -> Result<TrafficEstimate, ProviderError>;
}

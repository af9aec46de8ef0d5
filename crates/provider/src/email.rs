use async_trait::async_trait;
use uuid::Uuid;

use crate::error::{DispatchReceipt, ProviderError};

/// An outbound email to one recipient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailDispatch {
    pub to: String,
    pub subject: String,
    pub body: String,
    /// The delivery this notification belongs to, for correlation in logs
    /// and provider dashboards.
    pub delivery_id: Uuid,
}

/// Capability: dispatch an email notification.
#[async_trait]
pub trait EmailNotifier: Send + Sync {
    /// Unique name of this adapter (e.g. `"sendgrid"`).
    fn name(&self) -> &str;

    /// Selection priority; lower values are tried first.
    fn priority(&self) -> u16;

    /// Whether the adapter is configured and ready to serve requests.
    async fn is_available(&self) -> bool;

    /// Send the email and return the provider's message id.
    async fn send(&self, email: &EmailDispatch) -> Result<DispatchReceipt, ProviderError>;
}

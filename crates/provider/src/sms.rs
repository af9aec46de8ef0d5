use async_trait::async_trait;
use uuid::Uuid;

use crate::error::{DispatchReceipt, ProviderError};

/// Hard cap on outbound SMS length, in characters.
pub const SMS_MAX_CHARS: usize = 160;

/// An outbound SMS to one recipient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmsDispatch {
    /// E.164 destination number.
    pub to: String,
    /// Full message text; adapters truncate via [`truncate_sms`] before
    /// dispatch.
    pub body: String,
    pub delivery_id: Uuid,
}

/// Capability: dispatch an SMS notification.
///
/// Every adapter must apply [`truncate_sms`] so no message exceeds
/// [`SMS_MAX_CHARS`] characters.
#[async_trait]
pub trait SmsNotifier: Send + Sync {
    /// Unique name of this adapter (e.g. `"twilio"`).
    fn name(&self) -> &str;

    /// Selection priority; lower values are tried first.
    fn priority(&self) -> u16;

    /// Whether the adapter is configured and ready to serve requests.
    async fn is_available(&self) -> bool;

    /// Send the SMS and return the provider's message id.
    async fn send(&self, sms: &SmsDispatch) -> Result<DispatchReceipt, ProviderError>;
}

/// Compose the SMS text for a delivery update.
///
/// Keeps a `"Delivery {id} Update: "` prefix followed by the first two
/// non-empty content lines; if the composed text exceeds
/// [`SMS_MAX_CHARS`] characters it is cut at 157 and terminated with `…`.
#[must_use]
pub fn truncate_sms(delivery_id: &str, message: &str) -> String {
    let prefix = format!("Delivery {delivery_id} Update: ");
    let content: Vec<&str> = message
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .take(2)
        .collect();
    let composed = format!("{prefix}{}", content.join("\n"));
    if composed.chars().count() <= SMS_MAX_CHARS {
        return composed;
    }
    let mut cut: String = composed.chars().take(157).collect();
    cut.push('…');
    cut
}

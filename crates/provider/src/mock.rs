//! Always-available mock adapters.
//!
//! One mock per capability, registered at [`MOCK_PRIORITY`](crate::MOCK_PRIORITY)
//! so the system never ends up with an empty fallback chain. A
//! configuration flag can force mocks to be the only adapters (test mode).
//! The `Failing*` variants are test doubles for exercising fallback paths.

use std::sync::Mutex;

use async_trait::async_trait;
use uuid::Uuid;

use freightwatch_core::{Coordinates, DelayContext, GeneratedMessage, TrafficEstimate};

use crate::MOCK_PRIORITY;
use crate::email::{EmailDispatch, EmailNotifier};
use crate::error::{DispatchReceipt, ProviderError};
use crate::geocode::Geocoder;
use crate::message::MessageGenerator;
use crate::sms::{SmsDispatch, SmsNotifier, truncate_sms};
use crate::traffic::TrafficProvider;

/// Mock traffic provider returning a fixed delay.
pub struct MockTrafficProvider {
    delay_minutes: u32,
}

impl MockTrafficProvider {
    /// A mock reporting free-flowing traffic.
    #[must_use]
    pub fn new() -> Self {
        Self { delay_minutes: 0 }
    }

    /// A mock reporting a fixed delay in minutes.
    #[must_use]
    pub fn with_delay(delay_minutes: u32) -> Self {
        Self { delay_minutes }
    }
}

impl Default for MockTrafficProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TrafficProvider for MockTrafficProvider {
    fn name(&self) -> &str {
        "mock-traffic"
    }

    fn priority(&self) -> u16 {
        MOCK_PRIORITY
    }

    async fn is_available(&self) -> bool {
        true
    }

    async fn get_traffic(
        &self,
        _origin: &Coordinates,
        _destination: &Coordinates,
    ) -> Result<TrafficEstimate, ProviderError> {
        let normal = 1_800;
        let estimated = normal + self.delay_minutes * 60;
        Ok(TrafficEstimate::from_durations(
            25_000,
            normal,
            estimated,
            self.name(),
        ))
    }
}

/// Traffic provider that always fails; for fallback tests.
pub struct FailingTrafficProvider {
    priority: u16,
}

impl FailingTrafficProvider {
    #[must_use]
    pub fn new(priority: u16) -> Self {
        Self { priority }
    }
}

#[async_trait]
impl TrafficProvider for FailingTrafficProvider {
    fn name(&self) -> &str {
        "failing-traffic"
    }

    fn priority(&self) -> u16 {
        self.priority
    }

    async fn is_available(&self) -> bool {
        true
    }

    async fn get_traffic(
        &self,
        _origin: &Coordinates,
        _destination: &Coordinates,
    ) -> Result<TrafficEstimate, ProviderError> {
        Err(ProviderError::ExecutionFailed("mock failure".into()))
    }
}

/// Mock geocoder deriving deterministic coordinates from the address text.
pub struct MockGeocoder;

impl MockGeocoder {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Default for MockGeocoder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Geocoder for MockGeocoder {
    fn name(&self) -> &str {
        "mock-geocoder"
    }

    fn priority(&self) -> u16 {
        MOCK_PRIORITY
    }

    async fn is_available(&self) -> bool {
        true
    }

    async fn geocode(&self, address: &str) -> Result<Coordinates, ProviderError> {
        if address.trim().is_empty() {
            return Err(ProviderError::ExecutionFailed(
                "cannot geocode an empty address".into(),
            ));
        }
        // Deterministic pseudo-coordinates so repeated lookups agree.
        let sum: u32 = address.bytes().map(u32::from).sum();
        let lat = f64::from(sum % 180) - 90.0 + 0.5;
        let lng = f64::from(sum % 360) - 180.0 + 0.5;
        Ok(Coordinates::new(lat, lng))
    }
}

/// Mock message generator producing a fixed-template message.
pub struct MockMessageGenerator;

impl MockMessageGenerator {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Default for MockMessageGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessageGenerator for MockMessageGenerator {
    fn name(&self) -> &str {
        "mock-generator"
    }

    fn priority(&self) -> u16 {
        MOCK_PRIORITY
    }

    async fn is_available(&self) -> bool {
        true
    }

    async fn generate(&self, context: &DelayContext) -> Result<GeneratedMessage, ProviderError> {
        Ok(GeneratedMessage {
            subject: format!("Delivery {} delayed", context.tracking_number),
            body: format!(
                "Your delivery {} is running about {} minutes late due to {} traffic.\nNew estimated arrival: {}.",
                context.tracking_number,
                context.delay_minutes,
                context.condition,
                context.eta_display()
            ),
            model_name: "mock".into(),
            token_count: None,
        })
    }
}

/// Message generator that always fails; for fallback tests.
pub struct FailingMessageGenerator {
    priority: u16,
}

impl FailingMessageGenerator {
    #[must_use]
    pub fn new(priority: u16) -> Self {
        Self { priority }
    }
}

#[async_trait]
impl MessageGenerator for FailingMessageGenerator {
    fn name(&self) -> &str {
        "failing-generator"
    }

    fn priority(&self) -> u16 {
        self.priority
    }

    async fn is_available(&self) -> bool {
        true
    }

    async fn generate(&self, _context: &DelayContext) -> Result<GeneratedMessage, ProviderError> {
        Err(ProviderError::ExecutionFailed("mock failure".into()))
    }
}

/// Mock email notifier recording every dispatch.
#[derive(Default)]
pub struct MockEmailNotifier {
    sent: Mutex<Vec<EmailDispatch>>,
}

impl MockEmailNotifier {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Emails recorded so far.
    #[must_use]
    pub fn sent(&self) -> Vec<EmailDispatch> {
        self.sent.lock().expect("mock email lock poisoned").clone()
    }
}

#[async_trait]
impl EmailNotifier for MockEmailNotifier {
    fn name(&self) -> &str {
        "mock-email"
    }

    fn priority(&self) -> u16 {
        MOCK_PRIORITY
    }

    async fn is_available(&self) -> bool {
        true
    }

    async fn send(&self, email: &EmailDispatch) -> Result<DispatchReceipt, ProviderError> {
        self.sent
            .lock()
            .expect("mock email lock poisoned")
            .push(email.clone());
        Ok(DispatchReceipt {
            provider: self.name().to_owned(),
            message_id: format!("mock-email-{}", Uuid::new_v4()),
        })
    }
}

/// Email notifier that always fails; for fallback tests.
pub struct FailingEmailNotifier {
    priority: u16,
}

impl FailingEmailNotifier {
    #[must_use]
    pub fn new(priority: u16) -> Self {
        Self { priority }
    }
}

#[async_trait]
impl EmailNotifier for FailingEmailNotifier {
    fn name(&self) -> &str {
        "failing-email"
    }

    fn priority(&self) -> u16 {
        self.priority
    }

    async fn is_available(&self) -> bool {
        true
    }

    async fn send(&self, _email: &EmailDispatch) -> Result<DispatchReceipt, ProviderError> {
        Err(ProviderError::ExecutionFailed("mock failure".into()))
    }
}

/// Mock SMS notifier recording every dispatch (post-truncation).
#[derive(Default)]
pub struct MockSmsNotifier {
    sent: Mutex<Vec<SmsDispatch>>,
}

impl MockSmsNotifier {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages recorded so far, with the truncation contract applied.
    #[must_use]
    pub fn sent(&self) -> Vec<SmsDispatch> {
        self.sent.lock().expect("mock sms lock poisoned").clone()
    }
}

#[async_trait]
impl SmsNotifier for MockSmsNotifier {
    fn name(&self) -> &str {
        "mock-sms"
    }

    fn priority(&self) -> u16 {
        MOCK_PRIORITY
    }

    async fn is_available(&self) -> bool {
        true
    }

    async fn send(&self, sms: &SmsDispatch) -> Result<DispatchReceipt, ProviderError> {
        let mut recorded = sms.clone();
        recorded.body = truncate_sms(&sms.delivery_id.to_string(), &sms.body);
        self.sent
            .lock()
            .expect("mock sms lock poisoned")
            .push(recorded);
        Ok(DispatchReceipt {
            provider: self.name().to_owned(),
            message_id: format!("mock-sms-{}", Uuid::new_v4()),
        })
    }
}

/// SMS notifier that always fails; for fallback tests.
pub struct FailingSmsNotifier {
    priority: u16,
}

impl FailingSmsNotifier {
    #[must_use]
    pub fn new(priority: u16) -> Self {
        Self { priority }
    }
}

#[async_trait]
impl SmsNotifier for FailingSmsNotifier {
    fn name(&self) -> &str {
        "failing-sms"
    }

    fn priority(&self) -> u16 {
        self.priority
    }

    async fn is_available(&self) -> bool {
        true
    }

    async fn send(&self, _sms: &SmsDispatch) -> Result<DispatchReceipt, ProviderError> {
        Err(ProviderError::ExecutionFailed("mock failure".into()))
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use freightwatch_core::TrafficCondition;

    use super::*;
    use crate::sms::SMS_MAX_CHARS;

    #[tokio::test]
    async fn mock_traffic_reports_configured_delay() {
        let provider = MockTrafficProvider::with_delay(35);
        let origin = Coordinates::new(40.0, -74.0);
        let destination = Coordinates::new(42.0, -71.0);
        let estimate = provider.get_traffic(&origin, &destination).await.unwrap();
        assert_eq!(estimate.delay_minutes, 35);
        assert_eq!(estimate.condition, TrafficCondition::Severe);
    }

    #[tokio::test]
    async fn mock_geocoder_is_deterministic() {
        let geocoder = MockGeocoder::new();
        let a = geocoder.geocode("1 Main St, Springfield").await.unwrap();
        let b = geocoder.geocode("1 Main St, Springfield").await.unwrap();
        assert_eq!(a, b);
        assert!(a.is_valid());
    }

    #[tokio::test]
    async fn mock_geocoder_rejects_empty_address() {
        let geocoder = MockGeocoder::new();
        assert!(geocoder.geocode("  ").await.is_err());
    }

    #[tokio::test]
    async fn mock_sms_truncates_before_recording() {
        let notifier = MockSmsNotifier::new();
        let sms = SmsDispatch {
            to: "+15550001111".into(),
            body: "x".repeat(400),
            delivery_id: Uuid::new_v4(),
        };
        notifier.send(&sms).await.unwrap();
        let recorded = notifier.sent();
        assert_eq!(recorded.len(), 1);
        assert!(recorded[0].body.chars().count() <= SMS_MAX_CHARS);
    }

    #[tokio::test]
    async fn mock_generator_mentions_tracking_number() {
        let generator = MockMessageGenerator::new();
        let ctx = DelayContext::new(
            "TRK-42",
            "Newark, NJ",
            "Boston, MA",
            40,
            TrafficCondition::Severe,
            Utc::now(),
        );
        let message = generator.generate(&ctx).await.unwrap();
        assert!(message.subject.contains("TRK-42"));
        assert!(message.body.contains("40 minutes"));
        assert_eq!(message.model_name, "mock");
    }

    #[tokio::test]
    async fn failing_doubles_fail() {
        let traffic = FailingTrafficProvider::new(1);
        let origin = Coordinates::new(0.0, 0.0);
        assert!(traffic.get_traffic(&origin, &origin).await.is_err());

        let generator = FailingMessageGenerator::new(1);
        let ctx = DelayContext::new(
            "TRK-1",
            "A",
            "B",
            10,
            TrafficCondition::Moderate,
            Utc::now(),
        );
        assert!(generator.generate(&ctx).await.is_err());
    }
}

//! Provider capability traits and fallback plumbing.
//!
//! One object-safe trait per capability: traffic lookup, geocoding, message
//! generation, email dispatch, SMS dispatch. Every adapter reports a name, a
//! numeric priority (lower preferred), and availability; consumers walk the
//! adapters in priority order and fall through on failure, aggregating the
//! attempts into a single error when the chain is exhausted.

pub mod email;
pub mod error;
pub mod geocode;
pub mod message;
pub mod mock;
pub mod selection;
pub mod sms;
pub mod traffic;

pub use email::{EmailDispatch, EmailNotifier};
pub use error::{DispatchReceipt, ProviderError};
pub use geocode::Geocoder;
pub use message::MessageGenerator;
pub use selection::{AttemptLog, sort_by_priority};
pub use sms::{SMS_MAX_CHARS, SmsDispatch, SmsNotifier, truncate_sms};
pub use traffic::TrafficProvider;

/// Priority assigned to the always-available mock adapters, placing them
/// last in every fallback chain.
pub const MOCK_PRIORITY: u16 = 999;

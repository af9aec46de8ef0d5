//! Channel-aware notification fan-out.
//!
//! The service keeps one ordered adapter list per channel (ascending
//! priority, unavailable adapters skipped at send time), walks the chain
//! until an adapter accepts the message, and aggregates every failed
//! attempt when the chain is exhausted. Email recipients are screened
//! against a static blacklist before any attempt.

pub mod blacklist;
pub mod error;
pub mod service;

pub use blacklist::EmailBlacklist;
pub use error::NotifyError;
pub use service::{ChannelReceipt, NotificationRequest, NotificationService};

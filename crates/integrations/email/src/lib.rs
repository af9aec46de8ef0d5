//! Email notifier adapters.
//!
//! Two independent adapters implement the email capability at different
//! priorities: [`SendgridMailer`] (HTTP API, preferred) and [`SmtpMailer`]
//! (lettre SMTP transport, fallback). Each reports unavailable until its
//! configuration is complete.

pub mod config;
pub mod sendgrid;
pub mod smtp;

pub use config::{SendgridConfig, SmtpConfig};
pub use sendgrid::SendgridMailer;
pub use smtp::SmtpMailer;

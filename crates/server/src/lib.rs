//! HTTP surface and wiring for the FreightWatch delay-notification system.

pub mod api;
pub mod config;
pub mod error;
pub mod providers;
pub mod telemetry;

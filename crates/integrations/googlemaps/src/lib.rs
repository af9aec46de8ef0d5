//! Google Maps adapters: traffic via the Routes API, coordinates via the
//! Geocoding API. Both report unavailable until an API key is configured.

pub mod config;
pub mod error;
pub mod geocode;
pub mod traffic;

pub use config::GoogleMapsConfig;
pub use error::GoogleMapsError;
pub use geocode::GoogleGeocoder;
pub use traffic::GoogleTrafficProvider;

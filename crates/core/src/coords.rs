use serde::{Deserialize, Serialize};

/// A geographic coordinate pair. `lat`/`lng` is the canonical encoding at
/// rest; adapters that speak other encodings convert at their boundary.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    /// Latitude in decimal degrees, positive north.
    pub lat: f64,
    /// Longitude in decimal degrees, positive east.
    pub lng: f64,
}

impl Coordinates {
    /// Create a new coordinate pair.
    #[must_use]
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Whether the pair lies within the valid WGS84 ranges.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.lat) && (-180.0..=180.0).contains(&self.lng)
    }

    /// Linear midpoint between two coordinates. Good enough for placing
    /// an incident marker on a route segment.
    #[must_use]
    pub fn midpoint(&self, other: &Self) -> Self {
        Self {
            lat: (self.lat + other.lat) / 2.0,
            lng: (self.lng + other.lng) / 2.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn midpoint_is_halfway() {
        let a = Coordinates::new(40.0, -74.0);
        let b = Coordinates::new(42.0, -70.0);
        let mid = a.midpoint(&b);
        assert!((mid.lat - 41.0).abs() < f64::EPSILON);
        assert!((mid.lng - -72.0).abs() < f64::EPSILON);
    }

    #[test]
    fn validity_ranges() {
        assert!(Coordinates::new(51.5, -0.12).is_valid());
        assert!(!Coordinates::new(91.0, 0.0).is_valid());
        assert!(!Coordinates::new(0.0, 181.0).is_valid());
    }

    #[test]
    fn serde_roundtrip_uses_lat_lng() {
        let c = Coordinates::new(37.77, -122.41);
        let json = serde_json::to_string(&c).unwrap();
        assert!(json.contains("\"lat\""));
        assert!(json.contains("\"lng\""));
        let back: Coordinates = serde_json::from_str(&json).unwrap();
        assert_eq!(back, c);
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::coords::Coordinates;
use crate::traffic::{TrafficCondition, TrafficEstimate, delay_minutes_ceil};

/// A delivery route between two addresses.
///
/// Created together with a delivery but persists beyond its lifetime.
/// Mutated by both the fleet sweep and workflow activities; the row is the
/// single source of truth and last-writer-wins is accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub id: Uuid,
    pub origin_address: String,
    #[serde(default)]
    pub origin_coords: Option<Coordinates>,
    pub destination_address: String,
    #[serde(default)]
    pub destination_coords: Option<Coordinates>,
    /// Route length in meters; 0 until the first successful traffic fetch.
    pub distance_meters: u32,
    /// Free-flow duration in seconds; 0 until the first successful fetch.
    pub normal_duration_seconds: u32,
    #[serde(default)]
    pub current_duration_seconds: Option<u32>,
    #[serde(default)]
    pub traffic_condition: Option<TrafficCondition>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Route {
    /// Create a new route with a fresh id. Distance and free-flow duration
    /// start at 0; the first successful traffic fetch initializes them.
    #[must_use]
    pub fn new(
        origin_address: impl Into<String>,
        destination_address: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            origin_address: origin_address.into(),
            origin_coords: None,
            destination_address: destination_address.into(),
            destination_coords: None,
            distance_meters: 0,
            normal_duration_seconds: 0,
            current_duration_seconds: None,
            traffic_condition: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Set both coordinate pairs.
    #[must_use]
    pub fn with_coords(mut self, origin: Coordinates, destination: Coordinates) -> Self {
        self.origin_coords = Some(origin);
        self.destination_coords = Some(destination);
        self
    }

    /// Whether both endpoints have resolved coordinates.
    #[must_use]
    pub fn has_coords(&self) -> bool {
        self.origin_coords.is_some() && self.destination_coords.is_some()
    }

    /// Delay in whole minutes against the free-flow duration, rounded up.
    /// `None` until a traffic fetch has recorded a current duration.
    #[must_use]
    pub fn delay_minutes(&self) -> Option<u32> {
        self.current_duration_seconds
            .map(|current| delay_minutes_ceil(self.normal_duration_seconds, current))
    }

    /// Apply a fresh traffic estimate.
    ///
    /// The first successful fetch is the authoritative initializer for
    /// distance and free-flow duration; later fetches only refresh the
    /// live fields.
    pub fn apply_traffic(&mut self, estimate: &TrafficEstimate, now: DateTime<Utc>) {
        if self.distance_meters == 0 && self.normal_duration_seconds == 0 {
            self.distance_meters = estimate.distance_meters;
            self.normal_duration_seconds = estimate.normal_duration_seconds;
        }
        self.current_duration_seconds = Some(estimate.estimated_duration_seconds);
        self.traffic_condition = Some(estimate.condition);
        self.updated_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn estimate(normal: u32, estimated: u32) -> TrafficEstimate {
        TrafficEstimate::from_durations(12_000, normal, estimated, "test")
    }

    #[test]
    fn first_fetch_initializes_distance_and_normal() {
        let mut route = Route::new("A", "B", Utc::now());
        route.apply_traffic(&estimate(600, 900), Utc::now());
        assert_eq!(route.distance_meters, 12_000);
        assert_eq!(route.normal_duration_seconds, 600);
        assert_eq!(route.current_duration_seconds, Some(900));
    }

    #[test]
    fn later_fetches_keep_initial_baseline() {
        let mut route = Route::new("A", "B", Utc::now());
        route.apply_traffic(&estimate(600, 900), Utc::now());
        let second = TrafficEstimate::from_durations(13_000, 700, 1_000, "test");
        route.apply_traffic(&second, Utc::now());
        assert_eq!(route.distance_meters, 12_000);
        assert_eq!(route.normal_duration_seconds, 600);
        assert_eq!(route.current_duration_seconds, Some(1_000));
    }

    #[test]
    fn delay_minutes_uses_ceiling() {
        let mut route = Route::new("A", "B", Utc::now());
        route.apply_traffic(&estimate(600, 610), Utc::now());
        // 10 seconds over free-flow rounds up to 1 minute at the route level.
        assert_eq!(route.delay_minutes(), Some(1));
    }

    #[test]
    fn delay_is_none_without_current_duration() {
        let route = Route::new("A", "B", Utc::now());
        assert_eq!(route.delay_minutes(), None);
    }

    #[test]
    fn has_coords_requires_both_ends() {
        let route = Route::new("A", "B", Utc::now());
        assert!(!route.has_coords());
        let route = route.with_coords(Coordinates::new(1.0, 2.0), Coordinates::new(3.0, 4.0));
        assert!(route.has_coords());
    }
}

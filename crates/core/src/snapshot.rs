use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::coords::Coordinates;
use crate::route::Route;
use crate::traffic::{TrafficCondition, TrafficEstimate};

/// Severity of a recorded traffic incident, derived from the delay:
/// ≤ 15 minor, ≤ 30 moderate, ≤ 60 major, else severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotSeverity {
    Minor,
    Moderate,
    Major,
    Severe,
}

impl SnapshotSeverity {
    #[must_use]
    pub fn from_delay_minutes(delay_minutes: u32) -> Self {
        match delay_minutes {
            0..=15 => Self::Minor,
            16..=30 => Self::Moderate,
            31..=60 => Self::Major,
            _ => Self::Severe,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Minor => "minor",
            Self::Moderate => "moderate",
            Self::Major => "major",
            Self::Severe => "severe",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "minor" => Some(Self::Minor),
            "moderate" => Some(Self::Moderate),
            "major" => Some(Self::Major),
            "severe" => Some(Self::Severe),
            _ => None,
        }
    }
}

/// Kind of incident inferred from the delay magnitude: delays above 45
/// minutes are classified as accidents, anything else as congestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncidentType {
    Congestion,
    Accident,
}

impl IncidentType {
    #[must_use]
    pub fn from_delay_minutes(delay_minutes: u32) -> Self {
        if delay_minutes > 45 {
            Self::Accident
        } else {
            Self::Congestion
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Congestion => "congestion",
            Self::Accident => "accident",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "congestion" => Some(Self::Congestion),
            "accident" => Some(Self::Accident),
            _ => None,
        }
    }
}

/// An immutable record of traffic conditions on a route at a point in time.
/// The snapshot log is append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrafficSnapshot {
    pub id: Uuid,
    pub route_id: Uuid,
    pub traffic_condition: TrafficCondition,
    pub delay_minutes: u32,
    pub duration_seconds: u32,
    pub severity: SnapshotSeverity,
    pub incident_type: IncidentType,
    pub description: String,
    pub affected_area: String,
    #[serde(default)]
    pub incident_location: Option<Coordinates>,
    pub snapshot_at: DateTime<Utc>,
}

impl TrafficSnapshot {
    /// Build a snapshot from a traffic estimate for the given route,
    /// deriving severity, incident type, and the midpoint incident
    /// location.
    #[must_use]
    pub fn from_estimate(route: &Route, estimate: &TrafficEstimate, at: DateTime<Utc>) -> Self {
        let delay = estimate.delay_minutes;
        let incident_location = match (route.origin_coords, route.destination_coords) {
            (Some(o), Some(d)) => Some(o.midpoint(&d)),
            _ => None,
        };
        Self {
            id: Uuid::new_v4(),
            route_id: route.id,
            traffic_condition: estimate.condition,
            delay_minutes: delay,
            duration_seconds: estimate.estimated_duration_seconds,
            severity: SnapshotSeverity::from_delay_minutes(delay),
            incident_type: IncidentType::from_delay_minutes(delay),
            description: format!(
                "{} traffic, {delay} minute delay between {} and {}",
                estimate.condition, route.origin_address, route.destination_address
            ),
            affected_area: format!("{} - {}", route.origin_address, route.destination_address),
            incident_location,
            snapshot_at: at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_boundaries() {
        assert_eq!(SnapshotSeverity::from_delay_minutes(15), SnapshotSeverity::Minor);
        assert_eq!(SnapshotSeverity::from_delay_minutes(16), SnapshotSeverity::Moderate);
        assert_eq!(SnapshotSeverity::from_delay_minutes(30), SnapshotSeverity::Moderate);
        assert_eq!(SnapshotSeverity::from_delay_minutes(31), SnapshotSeverity::Major);
        assert_eq!(SnapshotSeverity::from_delay_minutes(60), SnapshotSeverity::Major);
        assert_eq!(SnapshotSeverity::from_delay_minutes(61), SnapshotSeverity::Severe);
    }

    #[test]
    fn incident_type_boundary() {
        assert_eq!(IncidentType::from_delay_minutes(45), IncidentType::Congestion);
        assert_eq!(IncidentType::from_delay_minutes(46), IncidentType::Accident);
    }

    #[test]
    fn snapshot_derives_midpoint_and_description() {
        let now = Utc::now();
        let route = Route::new("Newark, NJ", "Boston, MA", now)
            .with_coords(Coordinates::new(40.0, -74.0), Coordinates::new(42.0, -72.0));
        let estimate = TrafficEstimate::from_durations(300_000, 3_600, 7_200, "test");
        let snap = TrafficSnapshot::from_estimate(&route, &estimate, now);

        assert_eq!(snap.route_id, route.id);
        assert_eq!(snap.delay_minutes, 60);
        assert_eq!(snap.severity, SnapshotSeverity::Major);
        assert_eq!(snap.incident_type, IncidentType::Accident);
        let mid = snap.incident_location.unwrap();
        assert!((mid.lat - 41.0).abs() < f64::EPSILON);
        assert!(snap.description.contains("Newark, NJ"));
        assert!(snap.affected_area.contains("Boston, MA"));
    }

    #[test]
    fn snapshot_without_coords_has_no_location() {
        let now = Utc::now();
        let route = Route::new("A", "B", now);
        let estimate = TrafficEstimate::from_durations(1_000, 600, 900, "test");
        let snap = TrafficSnapshot::from_estimate(&route, &estimate, now);
        assert!(snap.incident_location.is_none());
    }
}

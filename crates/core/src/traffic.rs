use serde::{Deserialize, Serialize};

/// Qualitative traffic condition on a route, derived from the delay in
/// minutes relative to the free-flow duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrafficCondition {
    Light,
    Moderate,
    Heavy,
    Severe,
}

impl TrafficCondition {
    /// Classify a delay: ≤ 5 light, ≤ 15 moderate, ≤ 30 heavy, else severe.
    #[must_use]
    pub fn from_delay_minutes(delay_minutes: u32) -> Self {
        match delay_minutes {
            0..=5 => Self::Light,
            6..=15 => Self::Moderate,
            16..=30 => Self::Heavy,
            _ => Self::Severe,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Moderate => "moderate",
            Self::Heavy => "heavy",
            Self::Severe => "severe",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "light" => Some(Self::Light),
            "moderate" => Some(Self::Moderate),
            "heavy" => Some(Self::Heavy),
            "severe" => Some(Self::Severe),
            _ => None,
        }
    }
}

impl std::fmt::Display for TrafficCondition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Delay in whole minutes, rounding to nearest. Used for provider
/// estimates: `max(0, round((estimated − normal) / 60))`.
#[must_use]
pub fn delay_minutes_round(normal_duration_seconds: u32, estimated_duration_seconds: u32) -> u32 {
    if estimated_duration_seconds <= normal_duration_seconds {
        return 0;
    }
    let diff = estimated_duration_seconds - normal_duration_seconds;
    (diff + 30) / 60
}

/// Delay in whole minutes, rounding up. Used for the route-level invariant:
/// `max(0, ⌈(current − normal) / 60⌉)`.
#[must_use]
pub fn delay_minutes_ceil(normal_duration_seconds: u32, current_duration_seconds: u32) -> u32 {
    if current_duration_seconds <= normal_duration_seconds {
        return 0;
    }
    let diff = current_duration_seconds - normal_duration_seconds;
    diff.div_ceil(60)
}

/// Result of a traffic lookup for one origin/destination pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrafficEstimate {
    /// Route length in meters.
    pub distance_meters: u32,
    /// Free-flow duration in seconds.
    pub normal_duration_seconds: u32,
    /// Duration in current traffic, in seconds.
    pub estimated_duration_seconds: u32,
    /// Derived delay in whole minutes (never negative).
    pub delay_minutes: u32,
    /// Derived qualitative condition.
    pub condition: TrafficCondition,
    /// Name of the adapter that produced this estimate.
    pub provider: String,
}

impl TrafficEstimate {
    /// Build an estimate from raw durations, deriving delay and condition.
    #[must_use]
    pub fn from_durations(
        distance_meters: u32,
        normal_duration_seconds: u32,
        estimated_duration_seconds: u32,
        provider: impl Into<String>,
    ) -> Self {
        let delay_minutes = delay_minutes_round(normal_duration_seconds, estimated_duration_seconds);
        Self {
            distance_meters,
            normal_duration_seconds,
            estimated_duration_seconds,
            delay_minutes,
            condition: TrafficCondition::from_delay_minutes(delay_minutes),
            provider: provider.into(),
        }
    }
}

//! Fleet-wide traffic sweep.
//!
//! Triggered by the authenticated cron endpoint, independent of any
//! workflow: scans every route (paged, capped), refreshes live conditions,
//! and appends a snapshot per route. Per-route failures are isolated into
//! the summary; only repository-level failures abort the sweep.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use freightwatch_core::{Route, TrafficSnapshot};
use freightwatch_provider::{AttemptLog, TrafficProvider, sort_by_priority};
use freightwatch_store::{Page, Repository, StoreError};

/// Hard cap on routes visited in one sweep.
pub const MAX_ROUTES_PER_SWEEP: u64 = 1000;

/// A catastrophic sweep failure (the per-route path never produces one).
#[derive(Debug, Error)]
pub enum SweepError {
    /// The repository is unreachable or failing at the paging level.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// One isolated per-route failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepFailure {
    pub route_id: Uuid,
    pub message: String,
}

/// Aggregate result of one sweep invocation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SweepSummary {
    pub routes_checked: u64,
    pub snapshots_saved: u64,
    pub delays_detected: u64,
    /// Notifications are driven by workflows, never by the sweep; the
    /// counter is part of the summary contract and stays zero here.
    pub notifications_triggered: u64,
    pub errors: Vec<SweepFailure>,
}

/// The fleet sweep service.
pub struct FleetSweep {
    repo: Arc<dyn Repository>,
    traffic: Vec<Arc<dyn TrafficProvider>>,
    page_size: u64,
    max_routes: u64,
}

impl FleetSweep {
    #[must_use]
    pub fn new(repo: Arc<dyn Repository>, mut traffic: Vec<Arc<dyn TrafficProvider>>) -> Self {
        sort_by_priority(&mut traffic, |a| a.priority());
        Self {
            repo,
            traffic,
            page_size: 100,
            max_routes: MAX_ROUTES_PER_SWEEP,
        }
    }

    /// Override the page size (tests).
    #[must_use]
    pub fn with_page_size(mut self, page_size: u64) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Override the route cap (tests).
    #[must_use]
    pub fn with_max_routes(mut self, max_routes: u64) -> Self {
        self.max_routes = max_routes;
        self
    }

    /// Run one sweep over every route.
    #[instrument(skip(self))]
    pub async fn run(&self, now: DateTime<Utc>) -> Result<SweepSummary, SweepError> {
        let mut summary = SweepSummary::default();
        let mut offset = 0u64;

        'pages: loop {
            let page = self
                .repo
                .list_routes(Page::new(offset, self.page_size))
                .await?;
            if page.is_empty() {
                break;
            }
            let page_len = page.len() as u64;

            for route in page {
                if summary.routes_checked >= self.max_routes {
                    warn!(max_routes = self.max_routes, "route cap reached, stopping sweep");
                    break 'pages;
                }
                summary.routes_checked += 1;

                if !route.has_coords() {
                    debug!(route_id = %route.id, "route has no coordinates, skipping");
                    continue;
                }

                let route_id = route.id;
                match self.check_route(route, now).await {
                    Ok(delay_minutes) => {
                        summary.snapshots_saved += 1;
                        if delay_minutes > 0 {
                            summary.delays_detected += 1;
                        }
                    }
                    Err(message) => {
                        warn!(route_id = %route_id, error = %message, "route check failed");
                        summary.errors.push(SweepFailure { route_id, message });
                    }
                }
            }

            offset += page_len;
        }

        info!(
            routes_checked = summary.routes_checked,
            snapshots_saved = summary.snapshots_saved,
            delays_detected = summary.delays_detected,
            errors = summary.errors.len(),
            "fleet sweep finished"
        );
        Ok(summary)
    }

    /// Refresh one route and append a snapshot. Every failure is folded
    /// into a message so the caller can isolate it.
    async fn check_route(&self, mut route: Route, now: DateTime<Utc>) -> Result<u32, String> {
        let (origin, destination) = match (route.origin_coords, route.destination_coords) {
            (Some(origin), Some(destination)) => (origin, destination),
            _ => return Err("missing coordinates".into()),
        };

        let mut attempts = AttemptLog::new();
        for adapter in &self.traffic {
            if !adapter.is_available().await {
                continue;
            }
            match adapter.get_traffic(&origin, &destination).await {
                Ok(estimate) => {
                    route.apply_traffic(&estimate, now);
                    self.repo
                        .update_route(route.clone())
                        .await
                        .map_err(|e| e.to_string())?;
                    let snapshot = TrafficSnapshot::from_estimate(&route, &estimate, now);
                    self.repo
                        .create_traffic_snapshot(snapshot)
                        .await
                        .map_err(|e| e.to_string())?;
                    return Ok(estimate.delay_minutes);
                }
                Err(error) => attempts.record(adapter.name(), &error),
            }
        }
        Err(attempts.into_error("traffic lookup").to_string())
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use freightwatch_core::{Coordinates, TrafficEstimate};
    use freightwatch_provider::ProviderError;
    use freightwatch_provider::mock::MockTrafficProvider;
    use freightwatch_store_memory::MemoryRepository;

    use super::*;

    /// Fails on a specific coordinate pair, succeeds elsewhere.
    struct FlakyTrafficProvider {
        poison_lat: f64,
    }

    #[async_trait]
    impl TrafficProvider for FlakyTrafficProvider {
        fn name(&self) -> &str {
            "flaky-traffic"
        }

        fn priority(&self) -> u16 {
            1
        }

        async fn is_available(&self) -> bool {
            true
        }

        async fn get_traffic(
            &self,
            origin: &Coordinates,
            _destination: &Coordinates,
        ) -> Result<TrafficEstimate, ProviderError> {
            if (origin.lat - self.poison_lat).abs() < 1e-9 {
                return Err(ProviderError::ExecutionFailed("upstream 500".into()));
            }
            Ok(TrafficEstimate::from_durations(10_000, 600, 1_800, self.name()))
        }
    }

    async fn seed_routes(repo: &MemoryRepository, count: usize) -> Vec<Route> {
        let now = Utc::now();
        let mut routes = Vec::new();
        for i in 0..count {
            let route = Route::new(format!("Origin {i}"), format!("Destination {i}"), now)
                .with_coords(
                    Coordinates::new(40.0 + i as f64, -74.0),
                    Coordinates::new(41.0 + i as f64, -73.0),
                );
            routes.push(repo.create_route(route).await.unwrap());
        }
        routes
    }

    #[tokio::test]
    async fn sweep_updates_routes_and_appends_snapshots() {
        let repo = Arc::new(MemoryRepository::new());
        seed_routes(&repo, 5).await;

        let sweep = FleetSweep::new(
            repo.clone(),
            vec![Arc::new(MockTrafficProvider::with_delay(20))],
        );
        let summary = sweep.run(Utc::now()).await.unwrap();

        assert_eq!(summary.routes_checked, 5);
        assert_eq!(summary.snapshots_saved, 5);
        assert_eq!(summary.delays_detected, 5);
        assert_eq!(summary.notifications_triggered, 0);
        assert!(summary.errors.is_empty());

        for route in repo.list_routes(Page::default()).await.unwrap() {
            assert!(route.current_duration_seconds.is_some());
            assert!(route.traffic_condition.is_some());
            let snapshots = repo
                .list_snapshots_by_route(route.id, Page::default())
                .await
                .unwrap();
            assert_eq!(snapshots.len(), 1);
        }
    }

    #[tokio::test]
    async fn per_route_failure_is_isolated() {
        let repo = Arc::new(MemoryRepository::new());
        let routes = seed_routes(&repo, 10).await;
        // Route index 3 has origin lat 43.0; poison it.
        let poisoned = routes[3].id;

        let sweep = FleetSweep::new(
            repo.clone(),
            vec![Arc::new(FlakyTrafficProvider { poison_lat: 43.0 })],
        );
        let summary = sweep.run(Utc::now()).await.unwrap();

        assert_eq!(summary.routes_checked, 10);
        assert_eq!(summary.snapshots_saved, 9);
        assert_eq!(summary.errors.len(), 1);
        assert_eq!(summary.errors[0].route_id, poisoned);
        assert!(summary.errors[0].message.contains("upstream 500"));
    }

    #[tokio::test]
    async fn routes_without_coordinates_are_skipped() {
        let repo = Arc::new(MemoryRepository::new());
        seed_routes(&repo, 2).await;
        repo.create_route(Route::new("No coords A", "No coords B", Utc::now()))
            .await
            .unwrap();

        let sweep = FleetSweep::new(
            repo.clone(),
            vec![Arc::new(MockTrafficProvider::with_delay(0))],
        );
        let summary = sweep.run(Utc::now()).await.unwrap();

        assert_eq!(summary.routes_checked, 3);
        assert_eq!(summary.snapshots_saved, 2);
        assert!(summary.errors.is_empty());
    }

    #[tokio::test]
    async fn route_cap_bounds_the_scan() {
        let repo = Arc::new(MemoryRepository::new());
        seed_routes(&repo, 7).await;

        let sweep = FleetSweep::new(
            repo.clone(),
            vec![Arc::new(MockTrafficProvider::with_delay(0))],
        )
        .with_page_size(2)
        .with_max_routes(4);
        let summary = sweep.run(Utc::now()).await.unwrap();

        assert_eq!(summary.routes_checked, 4);
        assert_eq!(summary.snapshots_saved, 4);
    }

    #[tokio::test]
    async fn sweep_is_idempotent_modulo_new_snapshots() {
        let repo = Arc::new(MemoryRepository::new());
        let routes = seed_routes(&repo, 2).await;

        let sweep = FleetSweep::new(
            repo.clone(),
            vec![Arc::new(MockTrafficProvider::with_delay(10))],
        );
        sweep.run(Utc::now()).await.unwrap();
        sweep.run(Utc::now()).await.unwrap();

        for route in &routes {
            let snapshots = repo
                .list_snapshots_by_route(route.id, Page::default())
                .await
                .unwrap();
            assert_eq!(snapshots.len(), 2, "one snapshot per route per sweep");
        }
        // Baseline fields keep their first-fetch values.
        let refreshed = repo.get_route(routes[0].id).await.unwrap().unwrap();
        assert_eq!(refreshed.distance_meters, 25_000);
    }
}

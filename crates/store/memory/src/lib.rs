//! DashMap-backed [`Repository`] implementation.
//!
//! The default backend for development and tests. Multi-row invariants
//! (unique customer email, single default threshold) are guarded by small
//! mutexes; single-row mutations rely on DashMap's per-entry locking, which
//! is what makes the conditional status transition atomic.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use uuid::Uuid;

use freightwatch_core::{
    Customer, Delivery, DeliveryStatus, DomainError, Notification, NotificationStatus, Route,
    Threshold, TrafficSnapshot, WorkflowExecution,
};
use freightwatch_store::{Page, Repository, StoreError};

/// In-memory repository.
#[derive(Default)]
pub struct MemoryRepository {
    customers: DashMap<Uuid, Customer>,
    emails: DashMap<String, Uuid>,
    routes: DashMap<Uuid, Route>,
    deliveries: DashMap<Uuid, Delivery>,
    thresholds: DashMap<Uuid, Threshold>,
    snapshots: DashMap<Uuid, TrafficSnapshot>,
    notifications: DashMap<Uuid, Notification>,
    executions: DashMap<Uuid, WorkflowExecution>,
    /// Serializes clear-previous-default + set-new-default.
    default_guard: Mutex<()>,
}

impl MemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn page<T: Clone>(items: Vec<T>, page: Page) -> Vec<T> {
        items
            .into_iter()
            .skip(usize::try_from(page.offset).unwrap_or(usize::MAX))
            .take(usize::try_from(page.limit).unwrap_or(usize::MAX))
            .collect()
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn create_customer(&self, customer: Customer) -> Result<Customer, StoreError> {
        let email = customer.email.to_ascii_lowercase();
        match self.emails.entry(email) {
            Entry::Occupied(_) => Err(StoreError::Conflict(format!(
                "customer email already exists: {}",
                customer.email
            ))),
            Entry::Vacant(slot) => {
                slot.insert(customer.id);
                self.customers.insert(customer.id, customer.clone());
                Ok(customer)
            }
        }
    }

    async fn get_customer(&self, id: Uuid) -> Result<Option<Customer>, StoreError> {
        Ok(self.customers.get(&id).map(|c| c.clone()))
    }

    async fn get_customer_by_email(&self, email: &str) -> Result<Option<Customer>, StoreError> {
        let id = self.emails.get(&email.to_ascii_lowercase()).map(|e| *e);
        Ok(id.and_then(|id| self.customers.get(&id).map(|c| c.clone())))
    }

    async fn update_customer(&self, customer: Customer) -> Result<Customer, StoreError> {
        let Some(mut existing) = self.customers.get_mut(&customer.id) else {
            return Err(StoreError::NotFound(format!("customer {}", customer.id)));
        };
        if !existing.email.eq_ignore_ascii_case(&customer.email) {
            self.emails.remove(&existing.email.to_ascii_lowercase());
            self.emails
                .insert(customer.email.to_ascii_lowercase(), customer.id);
        }
        *existing = customer.clone();
        Ok(customer)
    }

    async fn list_customers(&self, page: Page) -> Result<Vec<Customer>, StoreError> {
        let mut all: Vec<Customer> = self.customers.iter().map(|c| c.clone()).collect();
        all.sort_by_key(|c| (c.created_at, c.id));
        Ok(Self::page(all, page))
    }

    async fn create_route(&self, route: Route) -> Result<Route, StoreError> {
        self.routes.insert(route.id, route.clone());
        Ok(route)
    }

    async fn get_route(&self, id: Uuid) -> Result<Option<Route>, StoreError> {
        Ok(self.routes.get(&id).map(|r| r.clone()))
    }

    async fn update_route(&self, route: Route) -> Result<Route, StoreError> {
        if !self.routes.contains_key(&route.id) {
            return Err(StoreError::NotFound(format!("route {}", route.id)));
        }
        self.routes.insert(route.id, route.clone());
        Ok(route)
    }

    async fn list_routes(&self, page: Page) -> Result<Vec<Route>, StoreError> {
        let mut all: Vec<Route> = self.routes.iter().map(|r| r.clone()).collect();
        all.sort_by_key(|r| (r.created_at, r.id));
        Ok(Self::page(all, page))
    }

    async fn create_delivery(&self, delivery: Delivery) -> Result<Delivery, StoreError> {
        self.deliveries.insert(delivery.id, delivery.clone());
        Ok(delivery)
    }

    async fn get_delivery(&self, id: Uuid) -> Result<Option<Delivery>, StoreError> {
        Ok(self.deliveries.get(&id).map(|d| d.clone()))
    }

    async fn get_delivery_by_tracking(
        &self,
        tracking_number: &str,
    ) -> Result<Option<Delivery>, StoreError> {
        Ok(self
            .deliveries
            .iter()
            .find(|d| d.tracking_number == tracking_number)
            .map(|d| d.clone()))
    }

    async fn update_delivery(&self, delivery: Delivery) -> Result<Delivery, StoreError> {
        let Some(mut existing) = self.deliveries.get_mut(&delivery.id) else {
            return Err(StoreError::NotFound(format!("delivery {}", delivery.id)));
        };
        // The status machine owns status mutations.
        let status = existing.status;
        *existing = delivery;
        existing.status = status;
        Ok(existing.clone())
    }

    async fn list_deliveries_by_status(
        &self,
        status: DeliveryStatus,
        page: Page,
    ) -> Result<Vec<Delivery>, StoreError> {
        let mut all: Vec<Delivery> = self
            .deliveries
            .iter()
            .filter(|d| d.status == status)
            .map(|d| d.clone())
            .collect();
        all.sort_by_key(|d| (d.created_at, d.id));
        Ok(Self::page(all, page))
    }

    async fn transition_delivery_status(
        &self,
        id: Uuid,
        to: DeliveryStatus,
        now: DateTime<Utc>,
    ) -> Result<Delivery, StoreError> {
        let Some(mut delivery) = self.deliveries.get_mut(&id) else {
            return Err(StoreError::NotFound(format!("delivery {id}")));
        };
        if !delivery.status.can_transition_to(to) {
            return Err(StoreError::Domain(DomainError::InvalidTransition {
                from: delivery.status,
                to,
            }));
        }
        delivery.status = to;
        delivery.updated_at = now;
        Ok(delivery.clone())
    }

    async fn increment_delivery_checks(
        &self,
        id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Delivery, StoreError> {
        let Some(mut delivery) = self.deliveries.get_mut(&id) else {
            return Err(StoreError::NotFound(format!("delivery {id}")));
        };
        delivery.checks_performed += 1;
        delivery.updated_at = now;
        Ok(delivery.clone())
    }

    async fn create_threshold(&self, threshold: Threshold) -> Result<Threshold, StoreError> {
        if threshold.is_default {
            let _guard = self.default_guard.lock().expect("default guard poisoned");
            for mut t in self.thresholds.iter_mut() {
                t.is_default = false;
            }
            self.thresholds.insert(threshold.id, threshold.clone());
        } else {
            self.thresholds.insert(threshold.id, threshold.clone());
        }
        Ok(threshold)
    }

    async fn get_threshold(&self, id: Uuid) -> Result<Option<Threshold>, StoreError> {
        Ok(self.thresholds.get(&id).map(|t| t.clone()))
    }

    async fn list_thresholds(&self) -> Result<Vec<Threshold>, StoreError> {
        let mut all: Vec<Threshold> = self.thresholds.iter().map(|t| t.clone()).collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(all)
    }

    async fn get_default_threshold(&self) -> Result<Option<Threshold>, StoreError> {
        Ok(self
            .thresholds
            .iter()
            .find(|t| t.is_default)
            .map(|t| t.clone()))
    }

    async fn set_default_threshold(&self, id: Uuid) -> Result<Threshold, StoreError> {
        let _guard = self.default_guard.lock().expect("default guard poisoned");
        if !self.thresholds.contains_key(&id) {
            return Err(StoreError::NotFound(format!("threshold {id}")));
        }
        for mut t in self.thresholds.iter_mut() {
            t.is_default = t.id == id;
        }
        Ok(self
            .thresholds
            .get(&id)
            .map(|t| t.clone())
            .expect("threshold present under guard"))
    }

    async fn delete_threshold(&self, id: Uuid) -> Result<(), StoreError> {
        let _guard = self.default_guard.lock().expect("default guard poisoned");
        let Some(threshold) = self.thresholds.get(&id).map(|t| t.clone()) else {
            return Err(StoreError::NotFound(format!("threshold {id}")));
        };
        if threshold.is_default {
            return Err(StoreError::Domain(DomainError::ProtectedThreshold(
                "cannot delete the default threshold".into(),
            )));
        }
        if threshold.is_system {
            return Err(StoreError::Domain(DomainError::ProtectedThreshold(
                "cannot delete a system threshold".into(),
            )));
        }
        self.thresholds.remove(&id);
        Ok(())
    }

    async fn create_traffic_snapshot(
        &self,
        snapshot: TrafficSnapshot,
    ) -> Result<TrafficSnapshot, StoreError> {
        self.snapshots.insert(snapshot.id, snapshot.clone());
        Ok(snapshot)
    }

    async fn list_snapshots_by_route(
        &self,
        route_id: Uuid,
        page: Page,
    ) -> Result<Vec<TrafficSnapshot>, StoreError> {
        let mut all: Vec<TrafficSnapshot> = self
            .snapshots
            .iter()
            .filter(|s| s.route_id == route_id)
            .map(|s| s.clone())
            .collect();
        all.sort_by(|a, b| b.snapshot_at.cmp(&a.snapshot_at));
        Ok(Self::page(all, page))
    }

    async fn create_notification(
        &self,
        notification: Notification,
    ) -> Result<Notification, StoreError> {
        self.notifications
            .insert(notification.id, notification.clone());
        Ok(notification)
    }

    async fn list_notifications_by_delivery(
        &self,
        delivery_id: Uuid,
    ) -> Result<Vec<Notification>, StoreError> {
        let mut all: Vec<Notification> = self
            .notifications
            .iter()
            .filter(|n| n.delivery_id == delivery_id)
            .map(|n| n.clone())
            .collect();
        all.sort_by_key(|n| (n.created_at, n.id));
        Ok(all)
    }

    async fn latest_sent_notification(
        &self,
        delivery_id: Uuid,
    ) -> Result<Option<Notification>, StoreError> {
        Ok(self
            .notifications
            .iter()
            .filter(|n| n.delivery_id == delivery_id && n.status == NotificationStatus::Sent)
            .map(|n| n.clone())
            .max_by_key(|n| n.sent_at))
    }

    async fn create_workflow_execution(
        &self,
        execution: WorkflowExecution,
    ) -> Result<WorkflowExecution, StoreError> {
        let duplicate = self.executions.iter().any(|e| {
            e.workflow_id == execution.workflow_id && e.run_id == execution.run_id
        });
        if duplicate {
            return Err(StoreError::Conflict(format!(
                "workflow execution already exists: ({}, {})",
                execution.workflow_id, execution.run_id
            )));
        }
        self.executions.insert(execution.id, execution.clone());
        Ok(execution)
    }

    async fn update_workflow_execution(
        &self,
        execution: WorkflowExecution,
    ) -> Result<WorkflowExecution, StoreError> {
        if !self.executions.contains_key(&execution.id) {
            return Err(StoreError::NotFound(format!(
                "workflow execution {}",
                execution.id
            )));
        }
        self.executions.insert(execution.id, execution.clone());
        Ok(execution)
    }

    async fn get_workflow_execution(
        &self,
        workflow_id: &str,
        run_id: &str,
    ) -> Result<Option<WorkflowExecution>, StoreError> {
        Ok(self
            .executions
            .iter()
            .find(|e| e.workflow_id == workflow_id && e.run_id == run_id)
            .map(|e| e.clone()))
    }

    async fn latest_execution_by_workflow_id(
        &self,
        workflow_id: &str,
    ) -> Result<Option<WorkflowExecution>, StoreError> {
        Ok(self
            .executions
            .iter()
            .filter(|e| e.workflow_id == workflow_id)
            .map(|e| e.clone())
            .max_by_key(|e| e.started_at))
    }

    async fn list_executions_by_delivery(
        &self,
        delivery_id: Uuid,
    ) -> Result<Vec<WorkflowExecution>, StoreError> {
        let mut all: Vec<WorkflowExecution> = self
            .executions
            .iter()
            .filter(|e| e.delivery_id == delivery_id)
            .map(|e| e.clone())
            .collect();
        all.sort_by_key(|e| (e.started_at, e.id));
        Ok(all)
    }
}

#[cfg(test)]
mod tests {
    use freightwatch_core::NotificationChannel;

    use super::*;

    fn repo() -> MemoryRepository {
        MemoryRepository::new()
    }

    async fn seed_delivery(repo: &MemoryRepository) -> Delivery {
        let now = Utc::now();
        let customer = repo
            .create_customer(Customer::new("Ada", "ada@example.com", now))
            .await
            .unwrap();
        let route = repo.create_route(Route::new("A", "B", now)).await.unwrap();
        repo.create_delivery(Delivery::new(
            "TRK-1",
            customer.id,
            route.id,
            now + chrono::Duration::hours(6),
            now,
        ))
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn duplicate_email_is_conflict() {
        let repo = repo();
        let now = Utc::now();
        repo.create_customer(Customer::new("Ada", "ada@example.com", now))
            .await
            .unwrap();
        let err = repo
            .create_customer(Customer::new("Other", "Ada@Example.com", now))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn transition_enforces_status_machine() {
        let repo = repo();
        let delivery = seed_delivery(&repo).await;

        let err = repo
            .transition_delivery_status(delivery.id, DeliveryStatus::Delivered, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Domain(_)));

        // Row unchanged after the rejected transition.
        let stored = repo.get_delivery(delivery.id).await.unwrap().unwrap();
        assert_eq!(stored.status, DeliveryStatus::Pending);

        repo.transition_delivery_status(delivery.id, DeliveryStatus::InTransit, Utc::now())
            .await
            .unwrap();
        let stored = repo.get_delivery(delivery.id).await.unwrap().unwrap();
        assert_eq!(stored.status, DeliveryStatus::InTransit);
    }

    #[tokio::test]
    async fn plain_update_cannot_change_status() {
        let repo = repo();
        let mut delivery = seed_delivery(&repo).await;
        delivery.status = DeliveryStatus::Delivered;
        delivery.check_interval_minutes = 15;
        let updated = repo.update_delivery(delivery).await.unwrap();
        assert_eq!(updated.status, DeliveryStatus::Pending);
        assert_eq!(updated.check_interval_minutes, 15);
    }

    #[tokio::test]
    async fn increment_checks_bumps_counter_and_updated_at() {
        let repo = repo();
        let delivery = seed_delivery(&repo).await;
        let later = Utc::now() + chrono::Duration::minutes(30);
        let updated = repo
            .increment_delivery_checks(delivery.id, later)
            .await
            .unwrap();
        assert_eq!(updated.checks_performed, 1);
        assert_eq!(updated.updated_at, later);
    }

    #[tokio::test]
    async fn exactly_one_default_threshold() {
        let repo = repo();
        let a = repo
            .create_threshold(
                Threshold::new("a", 30, vec![NotificationChannel::Email])
                    .unwrap()
                    .as_default(),
            )
            .await
            .unwrap();
        let b = repo
            .create_threshold(Threshold::new("b", 60, vec![NotificationChannel::Sms]).unwrap())
            .await
            .unwrap();

        assert_eq!(repo.get_default_threshold().await.unwrap().unwrap().id, a.id);

        repo.set_default_threshold(b.id).await.unwrap();
        let defaults: Vec<Threshold> = repo
            .list_thresholds()
            .await
            .unwrap()
            .into_iter()
            .filter(|t| t.is_default)
            .collect();
        assert_eq!(defaults.len(), 1);
        assert_eq!(defaults[0].id, b.id);
    }

    #[tokio::test]
    async fn deleting_default_or_system_threshold_is_rejected() {
        let repo = repo();
        let default = repo
            .create_threshold(
                Threshold::new("default", 30, vec![NotificationChannel::Email])
                    .unwrap()
                    .as_default(),
            )
            .await
            .unwrap();
        let system = repo
            .create_threshold(
                Threshold::new("system", 45, vec![NotificationChannel::Email])
                    .unwrap()
                    .as_system(),
            )
            .await
            .unwrap();
        let plain = repo
            .create_threshold(Threshold::new("plain", 60, vec![NotificationChannel::Sms]).unwrap())
            .await
            .unwrap();

        assert!(matches!(
            repo.delete_threshold(default.id).await.unwrap_err(),
            StoreError::Domain(_)
        ));
        assert!(matches!(
            repo.delete_threshold(system.id).await.unwrap_err(),
            StoreError::Domain(_)
        ));
        repo.delete_threshold(plain.id).await.unwrap();
    }

    #[tokio::test]
    async fn latest_sent_notification_ignores_failures() {
        let repo = repo();
        let delivery = seed_delivery(&repo).await;
        let now = Utc::now();

        repo.create_notification(Notification::sent(
            delivery.id,
            NotificationChannel::Email,
            "ada@example.com",
            "m1",
            "id-1",
            20,
            now - chrono::Duration::hours(2),
        ))
        .await
        .unwrap();
        repo.create_notification(Notification::sent(
            delivery.id,
            NotificationChannel::Email,
            "ada@example.com",
            "m2",
            "id-2",
            32,
            now - chrono::Duration::minutes(30),
        ))
        .await
        .unwrap();
        repo.create_notification(Notification::failed(
            delivery.id,
            NotificationChannel::Sms,
            "+15550001111",
            "m3",
            "no phone",
            40,
            now,
        ))
        .await
        .unwrap();

        let latest = repo
            .latest_sent_notification(delivery.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(latest.external_id.as_deref(), Some("id-2"));
        assert_eq!(latest.delay_minutes_at_send, 32);
    }

    #[tokio::test]
    async fn execution_unique_key_is_workflow_and_run() {
        let repo = repo();
        let delivery = seed_delivery(&repo).await;
        let exec = WorkflowExecution::begin("delay-notification-x", "run-1", delivery.id, Utc::now());
        repo.create_workflow_execution(exec.clone()).await.unwrap();

        let dup = WorkflowExecution::begin("delay-notification-x", "run-1", delivery.id, Utc::now());
        assert!(matches!(
            repo.create_workflow_execution(dup).await.unwrap_err(),
            StoreError::Conflict(_)
        ));

        let second =
            WorkflowExecution::begin("delay-notification-x", "run-2", delivery.id, Utc::now());
        repo.create_workflow_execution(second).await.unwrap();

        let latest = repo
            .latest_execution_by_workflow_id("delay-notification-x")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(latest.run_id, "run-2");
    }

    #[tokio::test]
    async fn list_by_status_and_tracking_lookup() {
        let repo = repo();
        let delivery = seed_delivery(&repo).await;

        let pending = repo
            .list_deliveries_by_status(DeliveryStatus::Pending, Page::default())
            .await
            .unwrap();
        assert_eq!(pending.len(), 1);
        assert!(
            repo.list_deliveries_by_status(DeliveryStatus::Delayed, Page::default())
                .await
                .unwrap()
                .is_empty()
        );

        let found = repo
            .get_delivery_by_tracking(&delivery.tracking_number)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, delivery.id);
        assert!(
            repo.get_delivery_by_tracking("TRK-unknown")
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn snapshots_are_listed_most_recent_first() {
        let repo = repo();
        let now = Utc::now();
        let route = repo.create_route(Route::new("A", "B", now)).await.unwrap();
        for minutes in [30, 10, 20] {
            let estimate = freightwatch_core::TrafficEstimate::from_durations(
                1_000,
                600,
                600 + minutes * 60,
                "test",
            );
            let snap = TrafficSnapshot::from_estimate(
                &route,
                &estimate,
                now - chrono::Duration::minutes(i64::from(minutes)),
            );
            repo.create_traffic_snapshot(snap).await.unwrap();
        }
        let listed = repo
            .list_snapshots_by_route(route.id, Page::default())
            .await
            .unwrap();
        assert_eq!(listed.len(), 3);
        assert!(listed[0].snapshot_at > listed[1].snapshot_at);
        assert!(listed[1].snapshot_at > listed[2].snapshot_at);
    }
}

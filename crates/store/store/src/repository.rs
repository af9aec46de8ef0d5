use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use freightwatch_core::{
    Customer, Delivery, DeliveryStatus, Notification, Route, Threshold, TrafficSnapshot,
    WorkflowExecution,
};

use crate::error::StoreError;

/// Offset/limit paging window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub offset: u64,
    pub limit: u64,
}

impl Page {
    #[must_use]
    pub fn new(offset: u64, limit: u64) -> Self {
        Self { offset, limit }
    }
}

impl Default for Page {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: 100,
        }
    }
}

/// Data-access contract for the delay-notification domain.
///
/// Implementations must be `Send + Sync` and safe for concurrent access.
/// Every method returns `Ok(value)` or a [`StoreError`]; nothing panics
/// across this boundary. Entities are stored by value; callers assign ids
/// before `create_*`.
#[async_trait]
pub trait Repository: Send + Sync {
    // -- customers ---------------------------------------------------------

    /// Insert a customer. Fails with [`StoreError::Conflict`] if the email
    /// is already taken.
    async fn create_customer(&self, customer: Customer) -> Result<Customer, StoreError>;

    async fn get_customer(&self, id: Uuid) -> Result<Option<Customer>, StoreError>;

    async fn get_customer_by_email(&self, email: &str) -> Result<Option<Customer>, StoreError>;

    async fn update_customer(&self, customer: Customer) -> Result<Customer, StoreError>;

    async fn list_customers(&self, page: Page) -> Result<Vec<Customer>, StoreError>;

    // -- routes ------------------------------------------------------------

    async fn create_route(&self, route: Route) -> Result<Route, StoreError>;

    async fn get_route(&self, id: Uuid) -> Result<Option<Route>, StoreError>;

    /// Overwrite the route row. Last-writer-wins between the fleet sweep
    /// and workflow activities is accepted.
    async fn update_route(&self, route: Route) -> Result<Route, StoreError>;

    /// List routes ordered by creation time for paged scans.
    async fn list_routes(&self, page: Page) -> Result<Vec<Route>, StoreError>;

    // -- deliveries --------------------------------------------------------

    async fn create_delivery(&self, delivery: Delivery) -> Result<Delivery, StoreError>;

    async fn get_delivery(&self, id: Uuid) -> Result<Option<Delivery>, StoreError>;

    async fn get_delivery_by_tracking(
        &self,
        tracking_number: &str,
    ) -> Result<Option<Delivery>, StoreError>;

    /// Overwrite delivery fields other than `status`. The stored status is
    /// preserved so plain updates cannot bypass the status machine.
    async fn update_delivery(&self, delivery: Delivery) -> Result<Delivery, StoreError>;

    async fn list_deliveries_by_status(
        &self,
        status: DeliveryStatus,
        page: Page,
    ) -> Result<Vec<Delivery>, StoreError>;

    /// Conditionally move a delivery to `to`, enforcing the status machine
    /// atomically. Invalid transitions return
    /// [`StoreError::Domain`] and leave the row unchanged.
    async fn transition_delivery_status(
        &self,
        id: Uuid,
        to: DeliveryStatus,
        now: DateTime<Utc>,
    ) -> Result<Delivery, StoreError>;

    /// Atomically increment `checks_performed` and refresh `updated_at`
    /// (the "last check" marker).
    async fn increment_delivery_checks(
        &self,
        id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Delivery, StoreError>;

    // -- thresholds --------------------------------------------------------

    async fn create_threshold(&self, threshold: Threshold) -> Result<Threshold, StoreError>;

    async fn get_threshold(&self, id: Uuid) -> Result<Option<Threshold>, StoreError>;

    async fn list_thresholds(&self) -> Result<Vec<Threshold>, StoreError>;

    /// The threshold with `is_default = true`, if any.
    async fn get_default_threshold(&self) -> Result<Option<Threshold>, StoreError>;

    /// Make `id` the default, atomically clearing the previous default.
    async fn set_default_threshold(&self, id: Uuid) -> Result<Threshold, StoreError>;

    /// Delete a threshold. Deleting the default or a system threshold is
    /// rejected with [`StoreError::Domain`].
    async fn delete_threshold(&self, id: Uuid) -> Result<(), StoreError>;

    // -- traffic snapshots -------------------------------------------------

    /// Append to the immutable snapshot log.
    async fn create_traffic_snapshot(
        &self,
        snapshot: TrafficSnapshot,
    ) -> Result<TrafficSnapshot, StoreError>;

    /// Snapshots for a route, most recent first.
    async fn list_snapshots_by_route(
        &self,
        route_id: Uuid,
        page: Page,
    ) -> Result<Vec<TrafficSnapshot>, StoreError>;

    // -- notifications -----------------------------------------------------

    /// Insert a notification row. Rows are never updated.
    async fn create_notification(
        &self,
        notification: Notification,
    ) -> Result<Notification, StoreError>;

    async fn list_notifications_by_delivery(
        &self,
        delivery_id: Uuid,
    ) -> Result<Vec<Notification>, StoreError>;

    /// The most recent successfully sent notification for a delivery;
    /// feeds the cooldown and delta dedup gates.
    async fn latest_sent_notification(
        &self,
        delivery_id: Uuid,
    ) -> Result<Option<Notification>, StoreError>;

    // -- workflow executions -----------------------------------------------

    /// Insert an execution row. (`workflow_id`, `run_id`) must be unique.
    async fn create_workflow_execution(
        &self,
        execution: WorkflowExecution,
    ) -> Result<WorkflowExecution, StoreError>;

    async fn update_workflow_execution(
        &self,
        execution: WorkflowExecution,
    ) -> Result<WorkflowExecution, StoreError>;

    async fn get_workflow_execution(
        &self,
        workflow_id: &str,
        run_id: &str,
    ) -> Result<Option<WorkflowExecution>, StoreError>;

    /// The most recently started execution for a workflow id; backs the
    /// status endpoint after the engine forgets a run.
    async fn latest_execution_by_workflow_id(
        &self,
        workflow_id: &str,
    ) -> Result<Option<WorkflowExecution>, StoreError>;

    async fn list_executions_by_delivery(
        &self,
        delivery_id: Uuid,
    ) -> Result<Vec<WorkflowExecution>, StoreError>;
}

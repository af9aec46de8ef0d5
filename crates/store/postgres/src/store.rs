use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use freightwatch_core::{
    Customer, Delivery, DeliveryStatus, DomainError, Notification, Route, Threshold,
    TrafficSnapshot, WorkflowExecution,
};
use freightwatch_store::{Page, Repository, StoreError};

use crate::config::PostgresConfig;
use crate::migrations;
use crate::rows;

const ALL_STATUSES: [DeliveryStatus; 6] = [
    DeliveryStatus::Pending,
    DeliveryStatus::InTransit,
    DeliveryStatus::Delayed,
    DeliveryStatus::Delivered,
    DeliveryStatus::Cancelled,
    DeliveryStatus::Failed,
];

/// PostgreSQL-backed repository.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Connect, build the pool, and run migrations.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Connection`] if pool creation fails, or
    /// [`StoreError::Backend`] if migrations fail.
    pub async fn new(config: PostgresConfig) -> Result<Self, StoreError> {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(config.pool_size)
            .connect(&config.url)
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        migrations::run_migrations(&pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        Ok(Self { pool })
    }

    /// Build a repository from an existing pool, running migrations.
    pub async fn from_pool(pool: PgPool) -> Result<Self, StoreError> {
        migrations::run_migrations(&pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(Self { pool })
    }

    fn map_err(e: sqlx::Error) -> StoreError {
        match &e {
            sqlx::Error::Database(db)
                if matches!(db.kind(), sqlx::error::ErrorKind::UniqueViolation) =>
            {
                StoreError::Conflict(db.to_string())
            }
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                StoreError::Connection(e.to_string())
            }
            _ => StoreError::Backend(e.to_string()),
        }
    }

    fn page_params(page: Page) -> (i64, i64) {
        (
            i64::try_from(page.limit).unwrap_or(i64::MAX),
            i64::try_from(page.offset).unwrap_or(i64::MAX),
        )
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn create_customer(&self, customer: Customer) -> Result<Customer, StoreError> {
        sqlx::query(
            "INSERT INTO customers (id, name, email, phone, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(customer.id)
        .bind(&customer.name)
        .bind(&customer.email)
        .bind(&customer.phone)
        .bind(customer.created_at)
        .bind(customer.updated_at)
        .execute(&self.pool)
        .await
        .map_err(Self::map_err)?;
        Ok(customer)
    }

    async fn get_customer(&self, id: Uuid) -> Result<Option<Customer>, StoreError> {
        sqlx::query("SELECT * FROM customers WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Self::map_err)?
            .map(|row| rows::customer(&row))
            .transpose()
    }

    async fn get_customer_by_email(&self, email: &str) -> Result<Option<Customer>, StoreError> {
        sqlx::query("SELECT * FROM customers WHERE LOWER(email) = LOWER($1)")
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(Self::map_err)?
            .map(|row| rows::customer(&row))
            .transpose()
    }

    async fn update_customer(&self, customer: Customer) -> Result<Customer, StoreError> {
        let result = sqlx::query(
            "UPDATE customers SET name = $2, email = $3, phone = $4, updated_at = $5
             WHERE id = $1",
        )
        .bind(customer.id)
        .bind(&customer.name)
        .bind(&customer.email)
        .bind(&customer.phone)
        .bind(customer.updated_at)
        .execute(&self.pool)
        .await
        .map_err(Self::map_err)?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("customer {}", customer.id)));
        }
        Ok(customer)
    }

    async fn list_customers(&self, page: Page) -> Result<Vec<Customer>, StoreError> {
        let (limit, offset) = Self::page_params(page);
        sqlx::query("SELECT * FROM customers ORDER BY created_at, id LIMIT $1 OFFSET $2")
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
            .map_err(Self::map_err)?
            .iter()
            .map(rows::customer)
            .collect()
    }

    async fn create_route(&self, route: Route) -> Result<Route, StoreError> {
        sqlx::query(
            "INSERT INTO routes (id, origin_address, origin_lat, origin_lng,
                 destination_address, destination_lat, destination_lng,
                 distance_meters, normal_duration_seconds, current_duration_seconds,
                 traffic_condition, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)",
        )
        .bind(route.id)
        .bind(&route.origin_address)
        .bind(route.origin_coords.map(|c| c.lat))
        .bind(route.origin_coords.map(|c| c.lng))
        .bind(&route.destination_address)
        .bind(route.destination_coords.map(|c| c.lat))
        .bind(route.destination_coords.map(|c| c.lng))
        .bind(i64::from(route.distance_meters))
        .bind(i64::from(route.normal_duration_seconds))
        .bind(route.current_duration_seconds.map(i64::from))
        .bind(route.traffic_condition.map(|c| c.as_str()))
        .bind(route.created_at)
        .bind(route.updated_at)
        .execute(&self.pool)
        .await
        .map_err(Self::map_err)?;
        Ok(route)
    }

    async fn get_route(&self, id: Uuid) -> Result<Option<Route>, StoreError> {
        sqlx::query("SELECT * FROM routes WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Self::map_err)?
            .map(|row| rows::route(&row))
            .transpose()
    }

    async fn update_route(&self, route: Route) -> Result<Route, StoreError> {
        let result = sqlx::query(
            "UPDATE routes SET origin_address = $2, origin_lat = $3, origin_lng = $4,
                 destination_address = $5, destination_lat = $6, destination_lng = $7,
                 distance_meters = $8, normal_duration_seconds = $9,
                 current_duration_seconds = $10, traffic_condition = $11, updated_at = $12
             WHERE id = $1",
        )
        .bind(route.id)
        .bind(&route.origin_address)
        .bind(route.origin_coords.map(|c| c.lat))
        .bind(route.origin_coords.map(|c| c.lng))
        .bind(&route.destination_address)
        .bind(route.destination_coords.map(|c| c.lat))
        .bind(route.destination_coords.map(|c| c.lng))
        .bind(i64::from(route.distance_meters))
        .bind(i64::from(route.normal_duration_seconds))
        .bind(route.current_duration_seconds.map(i64::from))
        .bind(route.traffic_condition.map(|c| c.as_str()))
        .bind(route.updated_at)
        .execute(&self.pool)
        .await
        .map_err(Self::map_err)?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("route {}", route.id)));
        }
        Ok(route)
    }

    async fn list_routes(&self, page: Page) -> Result<Vec<Route>, StoreError> {
        let (limit, offset) = Self::page_params(page);
        sqlx::query("SELECT * FROM routes ORDER BY created_at, id LIMIT $1 OFFSET $2")
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
            .map_err(Self::map_err)?
            .iter()
            .map(rows::route)
            .collect()
    }

    async fn create_delivery(&self, delivery: Delivery) -> Result<Delivery, StoreError> {
        let metadata = serde_json::to_string(&delivery.metadata)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        sqlx::query(
            "INSERT INTO deliveries (id, tracking_number, customer_id, route_id, status,
                 scheduled_delivery, actual_delivery, delay_threshold_minutes,
                 auto_check_traffic, enable_recurring_checks, check_interval_minutes,
                 max_checks, checks_performed, min_delay_change_threshold,
                 min_hours_between_notifications, metadata, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15,
                 $16, $17, $18)",
        )
        .bind(delivery.id)
        .bind(&delivery.tracking_number)
        .bind(delivery.customer_id)
        .bind(delivery.route_id)
        .bind(delivery.status.as_str())
        .bind(delivery.scheduled_delivery)
        .bind(delivery.actual_delivery)
        .bind(delivery.delay_threshold_minutes.map(i64::from))
        .bind(delivery.auto_check_traffic)
        .bind(delivery.enable_recurring_checks)
        .bind(i64::from(delivery.check_interval_minutes))
        .bind(delivery.max_checks)
        .bind(i64::from(delivery.checks_performed))
        .bind(i64::from(delivery.min_delay_change_threshold))
        .bind(delivery.min_hours_between_notifications)
        .bind(&metadata)
        .bind(delivery.created_at)
        .bind(delivery.updated_at)
        .execute(&self.pool)
        .await
        .map_err(Self::map_err)?;
        Ok(delivery)
    }

    async fn get_delivery(&self, id: Uuid) -> Result<Option<Delivery>, StoreError> {
        sqlx::query("SELECT * FROM deliveries WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Self::map_err)?
            .map(|row| rows::delivery(&row))
            .transpose()
    }

    async fn get_delivery_by_tracking(
        &self,
        tracking_number: &str,
    ) -> Result<Option<Delivery>, StoreError> {
        sqlx::query("SELECT * FROM deliveries WHERE tracking_number = $1")
            .bind(tracking_number)
            .fetch_optional(&self.pool)
            .await
            .map_err(Self::map_err)?
            .map(|row| rows::delivery(&row))
            .transpose()
    }

    async fn update_delivery(&self, delivery: Delivery) -> Result<Delivery, StoreError> {
        let metadata = serde_json::to_string(&delivery.metadata)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        // `status` is deliberately absent: only the conditional transition
        // below may change it.
        let row = sqlx::query(
            "UPDATE deliveries SET scheduled_delivery = $2, actual_delivery = $3,
                 delay_threshold_minutes = $4, auto_check_traffic = $5,
                 enable_recurring_checks = $6, check_interval_minutes = $7,
                 max_checks = $8, checks_performed = $9, min_delay_change_threshold = $10,
                 min_hours_between_notifications = $11, metadata = $12, updated_at = $13
             WHERE id = $1
             RETURNING *",
        )
        .bind(delivery.id)
        .bind(delivery.scheduled_delivery)
        .bind(delivery.actual_delivery)
        .bind(delivery.delay_threshold_minutes.map(i64::from))
        .bind(delivery.auto_check_traffic)
        .bind(delivery.enable_recurring_checks)
        .bind(i64::from(delivery.check_interval_minutes))
        .bind(delivery.max_checks)
        .bind(i64::from(delivery.checks_performed))
        .bind(i64::from(delivery.min_delay_change_threshold))
        .bind(delivery.min_hours_between_notifications)
        .bind(&metadata)
        .bind(delivery.updated_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(Self::map_err)?
        .ok_or_else(|| StoreError::NotFound(format!("delivery {}", delivery.id)))?;
        rows::delivery(&row)
    }

    async fn list_deliveries_by_status(
        &self,
        status: DeliveryStatus,
        page: Page,
    ) -> Result<Vec<Delivery>, StoreError> {
        let (limit, offset) = Self::page_params(page);
        sqlx::query(
            "SELECT * FROM deliveries WHERE status = $1 ORDER BY created_at, id
             LIMIT $2 OFFSET $3",
        )
        .bind(status.as_str())
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(Self::map_err)?
        .iter()
        .map(rows::delivery)
        .collect()
    }

    async fn transition_delivery_status(
        &self,
        id: Uuid,
        to: DeliveryStatus,
        now: DateTime<Utc>,
    ) -> Result<Delivery, StoreError> {
        let allowed_from: Vec<String> = ALL_STATUSES
            .iter()
            .filter(|from| from.can_transition_to(to))
            .map(|from| from.as_str().to_owned())
            .collect();

        let row = sqlx::query(
            "UPDATE deliveries SET status = $2, updated_at = $3
             WHERE id = $1 AND status = ANY($4)
             RETURNING *",
        )
        .bind(id)
        .bind(to.as_str())
        .bind(now)
        .bind(&allowed_from)
        .fetch_optional(&self.pool)
        .await
        .map_err(Self::map_err)?;

        if let Some(row) = row {
            return rows::delivery(&row);
        }

        // Nothing matched: missing row or rejected transition.
        let current = self
            .get_delivery(id)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("delivery {id}")))?;
        Err(StoreError::Domain(DomainError::InvalidTransition {
            from: current.status,
            to,
        }))
    }

    async fn increment_delivery_checks(
        &self,
        id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Delivery, StoreError> {
        let row = sqlx::query(
            "UPDATE deliveries SET checks_performed = checks_performed + 1, updated_at = $2
             WHERE id = $1
             RETURNING *",
        )
        .bind(id)
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(Self::map_err)?
        .ok_or_else(|| StoreError::NotFound(format!("delivery {id}")))?;
        rows::delivery(&row)
    }

    async fn create_threshold(&self, threshold: Threshold) -> Result<Threshold, StoreError> {
        let channels = serde_json::to_string(&threshold.notification_channels)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        let mut tx = self.pool.begin().await.map_err(Self::map_err)?;
        if threshold.is_default {
            sqlx::query("UPDATE thresholds SET is_default = FALSE WHERE is_default")
                .execute(&mut *tx)
                .await
                .map_err(Self::map_err)?;
        }
        sqlx::query(
            "INSERT INTO thresholds (id, name, delay_minutes, notification_channels,
                 is_default, is_system)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(threshold.id)
        .bind(&threshold.name)
        .bind(i64::from(threshold.delay_minutes))
        .bind(&channels)
        .bind(threshold.is_default)
        .bind(threshold.is_system)
        .execute(&mut *tx)
        .await
        .map_err(Self::map_err)?;
        tx.commit().await.map_err(Self::map_err)?;
        Ok(threshold)
    }

    async fn get_threshold(&self, id: Uuid) -> Result<Option<Threshold>, StoreError> {
        sqlx::query("SELECT * FROM thresholds WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Self::map_err)?
            .map(|row| rows::threshold(&row))
            .transpose()
    }

    async fn list_thresholds(&self) -> Result<Vec<Threshold>, StoreError> {
        sqlx::query("SELECT * FROM thresholds ORDER BY name")
            .fetch_all(&self.pool)
            .await
            .map_err(Self::map_err)?
            .iter()
            .map(rows::threshold)
            .collect()
    }

    async fn get_default_threshold(&self) -> Result<Option<Threshold>, StoreError> {
        sqlx::query("SELECT * FROM thresholds WHERE is_default LIMIT 1")
            .fetch_optional(&self.pool)
            .await
            .map_err(Self::map_err)?
            .map(|row| rows::threshold(&row))
            .transpose()
    }

    async fn set_default_threshold(&self, id: Uuid) -> Result<Threshold, StoreError> {
        let mut tx = self.pool.begin().await.map_err(Self::map_err)?;
        sqlx::query("UPDATE thresholds SET is_default = FALSE WHERE is_default")
            .execute(&mut *tx)
            .await
            .map_err(Self::map_err)?;
        let row = sqlx::query(
            "UPDATE thresholds SET is_default = TRUE WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(Self::map_err)?
        .ok_or_else(|| StoreError::NotFound(format!("threshold {id}")))?;
        tx.commit().await.map_err(Self::map_err)?;
        rows::threshold(&row)
    }

    async fn delete_threshold(&self, id: Uuid) -> Result<(), StoreError> {
        let threshold = self
            .get_threshold(id)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("threshold {id}")))?;
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
        sqlx::query("DELETE FROM thresholds WHERE id = $1 AND NOT is_default AND NOT is_system")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(Self::map_err)?;
        Ok(())
    }

    async fn create_traffic_snapshot(
        &self,
        snapshot: TrafficSnapshot,
    ) -> Result<TrafficSnapshot, StoreError> {
        sqlx::query(
            "INSERT INTO traffic_snapshots (id, route_id, traffic_condition, delay_minutes,
                 duration_seconds, severity, incident_type, description, affected_area,
                 incident_lat, incident_lng, snapshot_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
        )
        .bind(snapshot.id)
        .bind(snapshot.route_id)
        .bind(snapshot.traffic_condition.as_str())
        .bind(i64::from(snapshot.delay_minutes))
        .bind(i64::from(snapshot.duration_seconds))
        .bind(snapshot.severity.as_str())
        .bind(snapshot.incident_type.as_str())
        .bind(&snapshot.description)
        .bind(&snapshot.affected_area)
        .bind(snapshot.incident_location.map(|c| c.lat))
        .bind(snapshot.incident_location.map(|c| c.lng))
        .bind(snapshot.snapshot_at)
        .execute(&self.pool)
        .await
        .map_err(Self::map_err)?;
        Ok(snapshot)
    }

    async fn list_snapshots_by_route(
        &self,
        route_id: Uuid,
        page: Page,
    ) -> Result<Vec<TrafficSnapshot>, StoreError> {
        let (limit, offset) = Self::page_params(page);
        sqlx::query(
            "SELECT * FROM traffic_snapshots WHERE route_id = $1
             ORDER BY snapshot_at DESC LIMIT $2 OFFSET $3",
        )
        .bind(route_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(Self::map_err)?
        .iter()
        .map(rows::snapshot)
        .collect()
    }

    async fn create_notification(
        &self,
        notification: Notification,
    ) -> Result<Notification, StoreError> {
        sqlx::query(
            "INSERT INTO notifications (id, delivery_id, channel, recipient, message,
                 status, external_id, sent_at, delay_minutes_at_send, error_message,
                 created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
        )
        .bind(notification.id)
        .bind(notification.delivery_id)
        .bind(notification.channel.as_str())
        .bind(&notification.recipient)
        .bind(&notification.message)
        .bind(notification.status.as_str())
        .bind(&notification.external_id)
        .bind(notification.sent_at)
        .bind(i64::from(notification.delay_minutes_at_send))
        .bind(&notification.error_message)
        .bind(notification.created_at)
        .execute(&self.pool)
        .await
        .map_err(Self::map_err)?;
        Ok(notification)
    }

    async fn list_notifications_by_delivery(
        &self,
        delivery_id: Uuid,
    ) -> Result<Vec<Notification>, StoreError> {
        sqlx::query(
            "SELECT * FROM notifications WHERE delivery_id = $1 ORDER BY created_at, id",
        )
        .bind(delivery_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Self::map_err)?
        .iter()
        .map(rows::notification)
        .collect()
    }

    async fn latest_sent_notification(
        &self,
        delivery_id: Uuid,
    ) -> Result<Option<Notification>, StoreError> {
        sqlx::query(
            "SELECT * FROM notifications
             WHERE delivery_id = $1 AND status = 'sent'
             ORDER BY sent_at DESC LIMIT 1",
        )
        .bind(delivery_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Self::map_err)?
        .map(|row| rows::notification(&row))
        .transpose()
    }

    async fn create_workflow_execution(
        &self,
        execution: WorkflowExecution,
    ) -> Result<WorkflowExecution, StoreError> {
        let steps = serde_json::to_string(&execution.steps)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        sqlx::query(
            "INSERT INTO workflow_executions (id, workflow_id, run_id, delivery_id,
                 status, steps, started_at, completed_at, error)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(execution.id)
        .bind(&execution.workflow_id)
        .bind(&execution.run_id)
        .bind(execution.delivery_id)
        .bind(execution.status.as_str())
        .bind(&steps)
        .bind(execution.started_at)
        .bind(execution.completed_at)
        .bind(&execution.error)
        .execute(&self.pool)
        .await
        .map_err(Self::map_err)?;
        Ok(execution)
    }

    async fn update_workflow_execution(
        &self,
        execution: WorkflowExecution,
    ) -> Result<WorkflowExecution, StoreError> {
        let steps = serde_json::to_string(&execution.steps)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        let result = sqlx::query(
            "UPDATE workflow_executions SET status = $2, steps = $3, completed_at = $4,
                 error = $5
             WHERE id = $1",
        )
        .bind(execution.id)
        .bind(execution.status.as_str())
        .bind(&steps)
        .bind(execution.completed_at)
        .bind(&execution.error)
        .execute(&self.pool)
        .await
        .map_err(Self::map_err)?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!(
                "workflow execution {}",
                execution.id
            )));
        }
        Ok(execution)
    }

    async fn get_workflow_execution(
        &self,
        workflow_id: &str,
        run_id: &str,
    ) -> Result<Option<WorkflowExecution>, StoreError> {
        sqlx::query(
            "SELECT * FROM workflow_executions WHERE workflow_id = $1 AND run_id = $2",
        )
        .bind(workflow_id)
        .bind(run_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Self::map_err)?
        .map(|row| rows::execution(&row))
        .transpose()
    }

    async fn latest_execution_by_workflow_id(
        &self,
        workflow_id: &str,
    ) -> Result<Option<WorkflowExecution>, StoreError> {
        sqlx::query(
            "SELECT * FROM workflow_executions WHERE workflow_id = $1
             ORDER BY started_at DESC LIMIT 1",
        )
        .bind(workflow_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Self::map_err)?
        .map(|row| rows::execution(&row))
        .transpose()
    }

    async fn list_executions_by_delivery(
        &self,
        delivery_id: Uuid,
    ) -> Result<Vec<WorkflowExecution>, StoreError> {
        sqlx::query(
            "SELECT * FROM workflow_executions WHERE delivery_id = $1
             ORDER BY started_at, id",
        )
        .bind(delivery_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Self::map_err)?
        .iter()
        .map(rows::execution)
        .collect()
    }
}

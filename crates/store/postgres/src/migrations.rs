use sqlx::PgPool;

/// Run database migrations, creating the required tables if they do not
/// exist. DDL is idempotent; the server runs this on startup.
///
/// # Errors
///
/// Returns a [`sqlx::Error`] if any DDL statement fails.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    let statements = [
        "CREATE TABLE IF NOT EXISTS customers (
            id UUID PRIMARY KEY,
            name TEXT NOT NULL,
            email TEXT NOT NULL UNIQUE,
            phone TEXT,
            created_at TIMESTAMPTZ NOT NULL,
            updated_at TIMESTAMPTZ NOT NULL
        )",
        "CREATE TABLE IF NOT EXISTS routes (
            id UUID PRIMARY KEY,
            origin_address TEXT NOT NULL,
            origin_lat DOUBLE PRECISION,
            origin_lng DOUBLE PRECISION,
            destination_address TEXT NOT NULL,
            destination_lat DOUBLE PRECISION,
            destination_lng DOUBLE PRECISION,
            distance_meters BIGINT NOT NULL DEFAULT 0,
            normal_duration_seconds BIGINT NOT NULL DEFAULT 0,
            current_duration_seconds BIGINT,
            traffic_condition TEXT,
            created_at TIMESTAMPTZ NOT NULL,
            updated_at TIMESTAMPTZ NOT NULL
        )",
        "CREATE TABLE IF NOT EXISTS deliveries (
            id UUID PRIMARY KEY,
            tracking_number TEXT NOT NULL UNIQUE,
            customer_id UUID NOT NULL REFERENCES customers(id),
            route_id UUID NOT NULL REFERENCES routes(id),
            status TEXT NOT NULL,
            scheduled_delivery TIMESTAMPTZ NOT NULL,
            actual_delivery TIMESTAMPTZ,
            delay_threshold_minutes BIGINT,
            auto_check_traffic BOOLEAN NOT NULL,
            enable_recurring_checks BOOLEAN NOT NULL,
            check_interval_minutes BIGINT NOT NULL,
            max_checks INTEGER NOT NULL,
            checks_performed BIGINT NOT NULL DEFAULT 0,
            min_delay_change_threshold BIGINT NOT NULL,
            min_hours_between_notifications DOUBLE PRECISION NOT NULL,
            metadata TEXT NOT NULL DEFAULT '{}',
            created_at TIMESTAMPTZ NOT NULL,
            updated_at TIMESTAMPTZ NOT NULL
        )",
        "CREATE INDEX IF NOT EXISTS deliveries_status_idx ON deliveries(status)",
        "CREATE TABLE IF NOT EXISTS thresholds (
            id UUID PRIMARY KEY,
            name TEXT NOT NULL,
            delay_minutes BIGINT NOT NULL,
            notification_channels TEXT NOT NULL,
            is_default BOOLEAN NOT NULL DEFAULT FALSE,
            is_system BOOLEAN NOT NULL DEFAULT FALSE
        )",
        "CREATE TABLE IF NOT EXISTS traffic_snapshots (
            id UUID PRIMARY KEY,
            route_id UUID NOT NULL REFERENCES routes(id),
            traffic_condition TEXT NOT NULL,
            delay_minutes BIGINT NOT NULL,
            duration_seconds BIGINT NOT NULL,
            severity TEXT NOT NULL,
            incident_type TEXT NOT NULL,
            description TEXT NOT NULL,
            affected_area TEXT NOT NULL,
            incident_lat DOUBLE PRECISION,
            incident_lng DOUBLE PRECISION,
            snapshot_at TIMESTAMPTZ NOT NULL
        )",
        "CREATE INDEX IF NOT EXISTS traffic_snapshots_route_idx
            ON traffic_snapshots(route_id, snapshot_at DESC)",
        "CREATE TABLE IF NOT EXISTS notifications (
            id UUID PRIMARY KEY,
            delivery_id UUID NOT NULL REFERENCES deliveries(id),
            channel TEXT NOT NULL,
            recipient TEXT NOT NULL,
            message TEXT NOT NULL,
            status TEXT NOT NULL,
            external_id TEXT,
            sent_at TIMESTAMPTZ,
            delay_minutes_at_send BIGINT NOT NULL,
            error_message TEXT,
            created_at TIMESTAMPTZ NOT NULL
        )",
        "CREATE INDEX IF NOT EXISTS notifications_delivery_idx
            ON notifications(delivery_id, created_at)",
        "CREATE TABLE IF NOT EXISTS workflow_executions (
            id UUID PRIMARY KEY,
            workflow_id TEXT NOT NULL,
            run_id TEXT NOT NULL,
            delivery_id UUID NOT NULL REFERENCES deliveries(id),
            status TEXT NOT NULL,
            steps TEXT NOT NULL,
            started_at TIMESTAMPTZ NOT NULL,
            completed_at TIMESTAMPTZ,
            error TEXT,
            UNIQUE (workflow_id, run_id)
        )",
        "CREATE INDEX IF NOT EXISTS workflow_executions_workflow_idx
            ON workflow_executions(workflow_id, started_at DESC)",
    ];

    for statement in statements {
        sqlx::query(statement).execute(pool).await?;
    }

    Ok(())
}

//! Row-to-entity decoding helpers.

use sqlx::Row;
use sqlx::postgres::PgRow;

use freightwatch_core::{
    Coordinates, Customer, Delivery, DeliveryStatus, ExecutionSteps, Notification,
    NotificationChannel, NotificationStatus, Route, SnapshotSeverity, Threshold, TrafficCondition,
    TrafficSnapshot, WorkflowExecution, WorkflowStatus,
};
use freightwatch_core::snapshot::IncidentType;
use freightwatch_store::StoreError;

fn backend(e: sqlx::Error) -> StoreError {
    StoreError::Backend(e.to_string())
}

fn decode_u32(row: &PgRow, column: &str) -> Result<u32, StoreError> {
    let value: i64 = row.try_get(column).map_err(backend)?;
    u32::try_from(value)
        .map_err(|_| StoreError::Serialization(format!("column {column} out of range: {value}")))
}

fn decode_opt_u32(row: &PgRow, column: &str) -> Result<Option<u32>, StoreError> {
    let value: Option<i64> = row.try_get(column).map_err(backend)?;
    value
        .map(|v| {
            u32::try_from(v).map_err(|_| {
                StoreError::Serialization(format!("column {column} out of range: {v}"))
            })
        })
        .transpose()
}

fn decode_coords(
    row: &PgRow,
    lat_column: &str,
    lng_column: &str,
) -> Result<Option<Coordinates>, StoreError> {
    let lat: Option<f64> = row.try_get(lat_column).map_err(backend)?;
    let lng: Option<f64> = row.try_get(lng_column).map_err(backend)?;
    Ok(match (lat, lng) {
        (Some(lat), Some(lng)) => Some(Coordinates::new(lat, lng)),
        _ => None,
    })
}

fn parse_enum<T>(
    raw: &str,
    column: &str,
    parse: impl Fn(&str) -> Option<T>,
) -> Result<T, StoreError> {
    parse(raw)
        .ok_or_else(|| StoreError::Serialization(format!("invalid {column} value: {raw}")))
}

pub(crate) fn customer(row: &PgRow) -> Result<Customer, StoreError> {
    Ok(Customer {
        id: row.try_get("id").map_err(backend)?,
        name: row.try_get("name").map_err(backend)?,
        email: row.try_get("email").map_err(backend)?,
        phone: row.try_get("phone").map_err(backend)?,
        created_at: row.try_get("created_at").map_err(backend)?,
        updated_at: row.try_get("updated_at").map_err(backend)?,
    })
}

pub(crate) fn route(row: &PgRow) -> Result<Route, StoreError> {
    let condition: Option<String> = row.try_get("traffic_condition").map_err(backend)?;
    Ok(Route {
        id: row.try_get("id").map_err(backend)?,
        origin_address: row.try_get("origin_address").map_err(backend)?,
        origin_coords: decode_coords(row, "origin_lat", "origin_lng")?,
        destination_address: row.try_get("destination_address").map_err(backend)?,
        destination_coords: decode_coords(row, "destination_lat", "destination_lng")?,
        distance_meters: decode_u32(row, "distance_meters")?,
        normal_duration_seconds: decode_u32(row, "normal_duration_seconds")?,
        current_duration_seconds: decode_opt_u32(row, "current_duration_seconds")?,
        traffic_condition: condition
            .as_deref()
            .map(|c| parse_enum(c, "traffic_condition", TrafficCondition::parse))
            .transpose()?,
        created_at: row.try_get("created_at").map_err(backend)?,
        updated_at: row.try_get("updated_at").map_err(backend)?,
    })
}

pub(crate) fn delivery(row: &PgRow) -> Result<Delivery, StoreError> {
    let status: String = row.try_get("status").map_err(backend)?;
    let metadata: String = row.try_get("metadata").map_err(backend)?;
    Ok(Delivery {
        id: row.try_get("id").map_err(backend)?,
        tracking_number: row.try_get("tracking_number").map_err(backend)?,
        customer_id: row.try_get("customer_id").map_err(backend)?,
        route_id: row.try_get("route_id").map_err(backend)?,
        status: parse_enum(&status, "status", DeliveryStatus::parse)?,
        scheduled_delivery: row.try_get("scheduled_delivery").map_err(backend)?,
        actual_delivery: row.try_get("actual_delivery").map_err(backend)?,
        delay_threshold_minutes: decode_opt_u32(row, "delay_threshold_minutes")?,
        auto_check_traffic: row.try_get("auto_check_traffic").map_err(backend)?,
        enable_recurring_checks: row.try_get("enable_recurring_checks").map_err(backend)?,
        check_interval_minutes: decode_u32(row, "check_interval_minutes")?,
        max_checks: row.try_get("max_checks").map_err(backend)?,
        checks_performed: decode_u32(row, "checks_performed")?,
        min_delay_change_threshold: decode_u32(row, "min_delay_change_threshold")?,
        min_hours_between_notifications: row
            .try_get("min_hours_between_notifications")
            .map_err(backend)?,
        metadata: serde_json::from_str(&metadata)
            .map_err(|e| StoreError::Serialization(format!("delivery metadata: {e}")))?,
        created_at: row.try_get("created_at").map_err(backend)?,
        updated_at: row.try_get("updated_at").map_err(backend)?,
    })
}

pub(crate) fn threshold(row: &PgRow) -> Result<Threshold, StoreError> {
    let channels: String = row.try_get("notification_channels").map_err(backend)?;
    Ok(Threshold {
        id: row.try_get("id").map_err(backend)?,
        name: row.try_get("name").map_err(backend)?,
        delay_minutes: decode_u32(row, "delay_minutes")?,
        notification_channels: serde_json::from_str(&channels)
            .map_err(|e| StoreError::Serialization(format!("threshold channels: {e}")))?,
        is_default: row.try_get("is_default").map_err(backend)?,
        is_system: row.try_get("is_system").map_err(backend)?,
    })
}

pub(crate) fn snapshot(row: &PgRow) -> Result<TrafficSnapshot, StoreError> {
    let condition: String = row.try_get("traffic_condition").map_err(backend)?;
    let severity: String = row.try_get("severity").map_err(backend)?;
    let incident: String = row.try_get("incident_type").map_err(backend)?;
    Ok(TrafficSnapshot {
        id: row.try_get("id").map_err(backend)?,
        route_id: row.try_get("route_id").map_err(backend)?,
        traffic_condition: parse_enum(&condition, "traffic_condition", TrafficCondition::parse)?,
        delay_minutes: decode_u32(row, "delay_minutes")?,
        duration_seconds: decode_u32(row, "duration_seconds")?,
        severity: parse_enum(&severity, "severity", SnapshotSeverity::parse)?,
        incident_type: parse_enum(&incident, "incident_type", IncidentType::parse)?,
        description: row.try_get("description").map_err(backend)?,
        affected_area: row.try_get("affected_area").map_err(backend)?,
        incident_location: decode_coords(row, "incident_lat", "incident_lng")?,
        snapshot_at: row.try_get("snapshot_at").map_err(backend)?,
    })
}

pub(crate) fn notification(row: &PgRow) -> Result<Notification, StoreError> {
    let channel: String = row.try_get("channel").map_err(backend)?;
    let status: String = row.try_get("status").map_err(backend)?;
    Ok(Notification {
        id: row.try_get("id").map_err(backend)?,
        delivery_id: row.try_get("delivery_id").map_err(backend)?,
        channel: parse_enum(&channel, "channel", NotificationChannel::parse)?,
        recipient: row.try_get("recipient").map_err(backend)?,
        message: row.try_get("message").map_err(backend)?,
        status: parse_enum(&status, "status", NotificationStatus::parse)?,
        external_id: row.try_get("external_id").map_err(backend)?,
        sent_at: row.try_get("sent_at").map_err(backend)?,
        delay_minutes_at_send: decode_u32(row, "delay_minutes_at_send")?,
        error_message: row.try_get("error_message").map_err(backend)?,
        created_at: row.try_get("created_at").map_err(backend)?,
    })
}

pub(crate) fn execution(row: &PgRow) -> Result<WorkflowExecution, StoreError> {
    let status: String = row.try_get("status").map_err(backend)?;
    let steps: String = row.try_get("steps").map_err(backend)?;
    Ok(WorkflowExecution {
        id: row.try_get("id").map_err(backend)?,
        workflow_id: row.try_get("workflow_id").map_err(backend)?,
        run_id: row.try_get("run_id").map_err(backend)?,
        delivery_id: row.try_get("delivery_id").map_err(backend)?,
        status: parse_enum(&status, "status", WorkflowStatus::parse)?,
        steps: serde_json::from_str::<ExecutionSteps>(&steps)
            .map_err(|e| StoreError::Serialization(format!("execution steps: {e}")))?,
        started_at: row.try_get("started_at").map_err(backend)?,
        completed_at: row.try_get("completed_at").map_err(backend)?,
        error: row.try_get("error").map_err(backend)?,
    })
}

pub mod coords;
pub mod customer;
pub mod delivery;
pub mod error;
pub mod execution;
pub mod message;
pub mod notification;
pub mod route;
pub mod snapshot;
pub mod threshold;
pub mod traffic;

pub use coords::Coordinates;
pub use customer::Customer;
pub use delivery::{Delivery, DeliveryStatus};
pub use error::DomainError;
pub use execution::{ExecutionSteps, StepState, WorkflowExecution, WorkflowStatus};
pub use message::{DelayContext, GeneratedMessage};
pub use notification::{Notification, NotificationStatus};
pub use route::Route;
pub use snapshot::{IncidentType, SnapshotSeverity, TrafficSnapshot};
pub use threshold::{NotificationChannel, Threshold};
pub use traffic::{TrafficCondition, TrafficEstimate, delay_minutes_ceil, delay_minutes_round};

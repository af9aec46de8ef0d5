//! PostgreSQL-backed [`Repository`](freightwatch_store::Repository).
//!
//! Uses `sqlx::PgPool` for connection pooling. Enum columns are stored as
//! TEXT in their snake_case form; JSON-shaped columns (channel lists,
//! delivery metadata, execution steps) are stored as serialized TEXT. The
//! delivery status machine is enforced with a conditional `UPDATE … WHERE
//! status = ANY(allowed)` so invalid transitions never touch the row.

pub mod config;
pub mod migrations;
mod rows;
mod store;

pub use config::PostgresConfig;
pub use store::PostgresRepository;

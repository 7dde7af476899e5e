//! PostgreSQL storage layer for the helpdesk backend.
//!
//! Provides the connection pool, embedded SQL migrations, the Postgres
//! implementations of the `helpdesk-sla` store contracts, and the models
//! that stay database-only (admin users, in-app notifications).

pub mod error;
pub mod migrations;
pub mod models;
pub mod pool;
pub mod stores;

pub use error::DbError;
pub use migrations::run_migrations;
pub use models::notification::{CreateNotification, Notification};
pub use models::user::User;
pub use pool::DbPool;
pub use stores::{PgEscalationStore, PgTicketStore};

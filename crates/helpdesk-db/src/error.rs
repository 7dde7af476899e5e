//! Error types for the helpdesk-db crate.

use helpdesk_sla::SlaError;
use thiserror::Error;

/// Database operation errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// Failed to establish or acquire a database connection.
    #[error("Database connection failed: {0}")]
    ConnectionFailed(#[source] sqlx::Error),

    /// A database migration failed to apply.
    #[error("Migration failed: {0}")]
    MigrationFailed(#[source] sqlx::migrate::MigrateError),

    /// A database query failed to execute.
    #[error("Query failed: {0}")]
    QueryFailed(#[source] sqlx::Error),
}

impl DbError {
    /// Check if this error indicates a connection problem.
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(self, DbError::ConnectionFailed(_))
    }
}

impl From<DbError> for SlaError {
    fn from(err: DbError) -> Self {
        SlaError::Store(err.to_string())
    }
}

/// Map a raw query error into the domain store error.
pub(crate) fn store_err(err: sqlx::Error) -> SlaError {
    SlaError::Store(DbError::QueryFailed(err).to_string())
}

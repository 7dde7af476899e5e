//! Error types for the SLA escalation domain.

use thiserror::Error;
use uuid::Uuid;

/// Result alias used throughout the domain crates.
pub type Result<T> = std::result::Result<T, SlaError>;

/// Errors surfaced by the escalation domain and its store contracts.
#[derive(Debug, Error)]
pub enum SlaError {
    /// Invalid configuration or input.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// A storage backend failed. The inner message carries backend context
    /// (SQL error text for Postgres, never anything for the in-memory store).
    #[error("Store error: {0}")]
    Store(String),

    /// Ticket does not exist.
    #[error("Ticket not found: {0}")]
    TicketNotFound(Uuid),

    /// Attempted to create an `escalated` record for a ticket with no
    /// unresolved `warning` record. The evaluator's ordering contract makes
    /// this unreachable in normal operation, so it is a logic error worth
    /// failing loudly on.
    #[error("Staged escalation violated for ticket {0}: no unresolved warning record")]
    StagingViolation(Uuid),
}

impl SlaError {
    /// Check if this error indicates a storage problem.
    #[must_use]
    pub fn is_store_error(&self) -> bool {
        matches!(self, SlaError::Store(_))
    }
}

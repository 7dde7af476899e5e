//! Notification sinks for SLA warnings and escalations.
//!
//! The dispatcher talks to a [`NotificationSink`] trait so the delivery
//! channel can be swapped out; [`TelegramSink`] is the production
//! implementation and [`InMemorySink`] backs the tests. Admin in-app
//! notifications go through the separate [`AdminNotifier`] trait because
//! they fan out to every admin user rather than to a single channel.

mod admin;
mod telegram;

pub use admin::{AdminNotifier, InMemoryAdminNotifier, PgAdminNotifier};
pub use telegram::TelegramSink;

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use helpdesk_sla::TicketPriority;
use serde::Serialize;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Errors produced when a notification cannot be delivered.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("notifier configuration error: {0}")]
    Configuration(String),

    #[error("notification delivery failed: {0}")]
    Delivery(String),

    #[error("notification transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Payload for an SLA warning: the response budget has elapsed with no
/// agent response.
#[derive(Debug, Clone, Serialize)]
pub struct SlaWarningNotification {
    pub ticket_id: Uuid,
    pub ticket_number: String,
    pub subject: String,
    pub priority: TicketPriority,
    pub clock_started_at: DateTime<Utc>,
    pub elapsed_minutes: i64,
    pub budget_minutes: i64,
}

/// Payload for an admin escalation: the escalation threshold has elapsed
/// after an unresolved warning.
#[derive(Debug, Clone, Serialize)]
pub struct SlaEscalationNotification {
    pub ticket_id: Uuid,
    pub ticket_number: String,
    pub subject: String,
    pub priority: TicketPriority,
    pub clock_started_at: DateTime<Utc>,
    pub elapsed_minutes: i64,
    pub threshold_minutes: i64,
}

/// Outbound delivery channel for SLA notifications.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn send_warning(&self, note: &SlaWarningNotification) -> Result<(), NotifyError>;

    async fn send_escalation(&self, note: &SlaEscalationNotification) -> Result<(), NotifyError>;
}

/// In-memory sink for tests. Records every delivered notification and can
/// be told to fail deliveries for specific tickets.
#[derive(Default)]
pub struct InMemorySink {
    warnings: RwLock<Vec<SlaWarningNotification>>,
    escalations: RwLock<Vec<SlaEscalationNotification>>,
    failing: RwLock<HashSet<Uuid>>,
}

impl InMemorySink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// All deliveries for `ticket_id` will fail until cleared.
    pub async fn fail_for(&self, ticket_id: Uuid) {
        self.failing.write().await.insert(ticket_id);
    }

    pub async fn clear_failures(&self) {
        self.failing.write().await.clear();
    }

    pub async fn warnings(&self) -> Vec<SlaWarningNotification> {
        self.warnings.read().await.clone()
    }

    pub async fn escalations(&self) -> Vec<SlaEscalationNotification> {
        self.escalations.read().await.clone()
    }

    async fn check_failure(&self, ticket_id: Uuid) -> Result<(), NotifyError> {
        if self.failing.read().await.contains(&ticket_id) {
            return Err(NotifyError::Delivery(format!(
                "injected failure for ticket {ticket_id}"
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl NotificationSink for InMemorySink {
    async fn send_warning(&self, note: &SlaWarningNotification) -> Result<(), NotifyError> {
        self.check_failure(note.ticket_id).await?;
        self.warnings.write().await.push(note.clone());
        Ok(())
    }

    async fn send_escalation(&self, note: &SlaEscalationNotification) -> Result<(), NotifyError> {
        self.check_failure(note.ticket_id).await?;
        self.escalations.write().await.push(note.clone());
        Ok(())
    }
}

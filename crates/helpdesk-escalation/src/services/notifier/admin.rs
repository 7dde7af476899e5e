//! Admin fan-out for escalated tickets.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use helpdesk_db::{CreateNotification, User};
use serde_json::json;
use tokio::sync::RwLock;

use super::{NotifyError, SlaEscalationNotification};

/// Fans an admin-level escalation out to every administrator account.
/// Returns the number of admins notified.
#[async_trait]
pub trait AdminNotifier: Send + Sync {
    async fn notify_escalated(&self, note: &SlaEscalationNotification) -> Result<u64, NotifyError>;
}

/// Creates one in-app notification row per admin user.
pub struct PgAdminNotifier {
    pool: sqlx::PgPool,
}

impl PgAdminNotifier {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AdminNotifier for PgAdminNotifier {
    async fn notify_escalated(&self, note: &SlaEscalationNotification) -> Result<u64, NotifyError> {
        let admins = User::find_admins(&self.pool)
            .await
            .map_err(|e| NotifyError::Delivery(e.to_string()))?;
        if admins.is_empty() {
            tracing::warn!(
                ticket_id = %note.ticket_id,
                "no admin accounts found, escalation has no in-app recipients"
            );
            return Ok(0);
        }

        let data = json!({
            "ticket_id": note.ticket_id,
            "ticket_number": note.ticket_number,
            "priority": note.priority,
            "elapsed_minutes": note.elapsed_minutes,
            "threshold_minutes": note.threshold_minutes,
        });

        let mut notified = 0u64;
        for admin in admins {
            create_admin_notification(&self.pool, admin.id, note, &data).await?;
            notified += 1;
        }
        Ok(notified)
    }
}

async fn create_admin_notification(
    pool: &sqlx::PgPool,
    user_id: uuid::Uuid,
    note: &SlaEscalationNotification,
    data: &serde_json::Value,
) -> Result<(), NotifyError> {
    helpdesk_db::Notification::create(
        pool,
        CreateNotification {
            user_id,
            ticket_id: Some(note.ticket_id),
            kind: "ticket_escalated".to_string(),
            title: format!("Ticket {} needs attention", note.ticket_number),
            message: format!(
                "\"{}\" ({} priority) has gone {} minutes without a response, past the {}-minute escalation threshold.",
                note.subject, note.priority, note.elapsed_minutes, note.threshold_minutes
            ),
            data: Some(data.clone()),
        },
    )
    .await
    .map_err(|e| NotifyError::Delivery(e.to_string()))?;
    Ok(())
}

/// In-memory notifier for tests. Pretends a fixed number of admins exist.
pub struct InMemoryAdminNotifier {
    admin_count: u64,
    notified: RwLock<Vec<SlaEscalationNotification>>,
    calls: AtomicU64,
}

impl InMemoryAdminNotifier {
    pub fn new(admin_count: u64) -> Arc<Self> {
        Arc::new(Self {
            admin_count,
            notified: RwLock::new(Vec::new()),
            calls: AtomicU64::new(0),
        })
    }

    pub async fn notifications(&self) -> Vec<SlaEscalationNotification> {
        self.notified.read().await.clone()
    }

    pub fn call_count(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AdminNotifier for InMemoryAdminNotifier {
    async fn notify_escalated(&self, note: &SlaEscalationNotification) -> Result<u64, NotifyError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.notified.write().await.push(note.clone());
        Ok(self.admin_count)
    }
}

//! Persistent in-app notifications.
//!
//! The escalation dispatcher creates one row per administrator when a
//! ticket reaches the escalated level; the web layer (out of scope here)
//! reads and marks them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// An in-app notification row.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    /// Recipient account.
    pub user_id: Uuid,
    /// Ticket the notification is about, if any.
    pub ticket_id: Option<Uuid>,
    /// Notification kind, e.g. `ticket_escalated`.
    pub kind: String,
    pub title: String,
    pub message: String,
    /// Structured payload for the client.
    pub data: Option<serde_json::Value>,
    pub is_read: bool,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Input for creating a notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateNotification {
    pub user_id: Uuid,
    pub ticket_id: Option<Uuid>,
    pub kind: String,
    pub title: String,
    pub message: String,
    pub data: Option<serde_json::Value>,
}

impl Notification {
    /// Create a notification.
    pub async fn create(
        pool: &sqlx::PgPool,
        input: CreateNotification,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as(
            r"
            INSERT INTO notifications (user_id, ticket_id, kind, title, message, data)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            ",
        )
        .bind(input.user_id)
        .bind(input.ticket_id)
        .bind(&input.kind)
        .bind(&input.title)
        .bind(&input.message)
        .bind(&input.data)
        .fetch_one(pool)
        .await
    }
}

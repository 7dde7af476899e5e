//! Ticket and escalation record types shared across the workspace.
//!
//! These mirror the `tickets` and `ticket_escalations` tables; the Postgres
//! store in `helpdesk-db` maps them with `sqlx`, the in-memory stores hold
//! them directly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Ticket priority tier. Determines the SLA response budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "ticket_priority", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TicketPriority {
    Low,
    Medium,
    High,
    Urgent,
}

impl TicketPriority {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Urgent => "urgent",
        }
    }
}

impl std::fmt::Display for TicketPriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ticket lifecycle status. Only `Open` tickets are eligible for
/// escalation evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "ticket_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    /// New, waiting for a first staff response.
    Open,
    /// Staff is working on it.
    Processing,
    /// Waiting on the customer.
    Pending,
    /// Resolution posted.
    Resolved,
    /// Closed out.
    Closed,
}

impl TicketStatus {
    /// Whether tickets in this status are watched by the escalation scan.
    #[must_use]
    pub fn is_open(self) -> bool {
        matches!(self, Self::Open)
    }
}

/// Escalation stage. `Warning` always precedes `Escalated` within a breach
/// cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "escalation_level", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum EscalationLevel {
    /// First stage: response budget exceeded, lightweight channel notified.
    Warning,
    /// Second stage: extended threshold exceeded, administrators notified.
    Escalated,
}

/// Outbound medium an escalation record was announced on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "notification_channel", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum NotificationChannel {
    /// Support-channel chat bot.
    Telegram,
    /// Persistent in-app notification for administrators.
    AdminInbox,
}

/// A support ticket, restricted to the fields the escalation engine reads
/// and writes plus the display fields notifications reference.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Ticket {
    /// Unique identifier.
    pub id: Uuid,

    /// Human-facing ticket number, e.g. `TKT-2026-000042`.
    pub ticket_number: String,

    /// Short subject line.
    pub subject: String,

    /// Priority tier, fixes the SLA budget.
    pub priority: TicketPriority,

    /// Lifecycle status.
    pub status: TicketStatus,

    /// Staff member the ticket is assigned to, if any.
    pub assigned_to: Option<Uuid>,

    /// Anchor of the current response-waiting window. Replaced, never
    /// appended, on every status transition.
    pub response_clock_start: DateTime<Utc>,

    /// When the first warning was ever raised. Set once, never reset.
    pub first_escalated_at: Option<DateTime<Utc>>,

    /// True once the ticket reached admin escalation for the current
    /// breach cycle. Cleared when the ticket is reopened.
    pub is_escalated: bool,

    /// When the ticket was marked resolved.
    pub resolved_at: Option<DateTime<Utc>>,

    /// When the ticket was closed.
    pub closed_at: Option<DateTime<Utc>>,

    /// When the ticket was created.
    pub created_at: DateTime<Utc>,
}

/// One entry in a ticket's escalation history. Append-only; resolved in
/// bulk when the ticket leaves `open`, never hard-deleted.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct TicketEscalation {
    /// Unique identifier.
    pub id: Uuid,

    /// Owning ticket.
    pub ticket_id: Uuid,

    /// Warning or admin escalation.
    pub level: EscalationLevel,

    /// When the record was raised.
    pub escalated_at: DateTime<Utc>,

    /// Medium used to announce it.
    pub channel: NotificationChannel,

    /// Whether the breach cycle this record belongs to has closed.
    pub is_resolved: bool,

    /// When the record was resolved.
    pub resolved_at: Option<DateTime<Utc>>,
}

/// Input for appending an escalation record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTicketEscalation {
    pub ticket_id: Uuid,
    pub level: EscalationLevel,
    pub escalated_at: DateTime<Utc>,
    pub channel: NotificationChannel,
}

/// Snapshot of a ticket's unresolved escalation records, as the evaluator
/// consumes it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EscalationHistory {
    /// An unresolved `warning` record exists.
    pub unresolved_warning: bool,
    /// An unresolved `escalated` record exists.
    pub unresolved_escalation: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_serialization() {
        let json = serde_json::to_string(&TicketPriority::Urgent).unwrap();
        assert_eq!(json, "\"urgent\"");

        let restored: TicketPriority = serde_json::from_str("\"medium\"").unwrap();
        assert_eq!(restored, TicketPriority::Medium);
    }

    #[test]
    fn test_status_is_open() {
        assert!(TicketStatus::Open.is_open());
        assert!(!TicketStatus::Processing.is_open());
        assert!(!TicketStatus::Pending.is_open());
        assert!(!TicketStatus::Resolved.is_open());
        assert!(!TicketStatus::Closed.is_open());
    }

    #[test]
    fn test_level_serialization() {
        let json = serde_json::to_string(&EscalationLevel::Escalated).unwrap();
        assert_eq!(json, "\"escalated\"");
        let json = serde_json::to_string(&EscalationLevel::Warning).unwrap();
        assert_eq!(json, "\"warning\"");
    }

    #[test]
    fn test_channel_serialization() {
        let json = serde_json::to_string(&NotificationChannel::AdminInbox).unwrap();
        assert_eq!(json, "\"admin_inbox\"");
    }

    #[test]
    fn test_history_default_is_clean() {
        let history = EscalationHistory::default();
        assert!(!history.unresolved_warning);
        assert!(!history.unresolved_escalation);
    }
}

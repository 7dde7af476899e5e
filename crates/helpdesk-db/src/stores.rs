//! Postgres implementations of the `helpdesk-sla` store contracts.
//!
//! Uniqueness of unresolved records is enforced by a partial unique index;
//! a losing concurrent insert surfaces as `Ok(None)` via
//! `ON CONFLICT DO NOTHING`, matching the contract. Overlapping scan passes
//! may read the same tickets, but the index collapses their writes into a
//! single record per level per breach cycle.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use helpdesk_sla::{
    CreateTicketEscalation, EscalationHistory, EscalationLevel, EscalationStore, Result, SlaError,
    Ticket, TicketEscalation, TicketStatus, TicketStore,
};

use crate::error::store_err;

/// Ticket timer fields backed by the `tickets` table.
#[derive(Debug, Clone)]
pub struct PgTicketStore {
    pool: PgPool,
}

impl PgTicketStore {
    /// Create a store over an existing pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TicketStore for PgTicketStore {
    async fn list_open_unescalated(&self, limit: i64) -> Result<Vec<Ticket>> {
        sqlx::query_as(
            r"
            SELECT * FROM tickets
            WHERE status = 'open' AND is_escalated = FALSE
            ORDER BY response_clock_start ASC
            LIMIT $1
            ",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(store_err)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Ticket>> {
        sqlx::query_as("SELECT * FROM tickets WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(store_err)
    }

    async fn set_first_escalated_at(&self, id: Uuid, at: DateTime<Utc>) -> Result<()> {
        // Set once: the WHERE clause makes repeat calls no-ops.
        sqlx::query(
            r"
            UPDATE tickets
            SET first_escalated_at = $2, updated_at = NOW()
            WHERE id = $1 AND first_escalated_at IS NULL
            ",
        )
        .bind(id)
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(store_err)?;
        Ok(())
    }

    async fn mark_escalated(&self, id: Uuid) -> Result<()> {
        let result = sqlx::query(
            r"
            UPDATE tickets
            SET is_escalated = TRUE, updated_at = NOW()
            WHERE id = $1
            ",
        )
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(store_err)?;

        if result.rows_affected() == 0 {
            return Err(SlaError::TicketNotFound(id));
        }
        Ok(())
    }

    async fn reset_response_clock(
        &self,
        id: Uuid,
        at: DateTime<Utc>,
        clear_escalated: bool,
    ) -> Result<()> {
        let result = sqlx::query(
            r"
            UPDATE tickets
            SET response_clock_start = $2,
                is_escalated = (is_escalated AND NOT $3),
                updated_at = NOW()
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(at)
        .bind(clear_escalated)
        .execute(&self.pool)
        .await
        .map_err(store_err)?;

        if result.rows_affected() == 0 {
            return Err(SlaError::TicketNotFound(id));
        }
        Ok(())
    }

    async fn update_status(
        &self,
        id: Uuid,
        status: TicketStatus,
        at: DateTime<Utc>,
    ) -> Result<Ticket> {
        sqlx::query_as(
            r"
            UPDATE tickets
            SET status = $2,
                resolved_at = CASE WHEN $2 = 'resolved'::ticket_status THEN $3 ELSE resolved_at END,
                closed_at = CASE WHEN $2 = 'closed'::ticket_status THEN $3 ELSE closed_at END,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            ",
        )
        .bind(id)
        .bind(status)
        .bind(at)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_err)?
        .ok_or(SlaError::TicketNotFound(id))
    }
}

/// Escalation record log backed by the `ticket_escalations` table.
#[derive(Debug, Clone)]
pub struct PgEscalationStore {
    pool: PgPool,
}

impl PgEscalationStore {
    /// Create a store over an existing pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EscalationStore for PgEscalationStore {
    async fn create(&self, input: CreateTicketEscalation) -> Result<Option<TicketEscalation>> {
        let mut tx = self.pool.begin().await.map_err(store_err)?;

        if input.level == EscalationLevel::Escalated {
            // Lock the unresolved warning row for the duration of the
            // transaction. A concurrent resolve_all_unresolved sweep blocks
            // until commit, so the staged precondition cannot be yanked out
            // between check and insert.
            let warning_id: Option<Uuid> = sqlx::query_scalar(
                r"
                SELECT id FROM ticket_escalations
                WHERE ticket_id = $1 AND level = 'warning' AND NOT is_resolved
                FOR UPDATE
                ",
            )
            .bind(input.ticket_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(store_err)?;

            if warning_id.is_none() {
                return Err(SlaError::StagingViolation(input.ticket_id));
            }
        }

        let record: Option<TicketEscalation> = sqlx::query_as(
            r"
            INSERT INTO ticket_escalations (ticket_id, level, escalated_at, channel)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (ticket_id, level) WHERE NOT is_resolved DO NOTHING
            RETURNING *
            ",
        )
        .bind(input.ticket_id)
        .bind(input.level)
        .bind(input.escalated_at)
        .bind(input.channel)
        .fetch_optional(&mut *tx)
        .await
        .map_err(store_err)?;

        tx.commit().await.map_err(store_err)?;
        Ok(record)
    }

    async fn find_unresolved(
        &self,
        ticket_id: Uuid,
        level: EscalationLevel,
    ) -> Result<Option<TicketEscalation>> {
        sqlx::query_as(
            r"
            SELECT * FROM ticket_escalations
            WHERE ticket_id = $1 AND level = $2 AND NOT is_resolved
            ",
        )
        .bind(ticket_id)
        .bind(level)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_err)
    }

    async fn unresolved_history(&self, ticket_id: Uuid) -> Result<EscalationHistory> {
        let levels: Vec<EscalationLevel> = sqlx::query_scalar(
            r"
            SELECT level FROM ticket_escalations
            WHERE ticket_id = $1 AND NOT is_resolved
            ",
        )
        .bind(ticket_id)
        .fetch_all(&self.pool)
        .await
        .map_err(store_err)?;

        let mut history = EscalationHistory::default();
        for level in levels {
            match level {
                EscalationLevel::Warning => history.unresolved_warning = true,
                EscalationLevel::Escalated => history.unresolved_escalation = true,
            }
        }
        Ok(history)
    }

    async fn resolve_all_unresolved(&self, ticket_id: Uuid, at: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query(
            r"
            UPDATE ticket_escalations
            SET is_resolved = TRUE, resolved_at = $2
            WHERE ticket_id = $1 AND NOT is_resolved
            ",
        )
        .bind(ticket_id)
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(store_err)?;
        Ok(result.rows_affected())
    }

    async fn history(&self, ticket_id: Uuid) -> Result<Vec<TicketEscalation>> {
        sqlx::query_as(
            r"
            SELECT * FROM ticket_escalations
            WHERE ticket_id = $1
            ORDER BY escalated_at ASC
            ",
        )
        .bind(ticket_id)
        .fetch_all(&self.pool)
        .await
        .map_err(store_err)
    }
}

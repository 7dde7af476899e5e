//! Storage contracts for tickets and escalation records.
//!
//! The escalation dispatcher talks to storage exclusively through these
//! traits. `helpdesk-db` provides the Postgres implementations; the
//! in-memory implementations here back the test suites.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{Result, SlaError};
use crate::types::{
    CreateTicketEscalation, EscalationHistory, EscalationLevel, Ticket, TicketEscalation,
    TicketStatus,
};

/// Storage contract for the ticket timer fields the engine reads and
/// writes.
#[async_trait]
pub trait TicketStore: Send + Sync {
    /// List tickets eligible for escalation evaluation: `status == open`
    /// and `is_escalated == false`, oldest response clock first.
    async fn list_open_unescalated(&self, limit: i64) -> Result<Vec<Ticket>>;

    /// Fetch a ticket's latest state.
    async fn get(&self, id: Uuid) -> Result<Option<Ticket>>;

    /// Set `first_escalated_at` if and only if it is unset. Set once,
    /// never reset.
    async fn set_first_escalated_at(&self, id: Uuid, at: DateTime<Utc>) -> Result<()>;

    /// Flag the ticket as escalated for the current breach cycle.
    async fn mark_escalated(&self, id: Uuid) -> Result<()>;

    /// Replace the response clock anchor, optionally clearing the
    /// escalated flag (reopen semantics).
    async fn reset_response_clock(
        &self,
        id: Uuid,
        at: DateTime<Utc>,
        clear_escalated: bool,
    ) -> Result<()>;

    /// Transition the ticket's status, stamping `resolved_at`/`closed_at`
    /// when the new status warrants it.
    async fn update_status(&self, id: Uuid, status: TicketStatus, at: DateTime<Utc>)
        -> Result<Ticket>;
}

/// Storage contract for the append-only escalation record log.
#[async_trait]
pub trait EscalationStore: Send + Sync {
    /// Append an escalation record.
    ///
    /// Returns `Ok(None)` when an unresolved record of the same level
    /// already exists for the ticket: a concurrent writer won the race and
    /// this attempt is a no-op, not an error.
    ///
    /// Returns [`SlaError::StagingViolation`] when asked to create an
    /// `escalated` record for a ticket with no unresolved `warning`.
    async fn create(&self, input: CreateTicketEscalation) -> Result<Option<TicketEscalation>>;

    /// Find the unresolved record of a given level for a ticket, if any.
    async fn find_unresolved(
        &self,
        ticket_id: Uuid,
        level: EscalationLevel,
    ) -> Result<Option<TicketEscalation>>;

    /// Snapshot which unresolved levels exist for a ticket.
    async fn unresolved_history(&self, ticket_id: Uuid) -> Result<EscalationHistory>;

    /// Resolve every unresolved record for a ticket, closing the breach
    /// cycle. Returns the number of records resolved.
    async fn resolve_all_unresolved(&self, ticket_id: Uuid, at: DateTime<Utc>) -> Result<u64>;

    /// Full escalation history for a ticket, oldest first.
    async fn history(&self, ticket_id: Uuid) -> Result<Vec<TicketEscalation>>;
}

/// In-memory ticket store for testing.
#[derive(Debug, Default)]
pub struct InMemoryTicketStore {
    tickets: Arc<RwLock<HashMap<Uuid, Ticket>>>,
}

impl InMemoryTicketStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            tickets: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Insert or replace a ticket (for testing).
    pub async fn put(&self, ticket: Ticket) {
        self.tickets.write().await.insert(ticket.id, ticket);
    }

    /// Number of tickets in the store.
    pub async fn count(&self) -> usize {
        self.tickets.read().await.len()
    }
}

#[async_trait]
impl TicketStore for InMemoryTicketStore {
    async fn list_open_unescalated(&self, limit: i64) -> Result<Vec<Ticket>> {
        let tickets = self.tickets.read().await;
        let mut eligible: Vec<_> = tickets
            .values()
            .filter(|t| t.status == TicketStatus::Open && !t.is_escalated)
            .cloned()
            .collect();
        eligible.sort_by_key(|t| t.response_clock_start);
        eligible.truncate(limit.max(0) as usize);
        Ok(eligible)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Ticket>> {
        Ok(self.tickets.read().await.get(&id).cloned())
    }

    async fn set_first_escalated_at(&self, id: Uuid, at: DateTime<Utc>) -> Result<()> {
        let mut tickets = self.tickets.write().await;
        let ticket = tickets.get_mut(&id).ok_or(SlaError::TicketNotFound(id))?;
        if ticket.first_escalated_at.is_none() {
            ticket.first_escalated_at = Some(at);
        }
        Ok(())
    }

    async fn mark_escalated(&self, id: Uuid) -> Result<()> {
        let mut tickets = self.tickets.write().await;
        let ticket = tickets.get_mut(&id).ok_or(SlaError::TicketNotFound(id))?;
        ticket.is_escalated = true;
        Ok(())
    }

    async fn reset_response_clock(
        &self,
        id: Uuid,
        at: DateTime<Utc>,
        clear_escalated: bool,
    ) -> Result<()> {
        let mut tickets = self.tickets.write().await;
        let ticket = tickets.get_mut(&id).ok_or(SlaError::TicketNotFound(id))?;
        ticket.response_clock_start = at;
        if clear_escalated {
            ticket.is_escalated = false;
        }
        Ok(())
    }

    async fn update_status(
        &self,
        id: Uuid,
        status: TicketStatus,
        at: DateTime<Utc>,
    ) -> Result<Ticket> {
        let mut tickets = self.tickets.write().await;
        let ticket = tickets.get_mut(&id).ok_or(SlaError::TicketNotFound(id))?;
        ticket.status = status;
        match status {
            TicketStatus::Resolved => ticket.resolved_at = Some(at),
            TicketStatus::Closed => ticket.closed_at = Some(at),
            _ => {}
        }
        Ok(ticket.clone())
    }
}

/// In-memory escalation record store for testing.
#[derive(Debug, Default)]
pub struct InMemoryEscalationStore {
    records: Arc<RwLock<Vec<TicketEscalation>>>,
}

impl InMemoryEscalationStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            records: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// All records across all tickets (for testing).
    pub async fn all(&self) -> Vec<TicketEscalation> {
        self.records.read().await.clone()
    }

    /// Total record count (for testing).
    pub async fn count(&self) -> usize {
        self.records.read().await.len()
    }
}

#[async_trait]
impl EscalationStore for InMemoryEscalationStore {
    async fn create(&self, input: CreateTicketEscalation) -> Result<Option<TicketEscalation>> {
        let mut records = self.records.write().await;

        // Uniqueness: at most one unresolved record per (ticket, level).
        let exists = records
            .iter()
            .any(|r| r.ticket_id == input.ticket_id && r.level == input.level && !r.is_resolved);
        if exists {
            return Ok(None);
        }

        if input.level == EscalationLevel::Escalated {
            let has_warning = records.iter().any(|r| {
                r.ticket_id == input.ticket_id
                    && r.level == EscalationLevel::Warning
                    && !r.is_resolved
            });
            if !has_warning {
                return Err(SlaError::StagingViolation(input.ticket_id));
            }
        }

        let record = TicketEscalation {
            id: Uuid::new_v4(),
            ticket_id: input.ticket_id,
            level: input.level,
            escalated_at: input.escalated_at,
            channel: input.channel,
            is_resolved: false,
            resolved_at: None,
        };
        records.push(record.clone());
        Ok(Some(record))
    }

    async fn find_unresolved(
        &self,
        ticket_id: Uuid,
        level: EscalationLevel,
    ) -> Result<Option<TicketEscalation>> {
        let records = self.records.read().await;
        Ok(records
            .iter()
            .find(|r| r.ticket_id == ticket_id && r.level == level && !r.is_resolved)
            .cloned())
    }

    async fn unresolved_history(&self, ticket_id: Uuid) -> Result<EscalationHistory> {
        let records = self.records.read().await;
        let mut history = EscalationHistory::default();
        for record in records.iter().filter(|r| r.ticket_id == ticket_id && !r.is_resolved) {
            match record.level {
                EscalationLevel::Warning => history.unresolved_warning = true,
                EscalationLevel::Escalated => history.unresolved_escalation = true,
            }
        }
        Ok(history)
    }

    async fn resolve_all_unresolved(&self, ticket_id: Uuid, at: DateTime<Utc>) -> Result<u64> {
        let mut records = self.records.write().await;
        let mut resolved = 0;
        for record in records
            .iter_mut()
            .filter(|r| r.ticket_id == ticket_id && !r.is_resolved)
        {
            record.is_resolved = true;
            record.resolved_at = Some(at);
            resolved += 1;
        }
        Ok(resolved)
    }

    async fn history(&self, ticket_id: Uuid) -> Result<Vec<TicketEscalation>> {
        let records = self.records.read().await;
        let mut result: Vec<_> = records
            .iter()
            .filter(|r| r.ticket_id == ticket_id)
            .cloned()
            .collect();
        result.sort_by_key(|r| r.escalated_at);
        Ok(result)
    }
}

//! Ticket status transition hook.
//!
//! Escalation records never expire on their own; the only way a breach
//! cycle closes is through this hook firing on a status change. Whoever
//! mutates ticket status (API layer, worker, tests) must call
//! [`StatusTransitionService::on_status_changed`] afterwards.

use std::sync::Arc;

use chrono::Utc;
use helpdesk_sla::{EscalationStore, Result, TicketStatus, TicketStore};
use uuid::Uuid;

/// Applies the escalation-side effects of ticket status transitions.
pub struct StatusTransitionService {
    tickets: Arc<dyn TicketStore>,
    escalations: Arc<dyn EscalationStore>,
}

impl StatusTransitionService {
    pub fn new(tickets: Arc<dyn TicketStore>, escalations: Arc<dyn EscalationStore>) -> Self {
        Self {
            tickets,
            escalations,
        }
    }

    /// React to a ticket moving from `old` to `new` status.
    ///
    /// Leaving `open` resolves every unresolved escalation record and
    /// restarts the response clock; the `is_escalated` flag stays so the
    /// history shows the ticket breached. Re-entering `open` restarts the
    /// clock and clears the flag so a fresh breach cycle can begin.
    /// `first_escalated_at` is never touched.
    #[tracing::instrument(skip(self), fields(ticket_id = %ticket_id))]
    pub async fn on_status_changed(
        &self,
        ticket_id: Uuid,
        old: TicketStatus,
        new: TicketStatus,
    ) -> Result<()> {
        if old == new {
            return Ok(());
        }
        let now = Utc::now();

        if new != TicketStatus::Open {
            let resolved = self.escalations.resolve_all_unresolved(ticket_id, now).await?;
            self.tickets.reset_response_clock(ticket_id, now, false).await?;
            if resolved > 0 {
                tracing::info!(
                    resolved,
                    ?old,
                    ?new,
                    "breach cycle closed on status transition"
                );
            }
        } else {
            // Reopened. Fresh clock, escalation flag cleared, history kept.
            self.tickets.reset_response_clock(ticket_id, now, true).await?;
            tracing::info!(?old, "ticket reopened, response clock restarted");
        }
        Ok(())
    }

    /// Convenience wrapper: persist the status change, then run the hook.
    pub async fn apply_status_change(&self, ticket_id: Uuid, new: TicketStatus) -> Result<()> {
        let Some(before) = self.tickets.get(ticket_id).await? else {
            return Err(helpdesk_sla::SlaError::TicketNotFound(ticket_id));
        };
        let now = Utc::now();
        self.tickets.update_status(ticket_id, new, now).await?;
        self.on_status_changed(ticket_id, before.status, new).await
    }
}

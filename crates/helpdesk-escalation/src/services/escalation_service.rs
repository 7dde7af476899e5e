//! Escalation dispatcher.
//!
//! One scan pass lists the eligible tickets, evaluates each against the
//! policy and applies the resulting actions: append the escalation record,
//! update the ticket timer fields, then notify. Record creation comes
//! before notification so a crashed pass re-raises the notification on the
//! next scan instead of losing the record.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use helpdesk_sla::{
    evaluate, minutes_since_clock_start, CreateTicketEscalation, EscalationAction,
    EscalationLevel, EscalationStore, NotificationChannel, Result, SlaError, SlaPolicy, Ticket,
    TicketStore,
};
use uuid::Uuid;

use super::notifier::{
    AdminNotifier, NotificationSink, NotifyError, SlaEscalationNotification,
    SlaWarningNotification,
};

/// Default cap on tickets examined per scan pass.
pub const DEFAULT_SCAN_LIMIT: i64 = 500;

/// Delivery attempts per notification before giving up.
pub const MAX_DELIVERY_ATTEMPTS: u32 = 3;

/// Pause between delivery attempts.
const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_secs(2);

/// Counters for one scan pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanOutcome {
    /// Tickets examined.
    pub checked: u64,
    /// Warning records created.
    pub warnings_raised: u64,
    /// Admin escalation records created.
    pub escalations_raised: u64,
    /// Tickets that failed with a store error and were skipped.
    pub errors: u64,
}

impl ScanOutcome {
    /// Merge counters from another pass into this one.
    pub fn merge(&mut self, other: &ScanOutcome) {
        self.checked += other.checked;
        self.warnings_raised += other.warnings_raised;
        self.escalations_raised += other.escalations_raised;
        self.errors += other.errors;
    }
}

/// Scans open tickets and raises SLA warnings and admin escalations.
pub struct EscalationService {
    tickets: Arc<dyn TicketStore>,
    escalations: Arc<dyn EscalationStore>,
    sink: Arc<dyn NotificationSink>,
    admins: Arc<dyn AdminNotifier>,
    policy: SlaPolicy,
    scan_limit: i64,
    delivery_attempts: u32,
    retry_backoff: Duration,
}

impl EscalationService {
    pub fn new(
        tickets: Arc<dyn TicketStore>,
        escalations: Arc<dyn EscalationStore>,
        sink: Arc<dyn NotificationSink>,
        admins: Arc<dyn AdminNotifier>,
        policy: SlaPolicy,
    ) -> Self {
        Self {
            tickets,
            escalations,
            sink,
            admins,
            policy,
            scan_limit: DEFAULT_SCAN_LIMIT,
            delivery_attempts: MAX_DELIVERY_ATTEMPTS,
            retry_backoff: DEFAULT_RETRY_BACKOFF,
        }
    }

    /// Override the per-pass ticket cap.
    #[must_use]
    pub fn with_scan_limit(mut self, limit: i64) -> Self {
        self.scan_limit = limit;
        self
    }

    /// Override the delivery retry schedule. Tests use a zero backoff.
    #[must_use]
    pub fn with_delivery_retry(mut self, attempts: u32, backoff: Duration) -> Self {
        self.delivery_attempts = attempts.max(1);
        self.retry_backoff = backoff;
        self
    }

    /// Run one scan pass over all eligible tickets.
    ///
    /// A failure to list tickets aborts the pass; a failure on an
    /// individual ticket is logged, counted and skipped so one poisoned
    /// ticket cannot starve the rest.
    #[tracing::instrument(skip(self), name = "sla_scan")]
    pub async fn run_scan(&self) -> Result<ScanOutcome> {
        let mut outcome = ScanOutcome::default();
        let mut seen: HashSet<Uuid> = HashSet::new();

        // Drain in batches until a short fetch. Tickets that escalate drop
        // out of the listing, but on-track tickets stay in it, so each
        // round widens the window by the already-seen count rather than
        // re-reading the same head of the queue.
        loop {
            let limit = self.scan_limit.saturating_add(seen.len() as i64);
            let batch = self.tickets.list_open_unescalated(limit).await?;
            let short = (batch.len() as i64) < limit;
            let mut progressed = false;

            for ticket in batch {
                if !seen.insert(ticket.id) {
                    continue;
                }
                progressed = true;
                outcome.checked += 1;
                match self.process_ticket(ticket.id).await {
                    Ok(ticket_outcome) => outcome.merge(&ticket_outcome),
                    Err(err) => {
                        outcome.errors += 1;
                        tracing::error!(
                            ticket_id = %ticket.id,
                            ticket_number = %ticket.ticket_number,
                            error = %err,
                            "failed to process ticket, skipping"
                        );
                    }
                }
            }

            if short || !progressed {
                break;
            }
        }

        tracing::info!(
            checked = outcome.checked,
            warnings_raised = outcome.warnings_raised,
            escalations_raised = outcome.escalations_raised,
            errors = outcome.errors,
            "SLA scan pass complete"
        );
        Ok(outcome)
    }

    /// Evaluate and act on a single ticket by id.
    ///
    /// Re-fetches the ticket so decisions run against its latest state
    /// rather than the listing snapshot.
    pub async fn process_ticket(&self, ticket_id: Uuid) -> Result<ScanOutcome> {
        let mut outcome = ScanOutcome::default();

        let Some(ticket) = self.tickets.get(ticket_id).await? else {
            tracing::debug!(ticket_id = %ticket_id, "ticket vanished between listing and evaluation");
            return Ok(outcome);
        };

        let history = self.escalations.unresolved_history(ticket.id).await?;
        let now = Utc::now();
        let actions = evaluate(&ticket, &history, &self.policy, now);

        for action in actions {
            match action {
                EscalationAction::RaiseWarning => {
                    if self.raise_warning(&ticket).await? {
                        outcome.warnings_raised += 1;
                    }
                }
                EscalationAction::RaiseEscalation => {
                    if self.raise_escalation(&ticket).await? {
                        outcome.escalations_raised += 1;
                    }
                }
            }
        }
        Ok(outcome)
    }

    /// First stage: record the warning, stamp `first_escalated_at`, notify
    /// the support channel. Returns false when a concurrent scan already
    /// raised it.
    async fn raise_warning(&self, ticket: &Ticket) -> Result<bool> {
        let now = Utc::now();
        let created = self
            .escalations
            .create(CreateTicketEscalation {
                ticket_id: ticket.id,
                level: EscalationLevel::Warning,
                escalated_at: now,
                channel: NotificationChannel::Telegram,
            })
            .await?;
        let Some(record) = created else {
            tracing::debug!(ticket_id = %ticket.id, "warning already raised by a concurrent scan");
            return Ok(false);
        };

        self.tickets
            .set_first_escalated_at(ticket.id, record.escalated_at)
            .await?;

        let elapsed = minutes_since_clock_start(ticket, now);
        let note = SlaWarningNotification {
            ticket_id: ticket.id,
            ticket_number: ticket.ticket_number.clone(),
            subject: ticket.subject.clone(),
            priority: ticket.priority,
            clock_started_at: ticket.response_clock_start,
            elapsed_minutes: elapsed,
            budget_minutes: self.policy.response_budget_minutes(ticket.priority),
        };

        tracing::warn!(
            ticket_id = %ticket.id,
            ticket_number = %ticket.ticket_number,
            priority = %ticket.priority,
            elapsed_minutes = elapsed,
            "SLA warning raised"
        );

        self.deliver_with_retry(ticket.id, "warning", || self.sink.send_warning(&note))
            .await;
        Ok(true)
    }

    /// Second stage: record the escalation, flag the ticket so the scan
    /// stops re-examining it, notify the channel and every admin.
    async fn raise_escalation(&self, ticket: &Ticket) -> Result<bool> {
        let now = Utc::now();
        let created = self
            .escalations
            .create(CreateTicketEscalation {
                ticket_id: ticket.id,
                level: EscalationLevel::Escalated,
                escalated_at: now,
                channel: NotificationChannel::AdminInbox,
            })
            .await;
        let created = match created {
            Ok(created) => created,
            // Raced with a status transition that resolved the warning
            // between evaluation and insert: drop this attempt, the next
            // scan re-evaluates from scratch.
            Err(SlaError::StagingViolation(_)) => {
                tracing::debug!(
                    ticket_id = %ticket.id,
                    "warning resolved before escalation insert, dropping"
                );
                return Ok(false);
            }
            Err(err) => return Err(err),
        };
        let Some(_record) = created else {
            tracing::debug!(ticket_id = %ticket.id, "escalation already raised by a concurrent scan");
            return Ok(false);
        };

        self.tickets.mark_escalated(ticket.id).await?;

        let elapsed = minutes_since_clock_start(ticket, now);
        let note = SlaEscalationNotification {
            ticket_id: ticket.id,
            ticket_number: ticket.ticket_number.clone(),
            subject: ticket.subject.clone(),
            priority: ticket.priority,
            clock_started_at: ticket.response_clock_start,
            elapsed_minutes: elapsed,
            threshold_minutes: self.policy.escalation_threshold_minutes(ticket.priority),
        };

        tracing::error!(
            ticket_id = %ticket.id,
            ticket_number = %ticket.ticket_number,
            priority = %ticket.priority,
            elapsed_minutes = elapsed,
            "SLA breach escalated to admins"
        );

        self.deliver_with_retry(ticket.id, "escalation", || self.sink.send_escalation(&note))
            .await;

        match self.admins.notify_escalated(&note).await {
            Ok(count) => {
                tracing::info!(ticket_id = %ticket.id, admins = count, "admin notifications created");
            }
            Err(err) => {
                tracing::error!(
                    ticket_id = %ticket.id,
                    error = %err,
                    "failed to create admin notifications"
                );
            }
        }
        Ok(true)
    }

    /// Attempt delivery up to the configured number of times with a fixed
    /// pause between attempts. Exhausted retries are logged, never
    /// propagated: the escalation record is already persisted and the state
    /// machine must keep moving.
    async fn deliver_with_retry<F, Fut>(&self, ticket_id: Uuid, kind: &str, mut send: F)
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = std::result::Result<(), NotifyError>>,
    {
        for attempt in 1..=self.delivery_attempts {
            match send().await {
                Ok(()) => return,
                Err(err) if attempt < self.delivery_attempts => {
                    tracing::warn!(
                        ticket_id = %ticket_id,
                        kind,
                        attempt,
                        error = %err,
                        "notification delivery failed, retrying"
                    );
                    tokio::time::sleep(self.retry_backoff).await;
                }
                Err(err) => {
                    tracing::error!(
                        ticket_id = %ticket_id,
                        kind,
                        attempts = self.delivery_attempts,
                        error = %err,
                        "notification delivery failed, giving up"
                    );
                }
            }
        }
    }
}

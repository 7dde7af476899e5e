//! Escalation dispatching for the helpdesk SLA engine.
//!
//! This crate ties the pure SLA evaluator to the outside world:
//!
//! - [`EscalationService`] scans open tickets, evaluates them against the
//!   configured [`helpdesk_sla::SlaPolicy`] and raises warning / escalation
//!   records with their notifications.
//! - [`StatusTransitionService`] is the hook invoked whenever a ticket
//!   changes status; it closes out unresolved escalation records and resets
//!   the response clock.
//! - [`SlaScanJob`] drives the scan on a fixed interval with a per-pass
//!   timeout, suitable for running inside a worker binary.

pub mod jobs;
pub mod services;

pub use jobs::sla_scan_job::{ScanJobError, SlaScanJob};
pub use services::escalation_service::{EscalationService, ScanOutcome};
pub use services::notifier::{
    AdminNotifier, InMemoryAdminNotifier, InMemorySink, NotificationSink, NotifyError,
    PgAdminNotifier, SlaEscalationNotification, SlaWarningNotification, TelegramSink,
};
pub use services::status_transition::StatusTransitionService;

//! Core SLA escalation domain for the helpdesk backend.
//!
//! This crate holds the parts of the escalation engine that are pure domain
//! logic, independent of any database or transport:
//!
//! - [`types`] - ticket and escalation record types shared across the
//!   workspace
//! - [`policy`] - per-priority response budgets and threshold arithmetic
//! - [`evaluator`] - the pure decision function deciding whether a ticket
//!   needs a warning or an admin escalation right now
//! - [`store`] - storage contracts ([`store::TicketStore`],
//!   [`store::EscalationStore`]) with in-memory implementations for tests
//!
//! The evaluator performs no I/O; it reads a ticket snapshot plus its
//! unresolved escalation history and returns an ordered list of actions.
//! Persistence and notification side effects live in `helpdesk-escalation`.

pub mod error;
pub mod evaluator;
pub mod policy;
pub mod store;
pub mod types;

pub use error::{Result, SlaError};
pub use evaluator::{evaluate, minutes_since_clock_start, standing, EscalationAction, SlaStanding};
pub use policy::SlaPolicy;
pub use store::{
    EscalationStore, InMemoryEscalationStore, InMemoryTicketStore, TicketStore,
};
pub use types::{
    CreateTicketEscalation, EscalationHistory, EscalationLevel, NotificationChannel, Ticket,
    TicketEscalation, TicketPriority, TicketStatus,
};

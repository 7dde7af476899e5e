//! Escalation services.

pub mod escalation_service;
pub mod notifier;
pub mod status_transition;

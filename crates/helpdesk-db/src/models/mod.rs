//! Database entity models that stay database-only.
//!
//! Ticket and escalation record types live in `helpdesk-sla`; this module
//! holds the supporting tables.

pub mod notification;
pub mod user;

pub use notification::{CreateNotification, Notification};
pub use user::User;

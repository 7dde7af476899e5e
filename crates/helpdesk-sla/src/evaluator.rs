//! Pure escalation decision logic.
//!
//! Given a ticket snapshot, its unresolved escalation history and the SLA
//! policy, [`evaluate`] decides what should happen right now. It performs no
//! I/O and mutates nothing, so every rule is unit-testable with arbitrary
//! clocks and budgets.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::policy::SlaPolicy;
use crate::types::{EscalationHistory, Ticket, TicketStatus};

/// An action the dispatcher should apply to a ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EscalationAction {
    /// Create an unresolved warning record and notify the support channel.
    RaiseWarning,
    /// Create an unresolved escalated record and notify administrators.
    RaiseEscalation,
}

/// Derived read-only SLA standing for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlaStanding {
    /// Within the response budget.
    OnTrack,
    /// Past the budget, warning stage.
    AtRisk,
    /// Past the extended threshold.
    Breached,
}

/// Whole minutes elapsed since the ticket's response clock started.
///
/// Clamped at zero so a clock that was reset just ahead of `now` (or skew
/// between writers) never produces a negative elapsed time.
#[must_use]
pub fn minutes_since_clock_start(ticket: &Ticket, now: DateTime<Utc>) -> i64 {
    (now - ticket.response_clock_start).num_minutes().max(0)
}

/// Decide what should happen to a ticket right now.
///
/// Returns zero, one or two actions. When both thresholds were crossed
/// before the ticket was ever checked (coarse scan intervals), both actions
/// are returned with [`EscalationAction::RaiseWarning`] first: the escalated
/// record's precondition is the existence of a warning record, so the
/// dispatcher must apply them in order.
///
/// Rules, each independent:
///
/// - warning: status is `open`, no unresolved warning exists, and elapsed
///   minutes >= the priority's response budget;
/// - escalation: status is `open`, no unresolved escalated record exists, an
///   unresolved warning exists (or is being raised in this same pass), and
///   elapsed minutes >= the extended threshold.
#[must_use]
pub fn evaluate(
    ticket: &Ticket,
    history: &EscalationHistory,
    policy: &SlaPolicy,
    now: DateTime<Utc>,
) -> Vec<EscalationAction> {
    if ticket.status != TicketStatus::Open {
        return Vec::new();
    }

    let elapsed = minutes_since_clock_start(ticket, now);
    let mut actions = Vec::with_capacity(2);

    let raising_warning = !history.unresolved_warning
        && elapsed >= policy.response_budget_minutes(ticket.priority);
    if raising_warning {
        actions.push(EscalationAction::RaiseWarning);
    }

    // The staged precondition accepts a warning raised earlier in this same
    // pass: both thresholds can be crossed between two coarse scans.
    let warning_present = history.unresolved_warning || raising_warning;
    if !history.unresolved_escalation
        && warning_present
        && elapsed >= policy.escalation_threshold_minutes(ticket.priority)
    {
        actions.push(EscalationAction::RaiseEscalation);
    }

    actions
}

/// Classify a ticket's current SLA standing for reporting endpoints.
#[must_use]
pub fn standing(ticket: &Ticket, policy: &SlaPolicy, now: DateTime<Utc>) -> SlaStanding {
    let elapsed = minutes_since_clock_start(ticket, now);
    if elapsed >= policy.escalation_threshold_minutes(ticket.priority) {
        SlaStanding::Breached
    } else if elapsed >= policy.response_budget_minutes(ticket.priority) {
        SlaStanding::AtRisk
    } else {
        SlaStanding::OnTrack
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{TicketPriority, TicketStatus};
    use chrono::Duration;
    use uuid::Uuid;

    fn ticket(priority: TicketPriority, status: TicketStatus, clock_start: DateTime<Utc>) -> Ticket {
        Ticket {
            id: Uuid::new_v4(),
            ticket_number: "TKT-2026-000001".to_string(),
            subject: "Printer on fire".to_string(),
            priority,
            status,
            assigned_to: None,
            response_clock_start: clock_start,
            first_escalated_at: None,
            is_escalated: false,
            resolved_at: None,
            closed_at: None,
            created_at: clock_start,
        }
    }

    fn clean() -> EscalationHistory {
        EscalationHistory::default()
    }

    fn warned() -> EscalationHistory {
        EscalationHistory {
            unresolved_warning: true,
            unresolved_escalation: false,
        }
    }

    #[test]
    fn test_no_action_within_budget() {
        let now = Utc::now();
        let t = ticket(
            TicketPriority::Medium,
            TicketStatus::Open,
            now - Duration::minutes(10),
        );
        let actions = evaluate(&t, &clean(), &SlaPolicy::default(), now);
        assert!(actions.is_empty());
    }

    #[test]
    fn test_warning_at_budget_boundary() {
        let now = Utc::now();
        let t = ticket(
            TicketPriority::Urgent,
            TicketStatus::Open,
            now - Duration::minutes(5),
        );
        let actions = evaluate(&t, &clean(), &SlaPolicy::default(), now);
        assert_eq!(actions, vec![EscalationAction::RaiseWarning]);
    }

    #[test]
    fn test_non_open_status_never_fires() {
        let now = Utc::now();
        for status in [
            TicketStatus::Processing,
            TicketStatus::Pending,
            TicketStatus::Resolved,
            TicketStatus::Closed,
        ] {
            let t = ticket(TicketPriority::Urgent, status, now - Duration::hours(10));
            assert!(
                evaluate(&t, &clean(), &SlaPolicy::default(), now).is_empty(),
                "expected no action for {status:?}"
            );
        }
    }

    #[test]
    fn test_unresolved_warning_suppresses_duplicate() {
        let now = Utc::now();
        // Past budget (5) but before threshold (7).
        let t = ticket(
            TicketPriority::Urgent,
            TicketStatus::Open,
            now - Duration::minutes(6),
        );
        let actions = evaluate(&t, &warned(), &SlaPolicy::default(), now);
        assert!(actions.is_empty());
    }

    #[test]
    fn test_escalation_requires_prior_warning() {
        let now = Utc::now();
        let t = ticket(
            TicketPriority::Urgent,
            TicketStatus::Open,
            now - Duration::minutes(7),
        );
        // Warning already fired and is unresolved: only escalation.
        let actions = evaluate(&t, &warned(), &SlaPolicy::default(), now);
        assert_eq!(actions, vec![EscalationAction::RaiseEscalation]);
    }

    #[test]
    fn test_both_fire_when_scan_was_late() {
        let now = Utc::now();
        // Crossed both thresholds before ever being checked.
        let t = ticket(
            TicketPriority::Urgent,
            TicketStatus::Open,
            now - Duration::minutes(20),
        );
        let actions = evaluate(&t, &clean(), &SlaPolicy::default(), now);
        assert_eq!(
            actions,
            vec![
                EscalationAction::RaiseWarning,
                EscalationAction::RaiseEscalation
            ],
            "warning must be ordered before escalation"
        );
    }

    #[test]
    fn test_unresolved_escalation_suppresses_duplicate() {
        let now = Utc::now();
        let t = ticket(
            TicketPriority::Urgent,
            TicketStatus::Open,
            now - Duration::minutes(60),
        );
        let history = EscalationHistory {
            unresolved_warning: true,
            unresolved_escalation: true,
        };
        assert!(evaluate(&t, &history, &SlaPolicy::default(), now).is_empty());
    }

    #[test]
    fn test_scenario_urgent_ticket_timeline() {
        // Urgent ticket created at T=0, budget 5, threshold 7.
        // Scans at T=5, 6, 7, 8.
        let t0 = Utc::now();
        let policy = SlaPolicy::default();
        let t = ticket(TicketPriority::Urgent, TicketStatus::Open, t0);

        // T=5: warning fires.
        let actions = evaluate(&t, &clean(), &policy, t0 + Duration::minutes(5));
        assert_eq!(actions, vec![EscalationAction::RaiseWarning]);

        // T=6: warning unresolved, below threshold - nothing.
        let actions = evaluate(&t, &warned(), &policy, t0 + Duration::minutes(6));
        assert!(actions.is_empty());

        // T=7: escalation fires.
        let actions = evaluate(&t, &warned(), &policy, t0 + Duration::minutes(7));
        assert_eq!(actions, vec![EscalationAction::RaiseEscalation]);

        // T=8: both unresolved - nothing.
        let history = EscalationHistory {
            unresolved_warning: true,
            unresolved_escalation: true,
        };
        let actions = evaluate(&t, &history, &policy, t0 + Duration::minutes(8));
        assert!(actions.is_empty());
    }

    #[test]
    fn test_elapsed_clamped_at_zero() {
        let now = Utc::now();
        // Clock reset slightly in the future relative to this reader.
        let t = ticket(
            TicketPriority::Urgent,
            TicketStatus::Open,
            now + Duration::seconds(30),
        );
        assert_eq!(minutes_since_clock_start(&t, now), 0);
        assert!(evaluate(&t, &clean(), &SlaPolicy::default(), now).is_empty());
    }

    #[test]
    fn test_standing_classification() {
        let now = Utc::now();
        let policy = SlaPolicy::default();

        let t = ticket(
            TicketPriority::Medium,
            TicketStatus::Open,
            now - Duration::minutes(10),
        );
        assert_eq!(standing(&t, &policy, now), SlaStanding::OnTrack);

        let t = ticket(
            TicketPriority::Medium,
            TicketStatus::Open,
            now - Duration::minutes(30),
        );
        assert_eq!(standing(&t, &policy, now), SlaStanding::AtRisk);

        let t = ticket(
            TicketPriority::Medium,
            TicketStatus::Open,
            now - Duration::minutes(45),
        );
        assert_eq!(standing(&t, &policy, now), SlaStanding::Breached);
    }
}

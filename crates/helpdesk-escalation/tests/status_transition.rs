//! Status transition hook behavior: closing breach cycles and reopening.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use helpdesk_escalation::{
    EscalationService, InMemoryAdminNotifier, InMemorySink, StatusTransitionService,
};
use helpdesk_sla::{
    EscalationStore, InMemoryEscalationStore, InMemoryTicketStore, SlaPolicy, Ticket,
    TicketPriority, TicketStatus, TicketStore,
};
use uuid::Uuid;

struct Fixture {
    tickets: Arc<InMemoryTicketStore>,
    escalations: Arc<InMemoryEscalationStore>,
    service: EscalationService,
    transitions: StatusTransitionService,
}

fn fixture() -> Fixture {
    let tickets = Arc::new(InMemoryTicketStore::new());
    let escalations = Arc::new(InMemoryEscalationStore::new());
    let service = EscalationService::new(
        tickets.clone(),
        escalations.clone(),
        InMemorySink::new(),
        InMemoryAdminNotifier::new(1),
        SlaPolicy::default(),
    )
    .with_delivery_retry(1, Duration::ZERO);
    let transitions = StatusTransitionService::new(tickets.clone(), escalations.clone());
    Fixture {
        tickets,
        escalations,
        service,
        transitions,
    }
}

fn overdue_urgent(minutes_ago: i64) -> Ticket {
    let now = Utc::now();
    let clock_start = now - chrono::Duration::minutes(minutes_ago);
    Ticket {
        id: Uuid::new_v4(),
        ticket_number: "TKT-2026-000777".to_string(),
        subject: "cannot log in".to_string(),
        priority: TicketPriority::Urgent,
        status: TicketStatus::Open,
        assigned_to: None,
        response_clock_start: clock_start,
        first_escalated_at: None,
        is_escalated: false,
        resolved_at: None,
        closed_at: None,
        created_at: clock_start,
    }
}

async fn rewind_clock(tickets: &InMemoryTicketStore, id: Uuid, minutes_ago: i64) {
    let mut t = tickets.get(id).await.unwrap().unwrap();
    t.response_clock_start = Utc::now() - chrono::Duration::minutes(minutes_ago);
    tickets.put(t).await;
}

#[tokio::test]
async fn test_leaving_open_closes_breach_cycle() {
    let fx = fixture();
    let t = overdue_urgent(30);
    fx.tickets.put(t.clone()).await;

    // Breach fully: warning and escalation both raised.
    fx.service.run_scan().await.unwrap();
    assert_eq!(fx.escalations.count().await, 2);

    fx.transitions
        .apply_status_change(t.id, TicketStatus::Processing)
        .await
        .unwrap();

    // Every record resolved with a timestamp, none deleted.
    let records = fx.escalations.history(t.id).await.unwrap();
    assert_eq!(records.len(), 2);
    assert!(records.iter().all(|r| r.is_resolved && r.resolved_at.is_some()));

    // Flag and first_escalated_at survive as history.
    let after = fx.tickets.get(t.id).await.unwrap().unwrap();
    assert_eq!(after.status, TicketStatus::Processing);
    assert!(after.is_escalated);
    assert!(after.first_escalated_at.is_some());
    assert!(after.response_clock_start > t.response_clock_start);
}

#[tokio::test]
async fn test_reopen_clears_flag_and_restarts_clock() {
    let fx = fixture();
    let t = overdue_urgent(30);
    fx.tickets.put(t.clone()).await;

    fx.service.run_scan().await.unwrap();
    fx.transitions
        .apply_status_change(t.id, TicketStatus::Closed)
        .await
        .unwrap();
    fx.transitions
        .apply_status_change(t.id, TicketStatus::Open)
        .await
        .unwrap();

    let after = fx.tickets.get(t.id).await.unwrap().unwrap();
    assert!(!after.is_escalated);
    assert_eq!(after.status, TicketStatus::Open);

    // Freshly reopened ticket is back in scope but within budget.
    let outcome = fx.service.run_scan().await.unwrap();
    assert_eq!(outcome.checked, 1);
    assert_eq!(outcome.warnings_raised, 0);
}

#[tokio::test]
async fn test_reopened_ticket_can_breach_again() {
    let fx = fixture();
    let t = overdue_urgent(30);
    fx.tickets.put(t.clone()).await;

    fx.service.run_scan().await.unwrap();
    fx.transitions
        .apply_status_change(t.id, TicketStatus::Resolved)
        .await
        .unwrap();
    fx.transitions
        .apply_status_change(t.id, TicketStatus::Open)
        .await
        .unwrap();

    // Second cycle: budget blown again.
    rewind_clock(&fx.tickets, t.id, 30).await;
    let outcome = fx.service.run_scan().await.unwrap();
    assert_eq!(outcome.warnings_raised, 1);
    assert_eq!(outcome.escalations_raised, 1);

    // Four records total across the two cycles, two still unresolved.
    let records = fx.escalations.history(t.id).await.unwrap();
    assert_eq!(records.len(), 4);
    assert_eq!(records.iter().filter(|r| !r.is_resolved).count(), 2);
}

#[tokio::test]
async fn test_same_status_is_a_noop() {
    let fx = fixture();
    let t = overdue_urgent(10);
    fx.tickets.put(t.clone()).await;
    fx.service.run_scan().await.unwrap();
    assert_eq!(fx.escalations.count().await, 1);

    fx.transitions
        .on_status_changed(t.id, TicketStatus::Open, TicketStatus::Open)
        .await
        .unwrap();

    // Nothing resolved, clock untouched.
    let records = fx.escalations.history(t.id).await.unwrap();
    assert!(records.iter().all(|r| !r.is_resolved));
}

#[tokio::test]
async fn test_transition_between_non_open_statuses_still_resolves() {
    let fx = fixture();
    let t = overdue_urgent(10);
    fx.tickets.put(t.clone()).await;
    fx.service.run_scan().await.unwrap();

    // Straight to pending without passing through the hook first.
    fx.transitions
        .apply_status_change(t.id, TicketStatus::Pending)
        .await
        .unwrap();
    fx.transitions
        .apply_status_change(t.id, TicketStatus::Closed)
        .await
        .unwrap();

    let records = fx.escalations.history(t.id).await.unwrap();
    assert!(records.iter().all(|r| r.is_resolved));

    let after = fx.tickets.get(t.id).await.unwrap().unwrap();
    assert_eq!(after.status, TicketStatus::Closed);
    assert!(after.closed_at.is_some());
}

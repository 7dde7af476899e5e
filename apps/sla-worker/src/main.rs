//! SLA escalation worker.
//!
//! Connects to Postgres, runs the embedded migrations, then loops the
//! escalation scan on the configured interval until killed.

mod config;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use helpdesk_db::{run_migrations, DbPool, PgEscalationStore, PgTicketStore};
use helpdesk_escalation::{EscalationService, PgAdminNotifier, SlaScanJob, TelegramSink};
use helpdesk_sla::SlaPolicy;

use crate::config::WorkerConfig;

#[tokio::main]
async fn main() {
    // Load .env if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,sla_worker=debug")),
        )
        .init();

    let config = WorkerConfig::from_env().unwrap_or_else(|e| {
        eprintln!("Configuration error: {e}");
        std::process::exit(1);
    });

    let policy = SlaPolicy::from_env().unwrap_or_else(|e| {
        eprintln!("SLA policy error: {e}");
        std::process::exit(1);
    });

    tracing::info!(
        urgent_minutes = policy.urgent_minutes,
        high_minutes = policy.high_minutes,
        medium_minutes = policy.medium_minutes,
        low_minutes = policy.low_minutes,
        escalation_multiplier = policy.escalation_multiplier,
        scan_interval_minutes = policy.scan_interval_minutes,
        "starting SLA worker"
    );

    let pool = DbPool::connect_with_max(&config.database_url, config.max_connections)
        .await
        .unwrap_or_else(|e| {
            eprintln!("Database connection error: {e}");
            std::process::exit(1);
        });

    run_migrations(&pool).await.unwrap_or_else(|e| {
        eprintln!("Migration error: {e}");
        std::process::exit(1);
    });

    let sink = TelegramSink::from_env().unwrap_or_else(|e| {
        eprintln!("Telegram configuration error: {e}");
        std::process::exit(1);
    });

    let tickets = Arc::new(PgTicketStore::new(pool.inner().clone()));
    let escalations = Arc::new(PgEscalationStore::new(pool.inner().clone()));
    let admins = Arc::new(PgAdminNotifier::new(pool.inner().clone()));

    let service = EscalationService::new(
        tickets,
        escalations,
        Arc::new(sink),
        admins,
        policy.clone(),
    )
    .with_scan_limit(config.scan_limit);

    let job = SlaScanJob::new(Arc::new(service), policy.scan_interval_minutes);

    tracing::info!(
        interval_secs = job.poll_interval().as_secs(),
        "SLA scan job running"
    );
    job.run().await;
}

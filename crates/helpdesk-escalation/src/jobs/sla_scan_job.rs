//! Periodic SLA scan job.
//!
//! Wraps [`EscalationService::run_scan`] in an interval loop with a
//! per-pass timeout. One failed or timed-out pass is logged and the loop
//! keeps going; the next pass re-derives everything from current state, so
//! a missed pass only delays detection by one interval.

use std::sync::Arc;
use std::time::Duration;

use helpdesk_sla::SlaError;

use crate::services::escalation_service::{EscalationService, ScanOutcome};

/// Upper bound on a single scan pass.
pub const DEFAULT_SCAN_TIMEOUT_SECS: u64 = 30;

/// Errors from one scan pass.
#[derive(Debug, thiserror::Error)]
pub enum ScanJobError {
    #[error("scan pass exceeded {0:?}")]
    Timeout(Duration),

    #[error("scan pass failed: {0}")]
    Scan(#[from] SlaError),
}

/// Drives the escalation scan on a fixed interval.
pub struct SlaScanJob {
    service: Arc<EscalationService>,
    poll_interval: Duration,
    scan_timeout: Duration,
}

impl SlaScanJob {
    /// Build a job polling at `scan_interval_minutes` from the policy the
    /// service was configured with.
    pub fn new(service: Arc<EscalationService>, scan_interval_minutes: u64) -> Self {
        Self {
            service,
            poll_interval: Duration::from_secs(scan_interval_minutes.max(1) * 60),
            scan_timeout: Duration::from_secs(DEFAULT_SCAN_TIMEOUT_SECS),
        }
    }

    #[must_use]
    pub fn with_scan_timeout(mut self, timeout: Duration) -> Self {
        self.scan_timeout = timeout;
        self
    }

    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Run one scan pass under the timeout.
    pub async fn poll(&self) -> Result<ScanOutcome, ScanJobError> {
        match tokio::time::timeout(self.scan_timeout, self.service.run_scan()).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(ScanJobError::Timeout(self.scan_timeout)),
        }
    }

    /// Run forever, polling on the configured interval. Cumulative
    /// counters are logged after every pass.
    pub async fn run(&self) {
        tracing::info!(
            interval_secs = self.poll_interval.as_secs(),
            timeout_secs = self.scan_timeout.as_secs(),
            "SLA scan job started"
        );

        let mut totals = ScanOutcome::default();
        let mut interval = tokio::time::interval(self.poll_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            interval.tick().await;
            match self.poll().await {
                Ok(outcome) => {
                    totals.merge(&outcome);
                    tracing::debug!(
                        checked = totals.checked,
                        warnings_raised = totals.warnings_raised,
                        escalations_raised = totals.escalations_raised,
                        errors = totals.errors,
                        "cumulative scan totals"
                    );
                }
                Err(err) => {
                    tracing::error!(error = %err, "scan pass failed");
                }
            }
        }
    }
}

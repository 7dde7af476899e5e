//! SLA policy table: per-priority response budgets and threshold arithmetic.
//!
//! The policy is an explicitly injected configuration struct. Nothing in the
//! engine reads the environment behind the caller's back; `from_env` exists
//! for the worker binary, tests construct policies directly.

use std::env;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SlaError};
use crate::types::TicketPriority;

/// Fallback response budget in minutes when a priority has no configured
/// budget. Configuration gaps are never fatal.
pub const DEFAULT_RESPONSE_MINUTES: i64 = 30;

/// Default escalation multiplier.
pub const DEFAULT_ESCALATION_MULTIPLIER: f64 = 1.5;

/// Default scan interval in minutes. Informational: the scheduler enforces
/// it, the engine only reports it.
pub const DEFAULT_SCAN_INTERVAL_MINUTES: u64 = 1;

/// Per-priority SLA response budgets plus the escalation multiplier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlaPolicy {
    /// Response budget in minutes for `urgent` tickets.
    pub urgent_minutes: i64,
    /// Response budget in minutes for `high` tickets.
    pub high_minutes: i64,
    /// Response budget in minutes for `medium` tickets.
    pub medium_minutes: i64,
    /// Response budget in minutes for `low` tickets.
    pub low_minutes: i64,
    /// Multiplier applied to the budget to get the admin-escalation
    /// threshold. Must be >= 1.0.
    pub escalation_multiplier: f64,
    /// Scan interval in minutes, enforced by the external scheduler.
    pub scan_interval_minutes: u64,
}

impl Default for SlaPolicy {
    fn default() -> Self {
        Self {
            urgent_minutes: 5,
            high_minutes: 15,
            medium_minutes: 30,
            low_minutes: 60,
            escalation_multiplier: DEFAULT_ESCALATION_MULTIPLIER,
            scan_interval_minutes: DEFAULT_SCAN_INTERVAL_MINUTES,
        }
    }
}

impl SlaPolicy {
    /// Response budget in minutes for a priority.
    ///
    /// A non-positive configured budget falls back to
    /// [`DEFAULT_RESPONSE_MINUTES`] rather than failing: a misconfigured
    /// tier should degrade to the safe default, not stop the scan.
    #[must_use]
    pub fn response_budget_minutes(&self, priority: TicketPriority) -> i64 {
        let configured = match priority {
            TicketPriority::Urgent => self.urgent_minutes,
            TicketPriority::High => self.high_minutes,
            TicketPriority::Medium => self.medium_minutes,
            TicketPriority::Low => self.low_minutes,
        };

        if configured > 0 {
            configured
        } else {
            DEFAULT_RESPONSE_MINUTES
        }
    }

    /// Admin-escalation threshold in minutes:
    /// `floor(budget * multiplier)`.
    #[must_use]
    pub fn escalation_threshold_minutes(&self, priority: TicketPriority) -> i64 {
        let budget = self.response_budget_minutes(priority) as f64;
        (budget * self.escalation_multiplier).floor() as i64
    }

    /// Validate the policy. Budgets must be positive and the multiplier at
    /// least 1.0 (the admin threshold must never precede the warning).
    pub fn validate(&self) -> Result<()> {
        if self.escalation_multiplier < 1.0 {
            return Err(SlaError::Validation(format!(
                "escalation_multiplier must be >= 1.0, got {}",
                self.escalation_multiplier
            )));
        }

        for (name, minutes) in [
            ("urgent", self.urgent_minutes),
            ("high", self.high_minutes),
            ("medium", self.medium_minutes),
            ("low", self.low_minutes),
        ] {
            if minutes <= 0 {
                return Err(SlaError::Validation(format!(
                    "response budget for '{name}' must be positive, got {minutes}"
                )));
            }
        }

        Ok(())
    }

    /// Load the policy from `SLA_*` environment variables, using defaults
    /// for anything unset. Unparseable values are a configuration error.
    ///
    /// Recognized variables: `SLA_URGENT_MINUTES`, `SLA_HIGH_MINUTES`,
    /// `SLA_MEDIUM_MINUTES`, `SLA_LOW_MINUTES`, `SLA_ESCALATION_MULTIPLIER`,
    /// `SLA_SCAN_INTERVAL_MINUTES`.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let policy = Self {
            urgent_minutes: env_i64("SLA_URGENT_MINUTES", defaults.urgent_minutes)?,
            high_minutes: env_i64("SLA_HIGH_MINUTES", defaults.high_minutes)?,
            medium_minutes: env_i64("SLA_MEDIUM_MINUTES", defaults.medium_minutes)?,
            low_minutes: env_i64("SLA_LOW_MINUTES", defaults.low_minutes)?,
            escalation_multiplier: env_f64(
                "SLA_ESCALATION_MULTIPLIER",
                defaults.escalation_multiplier,
            )?,
            scan_interval_minutes: env_u64(
                "SLA_SCAN_INTERVAL_MINUTES",
                defaults.scan_interval_minutes,
            )?,
        };

        policy.validate()?;
        Ok(policy)
    }
}

fn env_i64(var: &str, default: i64) -> Result<i64> {
    match env::var(var) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| SlaError::Validation(format!("{var} is not an integer: {raw}"))),
        Err(_) => Ok(default),
    }
}

fn env_u64(var: &str, default: u64) -> Result<u64> {
    match env::var(var) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| SlaError::Validation(format!("{var} is not an integer: {raw}"))),
        Err(_) => Ok(default),
    }
}

fn env_f64(var: &str, default: f64) -> Result<f64> {
    match env::var(var) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| SlaError::Validation(format!("{var} is not a number: {raw}"))),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_budgets() {
        let policy = SlaPolicy::default();
        assert_eq!(policy.response_budget_minutes(TicketPriority::Urgent), 5);
        assert_eq!(policy.response_budget_minutes(TicketPriority::High), 15);
        assert_eq!(policy.response_budget_minutes(TicketPriority::Medium), 30);
        assert_eq!(policy.response_budget_minutes(TicketPriority::Low), 60);
    }

    #[test]
    fn test_threshold_arithmetic() {
        let policy = SlaPolicy::default();
        // medium: floor(30 * 1.5) = 45
        assert_eq!(policy.escalation_threshold_minutes(TicketPriority::Medium), 45);
        // urgent: floor(5 * 1.5) = 7
        assert_eq!(policy.escalation_threshold_minutes(TicketPriority::Urgent), 7);
        assert_eq!(policy.escalation_threshold_minutes(TicketPriority::High), 22);
        assert_eq!(policy.escalation_threshold_minutes(TicketPriority::Low), 90);
    }

    #[test]
    fn test_nonpositive_budget_falls_back() {
        let policy = SlaPolicy {
            medium_minutes: 0,
            ..SlaPolicy::default()
        };
        assert_eq!(
            policy.response_budget_minutes(TicketPriority::Medium),
            DEFAULT_RESPONSE_MINUTES
        );
        // Threshold follows the fallback budget.
        assert_eq!(policy.escalation_threshold_minutes(TicketPriority::Medium), 45);
    }

    #[test]
    fn test_validate_rejects_small_multiplier() {
        let policy = SlaPolicy {
            escalation_multiplier: 0.5,
            ..SlaPolicy::default()
        };
        assert!(matches!(policy.validate(), Err(SlaError::Validation(_))));
    }

    #[test]
    fn test_validate_rejects_negative_budget() {
        let policy = SlaPolicy {
            low_minutes: -10,
            ..SlaPolicy::default()
        };
        assert!(policy.validate().is_err());
    }

    #[test]
    fn test_validate_accepts_default() {
        assert!(SlaPolicy::default().validate().is_ok());
    }

    #[test]
    fn test_multiplier_exactly_one_is_valid() {
        let policy = SlaPolicy {
            escalation_multiplier: 1.0,
            ..SlaPolicy::default()
        };
        assert!(policy.validate().is_ok());
        // Warning and escalation thresholds coincide.
        assert_eq!(policy.escalation_threshold_minutes(TicketPriority::Urgent), 5);
    }
}

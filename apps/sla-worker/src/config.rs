//! Worker configuration from environment variables.

/// Configuration errors raised at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingVar(String),

    #[error("invalid value for {var}: {value}")]
    InvalidValue { var: String, value: String },
}

/// Worker settings. SLA budgets themselves are read separately through
/// `SlaPolicy::from_env`.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Postgres connection string.
    pub database_url: String,
    /// Connection pool size.
    pub max_connections: u32,
    /// Cap on tickets examined per scan pass.
    pub scan_limit: i64,
}

impl WorkerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| ConfigError::MissingVar("DATABASE_URL".to_string()))?;

        let max_connections = parse_var("SLA_WORKER_MAX_CONNECTIONS", 10)?;
        let scan_limit = parse_var("SLA_WORKER_SCAN_LIMIT", 500)?;

        Ok(Self {
            database_url,
            max_connections,
            scan_limit,
        })
    }
}

fn parse_var<T: std::str::FromStr>(var: &str, default: T) -> Result<T, ConfigError> {
    match std::env::var(var) {
        Ok(value) => value.parse().map_err(|_| ConfigError::InvalidValue {
            var: var.to_string(),
            value,
        }),
        Err(_) => Ok(default),
    }
}

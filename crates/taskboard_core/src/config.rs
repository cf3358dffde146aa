//! Explicit runtime configuration for the task-board core.
//!
//! # Responsibility
//! - Hold quota limits, retry policy, database and logging settings.
//! - Parse JSON configuration documents with per-field defaults.
//!
//! # Invariants
//! - Services receive a `CoreConfig` (or a part of it) at construction and
//!   never consult process-global state for limits.
//! - A validated config has non-zero limits and at least one attempt.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Errors raised while loading configuration.
#[derive(Debug)]
pub enum ConfigError {
    /// Input is not a valid configuration document.
    Parse(serde_json::Error),
    /// A field parsed correctly but holds an unusable value.
    InvalidValue {
        field: &'static str,
        reason: &'static str,
    },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Parse(err) => write!(f, "invalid configuration document: {err}"),
            Self::InvalidValue { field, reason } => {
                write!(f, "invalid configuration value for `{field}`: {reason}")
            }
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Parse(err) => Some(err),
            Self::InvalidValue { .. } => None,
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(value: serde_json::Error) -> Self {
        Self::Parse(value)
    }
}

/// Per-user and per-board quotas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoardLimits {
    /// Boards one user may own.
    pub max_boards_per_user: u32,
    /// Accepted members one board may hold (owner excluded).
    pub max_members_per_board: u32,
    /// Accepted memberships one user may hold across boards.
    pub max_memberships_per_user: u32,
}

impl Default for BoardLimits {
    fn default() -> Self {
        Self {
            max_boards_per_user: 10,
            max_members_per_board: 50,
            max_memberships_per_user: 20,
        }
    }
}

/// Bounded retry for operations that fail with a transient conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts including the first one.
    pub max_attempts: u32,
    /// Backoff before the second attempt; doubles on each further attempt.
    pub base_backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_backoff_ms: 20,
        }
    }
}

impl RetryPolicy {
    /// Returns the sleep before attempt number `attempt + 1`.
    pub fn backoff_ms(&self, attempt: u32) -> u64 {
        let exponent = attempt.saturating_sub(1).min(16);
        self.base_backoff_ms.saturating_mul(1_u64 << exponent)
    }
}

/// SQLite connection settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// How long a writer waits on another connection's lock.
    pub busy_timeout_ms: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            busy_timeout_ms: 5_000,
        }
    }
}

/// Logging settings consumed by [`crate::logging::init_logging`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// One of `trace|debug|info|warn|error`.
    pub level: String,
    /// Absolute directory for rolling log files; `None` disables file logging.
    pub log_dir: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: crate::logging::default_log_level().to_string(),
            log_dir: None,
        }
    }
}

/// Top-level configuration document.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    pub limits: BoardLimits,
    pub retry: RetryPolicy,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
}

impl CoreConfig {
    /// Parses and validates a JSON configuration document.
    ///
    /// Missing sections and fields fall back to defaults.
    pub fn from_json_str(input: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects values that would make every guarded operation fail.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let checks = [
            ("limits.max_boards_per_user", self.limits.max_boards_per_user),
            (
                "limits.max_members_per_board",
                self.limits.max_members_per_board,
            ),
            (
                "limits.max_memberships_per_user",
                self.limits.max_memberships_per_user,
            ),
            ("retry.max_attempts", self.retry.max_attempts),
        ];
        for (field, value) in checks {
            if value == 0 {
                return Err(ConfigError::InvalidValue {
                    field,
                    reason: "must be greater than zero",
                });
            }
        }
        Ok(())
    }
}

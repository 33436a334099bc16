//! Logger configuration, validation, and error types.

use std::error::Error;
use std::fmt;

// ── LoggerConfig ──────────────────────────────────────────────────

/// Configuration for [`Logger`](crate::logger::Logger).
///
/// [`Logger::reset`](crate::logger::Logger::reset) restores the logger to
/// the configuration it was constructed with.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoggerConfig {
    /// Maximum cycles buffered between the control loop and the sink
    /// worker. Default: 500 (10 s at 50 Hz).
    pub queue_capacity: usize,
    /// Record the console source's new output each cycle. Default: true.
    pub capture_console: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 500,
            capture_console: true,
        }
    }
}

impl LoggerConfig {
    /// Check structural invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.queue_capacity == 0 {
            return Err(ConfigError::QueueCapacityZero);
        }
        Ok(())
    }
}

// ── ConfigError ────────────────────────────────────────────────────

/// Errors detected while configuring or starting a logger.
#[derive(Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// The sink queue capacity is zero.
    QueueCapacityZero,
    /// The sink worker thread could not be spawned.
    ThreadSpawnFailed {
        /// Description of the failure.
        reason: String,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::QueueCapacityZero => write!(f, "queue_capacity must be at least 1"),
            Self::ThreadSpawnFailed { reason } => {
                write!(f, "thread spawn failed: {reason}")
            }
        }
    }
}

impl Error for ConfigError {}

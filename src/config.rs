//! Configuration for the task divider.
//!
//! Configuration can be set via environment variables:
//! - `MAX_TASK_DEPTH` - Optional. Hard ceiling on decomposition depth. Defaults to `5`.
//! - `STOP_AFTER_DELAY` - Optional. Retry wall-clock budget in seconds. Defaults to `20`.
//! - `STOP_AFTER_ATTEMPT` - Optional. Maximum decomposition attempts. Defaults to `5`.
//!
//! The divider never reads the environment itself; hosts load a config once
//! (from the environment or by hand) and inject it at construction time.

use std::time::Duration;

use thiserror::Error;

use crate::divider::RetryPolicy;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

/// Divider configuration.
#[derive(Debug, Clone)]
pub struct DividerConfig {
    /// Tasks at this depth or deeper are never decomposed further
    pub max_task_depth: u32,

    /// Stop conditions for the invalid-generation retry loop
    pub retry: RetryPolicy,
}

impl Default for DividerConfig {
    fn default() -> Self {
        Self {
            max_task_depth: 5,
            retry: RetryPolicy::default(),
        }
    }
}

impl DividerConfig {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    /// Returns `ConfigError::InvalidValue` if a set variable does not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        let max_task_depth = env_u32("MAX_TASK_DEPTH", 5)?;
        let stop_after_delay = env_u32("STOP_AFTER_DELAY", 20)?;
        let stop_after_attempt = env_u32("STOP_AFTER_ATTEMPT", 5)?;

        Ok(Self {
            max_task_depth,
            retry: RetryPolicy {
                stop_after_delay: Duration::from_secs(u64::from(stop_after_delay)),
                stop_after_attempt,
            },
        })
    }

    /// Create a config with an explicit depth ceiling, default retry policy.
    pub fn with_max_depth(max_task_depth: u32) -> Self {
        Self {
            max_task_depth,
            ..Self::default()
        }
    }
}

fn env_u32(name: &str, default: u32) -> Result<u32, ConfigError> {
    match std::env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|e| ConfigError::InvalidValue(name.to_string(), format!("{}", e))),
        Err(_) => Ok(default),
    }
}

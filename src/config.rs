//! Run configuration: deadlines, delivery retries, and rate limits.
//!
//! Loadable from YAML; every field has a default so an empty document
//! is a valid configuration.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Configuration for one orchestrator instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Hard deadline for the planning stage in seconds (default: 60)
    #[serde(default = "default_planning_timeout")]
    pub planning_timeout_seconds: u64,

    /// Soft per-search deadline in seconds; expiry degrades the item
    /// instead of failing the run (default: 45)
    #[serde(default = "default_search_timeout")]
    pub search_timeout_seconds: u64,

    /// Hard deadline for the writing stage in seconds (default: 120)
    #[serde(default = "default_writing_timeout")]
    pub writing_timeout_seconds: u64,

    /// Retry policy for the transport handoff
    #[serde(default)]
    pub delivery_retry: RetryPolicy,

    /// Sends allowed per sliding hour (default: 50)
    #[serde(default = "default_hourly_limit")]
    pub hourly_send_limit: u32,

    /// Sends allowed per sliding day (default: 500)
    #[serde(default = "default_daily_limit")]
    pub daily_send_limit: u32,
}

fn default_planning_timeout() -> u64 {
    60
}
fn default_search_timeout() -> u64 {
    45
}
fn default_writing_timeout() -> u64 {
    120
}
fn default_hourly_limit() -> u32 {
    50
}
fn default_daily_limit() -> u32 {
    500
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            planning_timeout_seconds: default_planning_timeout(),
            search_timeout_seconds: default_search_timeout(),
            writing_timeout_seconds: default_writing_timeout(),
            delivery_retry: RetryPolicy::default(),
            hourly_send_limit: default_hourly_limit(),
            daily_send_limit: default_daily_limit(),
        }
    }
}

impl RunConfig {
    /// Load configuration from a YAML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML content
    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).context("Failed to parse config YAML")
    }

    pub fn planning_timeout(&self) -> Duration {
        Duration::from_secs(self.planning_timeout_seconds)
    }

    pub fn search_timeout(&self) -> Duration {
        Duration::from_secs(self.search_timeout_seconds)
    }

    pub fn writing_timeout(&self) -> Duration {
        Duration::from_secs(self.writing_timeout_seconds)
    }
}

/// Retry policy for failed transport handoffs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Maximum number of attempts, including the first try (default: 3)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Initial delay between retries in milliseconds (default: 1000)
    #[serde(default = "default_initial_delay")]
    pub initial_delay_ms: u64,

    /// Maximum delay between retries in milliseconds (default: 30000)
    #[serde(default = "default_max_delay")]
    pub max_delay_ms: u64,

    /// Backoff multiplier applied after each retry (default: 2.0)
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
}

fn default_max_attempts() -> u32 {
    3
}
fn default_initial_delay() -> u64 {
    1000
}
fn default_max_delay() -> u64 {
    30000
}
fn default_backoff_multiplier() -> f64 {
    2.0
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay_ms: default_initial_delay(),
            max_delay_ms: default_max_delay(),
            backoff_multiplier: default_backoff_multiplier(),
        }
    }
}

impl RetryPolicy {
    /// Calculate delay for a specific attempt (1-indexed)
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            return Duration::from_millis(self.initial_delay_ms);
        }

        let delay =
            self.initial_delay_ms as f64 * self.backoff_multiplier.powi((attempt - 1) as i32);

        let capped = delay.min(self.max_delay_ms as f64) as u64;
        Duration::from_millis(capped)
    }

    /// Check if another attempt is allowed after `attempt` failures
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }
}

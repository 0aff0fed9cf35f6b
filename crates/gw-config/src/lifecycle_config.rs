use crate::{
    ConfigError, ConfigErrorResult, DEFAULT_ATTACH_PROBE_TIMEOUT_MS,
    DEFAULT_ENVIRONMENT_REFRESH_SECS, DEFAULT_LOG_LIMIT_CHARS, DEFAULT_POLL_INTERVAL_MS,
    DEFAULT_POLL_PROBE_TIMEOUT_MS, DEFAULT_START_DEADLINE_MS,
};

use std::time::Duration;

use serde::Deserialize;

/// Timing knobs for attach, start verification and background refresh.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LifecycleConfig {
    pub attach_probe_timeout_ms: u64,
    pub poll_probe_timeout_ms: u64,
    pub start_deadline_ms: u64,
    pub poll_interval_ms: u64,
    pub environment_refresh_secs: u64,
    pub log_limit_chars: usize,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            attach_probe_timeout_ms: DEFAULT_ATTACH_PROBE_TIMEOUT_MS,
            poll_probe_timeout_ms: DEFAULT_POLL_PROBE_TIMEOUT_MS,
            start_deadline_ms: DEFAULT_START_DEADLINE_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            environment_refresh_secs: DEFAULT_ENVIRONMENT_REFRESH_SECS,
            log_limit_chars: DEFAULT_LOG_LIMIT_CHARS,
        }
    }
}

impl LifecycleConfig {
    pub fn attach_probe_timeout(&self) -> Duration {
        Duration::from_millis(self.attach_probe_timeout_ms)
    }

    pub fn poll_probe_timeout(&self) -> Duration {
        Duration::from_millis(self.poll_probe_timeout_ms)
    }

    pub fn start_deadline(&self) -> Duration {
        Duration::from_millis(self.start_deadline_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn environment_refresh_interval(&self) -> Duration {
        Duration::from_secs(self.environment_refresh_secs)
    }

    pub fn validate(&self) -> ConfigErrorResult<()> {
        if self.attach_probe_timeout_ms == 0 || self.poll_probe_timeout_ms == 0 {
            return Err(ConfigError::lifecycle("probe timeouts must be > 0"));
        }

        if self.start_deadline_ms == 0 {
            return Err(ConfigError::lifecycle(
                "lifecycle.start_deadline_ms must be > 0",
            ));
        }

        if self.poll_probe_timeout_ms > self.start_deadline_ms {
            return Err(ConfigError::lifecycle(format!(
                "lifecycle.poll_probe_timeout_ms ({}) cannot exceed start_deadline_ms ({})",
                self.poll_probe_timeout_ms, self.start_deadline_ms
            )));
        }

        if self.poll_interval_ms == 0 {
            return Err(ConfigError::lifecycle(
                "lifecycle.poll_interval_ms must be > 0",
            ));
        }

        if self.log_limit_chars == 0 {
            return Err(ConfigError::lifecycle(
                "lifecycle.log_limit_chars must be > 0",
            ));
        }

        Ok(())
    }
}

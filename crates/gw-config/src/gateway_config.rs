use crate::{
    ConfigError, ConfigErrorResult, DEFAULT_ATTACH_ONLY, DEFAULT_COMMAND,
    DEFAULT_GATEWAY_LOG_FILE, DEFAULT_HOST, DEFAULT_PORT, DEFAULT_SERVICE_LABEL, GatewayMode,
    MIN_PORT,
};

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Loopback host the gateway listens on
    pub host: String,
    pub port: u16,
    pub mode: GatewayMode,
    /// Forbid spawning; only attach to an already-running gateway
    pub attach_only: bool,
    /// Bearer token sent with health probes
    pub auth_token: Option<String>,
    /// Gateway command name or absolute path
    pub command: String,
    /// Label of the persistent-service descriptor (launchd label / systemd unit)
    pub service_label: String,
    /// Gateway log file (relative paths resolve against the config dir)
    pub log_file: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: String::from(DEFAULT_HOST),
            port: DEFAULT_PORT,
            mode: GatewayMode::default(),
            attach_only: DEFAULT_ATTACH_ONLY,
            auth_token: None,
            command: String::from(DEFAULT_COMMAND),
            service_label: String::from(DEFAULT_SERVICE_LABEL),
            log_file: String::from(DEFAULT_GATEWAY_LOG_FILE),
        }
    }
}

impl GatewayConfig {
    pub fn validate(&self) -> ConfigErrorResult<()> {
        if self.port < MIN_PORT {
            return Err(ConfigError::gateway(format!(
                "gateway.port must be >= {}, got {}",
                MIN_PORT, self.port
            )));
        }

        // Attach and spawn only ever target the local machine.
        if self.host != DEFAULT_HOST && self.host != "localhost" {
            return Err(ConfigError::gateway(format!(
                "gateway.host must be {DEFAULT_HOST} or localhost, got {}",
                self.host
            )));
        }

        if self.command.trim().is_empty() {
            return Err(ConfigError::gateway("gateway.command cannot be empty"));
        }

        let label_ok = !self.service_label.is_empty()
            && self
                .service_label
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'));
        if !label_ok {
            return Err(ConfigError::gateway(format!(
                "gateway.service_label must be non-empty and contain only [A-Za-z0-9._-], got '{}'",
                self.service_label
            )));
        }

        Ok(())
    }
}

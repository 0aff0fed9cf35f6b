use crate::{
    ConfigError, ConfigErrorResult, GatewayConfig, LifecycleConfig, LoggingConfig,
};

use std::path::{Path, PathBuf};

use log::info;
use serde::Deserialize;

pub const CONFIG_DIR_ENV: &str = "GW_CONFIG_DIR";
pub const CONFIG_FILENAME: &str = "config.toml";

const APP_DIR_NAME: &str = "local-gateway";

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub gateway: GatewayConfig,
    pub lifecycle: LifecycleConfig,
    pub logging: LoggingConfig,
}

impl Config {
    /// Load config.
    ///
    /// Loading order:
    /// 1. GW_CONFIG_DIR env var, else `<platform config dir>/local-gateway`
    /// 2. Auto-create the config directory if it doesn't exist
    /// 3. Load config.toml if it exists, else use defaults
    /// 4. Apply GW_* environment variable overrides
    ///
    /// Does NOT validate - call validate() after load().
    pub fn load() -> ConfigErrorResult<Self> {
        let config_dir = Self::config_dir()?;

        if !config_dir.exists() {
            std::fs::create_dir_all(&config_dir).map_err(|e| ConfigError::Io {
                path: config_dir.clone(),
                source: e,
            })?;
        }

        let config_path = config_dir.join(CONFIG_FILENAME);

        let mut config = if config_path.exists() {
            Self::load_toml(&config_path)?
        } else {
            Config::default()
        };

        config.apply_env_overrides();

        Ok(config)
    }

    fn load_toml(path: &Path) -> ConfigErrorResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&contents).map_err(|e| ConfigError::Toml {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Get the config directory.
    /// Priority: GW_CONFIG_DIR env var > platform config dir
    pub fn config_dir() -> ConfigErrorResult<PathBuf> {
        if let Ok(dir) = std::env::var(CONFIG_DIR_ENV) {
            return Ok(PathBuf::from(dir));
        }

        dirs::config_dir()
            .map(|dir| dir.join(APP_DIR_NAME))
            .ok_or(ConfigError::NoConfigDir)
    }

    /// Validate all configuration.
    pub fn validate(&self) -> ConfigErrorResult<()> {
        self.gateway.validate()?;
        self.lifecycle.validate()?;

        if self.logging.dir.contains("..") {
            return Err(ConfigError::logging("logging.dir cannot contain '..'"));
        }

        Ok(())
    }

    /// Absolute path of the gateway log file the coordinator tails.
    pub fn gateway_log_path(&self) -> ConfigErrorResult<PathBuf> {
        let path = Path::new(&self.gateway.log_file);
        if path.is_absolute() {
            return Ok(path.to_path_buf());
        }
        Ok(Self::config_dir()?.join(&self.logging.dir).join(path))
    }

    /// Directory for the desktop host's own rolling logs.
    pub fn host_log_dir(&self) -> ConfigErrorResult<PathBuf> {
        Ok(Self::config_dir()?.join(&self.logging.dir))
    }

    /// Log configuration summary (never logs the auth token).
    pub fn log_summary(&self) {
        info!("Configuration loaded:");
        info!(
            "  gateway: {}:{} (mode: {}, attach_only: {})",
            self.gateway.host, self.gateway.port, self.gateway.mode, self.gateway.attach_only
        );
        info!(
            "  gateway command: {} (service: {}, auth token: {})",
            self.gateway.command,
            self.gateway.service_label,
            if self.gateway.auth_token.is_some() {
                "configured"
            } else {
                "not set"
            }
        );
        info!(
            "  lifecycle: attach={}ms, poll={}ms every {}ms, deadline={}ms",
            self.lifecycle.attach_probe_timeout_ms,
            self.lifecycle.poll_probe_timeout_ms,
            self.lifecycle.poll_interval_ms,
            self.lifecycle.start_deadline_ms
        );
        info!(
            "  refresh: environment every {}s, log tail {} chars",
            self.lifecycle.environment_refresh_secs, self.lifecycle.log_limit_chars
        );
        info!("  logging: {} ({})", *self.logging.level, self.logging.dir);
    }

    fn apply_env_overrides(&mut self) {
        // Gateway
        Self::apply_env_string("GW_GATEWAY_HOST", &mut self.gateway.host);
        Self::apply_env_parse("GW_GATEWAY_PORT", &mut self.gateway.port);
        Self::apply_env_parse("GW_GATEWAY_MODE", &mut self.gateway.mode);
        Self::apply_env_bool("GW_ATTACH_ONLY", &mut self.gateway.attach_only);
        Self::apply_env_option_string("GW_GATEWAY_TOKEN", &mut self.gateway.auth_token);
        Self::apply_env_string("GW_GATEWAY_COMMAND", &mut self.gateway.command);
        Self::apply_env_string("GW_SERVICE_LABEL", &mut self.gateway.service_label);
        Self::apply_env_string("GW_GATEWAY_LOG_FILE", &mut self.gateway.log_file);

        // Lifecycle
        Self::apply_env_parse(
            "GW_ATTACH_PROBE_TIMEOUT_MS",
            &mut self.lifecycle.attach_probe_timeout_ms,
        );
        Self::apply_env_parse(
            "GW_POLL_PROBE_TIMEOUT_MS",
            &mut self.lifecycle.poll_probe_timeout_ms,
        );
        Self::apply_env_parse(
            "GW_START_DEADLINE_MS",
            &mut self.lifecycle.start_deadline_ms,
        );
        Self::apply_env_parse("GW_POLL_INTERVAL_MS", &mut self.lifecycle.poll_interval_ms);
        Self::apply_env_parse(
            "GW_ENVIRONMENT_REFRESH_SECS",
            &mut self.lifecycle.environment_refresh_secs,
        );
        Self::apply_env_parse("GW_LOG_LIMIT_CHARS", &mut self.lifecycle.log_limit_chars);

        // Logging
        Self::apply_env_parse("GW_LOG_LEVEL", &mut self.logging.level);
        Self::apply_env_string("GW_LOG_DIR", &mut self.logging.dir);
    }

    /// Helper: Apply environment variable override for String values
    fn apply_env_string(var_name: &str, target: &mut String) {
        if let Ok(val) = std::env::var(var_name) {
            *target = val;
        }
    }

    /// Helper: Apply environment variable override for bool values (accepts "true"/"1")
    fn apply_env_bool(var_name: &str, target: &mut bool) {
        if let Ok(val) = std::env::var(var_name) {
            *target = val == "true" || val == "1";
        }
    }

    /// Helper: Apply environment variable override for parseable values
    fn apply_env_parse<T: std::str::FromStr>(var_name: &str, target: &mut T) {
        if let Ok(val) = std::env::var(var_name)
            && let Ok(parsed) = val.parse()
        {
            *target = parsed;
        }
    }

    /// Helper: Apply environment variable override for Option<String> values
    fn apply_env_option_string(var_name: &str, target: &mut Option<String>) {
        if let Ok(val) = std::env::var(var_name) {
            *target = Some(val);
        }
    }
}

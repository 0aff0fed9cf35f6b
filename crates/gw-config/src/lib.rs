mod config;
mod error;
mod gateway_config;
mod gateway_mode;
mod lifecycle_config;
mod log_level;
mod logging_config;

pub use config::{CONFIG_DIR_ENV, CONFIG_FILENAME, Config};
pub use error::{ConfigError, ConfigErrorResult};
pub use gateway_config::GatewayConfig;
pub use gateway_mode::GatewayMode;
pub use lifecycle_config::LifecycleConfig;
pub use log_level::LogLevel;
pub use logging_config::LoggingConfig;

#[cfg(test)]
mod tests;

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 18789;
const DEFAULT_COMMAND: &str = "gateway";
const DEFAULT_SERVICE_LABEL: &str = "dev.local-gateway.gateway";
const DEFAULT_GATEWAY_LOG_FILE: &str = "gateway.log";
const DEFAULT_ATTACH_ONLY: bool = false;
const DEFAULT_LOG_LEVEL_STRING: &str = "info";
const DEFAULT_LOG_LEVEL: log::LevelFilter = log::LevelFilter::Info;
const DEFAULT_LOG_DIRECTORY: &str = "logs";

const DEFAULT_ATTACH_PROBE_TIMEOUT_MS: u64 = 2_000;
const DEFAULT_POLL_PROBE_TIMEOUT_MS: u64 = 1_500;
const DEFAULT_START_DEADLINE_MS: u64 = 6_000;
const DEFAULT_POLL_INTERVAL_MS: u64 = 400;
const DEFAULT_ENVIRONMENT_REFRESH_SECS: u64 = 30;
const DEFAULT_LOG_LIMIT_CHARS: usize = 20_000;

const MIN_PORT: u16 = 1024;

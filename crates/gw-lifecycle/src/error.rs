use std::panic::Location;

use error_location::ErrorLocation;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LifecycleError {
    #[error("Health probe on port {port} timed out after {timeout_ms}ms {location}")]
    HealthTimeout {
        port: u16,
        timeout_ms: u64,
        location: ErrorLocation,
    },

    #[error("Health probe on port {port} could not connect: {message} {location}")]
    HealthConnection {
        port: u16,
        message: String,
        location: ErrorLocation,
    },

    #[error("Gateway on port {port} rejected our credentials (HTTP {status}) {location}")]
    AuthMismatch {
        port: u16,
        status: u16,
        location: ErrorLocation,
    },

    #[error("Health probe on port {port} returned HTTP {status} {location}")]
    HealthStatus {
        port: u16,
        status: u16,
        location: ErrorLocation,
    },

    #[error("Service descriptor error: {message} {location}")]
    Supervisor {
        message: String,
        location: ErrorLocation,
    },

    #[error("Command `{command}` failed: {message} {location}")]
    Command {
        command: String,
        message: String,
        location: ErrorLocation,
    },

    #[error("IO error: {source} {location}")]
    Io {
        #[source]
        source: std::io::Error,
        location: ErrorLocation,
    },

    #[error("HTTP error: {source} {location}")]
    Http {
        #[source]
        source: reqwest::Error,
        location: ErrorLocation,
    },
}

impl LifecycleError {
    #[track_caller]
    pub fn supervisor<S: Into<String>>(message: S) -> Self {
        Self::Supervisor {
            message: message.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn command<C: Into<String>, S: Into<String>>(command: C, message: S) -> Self {
        Self::Command {
            command: command.into(),
            message: message.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    /// Human-readable reason without the source location, suitable for
    /// `Status::Failed`.
    pub fn reason(&self) -> String {
        match self {
            Self::Supervisor { message, .. } => message.clone(),
            Self::Command {
                command, message, ..
            } => format!("{command}: {message}"),
            Self::Io { source, .. } => source.to_string(),
            Self::Http { source, .. } => source.to_string(),
            Self::HealthTimeout { timeout_ms, .. } => {
                format!("health probe timed out after {timeout_ms}ms")
            }
            Self::HealthConnection { message, .. } => message.clone(),
            Self::AuthMismatch { status, .. } => {
                format!("gateway rejected credentials (HTTP {status})")
            }
            Self::HealthStatus { status, .. } => format!("health probe returned HTTP {status}"),
        }
    }

    /// Whether this error is recoverable via retry
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::HealthTimeout { .. }
                | Self::HealthConnection { .. }
                | Self::HealthStatus { .. }
                | Self::Http { .. }
        )
    }

    pub fn recovery_hint(&self) -> &'static str {
        match self {
            Self::AuthMismatch { .. } => {
                "A gateway is running on this port but rejected the configured token. \
                   Check gateway.auth_token or stop the other gateway."
            }
            Self::HealthTimeout { .. } | Self::HealthConnection { .. } => {
                "The gateway is not reachable yet. \
                   Check the gateway log tail for startup errors."
            }
            Self::Supervisor { .. } | Self::Command { .. } => {
                "The background service could not be registered. \
                   Check that launchctl/systemctl is available for your user."
            }
            _ => "An unexpected error occurred. Please check the logs for details.",
        }
    }
}

impl From<std::io::Error> for LifecycleError {
    #[track_caller]
    fn from(source: std::io::Error) -> Self {
        Self::Io {
            source,
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

impl From<reqwest::Error> for LifecycleError {
    #[track_caller]
    fn from(source: reqwest::Error) -> Self {
        Self::Http {
            source,
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

pub type Result<T> = std::result::Result<T, LifecycleError>;

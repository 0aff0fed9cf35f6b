//! Spawn prerequisites for the local gateway.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use gw_config::Config;
use serde::Serialize;
use tokio::sync::watch;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EnvironmentKind {
    Checking,
    Ready,
    Missing,
    Error,
}

/// Outcome of an environment check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnvironmentStatus {
    pub kind: EnvironmentKind,
    pub message: String,
    pub command_path: Option<PathBuf>,
}

impl EnvironmentStatus {
    /// Neutral value shown before the first check completes.
    pub fn checking() -> Self {
        Self {
            kind: EnvironmentKind::Checking,
            message: "Checking gateway environment…".to_string(),
            command_path: None,
        }
    }

    pub fn ready(command_path: PathBuf) -> Self {
        Self {
            kind: EnvironmentKind::Ready,
            message: format!("Gateway command found at {}", command_path.display()),
            command_path: Some(command_path),
        }
    }

    pub fn missing<S: Into<String>>(message: S) -> Self {
        Self {
            kind: EnvironmentKind::Missing,
            message: message.into(),
            command_path: None,
        }
    }

    pub fn error<S: Into<String>>(message: S) -> Self {
        Self {
            kind: EnvironmentKind::Error,
            message: message.into(),
            command_path: None,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.kind == EnvironmentKind::Ready && self.command_path.is_some()
    }
}

impl Default for EnvironmentStatus {
    fn default() -> Self {
        Self::checking()
    }
}

#[async_trait]
pub trait EnvironmentChecker: Send + Sync {
    async fn check(&self) -> EnvironmentStatus;
}

/// Locates the configured gateway command.
///
/// Search order: an absolute configured path, a sibling of the running
/// executable, then `PATH`.
pub struct CommandEnvironmentChecker {
    config: watch::Receiver<Config>,
}

impl CommandEnvironmentChecker {
    pub fn new(config: watch::Receiver<Config>) -> Self {
        Self { config }
    }

    fn resolve(command: &str) -> EnvironmentStatus {
        let configured = Path::new(command);
        if configured.is_absolute() {
            return if configured.is_file() {
                EnvironmentStatus::ready(configured.to_path_buf())
            } else {
                EnvironmentStatus::missing(format!(
                    "Gateway command not found at {}",
                    configured.display()
                ))
            };
        }

        if let Some(sibling) = Self::sibling_of_current_exe(command) {
            return EnvironmentStatus::ready(sibling);
        }

        match which::which(command) {
            Ok(path) => EnvironmentStatus::ready(path),
            Err(which::Error::CannotFindBinaryPath) => EnvironmentStatus::missing(format!(
                "Gateway command `{command}` not found next to the app or on PATH"
            )),
            Err(e) => {
                EnvironmentStatus::error(format!("Could not look up gateway command `{command}`: {e}"))
            }
        }
    }

    fn sibling_of_current_exe(command: &str) -> Option<PathBuf> {
        let exe = std::env::current_exe().ok()?;
        let candidate = exe.parent()?.join(command);
        if candidate.is_file() {
            Some(candidate)
        } else {
            debug!("No gateway command beside {}", exe.display());
            None
        }
    }
}

#[async_trait]
impl EnvironmentChecker for CommandEnvironmentChecker {
    async fn check(&self) -> EnvironmentStatus {
        let command = self.config.borrow().gateway.command.clone();

        match tokio::task::spawn_blocking(move || Self::resolve(&command)).await {
            Ok(status) => status,
            Err(e) => EnvironmentStatus::error(format!("Environment check aborted: {e}")),
        }
    }
}

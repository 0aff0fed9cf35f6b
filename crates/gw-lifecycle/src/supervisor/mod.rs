//! Persistent-service descriptors that keep the gateway alive.
//!
//! Enabling installs (or refreshes) a per-user service definition pointing at
//! the gateway executable and asks the platform service manager to start it.
//! Disabling unloads it. Both directions are idempotent.

mod launchd;
mod systemd;

pub use launchd::LaunchdSupervisor;
pub use systemd::SystemdUserSupervisor;

use crate::{LifecycleError, LifecycleResult};

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use gw_config::Config;
use tokio::process::Command;
use tracing::{debug, info};

/// Arguments passed to the gateway executable after its path.
pub(crate) fn gateway_arguments(port: u16) -> Vec<String> {
    vec!["gateway".to_string(), "--port".to_string(), port.to_string()]
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupervisorRequest {
    pub enabled: bool,
    pub executable_path: PathBuf,
    pub port: u16,
}

#[async_trait]
pub trait ServiceSupervisor: Send + Sync {
    /// Enable or disable the descriptor. Disabling one that was never
    /// enabled succeeds.
    async fn set_enabled(&self, request: SupervisorRequest) -> LifecycleResult<()>;
}

/// Service manager for the current platform.
pub fn platform_supervisor(config: &Config) -> LifecycleResult<Arc<dyn ServiceSupervisor>> {
    let label = config.gateway.service_label.clone();
    let log_path = config
        .gateway_log_path()
        .map_err(|e| LifecycleError::supervisor(format!("cannot resolve gateway log: {e}")))?;

    if cfg!(target_os = "macos") {
        let home = dirs::home_dir()
            .ok_or_else(|| LifecycleError::supervisor("cannot determine home directory"))?;
        let agents_dir = home.join("Library").join("LaunchAgents");
        return Ok(Arc::new(LaunchdSupervisor::new(label, agents_dir, log_path)));
    }

    if cfg!(target_os = "linux") {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| LifecycleError::supervisor("cannot determine config directory"))?;
        let unit_dir = config_dir.join("systemd").join("user");
        return Ok(Arc::new(SystemdUserSupervisor::new(label, unit_dir, log_path)));
    }

    Ok(Arc::new(UnsupportedSupervisor))
}

/// Used where no per-user service manager is known.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnsupportedSupervisor;

#[async_trait]
impl ServiceSupervisor for UnsupportedSupervisor {
    async fn set_enabled(&self, request: SupervisorRequest) -> LifecycleResult<()> {
        if request.enabled {
            return Err(LifecycleError::supervisor(
                "no supported service manager on this platform",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub(crate) struct CommandOutput {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn stderr_or_placeholder(&self) -> &str {
        let stderr = self.stderr.trim();
        if stderr.is_empty() { "(no stderr)" } else { stderr }
    }
}

/// Run an external command, returning its output even when it fails.
pub(crate) async fn run_command(program: &str, args: &[&str]) -> LifecycleResult<CommandOutput> {
    info!(program, args = ?args, "executing external command");

    let output = Command::new(program)
        .args(args)
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| LifecycleError::command(program, format!("failed to execute: {e}")))?;

    let result = CommandOutput {
        success: output.status.success(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    };

    debug!(
        program,
        args = ?args,
        status = ?output.status.code(),
        stderr = %result.stderr.trim(),
        "external command finished"
    );

    Ok(result)
}

/// Run an external command and fail on a non-zero exit.
pub(crate) async fn run_checked(program: &str, args: &[&str]) -> LifecycleResult<String> {
    let result = run_command(program, args).await?;
    if !result.success {
        return Err(LifecycleError::command(
            format!("{program} {}", args.join(" ")),
            result.stderr_or_placeholder(),
        ));
    }
    Ok(result.stdout.trim().to_string())
}

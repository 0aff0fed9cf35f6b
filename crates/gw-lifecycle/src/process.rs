//! Port to process lookup for diagnostics.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

const LOOKUP_TIMEOUT: Duration = Duration::from_secs(2);

/// The process listening on a port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessInfo {
    pub pid: u32,
    pub command: String,
    pub executable_path: Option<PathBuf>,
}

impl ProcessInfo {
    /// `pid 4242 gateway (/usr/local/bin/gateway)`
    pub fn describe(&self) -> String {
        let mut text = format!("pid {} {}", self.pid, self.command);
        if let Some(ref path) = self.executable_path {
            text.push_str(&format!(" ({})", path.display()));
        }
        text
    }
}

#[async_trait]
pub trait ProcessResolver: Send + Sync {
    /// Describe whoever listens on `port`, if anything can be found.
    async fn describe(&self, port: u16) -> Option<ProcessInfo>;
}

/// Resolves listeners with `lsof`.
#[derive(Debug, Clone, Default)]
pub struct LsofProcessResolver;

impl LsofProcessResolver {
    pub fn new() -> Self {
        Self
    }

    async fn run(program: &str, args: &[String]) -> Option<String> {
        let output = tokio::time::timeout(
            LOOKUP_TIMEOUT,
            Command::new(program).args(args).kill_on_drop(true).output(),
        )
        .await;

        match output {
            Ok(Ok(output)) if output.status.success() => {
                Some(String::from_utf8_lossy(&output.stdout).into_owned())
            }
            Ok(Ok(output)) => {
                debug!("{program} exited with {}", output.status);
                None
            }
            Ok(Err(e)) => {
                debug!("Failed to run {program}: {e}");
                None
            }
            Err(_) => {
                debug!("{program} did not finish within {LOOKUP_TIMEOUT:?}");
                None
            }
        }
    }

    async fn executable_path(pid: u32) -> Option<PathBuf> {
        if cfg!(target_os = "linux") {
            return tokio::fs::read_link(format!("/proc/{pid}/exe")).await.ok();
        }

        let args = ["-o".to_string(), "comm=".to_string(), "-p".to_string(), pid.to_string()];
        let stdout = Self::run("ps", &args).await?;
        let path = stdout.trim();
        if path.is_empty() {
            None
        } else {
            Some(PathBuf::from(path))
        }
    }
}

#[async_trait]
impl ProcessResolver for LsofProcessResolver {
    async fn describe(&self, port: u16) -> Option<ProcessInfo> {
        let args = [
            "-nP".to_string(),
            format!("-iTCP:{port}"),
            "-sTCP:LISTEN".to_string(),
            "-Fpc".to_string(),
        ];
        let stdout = Self::run("lsof", &args).await?;
        let (pid, command) = parse_lsof_output(&stdout)?;
        let executable_path = Self::executable_path(pid).await;

        Some(ProcessInfo {
            pid,
            command,
            executable_path,
        })
    }
}

/// First `p<pid>` record of `lsof -F pc` output with its `c<command>` field.
pub(crate) fn parse_lsof_output(output: &str) -> Option<(u32, String)> {
    let mut pid = None;
    let mut command = None;

    for line in output.lines() {
        if let Some(value) = line.strip_prefix('p') {
            if pid.is_some() {
                break;
            }
            pid = value.trim().parse::<u32>().ok();
        } else if let Some(value) = line.strip_prefix('c')
            && pid.is_some()
            && command.is_none()
        {
            command = Some(value.trim().to_string());
        }
    }

    let pid = pid?;
    Some((pid, command.unwrap_or_else(|| "unknown".to_string())))
}

use super::{ServiceSupervisor, SupervisorRequest, gateway_arguments, run_checked, run_command};
use crate::{LifecycleError, LifecycleResult};

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use plist::{Dictionary, Value};
use tracing::{info, warn};

/// macOS LaunchAgent descriptor managed through `launchctl`.
pub struct LaunchdSupervisor {
    label: String,
    agents_dir: PathBuf,
    log_path: PathBuf,
}

impl LaunchdSupervisor {
    pub fn new(label: String, agents_dir: PathBuf, log_path: PathBuf) -> Self {
        Self {
            label,
            agents_dir,
            log_path,
        }
    }

    pub fn plist_path(&self) -> PathBuf {
        self.agents_dir.join(format!("{}.plist", self.label))
    }

    pub(crate) fn build_plist(&self, executable: &Path, port: u16) -> Value {
        let mut program_args = vec![Value::String(executable.display().to_string())];
        program_args.extend(gateway_arguments(port).into_iter().map(Value::String));

        let log = Value::String(self.log_path.display().to_string());

        let mut dict = Dictionary::new();
        dict.insert("Label".to_string(), Value::String(self.label.clone()));
        dict.insert("ProgramArguments".to_string(), Value::Array(program_args));
        dict.insert("RunAtLoad".to_string(), Value::Boolean(true));
        dict.insert("KeepAlive".to_string(), Value::Boolean(true));
        dict.insert("StandardOutPath".to_string(), log.clone());
        dict.insert("StandardErrorPath".to_string(), log);

        Value::Dictionary(dict)
    }

    pub(crate) async fn install_plist(
        &self,
        executable: &Path,
        port: u16,
    ) -> LifecycleResult<PathBuf> {
        tokio::fs::create_dir_all(&self.agents_dir).await?;
        if let Some(parent) = self.log_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut xml = Vec::new();
        self.build_plist(executable, port)
            .to_writer_xml(&mut xml)
            .map_err(|e| LifecycleError::supervisor(format!("failed to render plist: {e}")))?;

        let path = self.plist_path();
        tokio::fs::write(&path, xml).await?;
        Ok(path)
    }

    /// A plist that is already gone is not an error.
    pub(crate) async fn remove_plist(&self) -> LifecycleResult<()> {
        match tokio::fs::remove_file(self.plist_path()).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn enable(&self, request: &SupervisorRequest) -> LifecycleResult<()> {
        let plist = self.install_plist(&request.executable_path, request.port).await?;
        let uid = current_uid()?;
        let domain = format!("gui/{uid}");
        let service = format!("{domain}/{}", self.label);
        let plist = plist.display().to_string();

        // Fails when already loaded; kickstart below still applies.
        let bootstrap = run_command("launchctl", &["bootstrap", &domain, &plist]).await?;
        if !bootstrap.success {
            warn!(
                label = %self.label,
                stderr = %bootstrap.stderr_or_placeholder(),
                "launchctl bootstrap failed, assuming already loaded"
            );
        }

        run_checked("launchctl", &["kickstart", "-k", &service]).await?;
        info!(label = %self.label, port = request.port, "LaunchAgent enabled");
        Ok(())
    }

    async fn disable(&self) -> LifecycleResult<()> {
        let uid = current_uid()?;
        let service = format!("gui/{uid}/{}", self.label);

        let bootout = run_command("launchctl", &["bootout", &service]).await?;
        if !bootout.success {
            info!(
                label = %self.label,
                stderr = %bootout.stderr_or_placeholder(),
                "launchctl bootout reported no loaded service"
            );
        }

        self.remove_plist().await?;
        info!(label = %self.label, "LaunchAgent disabled");
        Ok(())
    }
}

#[async_trait]
impl ServiceSupervisor for LaunchdSupervisor {
    async fn set_enabled(&self, request: SupervisorRequest) -> LifecycleResult<()> {
        if request.enabled {
            self.enable(&request).await
        } else {
            self.disable().await
        }
    }
}

#[cfg(unix)]
fn current_uid() -> LifecycleResult<u32> {
    // SAFETY: getuid has no preconditions and cannot fail.
    Ok(unsafe { libc::getuid() })
}

#[cfg(not(unix))]
fn current_uid() -> LifecycleResult<u32> {
    Err(LifecycleError::supervisor("launchd requires a unix user id"))
}

use super::{ServiceSupervisor, SupervisorRequest, gateway_arguments, run_checked, run_command};
use crate::LifecycleResult;

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::info;

/// Linux `systemd --user` unit managed through `systemctl`.
pub struct SystemdUserSupervisor {
    label: String,
    unit_dir: PathBuf,
    log_path: PathBuf,
}

impl SystemdUserSupervisor {
    pub fn new(label: String, unit_dir: PathBuf, log_path: PathBuf) -> Self {
        Self {
            label,
            unit_dir,
            log_path,
        }
    }

    fn unit_name(&self) -> String {
        format!("{}.service", self.label)
    }

    pub fn unit_path(&self) -> PathBuf {
        self.unit_dir.join(self.unit_name())
    }

    pub(crate) fn unit_contents(&self, executable: &Path, port: u16) -> String {
        let mut exec_start = quote_arg(&executable.display().to_string());
        for arg in gateway_arguments(port) {
            exec_start.push(' ');
            exec_start.push_str(&quote_arg(&arg));
        }
        let log = self.log_path.display();

        format!(
            "[Unit]\n\
             Description=Local gateway ({label})\n\
             After=network.target\n\
             \n\
             [Service]\n\
             Type=simple\n\
             ExecStart={exec_start}\n\
             Restart=always\n\
             RestartSec=2\n\
             StandardOutput=append:{log}\n\
             StandardError=append:{log}\n\
             \n\
             [Install]\n\
             WantedBy=default.target\n",
            label = self.label,
        )
    }

    pub(crate) async fn install_unit(
        &self,
        executable: &Path,
        port: u16,
    ) -> LifecycleResult<PathBuf> {
        tokio::fs::create_dir_all(&self.unit_dir).await?;
        if let Some(parent) = self.log_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let path = self.unit_path();
        tokio::fs::write(&path, self.unit_contents(executable, port)).await?;
        Ok(path)
    }

    async fn enable(&self, request: &SupervisorRequest) -> LifecycleResult<()> {
        self.install_unit(&request.executable_path, request.port).await?;

        let unit = self.unit_name();
        run_checked("systemctl", &["--user", "daemon-reload"]).await?;
        run_checked("systemctl", &["--user", "enable", &unit]).await?;
        run_checked("systemctl", &["--user", "restart", &unit]).await?;

        info!(unit = %unit, port = request.port, "systemd user unit enabled");
        Ok(())
    }

    async fn disable(&self) -> LifecycleResult<()> {
        let unit = self.unit_name();
        let result = run_command("systemctl", &["--user", "disable", "--now", &unit]).await?;
        if !result.success {
            info!(
                unit = %unit,
                stderr = %result.stderr_or_placeholder(),
                "systemd user unit was not active"
            );
        }
        info!(unit = %unit, "systemd user unit disabled");
        Ok(())
    }
}

#[async_trait]
impl ServiceSupervisor for SystemdUserSupervisor {
    async fn set_enabled(&self, request: SupervisorRequest) -> LifecycleResult<()> {
        if request.enabled {
            self.enable(&request).await
        } else {
            self.disable().await
        }
    }
}

fn quote_arg(arg: &str) -> String {
    if arg.chars().any(|c| c.is_whitespace() || c == '"') {
        format!("\"{}\"", arg.replace('\\', "\\\\").replace('"', "\\\""))
    } else {
        arg.to_string()
    }
}

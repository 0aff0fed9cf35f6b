//! Activation state machine for the local gateway.

use crate::environment::{EnvironmentChecker, EnvironmentStatus};
use crate::health::{HealthProbe, HealthRequest, HealthSnapshot};
use crate::log_buffer::LogBuffer;
use crate::log_tail::LogSource;
use crate::process::ProcessResolver;
use crate::status::Status;
use crate::supervisor::{ServiceSupervisor, SupervisorRequest};

use std::path::PathBuf;
use std::sync::Arc;

use gw_config::Config;
use serde::Serialize;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

pub const ATTACH_ONLY_REASON: &str = "Attach-only enabled; no gateway to attach";
pub const START_TIMEOUT_REASON: &str = "Gateway did not start in time";
pub const START_TIMEOUT_FAILURE: &str = "launchd start timeout";

/// Collaborators the coordinator drives.
#[derive(Clone)]
pub struct CoordinatorDeps {
    pub health_probe: Arc<dyn HealthProbe>,
    pub process_resolver: Arc<dyn ProcessResolver>,
    pub supervisor: Arc<dyn ServiceSupervisor>,
    pub environment_checker: Arc<dyn EnvironmentChecker>,
    pub log_source: Arc<dyn LogSource>,
}

/// Read-only view of the activation state handed to observers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivationSnapshot {
    pub desired_active: bool,
    pub status: Status,
    pub existing_gateway_details: Option<String>,
    pub last_failure_reason: Option<String>,
    pub environment_status: EnvironmentStatus,
    pub log: String,
}

struct ActivationState {
    desired_active: bool,
    status: Status,
    existing_gateway_details: Option<String>,
    last_failure_reason: Option<String>,
    environment_status: EnvironmentStatus,
    last_environment_refresh_at: Option<Instant>,
    environment_refresh_in_flight: bool,
    log: LogBuffer,
    log_refresh_in_flight: bool,
    cycle: CancellationToken,
    last_executable_path: Option<PathBuf>,
}

impl ActivationState {
    fn new(log_limit: usize) -> Self {
        Self {
            desired_active: false,
            status: Status::Stopped,
            existing_gateway_details: None,
            last_failure_reason: None,
            environment_status: EnvironmentStatus::checking(),
            last_environment_refresh_at: None,
            environment_refresh_in_flight: false,
            log: LogBuffer::new(log_limit),
            log_refresh_in_flight: false,
            cycle: CancellationToken::new(),
            last_executable_path: None,
        }
    }

    fn snapshot(&self) -> ActivationSnapshot {
        ActivationSnapshot {
            desired_active: self.desired_active,
            status: self.status.clone(),
            existing_gateway_details: self.existing_gateway_details.clone(),
            last_failure_reason: self.last_failure_reason.clone(),
            environment_status: self.environment_status.clone(),
            log: self.log.as_str().to_string(),
        }
    }

    fn append_log(&mut self, message: &str) {
        info!("{message}");
        let stamp = chrono::Local::now().format("%H:%M:%S");
        self.log.append_line(&format!("[{stamp}] {message}"));
    }

    fn fail(&mut self, reason: String) {
        self.append_log(&format!("Gateway failed: {reason}"));
        self.status = Status::Failed { reason };
    }
}

struct Inner {
    deps: CoordinatorDeps,
    config: watch::Receiver<Config>,
    state: Mutex<ActivationState>,
    snapshot_tx: watch::Sender<ActivationSnapshot>,
    detached: TaskTracker,
}

/// Owns the activation state and decides whether a local gateway runs.
///
/// All state changes happen under a single lock and are published as an
/// [`ActivationSnapshot`]. Slow work (probes, process lookups, service
/// manager calls, file reads) runs on spawned tasks that re-enter the lock
/// only to commit their result. Cloning is cheap; clones share state.
#[derive(Clone)]
pub struct LifecycleCoordinator {
    inner: Arc<Inner>,
}

impl LifecycleCoordinator {
    pub fn new(deps: CoordinatorDeps, config: watch::Receiver<Config>) -> Self {
        let log_limit = config.borrow().lifecycle.log_limit_chars;
        let state = ActivationState::new(log_limit);
        let (snapshot_tx, _) = watch::channel(state.snapshot());

        Self {
            inner: Arc::new(Inner {
                deps,
                config,
                state: Mutex::new(state),
                snapshot_tx,
                detached: TaskTracker::new(),
            }),
        }
    }

    pub fn snapshot(&self) -> ActivationSnapshot {
        self.inner.snapshot_tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ActivationSnapshot> {
        self.inner.snapshot_tx.subscribe()
    }

    pub fn status(&self) -> Status {
        self.inner.snapshot_tx.borrow().status.clone()
    }

    /// Wait for fire-and-forget work (service disable, refreshes, log
    /// deletion) started so far.
    pub async fn wait_for_detached(&self) {
        self.inner.detached.close();
        self.inner.detached.wait().await;
        self.inner.detached.reopen();
    }

    fn config(&self) -> Config {
        self.inner.config.borrow().clone()
    }

    fn publish(&self, state: &ActivationState) {
        self.inner.snapshot_tx.send_replace(state.snapshot());
    }

    /// Apply `update` unless `cycle` was cancelled. Returns whether it ran.
    async fn commit<F>(&self, cycle: &CancellationToken, update: F) -> bool
    where
        F: FnOnce(&mut ActivationState),
    {
        let mut state = self.inner.state.lock().await;
        if cycle.is_cancelled() {
            return false;
        }
        update(&mut state);
        self.publish(&state);
        true
    }

    /// Record whether the gateway should run and act on it.
    pub async fn set_active(&self, active: bool) {
        if self.config().gateway.mode.is_remote() {
            self.stop_for_remote_mode().await;
            return;
        }

        {
            let mut state = self.inner.state.lock().await;
            state.desired_active = active;
            self.publish(&state);
        }

        // The check finishes in the background.
        drop(self.schedule_environment_refresh(false).await);

        if active {
            self.start_if_needed().await;
        } else {
            self.stop().await;
        }
    }

    /// Begin an activation cycle if one is desired. Restarts any cycle
    /// already underway.
    pub async fn start_if_needed(&self) {
        if self.config().gateway.mode.is_remote() {
            let desired = self.inner.state.lock().await.desired_active;
            if desired {
                self.stop_for_remote_mode().await;
            }
            return;
        }

        let cycle = {
            let mut state = self.inner.state.lock().await;
            if !state.desired_active {
                return;
            }

            state.cycle.cancel();
            state.cycle = CancellationToken::new();
            state.status = Status::Starting;
            state.append_log("Starting gateway");
            self.publish(&state);
            state.cycle.clone()
        };

        let coordinator = self.clone();
        tokio::spawn(async move {
            coordinator.run_activation(cycle).await;
        });
    }

    /// Remote mode never runs a local gateway: cancel any cycle in flight
    /// and disable the descriptor a local cycle may have left behind.
    async fn stop_for_remote_mode(&self) {
        self.stop().await;

        let mut state = self.inner.state.lock().await;
        state.desired_active = false;
        state.status = Status::Stopped;
        state.append_log("Remote mode; local gateway stays stopped");
        self.publish(&state);
    }

    async fn run_activation(&self, cycle: CancellationToken) {
        let config = self.config();

        if self.attach_existing_gateway_if_available(&cycle, &config).await {
            return;
        }
        if cycle.is_cancelled() {
            return;
        }

        if config.gateway.attach_only {
            self.commit(&cycle, |state| {
                state.fail(ATTACH_ONLY_REASON.to_string());
            })
            .await;
            return;
        }

        self.enable_and_verify(&cycle, &config).await;
    }

    async fn attach_existing_gateway_if_available(
        &self,
        cycle: &CancellationToken,
        config: &Config,
    ) -> bool {
        let port = config.gateway.port;
        let request = HealthRequest {
            host: config.gateway.host.clone(),
            port,
            timeout: config.lifecycle.attach_probe_timeout(),
            auth_token: config.gateway.auth_token.clone(),
        };

        match self.inner.deps.health_probe.probe(&request).await {
            Ok(snapshot) => {
                let process = self.inner.deps.process_resolver.describe(port).await;
                let process = process
                    .map(|info| info.describe())
                    .unwrap_or_else(|| "pid unknown".to_string());
                let details = attach_details(port, snapshot.as_ref(), &process);

                let committed = self
                    .commit(cycle, |state| {
                        state.existing_gateway_details = Some(details.clone());
                        state.last_failure_reason = None;
                        state.status = Status::AttachedExisting {
                            details: Some(details.clone()),
                        };
                        state.append_log(&format!("Attached to existing gateway ({details})"));
                    })
                    .await;

                if committed {
                    self.refresh_log().await;
                }
                // A cancelled cycle must not fall through to spawning.
                true
            }
            Err(e) => {
                debug!("No gateway to attach on port {port}: {e}");
                self.commit(cycle, |state| {
                    state.existing_gateway_details = None;
                })
                .await;
                false
            }
        }
    }

    async fn enable_and_verify(&self, cycle: &CancellationToken, config: &Config) {
        let port = config.gateway.port;

        if !self
            .commit(cycle, |state| {
                state.existing_gateway_details = None;
            })
            .await
        {
            return;
        }

        let environment = self.check_environment().await;
        let committed = self
            .commit(cycle, |state| {
                state.environment_status = environment.clone();
                state.last_environment_refresh_at = Some(Instant::now());
            })
            .await;
        if !committed {
            return;
        }

        let Some(executable_path) = environment.command_path.clone() else {
            self.commit(cycle, |state| state.fail(environment.message.clone()))
                .await;
            return;
        };

        let request = SupervisorRequest {
            enabled: true,
            executable_path: executable_path.clone(),
            port,
        };
        if let Err(e) = self.inner.deps.supervisor.set_enabled(request).await {
            warn!("Failed to enable gateway service: {e}");
            let reason = e.reason();
            self.commit(cycle, |state| {
                state.last_failure_reason = Some(reason.clone());
                state.fail(reason);
            })
            .await;
            return;
        }

        let committed = self
            .commit(cycle, |state| {
                state.last_executable_path = Some(executable_path.clone());
                state.append_log(&format!("Gateway service enabled on port {port}"));
            })
            .await;
        if !committed {
            // stop() raced the enable and its disable may have run first.
            // Once the gateway is desired again a newer cycle owns the
            // descriptor.
            let state = self.inner.state.lock().await;
            if !state.desired_active {
                self.spawn_disable(executable_path, port);
            }
            return;
        }

        let deadline = Instant::now() + config.lifecycle.start_deadline();
        let probe = HealthRequest {
            host: config.gateway.host.clone(),
            port,
            timeout: config.lifecycle.poll_probe_timeout(),
            auth_token: config.gateway.auth_token.clone(),
        };

        while Instant::now() < deadline {
            if cycle.is_cancelled() {
                return;
            }

            match self.inner.deps.health_probe.probe(&probe).await {
                Ok(_) => {
                    let details = self
                        .inner
                        .deps
                        .process_resolver
                        .describe(port)
                        .await
                        .map(|info| info.describe());

                    let committed = self
                        .commit(cycle, |state| {
                            state.last_failure_reason = None;
                            state.status = Status::Running {
                                details: details.clone(),
                            };
                            match details {
                                Some(ref details) => {
                                    state.append_log(&format!("Gateway running ({details})"))
                                }
                                None => state.append_log("Gateway running"),
                            }
                        })
                        .await;

                    if committed {
                        self.refresh_log().await;
                    }
                    return;
                }
                Err(e) => {
                    debug!("Gateway not ready on port {port}: {e}");
                }
            }

            tokio::select! {
                _ = cycle.cancelled() => return,
                _ = tokio::time::sleep(config.lifecycle.poll_interval()) => {}
            }
        }

        self.commit(cycle, |state| {
            state.last_failure_reason = Some(START_TIMEOUT_FAILURE.to_string());
            state.fail(START_TIMEOUT_REASON.to_string());
        })
        .await;
    }

    /// Stop managing the gateway and disable its service descriptor.
    pub async fn stop(&self) {
        let path = {
            let mut state = self.inner.state.lock().await;
            state.desired_active = false;
            state.existing_gateway_details = None;
            state.last_failure_reason = None;
            state.cycle.cancel();
            if state.status != Status::Stopped {
                state.status = Status::Stopped;
                state.append_log("Gateway stopped");
            }
            self.publish(&state);
            state
                .last_executable_path
                .clone()
                .or_else(|| state.environment_status.command_path.clone())
        };

        let config = self.config();
        let path = path.unwrap_or_else(|| PathBuf::from(&config.gateway.command));
        self.spawn_disable(path, config.gateway.port);
    }

    fn spawn_disable(&self, executable_path: PathBuf, port: u16) {
        let supervisor = Arc::clone(&self.inner.deps.supervisor);
        self.inner.detached.spawn(async move {
            let request = SupervisorRequest {
                enabled: false,
                executable_path,
                port,
            };
            if let Err(e) = supervisor.set_enabled(request).await {
                warn!("Failed to disable gateway service: {e}");
            }
        });
    }

    async fn check_environment(&self) -> EnvironmentStatus {
        let checker = Arc::clone(&self.inner.deps.environment_checker);
        match tokio::spawn(async move { checker.check().await }).await {
            Ok(status) => status,
            Err(e) => EnvironmentStatus::error(format!("Environment check failed: {e}")),
        }
    }

    /// Re-run the environment check. Unless `force` is set, runs at most
    /// once per configured refresh interval. A call made while a check is
    /// in flight returns without waiting for it.
    pub async fn refresh_environment_status(&self, force: bool) {
        if let Some(task) = self.schedule_environment_refresh(force).await
            && let Err(e) = task.await
        {
            warn!("Environment refresh task failed: {e}");
        }
    }

    /// Claim the in-flight marker and start the check on a detached task,
    /// which clears the marker even if the caller goes away.
    async fn schedule_environment_refresh(&self, force: bool) -> Option<JoinHandle<()>> {
        let interval = self.config().lifecycle.environment_refresh_interval();

        let mut state = self.inner.state.lock().await;
        if state.environment_refresh_in_flight {
            return None;
        }
        if !force
            && let Some(last) = state.last_environment_refresh_at
            && last.elapsed() < interval
        {
            return None;
        }
        state.environment_refresh_in_flight = true;
        state.last_environment_refresh_at = Some(Instant::now());

        let coordinator = self.clone();
        Some(self.inner.detached.spawn(async move {
            let status = coordinator.check_environment().await;

            let mut state = coordinator.inner.state.lock().await;
            state.environment_status = status;
            state.environment_refresh_in_flight = false;
            coordinator.publish(&state);
        }))
    }

    /// Replace the in-memory log with the tail of the gateway log file.
    pub async fn refresh_log(&self) {
        if let Some(task) = self.schedule_log_refresh().await
            && let Err(e) = task.await
        {
            warn!("Log refresh task failed: {e}");
        }
    }

    async fn schedule_log_refresh(&self) -> Option<JoinHandle<()>> {
        let path = match self.config().gateway_log_path() {
            Ok(path) => path,
            Err(e) => {
                debug!("Gateway log path unavailable: {e}");
                return None;
            }
        };

        let mut state = self.inner.state.lock().await;
        if state.log_refresh_in_flight {
            return None;
        }
        state.log_refresh_in_flight = true;
        let limit = state.log.cap();

        let coordinator = self.clone();
        Some(self.inner.detached.spawn(async move {
            let source = Arc::clone(&coordinator.inner.deps.log_source);
            let tail = match tokio::spawn(async move { source.tail(&path, limit).await }).await {
                Ok(tail) => tail,
                Err(e) => {
                    debug!("Gateway log read aborted: {e}");
                    String::new()
                }
            };

            let mut state = coordinator.inner.state.lock().await;
            state.log_refresh_in_flight = false;
            if !tail.is_empty() {
                state.log.replace(&tail);
            }
            coordinator.publish(&state);
        }))
    }

    /// Empty the in-memory log and delete the gateway log file.
    pub async fn clear_log(&self) {
        {
            let mut state = self.inner.state.lock().await;
            state.log.clear();
            self.publish(&state);
        }

        match self.config().gateway_log_path() {
            Ok(path) => {
                let source = Arc::clone(&self.inner.deps.log_source);
                self.inner.detached.spawn(async move {
                    if let Err(e) = source.delete(&path).await {
                        debug!("Could not delete {}: {e}", path.display());
                    }
                });
            }
            Err(e) => debug!("Gateway log path unavailable: {e}"),
        }
    }
}

/// `port 18789, linked, auth 5m, pid 4242 gateway`
pub(crate) fn attach_details(port: u16, snapshot: Option<&HealthSnapshot>, process: &str) -> String {
    let link = snapshot
        .map(|s| s.link_label().to_string())
        .unwrap_or_else(|| "health probe succeeded".to_string());
    let auth = snapshot
        .and_then(HealthSnapshot::auth_label)
        .unwrap_or_else(|| "unknown age".to_string());

    format!("port {port}, {link}, {auth}, {process}")
}

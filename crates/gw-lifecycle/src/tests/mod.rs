mod log_buffer;

use crate::{
    ActivationSnapshot, CoordinatorDeps, EnvironmentChecker, EnvironmentStatus, HealthProbe,
    HealthRequest, HealthSnapshot, LifecycleCoordinator, LifecycleError, LifecycleResult,
    LogSource, LogTailer, ProcessInfo, ProcessResolver, ServiceSupervisor, SupervisorRequest,
};

use std::panic::Location;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use error_location::ErrorLocation;
use gw_config::Config;
use tempfile::TempDir;
use tokio::sync::{Notify, watch};

pub const TEST_PORT: u16 = 18789;

/// Holds a collaborator call until the test releases it.
#[derive(Default)]
pub struct Gate {
    entered: Notify,
    released: Notify,
}

impl Gate {
    async fn pass(&self) {
        self.entered.notify_one();
        self.released.notified().await;
    }

    /// Resolves once a call has reached the gate.
    pub async fn entered(&self) {
        self.entered.notified().await;
    }

    /// Let one held (or the next) call through.
    pub fn release(&self) {
        self.released.notify_one();
    }
}

/// Health probe that fails until call number `succeed_from` (0-based).
pub struct ScriptedProbe {
    succeed_from: Option<usize>,
    snapshot: Option<HealthSnapshot>,
    calls: AtomicUsize,
    requests: Mutex<Vec<HealthRequest>>,
}

impl ScriptedProbe {
    pub fn always_failing() -> Self {
        Self::succeeding_from(None, None)
    }

    pub fn healthy(snapshot: Option<HealthSnapshot>) -> Self {
        Self::succeeding_from(Some(0), snapshot)
    }

    pub fn succeeding_from(succeed_from: Option<usize>, snapshot: Option<HealthSnapshot>) -> Self {
        Self {
            succeed_from,
            snapshot,
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<HealthRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl HealthProbe for ScriptedProbe {
    async fn probe(&self, request: &HealthRequest) -> LifecycleResult<Option<HealthSnapshot>> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());

        match self.succeed_from {
            Some(from) if call >= from => Ok(self.snapshot.clone()),
            _ => Err(LifecycleError::HealthConnection {
                port: request.port,
                message: "connection refused".to_string(),
                location: ErrorLocation::from(Location::caller()),
            }),
        }
    }
}

pub struct FixedResolver(pub Option<ProcessInfo>);

#[async_trait]
impl ProcessResolver for FixedResolver {
    async fn describe(&self, _port: u16) -> Option<ProcessInfo> {
        self.0.clone()
    }
}

#[derive(Default)]
pub struct RecordingSupervisor {
    fail_enable: Option<String>,
    enable_delays: Vec<Duration>,
    requests: Mutex<Vec<SupervisorRequest>>,
}

impl RecordingSupervisor {
    pub fn failing_enable(message: &str) -> Self {
        Self {
            fail_enable: Some(message.to_string()),
            ..Self::default()
        }
    }

    /// Enable call `n` takes `delays[n]`; calls past the end take the last.
    pub fn slow_enable(delays: Vec<Duration>) -> Self {
        Self {
            enable_delays: delays,
            ..Self::default()
        }
    }

    pub fn enable_calls(&self) -> usize {
        self.requests.lock().unwrap().iter().filter(|r| r.enabled).count()
    }

    pub fn disable_calls(&self) -> usize {
        self.requests.lock().unwrap().iter().filter(|r| !r.enabled).count()
    }

    pub fn requests(&self) -> Vec<SupervisorRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ServiceSupervisor for RecordingSupervisor {
    async fn set_enabled(&self, request: SupervisorRequest) -> LifecycleResult<()> {
        let enabled = request.enabled;
        let delay = {
            let mut requests = self.requests.lock().unwrap();
            let earlier_enables = requests.iter().filter(|r| r.enabled).count();
            requests.push(request);
            self.enable_delays
                .get(earlier_enables)
                .or(self.enable_delays.last())
                .copied()
        };
        if enabled && let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        match self.fail_enable {
            Some(ref message) if enabled => Err(LifecycleError::supervisor(message.clone())),
            _ => Ok(()),
        }
    }
}

pub struct CountingChecker {
    status: EnvironmentStatus,
    calls: AtomicUsize,
    gate: Option<Gate>,
}

impl CountingChecker {
    pub fn new(status: EnvironmentStatus) -> Self {
        Self {
            status,
            calls: AtomicUsize::new(0),
            gate: None,
        }
    }

    pub fn ready() -> Self {
        Self::new(EnvironmentStatus::ready(PathBuf::from("/usr/local/bin/gateway")))
    }

    /// Ready checker whose every call waits on [`Self::gate`].
    pub fn gated() -> Self {
        Self {
            gate: Some(Gate::default()),
            ..Self::ready()
        }
    }

    pub fn gate(&self) -> &Gate {
        self.gate.as_ref().expect("checker built with CountingChecker::gated")
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EnvironmentChecker for CountingChecker {
    async fn check(&self) -> EnvironmentStatus {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(ref gate) = self.gate {
            gate.pass().await;
        }
        self.status.clone()
    }
}

/// Reads through [`LogTailer`] and counts tail reads.
#[derive(Default)]
pub struct CountingLogSource {
    reads: AtomicUsize,
    gate: Option<Gate>,
}

impl CountingLogSource {
    /// Every tail read waits on [`Self::gate`].
    pub fn gated() -> Self {
        Self {
            reads: AtomicUsize::new(0),
            gate: Some(Gate::default()),
        }
    }

    pub fn gate(&self) -> &Gate {
        self.gate.as_ref().expect("log source built with CountingLogSource::gated")
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LogSource for CountingLogSource {
    async fn tail(&self, path: &Path, limit: usize) -> String {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if let Some(ref gate) = self.gate {
            gate.pass().await;
        }
        LogTailer.tail(path, limit).await
    }

    async fn delete(&self, path: &Path) -> std::io::Result<()> {
        LogTailer.delete(path).await
    }
}

pub fn gateway_process() -> ProcessInfo {
    ProcessInfo {
        pid: 4242,
        command: "gateway".to_string(),
        executable_path: Some(PathBuf::from("/usr/local/bin/gateway")),
    }
}

/// Config whose gateway log lives in `log_dir`.
pub fn test_config(log_dir: &Path) -> Config {
    let mut config = Config::default();
    config.gateway.port = TEST_PORT;
    config.gateway.log_file = log_dir.join("gateway.log").display().to_string();
    config
}

pub struct Harness {
    pub coordinator: LifecycleCoordinator,
    pub probe: Arc<ScriptedProbe>,
    pub supervisor: Arc<RecordingSupervisor>,
    pub checker: Arc<CountingChecker>,
    pub log_source: Arc<CountingLogSource>,
    pub config_tx: watch::Sender<Config>,
    pub log_path: PathBuf,
    _temp: TempDir,
}

pub struct HarnessBuilder {
    probe: ScriptedProbe,
    resolver: Option<ProcessInfo>,
    supervisor: RecordingSupervisor,
    checker: CountingChecker,
    log_source: CountingLogSource,
    configure: Box<dyn FnOnce(&mut Config)>,
}

impl HarnessBuilder {
    pub fn new(probe: ScriptedProbe) -> Self {
        Self {
            probe,
            resolver: Some(gateway_process()),
            supervisor: RecordingSupervisor::default(),
            checker: CountingChecker::ready(),
            log_source: CountingLogSource::default(),
            configure: Box::new(|_| {}),
        }
    }

    pub fn resolver(mut self, resolver: Option<ProcessInfo>) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn supervisor(mut self, supervisor: RecordingSupervisor) -> Self {
        self.supervisor = supervisor;
        self
    }

    pub fn checker(mut self, checker: CountingChecker) -> Self {
        self.checker = checker;
        self
    }

    pub fn log_source(mut self, log_source: CountingLogSource) -> Self {
        self.log_source = log_source;
        self
    }

    pub fn configure(mut self, configure: impl FnOnce(&mut Config) + 'static) -> Self {
        self.configure = Box::new(configure);
        self
    }

    pub fn build(self) -> Harness {
        let temp = TempDir::new().unwrap();
        let mut config = test_config(temp.path());
        (self.configure)(&mut config);
        let log_path = PathBuf::from(&config.gateway.log_file);
        let (config_tx, config_rx) = watch::channel(config);

        let probe = Arc::new(self.probe);
        let supervisor = Arc::new(self.supervisor);
        let checker = Arc::new(self.checker);
        let log_source = Arc::new(self.log_source);

        let deps = CoordinatorDeps {
            health_probe: probe.clone(),
            process_resolver: Arc::new(FixedResolver(self.resolver)),
            supervisor: supervisor.clone(),
            environment_checker: checker.clone(),
            log_source: log_source.clone(),
        };

        Harness {
            coordinator: LifecycleCoordinator::new(deps, config_rx),
            probe,
            supervisor,
            checker,
            log_source,
            config_tx,
            log_path,
            _temp: temp,
        }
    }
}

/// Wait until the current activation cycle has produced a terminal status.
pub async fn settle(coordinator: &LifecycleCoordinator) -> ActivationSnapshot {
    let mut rx = coordinator.subscribe();
    let snapshot = rx.wait_for(|s| !s.status.is_starting()).await.unwrap().clone();
    snapshot
}

/// Give detached tasks (disable, log refresh) a chance to run.
pub async fn let_background_run() {
    tokio::time::sleep(Duration::from_millis(50)).await;
}

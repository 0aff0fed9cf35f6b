//! gw-desktop - keeps the local gateway running for the desktop app
//!
//! # Examples
//!
//! ```bash
//! # Attach to or start the gateway, then keep watching it
//! gw-desktop
//!
//! # One-shot status check without ever starting a gateway
//! gw-desktop --attach-only --once
//!
//! # Disable the background service
//! gw-desktop --deactivate
//! ```

mod cli;
mod logging;


use crate::cli::Cli;
use crate::logging::{current_log_path, setup_logging};

use gw_config::Config;
use gw_lifecycle::{
    ActivationSnapshot, CommandEnvironmentChecker, CoordinatorDeps, HttpHealthProbe,
    LifecycleCoordinator, LogTailer, LsofProcessResolver, StatusReport, platform_supervisor,
};

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::sync::watch;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let mut config = Config::load()?;
    cli.apply(&mut config);
    config.validate()?;

    let logs_dir = config.host_log_dir()?;
    setup_logging(&logs_dir, &config.logging.level)?;

    info!("Starting gw-desktop v{}", env!("CARGO_PKG_VERSION"));
    info!("Host log: {}", current_log_path(&logs_dir).display());
    config.log_summary();

    let supervisor = platform_supervisor(&config)?;
    let refresh_every = config.lifecycle.environment_refresh_interval();
    let (_config_tx, config_rx) = watch::channel(config);

    let deps = CoordinatorDeps {
        health_probe: Arc::new(HttpHealthProbe::new()?),
        process_resolver: Arc::new(LsofProcessResolver::new()),
        supervisor,
        environment_checker: Arc::new(CommandEnvironmentChecker::new(config_rx.clone())),
        log_source: Arc::new(LogTailer),
    };
    let coordinator = LifecycleCoordinator::new(deps, config_rx);
    spawn_status_logger(&coordinator);

    if cli.deactivate {
        coordinator.set_active(false).await;
        coordinator.wait_for_detached().await;
        info!("Gateway deactivated");
        return Ok(ExitCode::SUCCESS);
    }

    coordinator.set_active(true).await;

    if cli.once {
        let snapshot = wait_until_settled(&coordinator).await;
        let report = StatusReport::from(&snapshot);
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(if report.is_healthy {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        });
    }

    spawn_refresh_loop(&coordinator, refresh_every);

    let signal = wait_for_shutdown_signal().await;
    // The background service outlives the host; only --deactivate disables it.
    info!("Received {signal}, exiting and leaving the gateway running");

    Ok(ExitCode::SUCCESS)
}

async fn wait_until_settled(coordinator: &LifecycleCoordinator) -> ActivationSnapshot {
    let mut rx = coordinator.subscribe();
    match rx.wait_for(|s| !s.status.is_starting()).await {
        Ok(snapshot) => snapshot.clone(),
        Err(_) => coordinator.snapshot(),
    }
}

/// Log every status transition published by the coordinator.
fn spawn_status_logger(coordinator: &LifecycleCoordinator) {
    let mut rx = coordinator.subscribe();
    tokio::spawn(async move {
        let mut last = rx.borrow_and_update().status.clone();
        while rx.changed().await.is_ok() {
            let snapshot = rx.borrow_and_update().clone();
            if snapshot.status == last {
                continue;
            }

            let report = StatusReport::from(&snapshot);
            match report.error {
                Some(ref reason) => error!(
                    "Gateway status: {} ({reason}). Hint: {}",
                    report.state,
                    report.recovery_hint.as_deref().unwrap_or_default()
                ),
                None => info!("Gateway status: {}", snapshot.status),
            }
            last = snapshot.status;
        }
    });
}

/// Keep the environment status and log tail fresh while the host runs.
fn spawn_refresh_loop(coordinator: &LifecycleCoordinator, every: Duration) {
    let coordinator = coordinator.clone();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            coordinator.refresh_environment_status(false).await;
            coordinator.refresh_log().await;
        }
    });
}

#[cfg(unix)]
async fn wait_for_shutdown_signal() -> String {
    use signal_hook::consts::{SIGINT, SIGTERM};
    use signal_hook::iterator::Signals;

    let (tx, rx) = tokio::sync::oneshot::channel();

    std::thread::spawn(move || {
        let mut signals = match Signals::new([SIGINT, SIGTERM]) {
            Ok(s) => s,
            Err(e) => {
                error!("Failed to register signal handlers: {e}");
                return;
            }
        };

        if let Some(sig) = signals.forever().next() {
            let _ = tx.send(format!("signal {sig}"));
        }
    });

    match rx.await {
        Ok(signal) => signal,
        Err(_) => {
            warn!("Signal handling unavailable, falling back to Ctrl-C");
            ctrl_c().await
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() -> String {
    ctrl_c().await
}

async fn ctrl_c() -> String {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for Ctrl-C: {e}");
        std::future::pending::<()>().await;
    }
    "Ctrl-C".to_string()
}

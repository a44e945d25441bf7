//! Daemon wiring
//!
//! Brings up the state actor, the worker, and the background loops, then
//! waits for a shutdown signal. A host service wrapper only needs to call
//! [`run`].

use std::time::Duration;

use eyre::{Result, WrapErr};
use tracing::{info, warn};

use crate::config::Config;
use crate::runlogs::{self, RunLogs};
use crate::scheduler;
use crate::state::{ControlState, SnapshotStore, StateManager, run_snapshotter};
use crate::worker::Worker;

/// Run the coordinator until ctrl-c, then snapshot and stop.
pub async fn run(config: &Config) -> Result<()> {
    config.validate()?;

    let logs = RunLogs::new(&config.storage.logs_dir);
    // Without the log directory the service cannot guarantee run
    // auditability, so this one is fatal.
    logs.ensure_dir()
        .await
        .wrap_err_with(|| format!("failed to create run log directory {}", config.storage.logs_dir.display()))?;

    let store = SnapshotStore::new(&config.storage.state_dir);
    let restored = store.load().await;

    let initial = ControlState {
        periodic_enabled: config.runner.periodic_enabled,
        interval_secs: config.runner.interval_secs,
        ..Default::default()
    };
    let (state, queue) = StateManager::spawn(config.storage.history_limit, initial, restored);

    let worker = Worker::new(state.clone(), logs.clone(), queue, config.runner.command.clone());
    tokio::spawn(worker.run());

    tokio::spawn(scheduler::run_periodic(state.clone(), scheduler::TICK));
    tokio::spawn(run_snapshotter(
        state.clone(),
        store.clone(),
        Duration::from_secs(config.storage.snapshot_interval_secs),
    ));
    tokio::spawn(runlogs::run_sweeper(
        state.clone(),
        logs,
        Duration::from_secs(config.storage.sweep_interval_secs),
    ));

    info!(version = env!("CARGO_PKG_VERSION"), "runwaiter started");

    tokio::signal::ctrl_c().await.wrap_err("failed to listen for shutdown signal")?;
    info!("shutdown requested");

    // Force a final snapshot so control state survives the restart
    match state.snapshot().await {
        Ok(snapshot) => {
            if let Err(e) = store.save(&snapshot).await {
                warn!(error = %e, "final state snapshot failed");
            }
        }
        Err(e) => warn!(error = %e, "could not read state for final snapshot"),
    }
    state.shutdown().await;

    info!("runwaiter stopped");
    Ok(())
}

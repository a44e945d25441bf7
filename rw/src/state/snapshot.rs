//! Durable snapshot of the scheduler control state
//!
//! A single small JSON document, written on an interval and at shutdown,
//! read back at startup. A missing or corrupt file is reported and ignored;
//! the scheduler then starts from defaults.

use std::path::PathBuf;
use std::time::Duration;

use eyre::{Result, WrapErr};
use tokio::fs;
use tracing::{debug, info, warn};

use super::control::StateSnapshot;
use super::manager::StateManager;

const SNAPSHOT_FILE: &str = "runwaiter_state.json";

/// On-disk store for the scheduler state snapshot.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    state_dir: PathBuf,
}

impl SnapshotStore {
    pub fn new(state_dir: impl Into<PathBuf>) -> Self {
        Self {
            state_dir: state_dir.into(),
        }
    }

    fn snapshot_file(&self) -> PathBuf {
        self.state_dir.join(SNAPSHOT_FILE)
    }

    /// Read the snapshot from the previous process lifetime.
    ///
    /// Returns `None` when the file is absent or does not parse; neither is
    /// fatal.
    pub async fn load(&self) -> Option<StateSnapshot> {
        let file = self.snapshot_file();
        let content = match fs::read_to_string(&file).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %file.display(), "no state snapshot found, starting from defaults");
                return None;
            }
            Err(e) => {
                warn!(path = %file.display(), error = %e, "could not read state snapshot, starting from defaults");
                return None;
            }
        };

        match serde_json::from_str(&content) {
            Ok(snapshot) => {
                info!(path = %file.display(), "restored state snapshot");
                Some(snapshot)
            }
            Err(e) => {
                warn!(path = %file.display(), error = %e, "corrupt state snapshot, starting from defaults");
                None
            }
        }
    }

    /// Write the snapshot, creating the state directory if needed.
    pub async fn save(&self, snapshot: &StateSnapshot) -> Result<()> {
        fs::create_dir_all(&self.state_dir)
            .await
            .wrap_err("failed to create state directory")?;

        let file = self.snapshot_file();
        let content = serde_json::to_string_pretty(snapshot).wrap_err("failed to serialize state snapshot")?;
        fs::write(&file, content)
            .await
            .wrap_err_with(|| format!("failed to write {}", file.display()))?;

        debug!(path = %file.display(), "state snapshot written");
        Ok(())
    }
}

/// Persist the scheduler state on an interval until the state manager goes
/// away. Write failures are logged and retried on the next tick.
pub async fn run_snapshotter(state: StateManager, store: SnapshotStore, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    // The first tick completes immediately
    ticker.tick().await;

    loop {
        ticker.tick().await;
        let snapshot = match state.snapshot().await {
            Ok(snapshot) => snapshot,
            Err(_) => break,
        };
        if let Err(e) = store.save(&snapshot).await {
            warn!(error = %e, "periodic state snapshot failed");
        }
    }

    debug!("snapshotter stopped");
}

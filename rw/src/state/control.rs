//! Scheduler control state and its durable snapshot form
//!
//! History (the job table) is disposable across restarts; control state is
//! not. Only the fields here are persisted.

use serde::{Deserialize, Serialize};

/// Default seconds between periodic runs.
pub const DEFAULT_INTERVAL_SECS: u64 = 600;

/// Process-wide scheduler state, owned by the state manager actor.
#[derive(Debug, Clone)]
pub struct ControlState {
    /// Whether the interval timer may admit runs
    pub periodic_enabled: bool,

    /// Seconds between periodic runs
    pub interval_secs: u64,

    /// Epoch seconds of the last periodic admission
    pub last_fire_epoch: i64,

    /// Epoch seconds when the maintenance window ends, 0 = not in maintenance
    pub maintenance_end_epoch: i64,

    /// Standing run lock; while set, no run is admitted
    pub locked: bool,

    /// Identifier of the most recently finished run
    pub last_run_id: Option<String>,
}

impl Default for ControlState {
    fn default() -> Self {
        Self {
            periodic_enabled: true,
            interval_secs: DEFAULT_INTERVAL_SECS,
            last_fire_epoch: 0,
            maintenance_end_epoch: 0,
            locked: false,
            last_run_id: None,
        }
    }
}

impl ControlState {
    pub fn in_maintenance(&self, now_epoch: i64) -> bool {
        self.maintenance_end_epoch > now_epoch
    }

    /// Epoch seconds when the next periodic run becomes due.
    pub fn next_fire_epoch(&self) -> i64 {
        self.last_fire_epoch + self.interval_secs as i64
    }

    pub fn periodic_due(&self, now_epoch: i64) -> bool {
        self.periodic_enabled && now_epoch >= self.next_fire_epoch()
    }

    /// Produce the durable form of this state.
    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            enabled: self.periodic_enabled,
            interval_seconds: self.interval_secs,
            last_fire_epoch: self.last_fire_epoch,
            maintenance_end_epoch: self.maintenance_end_epoch,
            locked: self.locked,
            last_run_id: self.last_run_id.clone().unwrap_or_default(),
        }
    }

    /// Overlay a restored snapshot onto this state.
    pub fn apply(&mut self, snapshot: StateSnapshot) {
        self.periodic_enabled = snapshot.enabled;
        self.interval_secs = snapshot.interval_seconds;
        self.last_fire_epoch = snapshot.last_fire_epoch;
        self.maintenance_end_epoch = snapshot.maintenance_end_epoch;
        self.locked = snapshot.locked;
        self.last_run_id = if snapshot.last_run_id.is_empty() {
            None
        } else {
            Some(snapshot.last_run_id)
        };
    }
}

/// Persisted scheduler state, written as a single JSON document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub enabled: bool,
    pub interval_seconds: u64,
    pub last_fire_epoch: i64,
    pub maintenance_end_epoch: i64,
    pub locked: bool,
    /// Empty string when no run has finished yet
    #[serde(default)]
    pub last_run_id: String,
}

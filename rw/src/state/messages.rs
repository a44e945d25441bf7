//! State manager messages
//!
//! Commands and responses for the actor pattern.

use serde::Serialize;
use thiserror::Error;
use tokio::sync::oneshot;

use super::control::StateSnapshot;
use crate::domain::{RunOrigin, RunRecord};

/// Largest accepted custom command line, in bytes.
pub const MAX_CUSTOM_COMMAND_BYTES: usize = 512;

/// Errors from state operations
#[derive(Debug, Error)]
pub enum StateError {
    /// The run lock is set; no mutation was performed.
    #[error("runs are locked")]
    Locked,

    #[error("run not found: {0}")]
    NotFound(String),

    /// A begin/finish transition arrived for a record that is not in the
    /// expected status. Statuses only ever move forward.
    #[error("run {id} is {status}, cannot transition")]
    InvalidTransition { id: String, status: String },

    #[error("invalid custom command: {0}")]
    InvalidCommand(String),

    #[error("run interval must be a positive number of seconds")]
    InvalidInterval,

    #[error("state manager channel closed")]
    ChannelClosed,
}

/// Response from state operations
pub type StateResponse<T> = Result<T, StateError>;

/// Maintenance window status as reported to callers
#[derive(Debug, Clone, Copy, Serialize)]
pub struct MaintenanceStatus {
    pub in_maintenance: bool,
    pub end_time_epoch: i64,
}

/// Application status report, served from the same actor that owns the
/// state so every field is mutually consistent.
#[derive(Debug, Clone, Serialize)]
pub struct AppStatus {
    pub version: String,
    pub uptime_secs: u64,
    pub locked: bool,
    pub in_maintenance: bool,
    pub maintenance_end_epoch: i64,
    pub periodic_enabled: bool,
    pub interval_secs: u64,
    pub last_run_id: Option<String>,
}

/// Commands sent to the state manager actor
#[derive(Debug)]
pub enum StateCommand {
    // Run admission and lifecycle
    RequestRun {
        origin: RunOrigin,
        command: Option<String>,
        bypass_lock: bool,
        reply: oneshot::Sender<StateResponse<String>>,
    },
    BeginRun {
        id: String,
        reply: oneshot::Sender<StateResponse<RunRecord>>,
    },
    FinishRun {
        id: String,
        exit_code: i32,
        reply: oneshot::Sender<StateResponse<()>>,
    },

    // Queries
    GetRun {
        id: String,
        reply: oneshot::Sender<StateResponse<RunRecord>>,
    },
    GetAllRuns {
        reply: oneshot::Sender<Vec<RunRecord>>,
    },
    GetLastRunId {
        reply: oneshot::Sender<Option<String>>,
    },
    GetStatus {
        reply: oneshot::Sender<AppStatus>,
    },

    // Periodic scheduling
    PeriodicTick,
    GetInterval {
        reply: oneshot::Sender<u64>,
    },
    SetInterval {
        secs: u64,
        reply: oneshot::Sender<StateResponse<()>>,
    },
    GetPeriodicEnabled {
        reply: oneshot::Sender<bool>,
    },
    SetPeriodicEnabled {
        enabled: bool,
        reply: oneshot::Sender<()>,
    },
    GetNextFireTime {
        reply: oneshot::Sender<i64>,
    },

    // Maintenance window
    GetMaintenance {
        reply: oneshot::Sender<MaintenanceStatus>,
    },
    StartMaintenance {
        minutes: u64,
        reply: oneshot::Sender<i64>,
    },
    EndMaintenance {
        reply: oneshot::Sender<()>,
    },

    // Run lock
    GetLock {
        reply: oneshot::Sender<bool>,
    },
    SetLock {
        locked: bool,
        reply: oneshot::Sender<()>,
    },

    // Persistence and log lifecycle
    Snapshot {
        reply: oneshot::Sender<StateSnapshot>,
    },
    TakeEvictedLogs {
        reply: oneshot::Sender<Vec<String>>,
    },

    // Shutdown
    Shutdown,
}

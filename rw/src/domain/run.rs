//! Run record domain type
//!
//! A run is one invocation attempt of the external configuration-management
//! command, identified by a random 128-bit id in opaque string form.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Reserved exit code for a run that has not finished yet.
///
/// Negative so it can never collide with a real process exit status.
pub const EXIT_CODE_PENDING: i32 = -1;

/// Reserved exit code for a run whose command could not be launched at all
/// (binary not found, empty command line, ...).
pub const EXIT_CODE_LAUNCH_FAILED: i32 = -2;

/// Run lifecycle status
///
/// A record only ever advances forward: registered -> running -> complete
/// or failed. Transitions are enforced by the state manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Admitted into the queue slot, waiting for the worker
    #[default]
    Registered,
    /// The external command is executing
    Running,
    /// Command exited 0
    Complete,
    /// Command exited non-zero or could not be launched
    Failed,
}

impl RunStatus {
    /// Terminal statuses are eligible for eviction from the job table.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::Failed)
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Registered => write!(f, "registered"),
            Self::Running => write!(f, "running"),
            Self::Complete => write!(f, "complete"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// What triggered a run request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOrigin {
    /// Interval timer
    Periodic,
    /// Explicit caller action, default command
    OnDemand,
    /// Explicit caller action with caller-supplied command text
    Custom,
}

impl RunOrigin {
    /// Periodic runs are system-triggered; everything else is on demand.
    pub fn is_on_demand(&self) -> bool {
        !matches!(self, Self::Periodic)
    }
}

/// One run of the external command and its recorded outcome
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    /// Unique identifier, immutable once assigned
    pub id: String,

    /// Current lifecycle status
    pub status: RunStatus,

    /// Final exit code, [`EXIT_CODE_PENDING`] until the run finishes
    pub exit_code: i32,

    /// Wall-clock start timestamp, nanosecond resolution
    pub start_time_ns: i64,

    /// True for API-triggered runs, false for timer-triggered runs
    pub on_demand: bool,

    /// Caller-supplied command line for custom runs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_command: Option<String>,
}

impl RunRecord {
    /// Create a freshly registered record with the pending exit sentinel.
    pub fn new(origin: RunOrigin, custom_command: Option<String>) -> Self {
        Self {
            id: new_run_id(),
            status: RunStatus::Registered,
            exit_code: EXIT_CODE_PENDING,
            start_time_ns: now_ns(),
            on_demand: origin.is_on_demand(),
            custom_command,
        }
    }
}

/// Generate a new run identifier (random 128-bit, opaque string form).
pub fn new_run_id() -> String {
    Uuid::new_v4().to_string()
}

/// Current wall-clock time in nanoseconds since the Unix epoch.
pub fn now_ns() -> i64 {
    Utc::now().timestamp_nanos_opt().unwrap_or_default()
}

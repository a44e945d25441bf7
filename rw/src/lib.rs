//! Runwaiter - serialized configuration-management run coordinator
//!
//! Runwaiter serializes execution of an external configuration-management
//! command on a single node: at most one run in flight, at most one run
//! queued. Runs are triggered on demand or by an interval timer, their
//! output is captured per run, and the scheduler's control state survives
//! restarts through a small snapshot file.
//!
//! # Core Concepts
//!
//! - **Single queue slot**: an admitted-but-not-started run occupies the
//!   one slot; further requests coalesce onto it and observe the same id
//! - **Single-writer state**: one actor task owns the job table and
//!   scheduler state, so admission decisions are always consistent
//! - **Bounded history**: the job table keeps the newest N records; evicted
//!   records take their log files with them
//! - **Control state is durable, history is not**: only the scheduler
//!   snapshot survives a restart
//!
//! # Modules
//!
//! - [`domain`] - Run records, statuses, and exit-code sentinels
//! - [`state`] - The state manager actor, job table, and snapshot store
//! - [`worker`] - The single serialized executor
//! - [`scheduler`] - The periodic tick loop
//! - [`runlogs`] - Per-run captured-output files and the deletion sweeper
//! - [`config`] - Configuration types and loading
//! - [`daemon`] - Wiring and lifecycle

pub mod cli;
pub mod config;
pub mod daemon;
pub mod domain;
pub mod runlogs;
pub mod scheduler;
pub mod state;
pub mod worker;

// Re-export commonly used types
pub use config::Config;
pub use domain::{EXIT_CODE_LAUNCH_FAILED, EXIT_CODE_PENDING, RunOrigin, RunRecord, RunStatus};
pub use runlogs::{RunLogError, RunLogs};
pub use state::{
    AppStatus, ControlState, MaintenanceStatus, SnapshotStore, StateError, StateManager, StateSnapshot,
};
pub use worker::Worker;

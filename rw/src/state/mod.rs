//! Serialized run/state engine
//!
//! One actor task owns the job table, the queue slot, and the scheduler
//! control state. Everything else talks to it through [`StateManager`].

mod control;
mod manager;
mod messages;
mod snapshot;
mod table;

pub use control::{ControlState, DEFAULT_INTERVAL_SECS, StateSnapshot};
pub use manager::StateManager;
pub use messages::{AppStatus, MAX_CUSTOM_COMMAND_BYTES, MaintenanceStatus, StateCommand, StateError, StateResponse};
pub use snapshot::{SnapshotStore, run_snapshotter};
pub use table::JobTable;

//! Domain types for runs

mod run;

pub use run::{EXIT_CODE_LAUNCH_FAILED, EXIT_CODE_PENDING, RunOrigin, RunRecord, RunStatus, new_run_id, now_ns};

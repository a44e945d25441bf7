//! Run log lifecycle
//!
//! One log file per run id, created when the worker begins executing and
//! complete once the record reaches a terminal status. Files are deleted
//! only after their record has been evicted from the job table; the
//! sweeper retries failed deletions on its next pass.

use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;
use tokio::fs::{self, File, OpenOptions};
use tracing::{debug, info, warn};

use crate::state::StateManager;

/// Errors from the run log store
#[derive(Debug, Error)]
pub enum RunLogError {
    #[error("no log on disk for run {0}")]
    NotAvailable(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Maps run ids to their on-disk captured-output files.
#[derive(Debug, Clone)]
pub struct RunLogs {
    dir: PathBuf,
}

impl RunLogs {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Create the log directory. Failure here is fatal at startup: without
    /// it the service cannot guarantee run auditability.
    pub async fn ensure_dir(&self) -> Result<(), RunLogError> {
        fs::create_dir_all(&self.dir).await?;
        Ok(())
    }

    pub fn log_path(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{id}.log"))
    }

    /// Check that a captured-output file exists for this run.
    pub fn is_log_available(&self, id: &str) -> Result<(), RunLogError> {
        if self.log_path(id).exists() {
            Ok(())
        } else {
            Err(RunLogError::NotAvailable(id.to_string()))
        }
    }

    /// Open the run's log file for append, creating it.
    pub async fn create(&self, id: &str) -> Result<File, RunLogError> {
        let path = self.log_path(id);
        let file = OpenOptions::new().create(true).append(true).open(&path).await?;
        debug!(run_id = %id, path = %path.display(), "run log opened");
        Ok(file)
    }

    async fn remove(&self, id: &str) -> Result<(), RunLogError> {
        fs::remove_file(self.log_path(id)).await?;
        Ok(())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

/// Delete the log files of evicted records on an interval.
///
/// Deletion failures are logged and carried over to the next sweep; they
/// are never fatal. Stops when the state manager goes away.
pub async fn run_sweeper(state: StateManager, logs: RunLogs, interval: Duration) {
    let mut carried: Vec<String> = Vec::new();
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    ticker.tick().await;

    loop {
        ticker.tick().await;

        match state.take_evicted_logs().await {
            Ok(evicted) => carried.extend(evicted),
            Err(_) => break,
        }

        let mut retry = Vec::new();
        for id in carried.drain(..) {
            match logs.remove(&id).await {
                Ok(()) => info!(run_id = %id, "deleted log of evicted run"),
                Err(RunLogError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                    // Run was evicted before its log was ever written
                    debug!(run_id = %id, "no log file to delete");
                }
                Err(e) => {
                    warn!(run_id = %id, error = %e, "log deletion failed, will retry next sweep");
                    retry.push(id);
                }
            }
        }
        carried = retry;
    }

    debug!("log sweeper stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_log_path_and_availability() {
        let temp = tempdir().unwrap();
        let logs = RunLogs::new(temp.path());

        assert_eq!(logs.log_path("abc"), temp.path().join("abc.log"));
        assert!(matches!(logs.is_log_available("abc"), Err(RunLogError::NotAvailable(_))));

        logs.create("abc").await.unwrap();
        assert!(logs.is_log_available("abc").is_ok());
    }

    #[tokio::test]
    async fn test_create_appends() {
        use tokio::io::AsyncWriteExt;

        let temp = tempdir().unwrap();
        let logs = RunLogs::new(temp.path());

        let mut file = logs.create("abc").await.unwrap();
        file.write_all(b"first\n").await.unwrap();
        file.flush().await.unwrap();
        drop(file);

        let mut file = logs.create("abc").await.unwrap();
        file.write_all(b"second\n").await.unwrap();
        file.flush().await.unwrap();
        drop(file);

        let content = fs::read_to_string(logs.log_path("abc")).await.unwrap();
        assert_eq!(content, "first\nsecond\n");
    }

    #[tokio::test]
    async fn test_ensure_dir_creates_nested_path() {
        let temp = tempdir().unwrap();
        let logs = RunLogs::new(temp.path().join("a").join("logs"));

        logs.ensure_dir().await.unwrap();
        assert!(logs.dir().is_dir());
    }

    #[tokio::test]
    async fn test_remove_deletes_file() {
        let temp = tempdir().unwrap();
        let logs = RunLogs::new(temp.path());

        logs.create("abc").await.unwrap();
        logs.remove("abc").await.unwrap();
        assert!(matches!(logs.is_log_available("abc"), Err(RunLogError::NotAvailable(_))));
    }
}

//! The single serialized executor
//!
//! Pulls admitted runs off the queue slot one at a time, invokes the
//! external command, streams its combined output into the run's log file,
//! and records the outcome. Exactly one external command executes at a
//! time for the process lifetime: configuration-management clients are not
//! safe to run concurrently against the same target.

use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::domain::{EXIT_CODE_LAUNCH_FAILED, RunRecord};
use crate::runlogs::RunLogs;
use crate::state::{StateError, StateManager};

/// The worker loop and its collaborators.
pub struct Worker {
    state: StateManager,
    logs: RunLogs,
    queue: mpsc::Receiver<String>,
    default_command: String,
}

impl Worker {
    pub fn new(state: StateManager, logs: RunLogs, queue: mpsc::Receiver<String>, default_command: String) -> Self {
        Self {
            state,
            logs,
            queue,
            default_command,
        }
    }

    /// Run until the state manager stops waking us.
    pub async fn run(mut self) {
        info!("worker started");

        while let Some(id) = self.queue.recv().await {
            match self.state.begin_run(&id).await {
                Ok(record) => self.execute(record).await,
                // A wakeup can outlive its run (evicted, or already picked
                // up); skip it.
                Err(StateError::NotFound(_)) | Err(StateError::InvalidTransition { .. }) => {
                    debug!(run_id = %id, "stale wakeup, skipping");
                }
                Err(e) => {
                    error!(run_id = %id, error = %e, "could not begin run");
                    break;
                }
            }
        }

        info!("worker stopped");
    }

    /// Execute one run to its terminal status. The admission lifecycle
    /// always completes, even on failure, so the slot frees up for the
    /// next run.
    async fn execute(&self, record: RunRecord) {
        let id = record.id.clone();
        let command_line = record
            .custom_command
            .clone()
            .unwrap_or_else(|| self.default_command.clone());

        let mut log = match self.logs.create(&id).await {
            Ok(log) => Some(log),
            Err(e) => {
                // The run still executes; it just goes unaudited.
                error!(run_id = %id, error = %e, "could not open run log");
                None
            }
        };

        info!(run_id = %id, command = %command_line, "starting run");

        let exit_code = match spawn_command(&command_line) {
            Ok(child) => stream_to_log(child, &mut log).await,
            Err(e) => {
                warn!(run_id = %id, error = %e, "failed to launch command");
                if let Some(log) = log.as_mut() {
                    let message = format!("runwaiter: failed to launch command: {e}\n");
                    let _ = log.write_all(message.as_bytes()).await;
                }
                EXIT_CODE_LAUNCH_FAILED
            }
        };

        if let Some(log) = log.as_mut() {
            let _ = log.flush().await;
        }

        if let Err(e) = self.state.finish_run(&id, exit_code).await {
            error!(run_id = %id, error = %e, "could not record run outcome");
        }
    }
}

/// Split a command line on whitespace and spawn it with piped output.
///
/// No shell is involved, so quoting is not supported; the command text is
/// a program name followed by plain arguments.
fn spawn_command(command_line: &str) -> std::io::Result<Child> {
    let mut parts = command_line.split_whitespace();
    let program = parts
        .next()
        .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::InvalidInput, "empty command line"))?;

    Command::new(program)
        .args(parts)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
}

/// Stream the child's combined stdout/stderr into the log as it is
/// produced, then wait for exit. Log write failures are logged once and do
/// not abort the run.
async fn stream_to_log(mut child: Child, log: &mut Option<tokio::fs::File>) -> i32 {
    let (line_tx, mut line_rx) = mpsc::channel::<String>(64);

    if let Some(stdout) = child.stdout.take() {
        tokio::spawn(copy_lines(stdout, line_tx.clone()));
    }
    if let Some(stderr) = child.stderr.take() {
        tokio::spawn(copy_lines(stderr, line_tx.clone()));
    }
    drop(line_tx);

    let mut write_failed = false;
    while let Some(line) = line_rx.recv().await {
        let Some(log) = log.as_mut() else { continue };
        let result = async {
            log.write_all(line.as_bytes()).await?;
            log.write_all(b"\n").await
        }
        .await;
        if let Err(e) = result
            && !write_failed
        {
            warn!(error = %e, "run log write failed, output discarded");
            write_failed = true;
        }
    }

    match child.wait().await {
        // A signal-terminated child has no exit code; report it as a plain
        // failure.
        Ok(status) => status.code().unwrap_or(1),
        Err(e) => {
            warn!(error = %e, "could not collect command exit status");
            EXIT_CODE_LAUNCH_FAILED
        }
    }
}

async fn copy_lines(reader: impl AsyncRead + Unpin, tx: mpsc::Sender<String>) {
    let mut lines = BufReader::new(reader).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        if tx.send(line).await.is_err() {
            break;
        }
    }
}

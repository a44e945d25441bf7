//! StateManager - actor that owns the job table and scheduler state
//!
//! All mutation is serialized through one task with a command channel, so
//! concurrent admission requests always observe a consistent
//! coalesce-or-create decision and no duplicate ids are ever issued for the
//! same pending slot.

use std::time::Instant;

use chrono::Utc;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use super::control::{ControlState, StateSnapshot};
use super::messages::{
    AppStatus, MAX_CUSTOM_COMMAND_BYTES, MaintenanceStatus, StateCommand, StateError, StateResponse,
};
use super::table::JobTable;
use crate::domain::{RunOrigin, RunRecord, RunStatus};

/// Current wall-clock time in epoch seconds.
fn now_epoch() -> i64 {
    Utc::now().timestamp()
}

/// Handle to send commands to the state manager actor. Cheap to clone.
#[derive(Clone)]
pub struct StateManager {
    tx: mpsc::Sender<StateCommand>,
}

impl StateManager {
    /// Spawn the actor.
    ///
    /// `initial` carries the config-derived defaults; `restored` (the
    /// snapshot from the previous process lifetime, if any) overlays them.
    /// Returns the handle and the worker's wakeup queue: one id is sent per
    /// newly admitted run.
    pub fn spawn(history_limit: usize, initial: ControlState, restored: Option<StateSnapshot>) -> (Self, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(64);
        let (wake_tx, wake_rx) = mpsc::channel(8);

        let mut control = initial;
        if let Some(snapshot) = restored {
            info!("restoring scheduler state from snapshot");
            control.apply(snapshot);
        }
        if control.last_fire_epoch == 0 {
            // Fresh start: the first periodic run is due one interval from
            // now, not immediately.
            control.last_fire_epoch = now_epoch();
        }

        let core = StateCore {
            table: JobTable::new(history_limit),
            control,
            pending: None,
            evicted_logs: Vec::new(),
            wake_tx,
            started_at: Instant::now(),
        };

        tokio::spawn(actor_loop(core, rx));

        (Self { tx }, wake_rx)
    }

    async fn request<T>(&self, command: StateCommand, reply_rx: oneshot::Receiver<T>) -> StateResponse<T> {
        self.tx.send(command).await.map_err(|_| StateError::ChannelClosed)?;
        reply_rx.await.map_err(|_| StateError::ChannelClosed)
    }

    /// Request a run of the default command.
    pub async fn request_on_demand_run(&self) -> StateResponse<String> {
        let (reply, rx) = oneshot::channel();
        self.request(
            StateCommand::RequestRun {
                origin: RunOrigin::OnDemand,
                command: None,
                bypass_lock: false,
                reply,
            },
            rx,
        )
        .await?
    }

    /// Request a run of caller-supplied command text.
    ///
    /// Whitelist policy is the caller's responsibility; the core only
    /// bounds the payload size. `force` bypasses the run lock and nothing
    /// else.
    pub async fn request_custom_run(&self, text: &str, force: bool) -> StateResponse<String> {
        if text.trim().is_empty() {
            return Err(StateError::InvalidCommand("command text is empty".to_string()));
        }
        if text.len() > MAX_CUSTOM_COMMAND_BYTES {
            return Err(StateError::InvalidCommand(format!(
                "command text is {} bytes, max is {}",
                text.len(),
                MAX_CUSTOM_COMMAND_BYTES
            )));
        }

        let (reply, rx) = oneshot::channel();
        self.request(
            StateCommand::RequestRun {
                origin: RunOrigin::Custom,
                command: Some(text.to_string()),
                bypass_lock: force,
                reply,
            },
            rx,
        )
        .await?
    }

    /// Request a timer-triggered run. Exposed for the periodic scheduler;
    /// gating (lock, maintenance, due time) happens inside the actor.
    pub async fn periodic_tick(&self) -> StateResponse<()> {
        self.tx
            .send(StateCommand::PeriodicTick)
            .await
            .map_err(|_| StateError::ChannelClosed)
    }

    /// Worker transition: queue slot -> running. Frees the slot for the
    /// next admission.
    pub async fn begin_run(&self, id: &str) -> StateResponse<RunRecord> {
        let (reply, rx) = oneshot::channel();
        self.request(StateCommand::BeginRun { id: id.to_string(), reply }, rx).await?
    }

    /// Worker transition: running -> complete/failed, classified by exit
    /// code.
    pub async fn finish_run(&self, id: &str, exit_code: i32) -> StateResponse<()> {
        let (reply, rx) = oneshot::channel();
        self.request(
            StateCommand::FinishRun {
                id: id.to_string(),
                exit_code,
                reply,
            },
            rx,
        )
        .await?
    }

    pub async fn get_run(&self, id: &str) -> StateResponse<RunRecord> {
        let (reply, rx) = oneshot::channel();
        self.request(StateCommand::GetRun { id: id.to_string(), reply }, rx).await?
    }

    pub async fn all_runs(&self) -> StateResponse<Vec<RunRecord>> {
        let (reply, rx) = oneshot::channel();
        self.request(StateCommand::GetAllRuns { reply }, rx).await
    }

    pub async fn last_run_id(&self) -> StateResponse<Option<String>> {
        let (reply, rx) = oneshot::channel();
        self.request(StateCommand::GetLastRunId { reply }, rx).await
    }

    pub async fn status(&self) -> StateResponse<AppStatus> {
        let (reply, rx) = oneshot::channel();
        self.request(StateCommand::GetStatus { reply }, rx).await
    }

    pub async fn run_interval(&self) -> StateResponse<u64> {
        let (reply, rx) = oneshot::channel();
        self.request(StateCommand::GetInterval { reply }, rx).await
    }

    pub async fn set_run_interval(&self, secs: u64) -> StateResponse<()> {
        let (reply, rx) = oneshot::channel();
        self.request(StateCommand::SetInterval { secs, reply }, rx).await?
    }

    pub async fn periodic_enabled(&self) -> StateResponse<bool> {
        let (reply, rx) = oneshot::channel();
        self.request(StateCommand::GetPeriodicEnabled { reply }, rx).await
    }

    pub async fn set_periodic_enabled(&self, enabled: bool) -> StateResponse<()> {
        let (reply, rx) = oneshot::channel();
        self.request(StateCommand::SetPeriodicEnabled { enabled, reply }, rx).await
    }

    /// Epoch seconds of the next periodic fire: last fire + interval.
    pub async fn next_fire_time(&self) -> StateResponse<i64> {
        let (reply, rx) = oneshot::channel();
        self.request(StateCommand::GetNextFireTime { reply }, rx).await
    }

    pub async fn maintenance_status(&self) -> StateResponse<MaintenanceStatus> {
        let (reply, rx) = oneshot::channel();
        self.request(StateCommand::GetMaintenance { reply }, rx).await
    }

    /// Suppress periodic runs until `minutes` from now. Returns the window
    /// end time. Zero minutes is an immediately expired window.
    pub async fn start_maintenance(&self, minutes: u64) -> StateResponse<i64> {
        let (reply, rx) = oneshot::channel();
        self.request(StateCommand::StartMaintenance { minutes, reply }, rx).await
    }

    pub async fn end_maintenance(&self) -> StateResponse<()> {
        let (reply, rx) = oneshot::channel();
        self.request(StateCommand::EndMaintenance { reply }, rx).await
    }

    pub async fn lock_status(&self) -> StateResponse<bool> {
        let (reply, rx) = oneshot::channel();
        self.request(StateCommand::GetLock { reply }, rx).await
    }

    pub async fn set_lock(&self, locked: bool) -> StateResponse<()> {
        let (reply, rx) = oneshot::channel();
        self.request(StateCommand::SetLock { locked, reply }, rx).await
    }

    /// Current durable form of the scheduler state.
    pub async fn snapshot(&self) -> StateResponse<StateSnapshot> {
        let (reply, rx) = oneshot::channel();
        self.request(StateCommand::Snapshot { reply }, rx).await
    }

    /// Drain the ids whose records were evicted since the last call, so
    /// the log sweeper can delete their files.
    pub async fn take_evicted_logs(&self) -> StateResponse<Vec<String>> {
        let (reply, rx) = oneshot::channel();
        self.request(StateCommand::TakeEvictedLogs { reply }, rx).await
    }

    pub async fn shutdown(&self) {
        let _ = self.tx.send(StateCommand::Shutdown).await;
    }
}

/// State owned exclusively by the actor task.
struct StateCore {
    table: JobTable,
    control: ControlState,
    /// The single queue slot: at most one admitted-but-not-started run.
    pending: Option<String>,
    /// Ids evicted from the table whose log files still need deleting.
    evicted_logs: Vec<String>,
    /// Wakes the worker once per newly admitted run.
    wake_tx: mpsc::Sender<String>,
    started_at: Instant,
}

impl StateCore {
    /// Coalesce-or-create: return the pending run's id unchanged if the
    /// slot is occupied, otherwise register a new record and fill the slot.
    fn admit(&mut self, origin: RunOrigin, command: Option<String>) -> String {
        if let Some(id) = &self.pending {
            debug!(run_id = %id, "coalescing request onto pending run");
            return id.clone();
        }

        let record = RunRecord::new(origin, command);
        let id = record.id.clone();
        self.table.insert(record);
        self.evicted_logs.extend(self.table.enforce_limit());
        self.pending = Some(id.clone());

        // The slot was empty, so the worker cannot have an unconsumed
        // wakeup outstanding; a full queue here is a stale-wakeup bug the
        // worker tolerates.
        if let Err(e) = self.wake_tx.try_send(id.clone()) {
            warn!(run_id = %id, error = %e, "could not wake worker");
        }

        info!(run_id = %id, origin = ?origin, "run registered");
        id
    }

    /// Admit a periodic run if one is due and not gated. Called from the
    /// timer tick and from the top of every admission request, so a due
    /// periodic fire always claims the slot before an on-demand request.
    fn try_fire_periodic(&mut self, now: i64) {
        if !self.control.periodic_due(now) {
            return;
        }
        if self.control.locked {
            debug!("periodic run due but suppressed by run lock");
            return;
        }
        if self.control.in_maintenance(now) {
            debug!(end = self.control.maintenance_end_epoch, "periodic run due but suppressed by maintenance");
            return;
        }

        // Advance the fire time whether a new record was created or an
        // already-queued run absorbed the fire; otherwise a queued run
        // would refire every tick.
        self.admit(RunOrigin::Periodic, None);
        self.control.last_fire_epoch = now;
    }

    fn request_run(&mut self, origin: RunOrigin, command: Option<String>, bypass_lock: bool) -> StateResponse<String> {
        let now = now_epoch();
        if origin != RunOrigin::Periodic {
            self.try_fire_periodic(now);
        }
        if self.control.locked && !bypass_lock {
            return Err(StateError::Locked);
        }
        Ok(self.admit(origin, command))
    }

    fn begin_run(&mut self, id: &str) -> StateResponse<RunRecord> {
        let status = self.table.get(id).ok_or_else(|| StateError::NotFound(id.to_string()))?.status;
        if status != RunStatus::Registered {
            return Err(StateError::InvalidTransition {
                id: id.to_string(),
                status: status.to_string(),
            });
        }

        if self.pending.as_deref() == Some(id) {
            self.pending = None;
        }
        let record = self
            .table
            .update(id, |r| r.status = RunStatus::Running)
            .ok_or_else(|| StateError::NotFound(id.to_string()))?;

        debug!(run_id = %id, "run moved to running");
        Ok(record)
    }

    fn finish_run(&mut self, id: &str, exit_code: i32) -> StateResponse<()> {
        let status = self.table.get(id).ok_or_else(|| StateError::NotFound(id.to_string()))?.status;
        if status != RunStatus::Running {
            return Err(StateError::InvalidTransition {
                id: id.to_string(),
                status: status.to_string(),
            });
        }

        let new_status = if exit_code == 0 { RunStatus::Complete } else { RunStatus::Failed };
        self.table.update(id, |r| {
            r.status = new_status;
            r.exit_code = exit_code;
        });
        self.control.last_run_id = Some(id.to_string());

        info!(run_id = %id, exit_code, status = %new_status, "run finished");
        Ok(())
    }

    fn app_status(&self) -> AppStatus {
        let now = now_epoch();
        AppStatus {
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_secs: self.started_at.elapsed().as_secs(),
            locked: self.control.locked,
            in_maintenance: self.control.in_maintenance(now),
            maintenance_end_epoch: self.control.maintenance_end_epoch,
            periodic_enabled: self.control.periodic_enabled,
            interval_secs: self.control.interval_secs,
            last_run_id: self.control.last_run_id.clone(),
        }
    }
}

/// Run the actor until shutdown is requested or all handles are dropped.
async fn actor_loop(mut core: StateCore, mut rx: mpsc::Receiver<StateCommand>) {
    info!("state manager started");

    while let Some(command) = rx.recv().await {
        match command {
            StateCommand::RequestRun {
                origin,
                command,
                bypass_lock,
                reply,
            } => {
                let _ = reply.send(core.request_run(origin, command, bypass_lock));
            }

            StateCommand::BeginRun { id, reply } => {
                let _ = reply.send(core.begin_run(&id));
            }

            StateCommand::FinishRun { id, exit_code, reply } => {
                let _ = reply.send(core.finish_run(&id, exit_code));
            }

            StateCommand::GetRun { id, reply } => {
                let result = core.table.get(&id).cloned().ok_or(StateError::NotFound(id));
                let _ = reply.send(result);
            }

            StateCommand::GetAllRuns { reply } => {
                let _ = reply.send(core.table.all());
            }

            StateCommand::GetLastRunId { reply } => {
                let _ = reply.send(core.control.last_run_id.clone());
            }

            StateCommand::GetStatus { reply } => {
                let _ = reply.send(core.app_status());
            }

            StateCommand::PeriodicTick => {
                core.try_fire_periodic(now_epoch());
            }

            StateCommand::GetInterval { reply } => {
                let _ = reply.send(core.control.interval_secs);
            }

            StateCommand::SetInterval { secs, reply } => {
                let result = if secs == 0 {
                    Err(StateError::InvalidInterval)
                } else {
                    info!(interval_secs = secs, "run interval changed");
                    core.control.interval_secs = secs;
                    Ok(())
                };
                let _ = reply.send(result);
            }

            StateCommand::GetPeriodicEnabled { reply } => {
                let _ = reply.send(core.control.periodic_enabled);
            }

            StateCommand::SetPeriodicEnabled { enabled, reply } => {
                info!(enabled, "periodic runs toggled");
                core.control.periodic_enabled = enabled;
                let _ = reply.send(());
            }

            StateCommand::GetNextFireTime { reply } => {
                let _ = reply.send(core.control.next_fire_epoch());
            }

            StateCommand::GetMaintenance { reply } => {
                let _ = reply.send(MaintenanceStatus {
                    in_maintenance: core.control.in_maintenance(now_epoch()),
                    end_time_epoch: core.control.maintenance_end_epoch,
                });
            }

            StateCommand::StartMaintenance { minutes, reply } => {
                let end = now_epoch() + (minutes * 60) as i64;
                info!(minutes, end_epoch = end, "maintenance window started");
                core.control.maintenance_end_epoch = end;
                let _ = reply.send(end);
            }

            StateCommand::EndMaintenance { reply } => {
                info!("maintenance window ended");
                core.control.maintenance_end_epoch = 0;
                let _ = reply.send(());
            }

            StateCommand::GetLock { reply } => {
                let _ = reply.send(core.control.locked);
            }

            StateCommand::SetLock { locked, reply } => {
                info!(locked, "run lock changed");
                core.control.locked = locked;
                let _ = reply.send(());
            }

            StateCommand::Snapshot { reply } => {
                let _ = reply.send(core.control.snapshot());
            }

            StateCommand::TakeEvictedLogs { reply } => {
                let _ = reply.send(std::mem::take(&mut core.evicted_logs));
            }

            StateCommand::Shutdown => {
                info!("state manager shutting down");
                break;
            }
        }
    }

    info!("state manager stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::EXIT_CODE_PENDING;

    fn spawn_default() -> (StateManager, mpsc::Receiver<String>) {
        StateManager::spawn(20, ControlState::default(), None)
    }

    /// Control state with the periodic timer long overdue.
    fn due_periodic_snapshot() -> StateSnapshot {
        StateSnapshot {
            enabled: true,
            interval_seconds: 1,
            last_fire_epoch: 1, // non-zero so spawn keeps it
            maintenance_end_epoch: 0,
            locked: false,
            last_run_id: String::new(),
        }
    }

    #[tokio::test]
    async fn test_fresh_start_scenario() {
        let (state, _wake) = spawn_default();

        assert!(!state.lock_status().await.unwrap());
        assert!(state.last_run_id().await.unwrap().is_none());
        assert_eq!(state.run_interval().await.unwrap(), 600);

        let id = state.request_on_demand_run().await.unwrap();
        let record = state.get_run(&id).await.unwrap();
        assert_eq!(record.status, RunStatus::Registered);
        assert_eq!(record.exit_code, EXIT_CODE_PENDING);
        assert!(record.on_demand);

        state.begin_run(&id).await.unwrap();
        state.finish_run(&id, 0).await.unwrap();

        let record = state.get_run(&id).await.unwrap();
        assert_eq!(record.status, RunStatus::Complete);
        assert_eq!(record.exit_code, 0);
        assert_eq!(state.last_run_id().await.unwrap().as_deref(), Some(id.as_str()));
    }

    #[tokio::test]
    async fn test_concurrent_requests_coalesce_onto_pending_slot() {
        let (state, _wake) = spawn_default();

        let first = state.request_on_demand_run().await.unwrap();
        for _ in 0..10 {
            assert_eq!(state.request_on_demand_run().await.unwrap(), first);
        }

        // Still a single record in the table
        assert_eq!(state.all_runs().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_new_id_after_worker_dequeues() {
        let (state, _wake) = spawn_default();

        let first = state.request_on_demand_run().await.unwrap();
        state.begin_run(&first).await.unwrap();

        let second = state.request_on_demand_run().await.unwrap();
        assert_ne!(first, second);

        // The running record and the freshly queued one coexist
        let runs = state.all_runs().await.unwrap();
        assert_eq!(runs.len(), 2);
    }

    #[tokio::test]
    async fn test_lock_rejects_admission_without_mutation() {
        let (state, _wake) = spawn_default();
        state.set_lock(true).await.unwrap();

        assert!(matches!(state.request_on_demand_run().await, Err(StateError::Locked)));
        assert!(matches!(state.request_custom_run("echo hi", false).await, Err(StateError::Locked)));
        assert!(state.all_runs().await.unwrap().is_empty());

        state.set_lock(false).await.unwrap();
        assert!(state.request_on_demand_run().await.is_ok());
    }

    #[tokio::test]
    async fn test_lock_also_refuses_periodic_origin_requests() {
        let (state, _wake) = StateManager::spawn(
            20,
            ControlState::default(),
            Some(StateSnapshot {
                locked: true,
                ..due_periodic_snapshot()
            }),
        );

        // The tick is due but the lock suppresses it, without advancing the
        // fire time.
        let before = state.next_fire_time().await.unwrap();
        state.periodic_tick().await.unwrap();
        assert!(state.all_runs().await.unwrap().is_empty());
        assert_eq!(state.next_fire_time().await.unwrap(), before);
    }

    #[tokio::test]
    async fn test_force_custom_run_bypasses_lock_only() {
        let (state, _wake) = spawn_default();
        state.set_lock(true).await.unwrap();

        let id = state.request_custom_run("echo forced", true).await.unwrap();
        let record = state.get_run(&id).await.unwrap();
        assert_eq!(record.custom_command.as_deref(), Some("echo forced"));
    }

    #[tokio::test]
    async fn test_custom_command_size_bound() {
        let (state, _wake) = spawn_default();

        let too_long = "x".repeat(MAX_CUSTOM_COMMAND_BYTES + 1);
        assert!(matches!(
            state.request_custom_run(&too_long, false).await,
            Err(StateError::InvalidCommand(_))
        ));
        assert!(matches!(
            state.request_custom_run("   ", false).await,
            Err(StateError::InvalidCommand(_))
        ));
    }

    #[tokio::test]
    async fn test_maintenance_gates_periodic_but_not_on_demand() {
        let now = now_epoch();
        let (state, _wake) = StateManager::spawn(
            20,
            ControlState::default(),
            Some(StateSnapshot {
                maintenance_end_epoch: now + 3600,
                ..due_periodic_snapshot()
            }),
        );

        let before = state.next_fire_time().await.unwrap();
        state.periodic_tick().await.unwrap();
        assert!(state.all_runs().await.unwrap().is_empty());
        assert_eq!(state.next_fire_time().await.unwrap(), before);

        // On-demand admission is unaffected by the window
        let id = state.request_on_demand_run().await.unwrap();
        assert!(state.get_run(&id).await.unwrap().on_demand);
    }

    #[tokio::test]
    async fn test_due_periodic_wins_the_slot_over_on_demand() {
        let (state, _wake) = StateManager::spawn(20, ControlState::default(), Some(due_periodic_snapshot()));

        // The on-demand request arrives while a periodic fire is due; the
        // periodic run claims the slot first and the request coalesces
        // onto it.
        let id = state.request_on_demand_run().await.unwrap();
        let record = state.get_run(&id).await.unwrap();
        assert!(!record.on_demand);
        assert_eq!(state.all_runs().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_queued_periodic_run_does_not_refire() {
        let (state, _wake) = StateManager::spawn(20, ControlState::default(), Some(due_periodic_snapshot()));

        state.periodic_tick().await.unwrap();
        let after_first = state.next_fire_time().await.unwrap();
        assert_eq!(state.all_runs().await.unwrap().len(), 1);

        // Interval is 1s; even once due again the queued run absorbs the
        // fire without creating a second record.
        tokio::time::sleep(std::time::Duration::from_millis(1100)).await;
        state.periodic_tick().await.unwrap();
        assert_eq!(state.all_runs().await.unwrap().len(), 1);
        assert!(state.next_fire_time().await.unwrap() >= after_first);
    }

    #[tokio::test]
    async fn test_exit_code_classification() {
        let (state, _wake) = spawn_default();

        let ok = state.request_on_demand_run().await.unwrap();
        state.begin_run(&ok).await.unwrap();
        state.finish_run(&ok, 0).await.unwrap();
        assert_eq!(state.get_run(&ok).await.unwrap().status, RunStatus::Complete);

        let bad = state.request_on_demand_run().await.unwrap();
        state.begin_run(&bad).await.unwrap();
        state.finish_run(&bad, 7).await.unwrap();
        let record = state.get_run(&bad).await.unwrap();
        assert_eq!(record.status, RunStatus::Failed);
        assert_eq!(record.exit_code, 7);
    }

    #[tokio::test]
    async fn test_status_never_moves_backward() {
        let (state, _wake) = spawn_default();

        let id = state.request_on_demand_run().await.unwrap();
        state.begin_run(&id).await.unwrap();
        assert!(matches!(state.begin_run(&id).await, Err(StateError::InvalidTransition { .. })));

        state.finish_run(&id, 0).await.unwrap();
        assert!(matches!(state.finish_run(&id, 1).await, Err(StateError::InvalidTransition { .. })));
        assert_eq!(state.get_run(&id).await.unwrap().exit_code, 0);
    }

    #[tokio::test]
    async fn test_table_bound_and_evicted_log_drain() {
        let limit = 3;
        let (state, _wake) = StateManager::spawn(limit, ControlState::default(), None);

        let mut ids = Vec::new();
        for _ in 0..limit + 2 {
            let id = state.request_on_demand_run().await.unwrap();
            state.begin_run(&id).await.unwrap();
            state.finish_run(&id, 0).await.unwrap();
            ids.push(id);
        }

        let runs = state.all_runs().await.unwrap();
        assert_eq!(runs.len(), limit);
        // The two oldest are gone and queued for log deletion
        let remaining: Vec<&String> = runs.iter().map(|r| &r.id).collect();
        assert!(!remaining.contains(&&ids[0]));
        assert!(!remaining.contains(&&ids[1]));

        let evicted = state.take_evicted_logs().await.unwrap();
        assert_eq!(evicted, vec![ids[0].clone(), ids[1].clone()]);
        // Drained: a second call returns nothing
        assert!(state.take_evicted_logs().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_run_is_not_found() {
        let (state, _wake) = spawn_default();
        assert!(matches!(state.get_run("missing").await, Err(StateError::NotFound(_))));
        assert!(matches!(state.begin_run("missing").await, Err(StateError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_interval_must_be_positive() {
        let (state, _wake) = spawn_default();
        assert!(matches!(state.set_run_interval(0).await, Err(StateError::InvalidInterval)));
        state.set_run_interval(1800).await.unwrap();
        assert_eq!(state.run_interval().await.unwrap(), 1800);
    }

    #[tokio::test]
    async fn test_maintenance_window_lifecycle() {
        let (state, _wake) = spawn_default();

        let end = state.start_maintenance(10).await.unwrap();
        let status = state.maintenance_status().await.unwrap();
        assert!(status.in_maintenance);
        assert_eq!(status.end_time_epoch, end);

        state.end_maintenance().await.unwrap();
        let status = state.maintenance_status().await.unwrap();
        assert!(!status.in_maintenance);
        assert_eq!(status.end_time_epoch, 0);

        // Zero minutes is a no-op window, already expired
        state.start_maintenance(0).await.unwrap();
        assert!(!state.maintenance_status().await.unwrap().in_maintenance);
    }

    #[tokio::test]
    async fn test_snapshot_reflects_control_state() {
        let (state, _wake) = spawn_default();
        state.set_run_interval(900).await.unwrap();
        state.set_periodic_enabled(false).await.unwrap();
        state.set_lock(true).await.unwrap();

        let snapshot = state.snapshot().await.unwrap();
        assert_eq!(snapshot.interval_seconds, 900);
        assert!(!snapshot.enabled);
        assert!(snapshot.locked);
        assert!(snapshot.last_run_id.is_empty());
    }

    #[tokio::test]
    async fn test_worker_wakeup_per_admission() {
        let (state, mut wake) = spawn_default();

        let id = state.request_on_demand_run().await.unwrap();
        assert_eq!(wake.recv().await.unwrap(), id);

        // Coalesced requests do not produce extra wakeups
        state.begin_run(&id).await.unwrap();
        let next = state.request_on_demand_run().await.unwrap();
        assert_eq!(wake.recv().await.unwrap(), next);
        assert!(wake.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_app_status_report() {
        let (state, _wake) = spawn_default();
        state.set_lock(true).await.unwrap();

        let status = state.status().await.unwrap();
        assert!(status.locked);
        assert!(!status.in_maintenance);
        assert!(status.periodic_enabled);
        assert_eq!(status.interval_secs, 600);
        assert_eq!(status.version, env!("CARGO_PKG_VERSION"));
    }
}

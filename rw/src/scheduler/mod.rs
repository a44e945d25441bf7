//! Periodic run scheduler
//!
//! A coarse fixed tick that hands the due/gating decision to the state
//! actor. The tick only needs to be fine enough that the configured
//! interval is honored to within a second; all ordering guarantees live in
//! the actor, where periodic admission is evaluated ahead of on-demand
//! requests.

use std::time::Duration;

use tracing::debug;

use crate::state::StateManager;

/// How often the due-condition is evaluated.
pub const TICK: Duration = Duration::from_secs(1);

/// Drive periodic run admission until the state manager goes away.
pub async fn run_periodic(state: StateManager, tick: Duration) {
    let mut ticker = tokio::time::interval(tick);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    ticker.tick().await;

    loop {
        ticker.tick().await;
        if state.periodic_tick().await.is_err() {
            break;
        }
    }

    debug!("periodic scheduler stopped");
}

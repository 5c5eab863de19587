//! Background task closing started games nobody has been connected to for
//! `game_ttl`.

use std::time::{Duration, Instant};

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::info;

use crate::state::AppState;

const REAP_INTERVAL: Duration = Duration::from_secs(30);

/// Spawn the reaper loop. It runs for the life of the process.
#[must_use]
pub fn spawn_reaper(state: AppState) -> JoinHandle<()> {
    spawn_reaper_every(state, REAP_INTERVAL)
}

fn spawn_reaper_every(state: AppState, every: Duration) -> JoinHandle<()> {
    info!(interval_secs = every.as_secs(), "abandoned game reaper started");
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            let mut registry = state.registry.write().await;
            let closed = super::lobby::reap_abandoned(&mut registry, Instant::now());
            if closed > 0 {
                info!(closed, lobbies = registry.lobbies.len(), "reaper: closed abandoned games");
            }
        }
    })
}

#[cfg(test)]
#[path = "reaper_test.rs"]
mod tests;

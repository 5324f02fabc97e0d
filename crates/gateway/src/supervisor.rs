//! The lifecycle supervisor: one cooperative loop running every sweep at
//! the room's adaptive tempo.
//!
//! Each tick: zombie sweep, handoff expiry, lock and cache TTL reaping,
//! interrupt timeouts, synapse consolidation, tempo recalculation, and a
//! daily telemetry rotation.  The loop exits promptly on shutdown.

use chrono::{TimeZone, Utc};
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::state::AppState;

pub fn spawn(state: AppState, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let last_rotation_date: Mutex<Option<String>> = Mutex::new(None);
        loop {
            let tempo = state.store.tempo().await.unwrap_or(30.0);
            tokio::select! {
                _ = tokio::time::sleep(std::time::Duration::from_secs_f64(tempo)) => {}
                _ = shutdown.changed() => {
                    tracing::debug!("supervisor stopping");
                    return;
                }
            }

            match state.store.supervisor_pass().await {
                Ok(stats) => {
                    if stats.zombied + stats.collected + stats.handoffs_expired + stats.locks_expired
                        > 0
                    {
                        tracing::info!(
                            zombied = stats.zombied,
                            collected = stats.collected,
                            handoffs_expired = stats.handoffs_expired,
                            locks_expired = stats.locks_expired,
                            cache_swept = stats.cache_swept,
                            tempo = stats.tempo,
                            "supervisor pass"
                        );
                    }
                }
                Err(e) => tracing::warn!(error = %e, "supervisor pass failed"),
            }

            state.limiter.sweep_idle();
            rotate_telemetry_if_new_day(&state, &last_rotation_date).await;
        }
    })
}

/// Roll the telemetry log the first tick after a UTC date change.
async fn rotate_telemetry_if_new_day(state: &AppState, last: &Mutex<Option<String>>) {
    let now = state.clock.now();
    let today = match Utc.timestamp_opt(now as i64, 0).single() {
        Some(ts) => ts.format("%Y-%m-%d").to_string(),
        None => return,
    };

    let previous = {
        let mut guard = last.lock();
        let previous = guard.clone();
        *guard = Some(today.clone());
        previous
    };

    match previous {
        // First tick: remember today, rotate nothing.
        None => {}
        Some(seen) if seen != today => {
            if let Err(e) = state.store.telemetry().rotate(&seen).await {
                tracing::warn!(error = %e, "telemetry rotation failed");
            } else {
                tracing::info!(date = %seen, "telemetry log rotated");
            }
        }
        _ => {}
    }
}

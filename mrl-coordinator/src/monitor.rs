//! Straggler detection.
//!
//! There are no heartbeats. A worker is presumed dead purely because its
//! claim got too old, and its task goes back to waiting.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::anyhow;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::info;

use crate::core::MRCoordinator;
use crate::tasks::TaskRegistry;

/// Demote timed out tasks every `interval`, forever.
pub async fn sweep_timeouts(registry: Arc<TaskRegistry>, timeout: Duration, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;

        let demoted = registry.demote_expired(Instant::now(), timeout).await;
        if !demoted.is_empty() {
            info!("Stragglers detected, reassigning {:?}", demoted);
        }
    }
}

/// Run [`sweep_timeouts`] as a background task.
pub fn spawn_timeout_sweep(
    registry: Arc<TaskRegistry>,
    timeout: Duration,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(sweep_timeouts(registry, timeout, interval))
}

/// Poll `coordinator` every `poll_interval` until the job completes.
///
/// Fails as soon as the sweep or the server stops first. A handle that is
/// reported here has already been awaited and must not be awaited again.
pub async fn wait_for_completion(
    coordinator: &MRCoordinator,
    sweep: &mut JoinHandle<()>,
    server: &mut JoinHandle<anyhow::Result<()>>,
    poll_interval: Duration,
) -> anyhow::Result<()> {
    loop {
        if coordinator.is_complete().await {
            return Ok(());
        }

        if sweep.is_finished() {
            return match sweep.await {
                Err(e) if e.is_panic() => Err(anyhow!("timeout sweep panicked: {e}")),
                _ => Err(anyhow!("timeout sweep stopped before the job completed")),
            };
        }

        if server.is_finished() {
            return match server.await {
                Ok(Ok(())) => Err(anyhow!("coordinator server stopped before the job completed")),
                Ok(Err(e)) => Err(e.context("coordinator server failed")),
                Err(e) => Err(anyhow!("coordinator server panicked: {e}")),
            };
        }

        tokio::time::sleep(poll_interval).await;
    }
}

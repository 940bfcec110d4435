//! Fixed-interval background refresh.

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use super::refresh::{RefreshController, RefreshTrigger};

/// Refresh `controller` every `period` until `cancel` fires.
///
/// The first tick is skipped so polling starts one period after the initial
/// load. Ticks missed while a refresh is slow are dropped, not replayed.
pub fn spawn_poller(
    controller: Arc<RefreshController>,
    period: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    log::debug!("Poller stopped");
                    break;
                }
                _ = ticker.tick() => {
                    let snapshot = controller.refresh(RefreshTrigger::Poll).await;
                    if let Some(error) = &snapshot.error {
                        log::debug!("Poll refresh #{} failed: {}", snapshot.generation, error);
                    }
                }
            }
        }
    })
}

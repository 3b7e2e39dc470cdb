//! Background eviction of nodes that stopped sending heartbeats.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::registry::NodeRegistry;

/// Periodically forget nodes silent for at least `max_age`.
pub async fn run_node_reaper(
    registry: Arc<NodeRegistry>,
    max_age: Duration,
    interval: Duration,
    shutdown: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = ticker.tick() => {
                for address in registry.evict_stale(Utc::now(), max_age).await {
                    info!(node = %address, max_age_secs = max_age.as_secs(), "Evicted silent edge node");
                }
            }
        }
    }
}

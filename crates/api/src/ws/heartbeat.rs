use std::sync::Arc;
use std::time::Duration;

use crate::config::MAX_PRESENCE_STALE_TIMEOUT_SECS;
use crate::ws::relay::Relay;

/// Spawn a background task that pings every connection and evicts the ones
/// that stayed silent for longer than `stale_timeout_secs`.
///
/// Evicted connections lose their presence record and a fresh snapshot is
/// published. `stale_timeout_secs` is capped at
/// [`MAX_PRESENCE_STALE_TIMEOUT_SECS`]. The returned `JoinHandle` can be used to abort the task.
pub fn start_heartbeat(
    relay: Arc<Relay>,
    interval_secs: u64,
    stale_timeout_secs: u64,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
        let max_silence =
            chrono::Duration::seconds(stale_timeout_secs.min(MAX_PRESENCE_STALE_TIMEOUT_SECS) as i64);

        loop {
            interval.tick().await;
            let ws_manager = relay.ws_manager();

            let evicted = ws_manager.evict_stale(max_silence).await;
            if !evicted.is_empty() {
                tracing::info!(count = evicted.len(), "Evicted stale presence connections");
                relay.publish_sync().await;
            }

            let count = ws_manager.connection_count().await;
            tracing::debug!(count, "Presence heartbeat ping");
            ws_manager.ping_all().await;
        }
    })
}

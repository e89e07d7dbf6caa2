// Path: crates/filter/src/purge.rs
use std::sync::Arc;
use std::time::Duration;

use crate::pipeline::ContentFilter;

/// Spawns the background task that periodically purges expired cache
/// entries and logs the resulting size, per spec §4.8's closing paragraph.
/// Returns a handle the caller can abort on shutdown.
pub fn spawn_purge_task(filter: Arc<ContentFilter>, interval: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            let purged = filter.purge_expired();
            tracing::debug!(purged, size = filter.cache_len(), "content filter cache purge");
        }
    })
}

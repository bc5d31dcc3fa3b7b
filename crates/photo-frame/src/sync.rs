//! Periodic album sync
//!
//! Each tick pulls the full album listing, reconciles the cache catalog with
//! it and downloads the photos that are new since the last tick.

use crate::error::Result;
use crate::source::PhotoSource;
use photo_cache::PhotoCache;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

/// Summary of a single sync tick
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    /// Photos in the upstream listing
    pub total: usize,
    /// Photos new to the catalog
    pub added: usize,
    /// New photos downloaded and handed to the cache
    pub cached: usize,
    /// New photos whose download failed
    pub failed: usize,
    /// The listing was too small to trust and the catalog was left alone
    pub skipped: bool,
}

/// Run one sync tick.
///
/// A failed listing returns the error without touching the cache. A listing
/// with fewer than `min_items` photos is ignored, so a transient empty answer
/// from the NAS cannot wipe the catalog. Download failures are logged and
/// leave the photo listed but uncached; it will be fetched on first request.
pub async fn sync_once(
    cache: &PhotoCache,
    source: &dyn PhotoSource,
    min_items: usize,
) -> Result<SyncReport> {
    let snapshot = source.list_album().await?;
    let total = snapshot.len();

    if total < min_items {
        warn!(total, min_items, "Too few photos in album, skipping sync");
        return Ok(SyncReport {
            total,
            skipped: true,
            ..Default::default()
        });
    }

    let mut added: Vec<_> = cache.sync_index(snapshot).into_iter().collect();
    added.sort();
    info!(total, new = added.len(), "Index synced");

    let mut report = SyncReport {
        total,
        added: added.len(),
        ..Default::default()
    };

    for key in added {
        // The key may have been dropped by a concurrent sync since the diff
        let Some(external_id) = cache.external_id(&key) else {
            debug!(cache_key = %key, "Photo delisted before download");
            continue;
        };

        match source.download(&key, &external_id).await {
            Ok(data) => {
                let size = data.len();
                cache.put(key.clone(), data);
                report.cached += 1;
                debug!(cache_key = %key, size, "Cached new photo");
            }
            Err(e) => {
                report.failed += 1;
                warn!(cache_key = %key, error = %e, "Failed to download new photo");
            }
        }
    }

    Ok(report)
}

/// Sync forever, once per `period`. Errors are logged and retried on the
/// next tick.
pub async fn run_sync_loop(
    cache: Arc<PhotoCache>,
    source: Arc<dyn PhotoSource>,
    period: Duration,
    min_items: usize,
) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        match sync_once(&cache, source.as_ref(), min_items).await {
            Ok(report) if !report.skipped => {
                let stats = cache.stats();
                info!(
                    cached = report.cached,
                    failed = report.failed,
                    size_bytes = stats.size_bytes,
                    "Sync complete"
                );
            }
            Ok(_) => {}
            Err(e) => error!(error = %e, "Sync error"),
        }
    }
}

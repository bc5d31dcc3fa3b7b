//! Fetch-on-miss photo lookup

use crate::error::Result;
use crate::source::PhotoSource;
use bytes::Bytes;
use photo_cache::{CacheKey, PhotoCache};
use tracing::{debug, info};

/// Outcome of looking up a photo
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    /// Served from memory
    Hit(Bytes),
    /// Downloaded on demand (and cached if it fit)
    Fetched(Bytes),
    /// Not listed in the album
    NotFound,
}

/// Return a photo's bytes, downloading and caching them on a miss.
///
/// The cache lock is never held while downloading. A failed download leaves
/// the cache untouched, so the photo stays listed and is retried on the next
/// request.
pub async fn fetch_photo(
    cache: &PhotoCache,
    source: &dyn PhotoSource,
    key: &CacheKey,
) -> Result<Lookup> {
    if let Some(data) = cache.get(key) {
        debug!(cache_key = %key, "Cache hit");
        return Ok(Lookup::Hit(data));
    }

    let Some(external_id) = cache.external_id(key) else {
        return Ok(Lookup::NotFound);
    };

    info!(cache_key = %key, "Cache miss, downloading");
    let data = source.download(key, &external_id).await?;
    cache.put(key.clone(), data.clone());

    Ok(Lookup::Fetched(data))
}

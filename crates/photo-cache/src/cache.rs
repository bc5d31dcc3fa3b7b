//! Catalog plus byte-budgeted LRU blob store behind a single lock

use crate::types::{CacheKey, CacheStats, CatalogSnapshot, ExternalId};
use bytes::Bytes;
use lru::LruCache;
use parking_lot::Mutex;
use std::collections::hash_map::Entry;
use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::debug;

/// Default memory budget for cached photo bytes: 250 MiB
pub const DEFAULT_MAX_BYTES: u64 = 250 * 1024 * 1024;

/// Everything guarded by the cache lock.
///
/// `size_bytes` always equals the summed length of `blobs`, and never exceeds
/// the owning cache's budget.
struct CacheState {
    /// All photos currently listed upstream
    index: HashMap<CacheKey, ExternalId>,
    /// Downloaded photo bytes, most recently used first
    blobs: LruCache<CacheKey, Bytes>,
    size_bytes: u64,
}

impl CacheState {
    fn new() -> Self {
        Self {
            index: HashMap::new(),
            blobs: LruCache::unbounded(),
            size_bytes: 0,
        }
    }

    fn remove_blob(&mut self, key: &CacheKey) -> Option<Bytes> {
        let blob = self.blobs.pop(key)?;
        self.size_bytes -= blob.len() as u64;
        Some(blob)
    }

    fn reconcile(&mut self, snapshot: CatalogSnapshot) -> HashSet<CacheKey> {
        let removed: Vec<CacheKey> = self
            .index
            .keys()
            .filter(|key| !snapshot.contains_key(*key))
            .cloned()
            .collect();

        for key in &removed {
            self.index.remove(key);
            if let Some(blob) = self.remove_blob(key) {
                debug!(cache_key = %key, size = blob.len(), "Dropped photo no longer listed upstream");
            }
        }

        // Keys already indexed keep their original external id and LRU slot.
        let mut added = HashSet::new();
        for (key, external_id) in snapshot {
            if let Entry::Vacant(slot) = self.index.entry(key) {
                added.insert(slot.key().clone());
                slot.insert(external_id);
            }
        }

        debug!(
            added = added.len(),
            removed = removed.len(),
            indexed = self.index.len(),
            "Reconciled catalog"
        );
        added
    }

    fn insert(&mut self, key: CacheKey, data: Bytes, max_bytes: u64) {
        let size = data.len() as u64;

        self.remove_blob(&key);

        while self.size_bytes + size > max_bytes {
            let Some((evicted_key, evicted)) = self.blobs.pop_lru() else {
                break;
            };
            self.size_bytes -= evicted.len() as u64;
            debug!(cache_key = %evicted_key, size = evicted.len(), "Evicted least recently used photo");
        }

        self.blobs.put(key, data);
        self.size_bytes += size;
    }
}

/// Thread-safe photo cache.
///
/// Holds two views of the same photo set:
///
/// - the catalog, every photo known upstream mapped to the id needed to
///   download it, replaced wholesale by [`PhotoCache::sync_index`];
/// - the blob store, the bytes of the photos actually held in memory, kept in
///   recency order and bounded by `max_bytes`.
///
/// Every method takes the one internal lock for its whole duration and never
/// performs I/O, so callers may share a `PhotoCache` freely between a
/// background sync task and any number of request handlers.
pub struct PhotoCache {
    state: Mutex<CacheState>,
    max_bytes: u64,
}

impl PhotoCache {
    /// Create an empty cache holding at most `max_bytes` of photo data
    pub fn new(max_bytes: u64) -> Self {
        Self {
            state: Mutex::new(CacheState::new()),
            max_bytes,
        }
    }

    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    /// Replace the catalog with a fresh upstream listing.
    ///
    /// Photos missing from `snapshot` are dropped from the catalog together
    /// with any cached bytes. Photos new in `snapshot` are indexed but not
    /// downloaded; their keys are returned so the caller can fetch them.
    /// Photos present in both are left exactly as they were.
    pub fn sync_index(&self, snapshot: CatalogSnapshot) -> HashSet<CacheKey> {
        self.state.lock().reconcile(snapshot)
    }

    /// Look up the remote id needed to download `key`
    pub fn external_id(&self, key: &CacheKey) -> Option<ExternalId> {
        self.state.lock().index.get(key).cloned()
    }

    /// Whether `key` is listed in the catalog
    pub fn contains_key(&self, key: &CacheKey) -> bool {
        self.state.lock().index.contains_key(key)
    }

    /// All keys in the catalog, whether or not their bytes are cached
    pub fn keys(&self) -> BTreeSet<CacheKey> {
        self.state.lock().index.keys().cloned().collect()
    }

    /// Return cached bytes for `key`, marking it most recently used
    pub fn get(&self, key: &CacheKey) -> Option<Bytes> {
        self.state.lock().blobs.get(key).cloned()
    }

    /// Cache the bytes of a photo, evicting least recently used photos until
    /// it fits.
    ///
    /// A payload larger than the whole budget is silently not cached. Catalog
    /// membership is not checked: only a later sync drops bytes for photos
    /// that have disappeared upstream.
    pub fn put(&self, key: CacheKey, data: Bytes) {
        if data.len() as u64 > self.max_bytes {
            debug!(
                cache_key = %key,
                size = data.len(),
                max_bytes = self.max_bytes,
                "Photo larger than cache budget, not caching"
            );
            return;
        }

        self.state.lock().insert(key, data, self.max_bytes);
    }

    /// Get current cache statistics
    pub fn stats(&self) -> CacheStats {
        let state = self.state.lock();
        CacheStats {
            indexed: state.index.len(),
            cached: state.blobs.len(),
            size_bytes: state.size_bytes,
            max_bytes: self.max_bytes,
        }
    }
}

impl Default for PhotoCache {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_BYTES)
    }
}

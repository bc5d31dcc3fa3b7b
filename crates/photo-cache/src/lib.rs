//! In-memory photo cache
//!
//! Keeps the catalog of photos known upstream (cache key to remote id) next to
//! a byte-budgeted LRU store of downloaded photo bytes. Both live behind one
//! lock so a catalog sync can never be observed half-applied.

mod cache;
mod types;

pub use cache::{PhotoCache, DEFAULT_MAX_BYTES};
pub use types::{CacheKey, CacheStats, CatalogSnapshot, ExternalId};

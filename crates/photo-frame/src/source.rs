//! Where photos come from: album listings and downloads

use crate::error::Result;
use async_trait::async_trait;
use bytes::Bytes;
use photo_cache::{CacheKey, CatalogSnapshot, ExternalId};
use synology_photos_client::{parse_items, SynologyPhotosClient, DEFAULT_ADDITIONAL};

/// Remote photo service feeding the cache.
///
/// Implementations perform network I/O and must never be called while
/// holding any cache lock.
#[async_trait]
pub trait PhotoSource: Send + Sync {
    /// Complete listing of the album as it exists upstream right now
    async fn list_album(&self) -> Result<CatalogSnapshot>;

    /// Download the bytes of a single photo
    async fn download(&self, key: &CacheKey, external_id: &ExternalId) -> Result<Bytes>;
}

/// [`PhotoSource`] backed by one album on a Synology NAS
pub struct SynologySource {
    client: SynologyPhotosClient,
    album: String,
}

impl SynologySource {
    pub fn new(client: SynologyPhotosClient, album: impl Into<String>) -> Self {
        Self {
            client,
            album: album.into(),
        }
    }

    pub fn client(&self) -> &SynologyPhotosClient {
        &self.client
    }

    pub fn album(&self) -> &str {
        &self.album
    }
}

#[async_trait]
impl PhotoSource for SynologySource {
    async fn list_album(&self) -> Result<CatalogSnapshot> {
        let items = self
            .client
            .list_album_items(&self.album, DEFAULT_ADDITIONAL)
            .await?;

        Ok(parse_items(&items)
            .into_iter()
            .map(|(key, unit_id)| (CacheKey::from(key), ExternalId::from(unit_id)))
            .collect())
    }

    async fn download(&self, key: &CacheKey, external_id: &ExternalId) -> Result<Bytes> {
        Ok(self
            .client
            .download_item(key.as_str(), external_id.as_str())
            .await?)
    }
}

//! # Thumbnail Cache
//!
//! Cover images by URL, served locally when possible. The cache is never
//! authoritative: a storage failure just means another download.

use scout_db::ImageCacheRepository;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::SyncResult;
use crate::network::NetworkMonitor;
use crate::transport::ScoutApi;

#[derive(Clone)]
pub struct ThumbnailCache {
    images: ImageCacheRepository,
    api: Arc<dyn ScoutApi>,
    network: NetworkMonitor,
}

impl ThumbnailCache {
    pub fn new(images: ImageCacheRepository, api: Arc<dyn ScoutApi>, network: NetworkMonitor) -> Self {
        ThumbnailCache {
            images,
            api,
            network,
        }
    }

    /// Cached bytes, else a download (when online) that is cached for next time.
    ///
    /// `Ok(None)` means offline with nothing cached.
    pub async fn get_or_fetch(&self, url: &str) -> SyncResult<Option<Vec<u8>>> {
        match self.images.get(url).await {
            Ok(Some(image)) => return Ok(Some(image.data)),
            Ok(None) => {}
            Err(e) => warn!(url, error = %e, "Image cache read failed"),
        }

        if !self.network.is_online() {
            debug!(url, "Thumbnail not cached and offline");
            return Ok(None);
        }

        let bytes = self.api.fetch_image(url).await?;
        if let Err(e) = self.images.put(url, &bytes).await {
            warn!(url, error = %e, "Failed to cache thumbnail");
        }
        Ok(Some(bytes))
    }
}

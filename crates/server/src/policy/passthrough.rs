//! Read-only passthrough for shell assets.
//!
//! Shell assets only ever enter the store through a full manifest refresh.
//! A miss here is answered from the network without touching the store.

use shellcache_client::FetchOptions;
use shellcache_core::{Error, RequestKey, Snapshot};
use url::Url;

use super::CachePolicy;

impl CachePolicy {
    pub async fn serve_no_cache_write(&self, url: &Url) -> Result<Snapshot, Error> {
        let store = self.current_store().await?;
        if let Some(cached) = store.get(&RequestKey::from_url(url)).await? {
            return Ok(cached);
        }
        self.fetcher.fetch(url, FetchOptions::default()).await
    }
}

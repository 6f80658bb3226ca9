//! Stale-while-revalidate.
//!
//! A cache hit is returned immediately. Unless the caller asked to skip it,
//! a background fetch then replaces the entry when the network answers with
//! a 2xx or an opaque response. Background failures are logged and dropped;
//! nothing here retries.

use std::sync::Arc;

use shellcache_client::FetchOptions;
use shellcache_core::{Error, RequestKey, Snapshot, Store};
use url::Url;

use super::CachePolicy;

impl CachePolicy {
    pub async fn stale_while_revalidate(
        &self, url: &Url, store_name: &str, skip_revalidate_if_cached: bool,
    ) -> Result<Snapshot, Error> {
        let store = self.storage.open(store_name).await?;
        let key = RequestKey::from_url(url);

        if let Some(cached) = store.get(&key).await? {
            if skip_revalidate_if_cached {
                tracing::trace!(url = %url, "versioned asset hit, skipping revalidation");
                return Ok(cached);
            }

            let fetcher = Arc::clone(&self.fetcher);
            let url = url.clone();
            self.tasks.spawn("revalidate", async move {
                let fresh = fetcher.fetch(&url, FetchOptions::default()).await?;
                store_if_cacheable(store.as_ref(), &key, &fresh).await
            });
            return Ok(cached);
        }

        let fresh = self.fetcher.fetch(url, FetchOptions::default()).await?;
        if let Err(e) = store_if_cacheable(store.as_ref(), &key, &fresh).await {
            tracing::warn!(url = %url, store = store.name(), error = %e, "failed to store fetched response");
        }
        Ok(fresh)
    }
}

async fn store_if_cacheable(store: &dyn Store, key: &RequestKey, snapshot: &Snapshot) -> Result<(), Error> {
    if !snapshot.is_cacheable() {
        tracing::debug!(url = %key, status = snapshot.status, "not caching unsuccessful response");
        return Ok(());
    }
    store.put(key, snapshot).await
}

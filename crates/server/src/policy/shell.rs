//! Shell bundle refresh.
//!
//! The manifest is refreshed as a unit: every member is fetched in parallel,
//! bypassing intermediary caches, and nothing is written unless every fetch
//! returned a 2xx. Writes that already landed are not rolled back if a later
//! write fails.

use std::sync::Arc;

use futures_util::future::join_all;
use shellcache_client::{FetchOptions, Fetcher};
use shellcache_core::{Error, RequestKey, Snapshot, Store};
use url::Url;

/// Outcome of a shell refresh.
#[derive(Debug, Clone)]
pub enum ShellRefresh {
    /// Every member was fetched and written. Carries the root document so a
    /// first load can answer without reading it back from the store.
    Refreshed { root: Snapshot },
    Failed,
}

impl ShellRefresh {
    pub fn is_refreshed(&self) -> bool {
        matches!(self, ShellRefresh::Refreshed { .. })
    }
}

#[derive(Debug, Clone)]
pub struct ShellRefresher {
    fetcher: Arc<dyn Fetcher>,
    manifest: Arc<[Url]>,
}

impl ShellRefresher {
    /// `manifest` must list the root document first.
    pub fn new(fetcher: Arc<dyn Fetcher>, manifest: Vec<Url>) -> Self {
        Self { fetcher, manifest: manifest.into() }
    }

    /// Refresh the bundle, folding any error into [`ShellRefresh::Failed`].
    pub async fn refresh(&self, store: &dyn Store) -> ShellRefresh {
        match self.try_refresh(store).await {
            Ok(root) => ShellRefresh::Refreshed { root },
            Err(e) => {
                tracing::warn!(store = store.name(), code = e.code(), error = %e, "shell refresh failed");
                ShellRefresh::Failed
            }
        }
    }

    /// Refresh the bundle and return the fetched root document.
    pub async fn try_refresh(&self, store: &dyn Store) -> Result<Snapshot, Error> {
        let bundle = self.fetch_bundle().await?;
        self.write_bundle(store, &bundle).await?;

        tracing::debug!(store = store.name(), members = bundle.len(), "shell bundle refreshed");

        bundle
            .into_iter()
            .next()
            .ok_or_else(|| Error::InvalidInput("shell manifest is empty".to_string()))
    }

    async fn fetch_bundle(&self) -> Result<Vec<Snapshot>, Error> {
        let fetches = self
            .manifest
            .iter()
            .map(|url| self.fetcher.fetch(url, FetchOptions::bypass_cache()));
        let responses = join_all(fetches).await;

        let mut bundle = Vec::with_capacity(responses.len());
        for (url, response) in self.manifest.iter().zip(responses) {
            let snapshot = response?;
            if !snapshot.is_ok() {
                return Err(Error::HttpError(format!("shell resource {url} returned status {}", snapshot.status)));
            }
            bundle.push(snapshot);
        }
        Ok(bundle)
    }

    async fn write_bundle(&self, store: &dyn Store, bundle: &[Snapshot]) -> Result<(), Error> {
        let writes = self.manifest.iter().zip(bundle).map(|(url, snapshot)| {
            let key = RequestKey::from_url(url);
            async move { store.put(&key, snapshot).await }
        });

        join_all(writes).await.into_iter().collect()
    }
}

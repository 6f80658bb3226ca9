//! Root document handling.
//!
//! Once a root document is cached it is always served from the store, and
//! every such hit kicks off a shell refresh in the background. Only the first
//! load (or a load after the store was purged) waits on the network.

use shellcache_client::FetchOptions;
use shellcache_core::{Error, RequestKey, Snapshot};

use super::{CachePolicy, ShellRefresh};

impl CachePolicy {
    pub async fn serve_root(&self) -> Result<Snapshot, Error> {
        let store = self.current_store().await?;
        let root_url = &self.settings.root_url;

        if let Some(cached) = store.get(&RequestKey::from_url(root_url)).await? {
            let shell = self.shell.clone();
            self.tasks.spawn("shell-refresh", async move {
                shell.try_refresh(store.as_ref()).await.map(|_| ())
            });
            return Ok(cached);
        }

        match self.shell.refresh(store.as_ref()).await {
            ShellRefresh::Refreshed { root } => Ok(root),
            ShellRefresh::Failed => {
                tracing::info!(url = %root_url, "first load refresh failed, fetching root document directly");
                self.fetcher.fetch(root_url, FetchOptions::default()).await
            }
        }
    }
}

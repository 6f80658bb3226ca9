//! Per-request caching policy.
//!
//! Each intercepted request is classified and handed to one strategy:
//!
//! - root document: cache first, refresh the shell bundle in the background
//! - shell asset: serve from the store, fetch on miss, never write
//! - everything else: stale-while-revalidate, optionally skipping the
//!   revalidation for versioned assets

pub mod classify;
pub mod passthrough;
pub mod revalidate;
pub mod root;
pub mod shell;

use std::sync::Arc;

use shellcache_client::Fetcher;
use shellcache_core::{AppConfig, Error, Snapshot, Storage, Store};
use url::Url;

use crate::tasks::BackgroundTasks;

pub use classify::{ClassifyRules, InterceptedRequest, Route, classify};
pub use shell::{ShellRefresh, ShellRefresher};

/// Deployment-specific policy inputs.
#[derive(Debug, Clone)]
pub struct PolicySettings {
    pub origin: Url,
    /// Name of the current store.
    pub store_name: String,
    pub root_url: Url,
    /// Shell manifest as absolute URLs, root document first.
    pub manifest: Vec<Url>,
    pub rules: ClassifyRules,
}

impl PolicySettings {
    pub fn from_config(config: &AppConfig) -> Result<Self, Error> {
        let origin = Url::parse(&config.origin).map_err(|e| Error::InvalidUrl(format!("origin: {e}")))?;
        let join = |path: &str| origin.join(path).map_err(|e| Error::InvalidUrl(format!("{path}: {e}")));

        let manifest = config
            .shell_manifest()
            .iter()
            .map(|path| join(path.as_str()))
            .collect::<Result<Vec<_>, _>>()?;
        let root_url = join(&config.root_path)?;

        let root_paths = std::iter::once(&config.root_path)
            .chain(&config.root_aliases)
            .cloned()
            .collect();

        Ok(Self {
            store_name: config.store_name.clone(),
            root_url,
            manifest,
            rules: ClassifyRules {
                origin: origin.clone(),
                root_paths,
                shell_asset_paths: config.shell_assets.clone(),
                versioned_asset_marker: config.versioned_asset_marker.clone(),
            },
            origin,
        })
    }
}

/// The policy engine. Cheap to clone; every field is shared.
#[derive(Debug, Clone)]
pub struct CachePolicy {
    storage: Arc<dyn Storage>,
    fetcher: Arc<dyn Fetcher>,
    shell: ShellRefresher,
    settings: Arc<PolicySettings>,
    tasks: BackgroundTasks,
}

impl CachePolicy {
    pub fn new(
        storage: Arc<dyn Storage>, fetcher: Arc<dyn Fetcher>, shell: ShellRefresher, settings: Arc<PolicySettings>,
        tasks: BackgroundTasks,
    ) -> Self {
        Self { storage, fetcher, shell, settings, tasks }
    }

    #[cfg(test)]
    pub fn settings(&self) -> &PolicySettings {
        &self.settings
    }

    pub fn tasks(&self) -> &BackgroundTasks {
        &self.tasks
    }

    /// Serve a request, or return `None` when no rule claims it.
    pub async fn handle(&self, request: &InterceptedRequest) -> Option<Result<Snapshot, Error>> {
        let route = classify(request, &self.settings.rules);
        tracing::debug!(method = %request.method, url = %request.url, route = ?route, "classified request");

        Some(match route? {
            Route::RootDocument => self.serve_root().await,
            Route::ShellAsset => self.serve_no_cache_write(&request.url).await,
            Route::Revalidate { skip_revalidate_if_cached } => {
                self.stale_while_revalidate(&request.url, &self.settings.store_name, skip_revalidate_if_cached)
                    .await
            }
        })
    }

    async fn current_store(&self) -> Result<Arc<dyn Store>, Error> {
        self.storage.open(&self.settings.store_name).await
    }
}

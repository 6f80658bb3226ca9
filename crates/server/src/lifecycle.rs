//! Store lifecycle and activation.
//!
//! Activation purges every store other than the current one, opens the
//! current store, and refreshes the shell bundle into it. Each delete runs
//! independently, and a failed delete is recorded in the report without
//! stopping the others. Failing to list the stores at all aborts activation.

use std::sync::Arc;

use futures_util::future::join_all;
use shellcache_core::{Error, Storage};

use crate::policy::ShellRefresher;

/// What happened to one stale store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CleanupOutcome {
    Deleted,
    /// Listed, but gone by the time the delete ran.
    AlreadyGone,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreCleanup {
    pub name: String,
    pub outcome: CleanupOutcome,
}

#[derive(Debug, Clone)]
pub struct ActivationReport {
    pub store: String,
    pub cleanup: Vec<StoreCleanup>,
    pub shell_refreshed: bool,
}

impl ActivationReport {
    pub fn failed_cleanups(&self) -> impl Iterator<Item = &StoreCleanup> {
        self.cleanup
            .iter()
            .filter(|c| matches!(c.outcome, CleanupOutcome::Failed(_)))
    }
}

#[derive(Debug, Clone)]
pub struct LifecycleManager {
    storage: Arc<dyn Storage>,
    current: String,
    shell: ShellRefresher,
}

impl LifecycleManager {
    pub fn new(storage: Arc<dyn Storage>, current: impl Into<String>, shell: ShellRefresher) -> Self {
        Self { storage, current: current.into(), shell }
    }

    pub fn current_store_name(&self) -> &str {
        &self.current
    }

    /// Run activation.
    ///
    /// # Errors
    ///
    /// Fails if the stores cannot be listed or the current store cannot be
    /// opened. Individual delete and shell refresh failures are reported in
    /// the [`ActivationReport`].
    pub async fn activate(&self) -> Result<ActivationReport, Error> {
        let cleanup = self.purge_stale_stores().await?;

        let store = self.storage.open(&self.current).await?;
        let shell_refreshed = self.shell.refresh(store.as_ref()).await.is_refreshed();

        let report = ActivationReport { store: self.current.clone(), cleanup, shell_refreshed };

        tracing::info!(
            store = %report.store,
            purged = report.cleanup.iter().filter(|c| c.outcome == CleanupOutcome::Deleted).count(),
            failed = report.failed_cleanups().count(),
            shell_refreshed = report.shell_refreshed,
            "activation complete"
        );

        Ok(report)
    }

    async fn purge_stale_stores(&self) -> Result<Vec<StoreCleanup>, Error> {
        let names = self.storage.list_names().await.inspect_err(|e| {
            tracing::warn!(error = %e, "could not list stores, activation aborted");
        })?;

        let deletions = names
            .into_iter()
            .filter(|name| *name != self.current)
            .map(|name| async move {
                let outcome = match self.storage.delete(&name).await {
                    Ok(true) => CleanupOutcome::Deleted,
                    Ok(false) => CleanupOutcome::AlreadyGone,
                    Err(e) => {
                        tracing::warn!(store = %name, error = %e, "failed to delete stale store");
                        CleanupOutcome::Failed(e.to_string())
                    }
                };
                StoreCleanup { name, outcome }
            });

        Ok(join_all(deletions).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FlakyStorage, MockFetcher, url};
    use shellcache_client::Fetcher;
    use shellcache_core::{CacheDb, RequestKey, Snapshot};

    fn shell_fetcher() -> Arc<MockFetcher> {
        let fetcher = MockFetcher::new();
        fetcher.respond("/", 200, "root");
        fetcher.respond("/app.js", 200, "js");
        fetcher.respond("/style.css", 200, "css");
        fetcher
    }

    fn manager(storage: Arc<dyn Storage>, current: &str, fetcher: Arc<MockFetcher>) -> LifecycleManager {
        let fetcher: Arc<dyn Fetcher> = fetcher;
        let shell = ShellRefresher::new(fetcher, vec![url("/"), url("/app.js"), url("/style.css")]);
        LifecycleManager::new(storage, current, shell)
    }

    async fn db_with(stores: &[&str]) -> CacheDb {
        let db = CacheDb::open_in_memory().await.unwrap();
        for name in stores {
            db.open(name).await.unwrap();
        }
        db
    }

    #[tokio::test]
    async fn test_activation_idempotent_from_any_start() {
        let starts: [&[&str]; 4] =
            [&[], &["app-cache"], &["app-cache-v0", "other"], &["app-cache", "app-cache-v0", "legacy", "zzz"]];

        for start in starts {
            let db = db_with(start).await;
            let lifecycle = manager(Arc::new(db.clone()), "app-cache", shell_fetcher());

            lifecycle.activate().await.unwrap();
            assert_eq!(db.list_names().await.unwrap(), vec!["app-cache".to_string()], "start: {start:?}");

            let second = lifecycle.activate().await.unwrap();
            assert!(second.cleanup.is_empty());
            assert_eq!(db.list_names().await.unwrap(), vec!["app-cache".to_string()], "start: {start:?}");
        }
    }

    #[tokio::test]
    async fn test_activation_refreshes_shell_into_current_store() {
        let db = db_with(&[]).await;
        let lifecycle = manager(Arc::new(db.clone()), "app-cache", shell_fetcher());

        let report = lifecycle.activate().await.unwrap();

        assert!(report.shell_refreshed);
        let store = db.open("app-cache").await.unwrap();
        let root = store.get(&RequestKey::from_url(&url("/"))).await.unwrap().unwrap();
        assert_eq!(&root.body[..], b"root");
    }

    #[tokio::test]
    async fn test_activation_keeps_current_store_entries() {
        let db = db_with(&[]).await;
        let store = db.open("app-cache").await.unwrap();
        let key = RequestKey::from_url(&url("/data.json"));
        store.put(&key, &Snapshot::new(url("/data.json").as_str(), 200, "kept")).await.unwrap();

        manager(Arc::new(db.clone()), "app-cache", shell_fetcher()).activate().await.unwrap();

        assert!(store.get(&key).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_failed_delete_does_not_block_others() {
        let db = db_with(&["app-cache-v0", "app-cache-v1", "legacy"]).await;
        let storage = FlakyStorage::new(db.clone()).failing_delete("app-cache-v1");
        let lifecycle = manager(Arc::new(storage), "app-cache", shell_fetcher());

        let report = lifecycle.activate().await.unwrap();

        assert_eq!(db.list_names().await.unwrap(), vec!["app-cache".to_string(), "app-cache-v1".to_string()]);
        let failed: Vec<&str> = report.failed_cleanups().map(|c| c.name.as_str()).collect();
        assert_eq!(failed, vec!["app-cache-v1"]);
        assert_eq!(report.cleanup.len(), 3);
        assert!(report.shell_refreshed);
    }

    #[tokio::test]
    async fn test_listing_failure_aborts_activation() {
        let db = db_with(&["old"]).await;
        let fetcher = shell_fetcher();
        let storage = FlakyStorage::new(db.clone()).failing_list();
        let lifecycle = manager(Arc::new(storage), "app-cache", Arc::clone(&fetcher));

        let result = lifecycle.activate().await;

        assert!(matches!(result, Err(Error::InvalidInput(_))));
        assert_eq!(db.list_names().await.unwrap(), vec!["old".to_string()]);
        assert_eq!(fetcher.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_offline_activation_reports_shell_failure() {
        let db = db_with(&["old"]).await;
        let fetcher = MockFetcher::new();
        fetcher.fail("/");
        fetcher.fail("/app.js");
        fetcher.fail("/style.css");
        let lifecycle = manager(Arc::new(db.clone()), "app-cache", fetcher);

        let report = lifecycle.activate().await.unwrap();

        assert!(!report.shell_refreshed);
        assert_eq!(db.list_names().await.unwrap(), vec!["app-cache".to_string()]);
    }

    #[tokio::test]
    async fn test_deployments_are_isolated_by_store_name() {
        let db = db_with(&[]).await;
        let v1 = manager(Arc::new(db.clone()), "app-cache-v1", shell_fetcher());
        let v2 = manager(Arc::new(db.clone()), "app-cache-v2", shell_fetcher());

        v1.activate().await.unwrap();
        assert_eq!(db.list_names().await.unwrap(), vec!["app-cache-v1".to_string()]);

        let report = v2.activate().await.unwrap();
        assert_eq!(report.cleanup, vec![StoreCleanup { name: "app-cache-v1".into(), outcome: CleanupOutcome::Deleted }]);
        assert_eq!(db.list_names().await.unwrap(), vec!["app-cache-v2".to_string()]);
    }
}

//! Activation gate in front of the policy engine.
//!
//! Until activation completes, nothing is intercepted and requests take the
//! default network path. Afterwards every request goes through the policy.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use shellcache_client::Fetcher;
use shellcache_core::{Error, Snapshot, Storage};

use crate::lifecycle::{ActivationReport, LifecycleManager};
use crate::policy::{CachePolicy, InterceptedRequest, PolicySettings, ShellRefresher};
use crate::tasks::BackgroundTasks;

#[derive(Debug)]
pub struct Controller {
    lifecycle: LifecycleManager,
    policy: CachePolicy,
    active: AtomicBool,
}

impl Controller {
    pub fn new(lifecycle: LifecycleManager, policy: CachePolicy) -> Self {
        Self { lifecycle, policy, active: AtomicBool::new(false) }
    }

    /// Wire a lifecycle manager and policy that share one shell refresher.
    pub fn from_parts(storage: Arc<dyn Storage>, fetcher: Arc<dyn Fetcher>, settings: PolicySettings) -> Self {
        let shell = ShellRefresher::new(Arc::clone(&fetcher), settings.manifest.clone());
        let lifecycle = LifecycleManager::new(Arc::clone(&storage), settings.store_name.clone(), shell.clone());
        let policy = CachePolicy::new(storage, fetcher, shell, Arc::new(settings), BackgroundTasks::new());
        Self::new(lifecycle, policy)
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Activate and start intercepting.
    pub async fn activate(&self) -> Result<ActivationReport, Error> {
        let report = self.lifecycle.activate().await?;
        if !self.active.swap(true, Ordering::AcqRel) {
            tracing::info!(store = self.lifecycle.current_store_name(), "now intercepting requests");
        }
        Ok(report)
    }

    /// `None` means the request is not intercepted: either activation has not
    /// finished or no rule claims it.
    pub async fn intercept(&self, request: &InterceptedRequest) -> Option<Result<Snapshot, Error>> {
        if !self.is_active() {
            return None;
        }
        self.policy.handle(request).await
    }

    /// Wait for background refreshes to finish.
    pub async fn shutdown(&self) {
        self.policy.tasks().shutdown().await;
    }
}

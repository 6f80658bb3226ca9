//! Fire-and-forget background work.
//!
//! Responses never wait on anything spawned here. Failures are drained into
//! the log instead of being dropped, and the tracker lets shutdown wait for
//! in-flight refreshes before the process exits.

use std::future::Future;

use shellcache_core::Error;
use tokio_util::task::TaskTracker;

#[derive(Debug, Clone, Default)]
pub struct BackgroundTasks {
    tracker: TaskTracker,
}

impl BackgroundTasks {
    pub fn new() -> Self {
        Self { tracker: TaskTracker::new() }
    }

    /// Spawn `work` onto the runtime without awaiting it.
    pub fn spawn<F>(&self, label: &'static str, work: F)
    where
        F: Future<Output = Result<(), Error>> + Send + 'static,
    {
        self.tracker.spawn(async move {
            match work.await {
                Ok(()) => tracing::debug!(task = label, "background task finished"),
                Err(e) => tracing::warn!(task = label, code = e.code(), error = %e, "background task failed"),
            }
        });
    }

    /// Number of tasks still running.
    pub fn len(&self) -> usize {
        self.tracker.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracker.is_empty()
    }

    /// Wait for every task spawned so far, then keep accepting new ones.
    #[cfg(test)]
    pub async fn drain(&self) {
        self.tracker.close();
        self.tracker.wait().await;
        self.tracker.reopen();
    }

    /// Wait for every task spawned so far. Called once at teardown.
    pub async fn shutdown(&self) {
        self.tracker.close();
        if !self.is_empty() {
            tracing::info!(pending = self.len(), "waiting for background tasks");
        }
        self.tracker.wait().await;
    }
}

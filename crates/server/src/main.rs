//! shellcache entry point.
//!
//! Loads configuration, activates the cache controller against the current
//! store, and serves HTTP until Ctrl-C. Logs go to stderr as JSON.

use std::sync::Arc;

use anyhow::{Context, Result};
use shellcache_client::{FetchConfig, Fetcher, HttpFetcher};
use shellcache_core::{AppConfig, CacheDb};
use tracing_subscriber::EnvFilter;

mod controller;
mod error;
mod handler;
mod lifecycle;
mod policy;
mod tasks;
#[cfg(test)]
mod testing;

use controller::Controller;
use handler::AppState;
use policy::PolicySettings;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load().context("loading configuration")?;
    let settings = PolicySettings::from_config(&config)?;
    let db = CacheDb::open(&config.db_path).await?;

    let mut fetch_config = FetchConfig::new(settings.origin.clone());
    fetch_config.user_agent = config.user_agent.clone();
    fetch_config.max_bytes = config.max_bytes;
    fetch_config.timeout = config.timeout();
    let fetcher: Arc<dyn Fetcher> = Arc::new(HttpFetcher::new(fetch_config)?);

    let origin = settings.origin.clone();
    let controller = Arc::new(Controller::from_parts(Arc::new(db), Arc::clone(&fetcher), settings));
    let report = controller.activate().await?;
    if !report.shell_refreshed {
        tracing::warn!("shell bundle not refreshed during activation, serving from network until it is");
    }

    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .with_context(|| format!("binding {}", config.listen_addr))?;
    tracing::info!(addr = %config.listen_addr, origin = %origin, "listening");

    let app = handler::router(AppState::new(Arc::clone(&controller), fetcher, origin));
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    controller.shutdown().await;
    Ok(())
}

async fn shutdown_signal() {
    until_signal(tokio::signal::ctrl_c()).await;
}

/// Resolves once `signal` fires. If the handler could not be installed the
/// server keeps running rather than stopping immediately.
async fn until_signal(signal: impl Future<Output = std::io::Result<()>>) {
    match signal.await {
        Ok(()) => tracing::info!("shutting down"),
        Err(e) => {
            tracing::error!(error = %e, "failed to install Ctrl-C handler, graceful shutdown disabled");
            std::future::pending::<()>().await;
        }
    }
}

//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use std::net::SocketAddr;

use crate::config::AppConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },

    #[error("missing required configuration: {field} ({hint})")]
    Missing { field: String, hint: String },
}

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid { field: field.into(), reason: reason.into() }
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `origin` is not a bare http(s) origin
    /// - `listen_addr` is not a socket address
    /// - any shell path does not start with `/`, or an asset duplicates the root path
    /// - `max_bytes` is 0 or exceeds 512MB
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    ///
    /// Returns `ConfigError::Missing` if `store_name`, `versioned_asset_marker`,
    /// or `user_agent` is empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let origin = url::Url::parse(&self.origin).map_err(|e| invalid("origin", e.to_string()))?;
        if !matches!(origin.scheme(), "http" | "https") {
            return Err(invalid("origin", "scheme must be http or https"));
        }
        if origin.host_str().is_none() {
            return Err(invalid("origin", "must include a host"));
        }
        if origin.path() != "/" || origin.query().is_some() {
            return Err(invalid("origin", "must not include a path or query"));
        }

        if self.listen_addr.parse::<SocketAddr>().is_err() {
            return Err(invalid("listen_addr", "must be a socket address such as 127.0.0.1:8080"));
        }

        if self.store_name.trim().is_empty() {
            return Err(ConfigError::Missing {
                field: "store_name".into(),
                hint: "Set SHELLCACHE_STORE_NAME environment variable".into(),
            });
        }

        if !self.root_path.starts_with('/') {
            return Err(invalid("root_path", "must start with '/'"));
        }
        if self.root_aliases.iter().any(|p| !p.starts_with('/')) {
            return Err(invalid("root_aliases", "every alias must start with '/'"));
        }
        if self.shell_assets.iter().any(|p| !p.starts_with('/')) {
            return Err(invalid("shell_assets", "every asset path must start with '/'"));
        }
        if self.shell_assets.iter().any(|p| *p == self.root_path) {
            return Err(invalid("shell_assets", "must not repeat root_path"));
        }

        if self.versioned_asset_marker.is_empty() {
            return Err(ConfigError::Missing {
                field: "versioned_asset_marker".into(),
                hint: "Set SHELLCACHE_VERSIONED_ASSET_MARKER environment variable".into(),
            });
        }

        if self.user_agent.is_empty() {
            return Err(ConfigError::Missing {
                field: "user_agent".into(),
                hint: "Set SHELLCACHE_USER_AGENT environment variable".into(),
            });
        }

        if self.max_bytes == 0 {
            return Err(invalid("max_bytes", "must be greater than 0"));
        }
        if self.max_bytes > 512 * 1024 * 1024 {
            return Err(invalid("max_bytes", "must not exceed 512MB"));
        }

        if self.timeout_ms < 100 {
            return Err(invalid("timeout_ms", "must be at least 100ms"));
        }
        if self.timeout_ms > 300_000 {
            return Err(invalid("timeout_ms", "must not exceed 5 minutes (300000ms)"));
        }

        if self.root_aliases.iter().any(|alias| self.shell_assets.contains(alias)) {
            tracing::warn!(
                aliases = ?self.root_aliases,
                assets = ?self.shell_assets,
                "A root alias is also listed as a shell asset; the root document rule takes precedence"
            );
        }

        Ok(())
    }
}

//! Deployment configuration.
//!
//! Values come from `SHELLCACHE_*` environment variables, then an optional
//! TOML file named by `SHELLCACHE_CONFIG_FILE`, then the defaults below.

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Everything that identifies one deployment of the cached app.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Origin the application shell is served from.
    ///
    /// Requests to this origin are eligible for the root document and
    /// shell asset policies. Set via SHELLCACHE_ORIGIN.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Socket address the HTTP front listens on.
    ///
    /// Set via SHELLCACHE_LISTEN_ADDR.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Path to SQLite store database.
    ///
    /// Set via SHELLCACHE_DB_PATH.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Name of the current store. Every other store is purged on activation.
    ///
    /// Set via SHELLCACHE_STORE_NAME.
    #[serde(default = "default_store_name")]
    pub store_name: String,

    /// Path of the application entry document.
    #[serde(default = "default_root_path")]
    pub root_path: String,

    /// Additional paths that serve the entry document.
    #[serde(default = "default_root_aliases")]
    pub root_aliases: Vec<String>,

    /// Critical shell assets refreshed together with the root document.
    #[serde(default = "default_shell_assets")]
    pub shell_assets: Vec<String>,

    /// Path substring that marks a large, immutable, versioned asset.
    #[serde(default = "default_versioned_asset_marker")]
    pub versioned_asset_marker: String,

    /// User-Agent string for HTTP requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Maximum bytes to fetch per request. Must cover the largest versioned
    /// asset, which is fetched whole on a miss.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// HTTP request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_origin() -> String {
    "http://127.0.0.1:8080".into()
}

fn default_listen_addr() -> String {
    "127.0.0.1:8080".into()
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./shellcache.sqlite")
}

fn default_store_name() -> String {
    "app-cache".into()
}

fn default_root_path() -> String {
    "/".into()
}

fn default_root_aliases() -> Vec<String> {
    vec!["/index.html".into()]
}

fn default_shell_assets() -> Vec<String> {
    vec!["/app.js".into(), "/style.css".into()]
}

fn default_versioned_asset_marker() -> String {
    "model.onnx.gz.".into()
}

fn default_user_agent() -> String {
    "shellcache/0.1".into()
}

fn default_max_bytes() -> usize {
    256 * 1024 * 1024
}

fn default_timeout_ms() -> u64 {
    30_000
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            origin: default_origin(),
            listen_addr: default_listen_addr(),
            db_path: default_db_path(),
            store_name: default_store_name(),
            root_path: default_root_path(),
            root_aliases: default_root_aliases(),
            shell_assets: default_shell_assets(),
            versioned_asset_marker: default_versioned_asset_marker(),
            user_agent: default_user_agent(),
            max_bytes: default_max_bytes(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl AppConfig {
    /// Per-request network timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// The shell manifest paths, root document first.
    pub fn shell_manifest(&self) -> Vec<String> {
        std::iter::once(self.root_path.clone())
            .chain(self.shell_assets.iter().cloned())
            .collect()
    }

    /// Load and validate. Environment wins over the file, the file over defaults.
    ///
    /// List fields take figment's array syntax in the environment, e.g.
    /// `SHELLCACHE_SHELL_ASSETS='["/app.js","/style.css"]'`.
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("SHELLCACHE_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("SHELLCACHE_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }
}

//! HTTP fetch pipeline.
//!
//! ### Fetch contract
//! - Every HTTP status yields a [`Snapshot`]; only transport failures are errors.
//! - `bypass_cache` asks intermediaries not to answer from their own caches.
//! - Max redirects: 5
//! - Max body bytes: 256MB (configurable, sized for versioned model weights)
//!
//! ### Opaque responses
//! A cross-origin response is tagged [`ResponseKind::Opaque`] unless it
//! carries an `Access-Control-Allow-Origin` of `*` or the application origin.

pub mod url;

use async_trait::async_trait;
use reqwest::{Client, header};
use std::fmt::Debug;
use std::time::{Duration, Instant};

pub use self::url::{UrlError, resolve, same_origin};

use ::url::Url;
use shellcache_core::{Error, ResponseKind, Snapshot};

/// Per-call fetch options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchOptions {
    /// Skip every cache between us and the origin server.
    pub bypass_cache: bool,
}

impl FetchOptions {
    pub fn bypass_cache() -> Self {
        Self { bypass_cache: true }
    }
}

/// The network fetch primitive.
#[async_trait]
pub trait Fetcher: Send + Sync + Debug + 'static {
    async fn fetch(&self, url: &Url, options: FetchOptions) -> Result<Snapshot, Error>;
}

/// Configuration for the fetch client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Application origin, used to decide which responses are opaque.
    pub origin: Url,

    /// User agent string (default: "shellcache/0.1")
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 256MB)
    pub max_bytes: usize,

    /// Request timeout (default: 30s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,
}

impl FetchConfig {
    pub fn new(origin: Url) -> Self {
        Self {
            origin,
            user_agent: "shellcache/0.1".to_string(),
            max_bytes: 256 * 1024 * 1024,
            timeout: Duration::from_millis(30_000),
            max_redirects: 5,
        }
    }
}

/// reqwest-backed [`Fetcher`].
#[derive(Debug)]
pub struct HttpFetcher {
    http: Client,
    config: FetchConfig,
}

impl HttpFetcher {
    /// Create a new fetch client with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::HttpError(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { http, config })
    }

    fn classify_kind(&self, url: &Url, headers: &header::HeaderMap) -> ResponseKind {
        if same_origin(url, &self.config.origin) {
            return ResponseKind::Basic;
        }

        let app_origin = self.config.origin.origin().ascii_serialization();
        let permitted = headers
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .is_some_and(|allowed| allowed == "*" || allowed == app_origin);

        if permitted { ResponseKind::Basic } else { ResponseKind::Opaque }
    }

    fn too_large(&self, len: usize) -> Error {
        Error::FetchTooLarge(format!("{} bytes exceeds {}", len, self.config.max_bytes))
    }
}

fn transport_error(url: &Url, e: &reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::FetchTimeout(format!("{url}: {e}"))
    } else {
        Error::HttpError(format!("network error: {url}: {e}"))
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &Url, options: FetchOptions) -> Result<Snapshot, Error> {
        let start = Instant::now();

        let mut request = self.http.get(url.as_str());
        if options.bypass_cache {
            request = request
                .header(header::CACHE_CONTROL, "no-store")
                .header(header::PRAGMA, "no-cache");
        }

        let response = request.send().await.map_err(|e| transport_error(url, &e))?;

        let status = response.status();

        if let Some(len) = response.content_length()
            && len as usize > self.config.max_bytes
        {
            return Err(self.too_large(len as usize));
        }

        let kind = self.classify_kind(url, response.headers());
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| (name.as_str().to_string(), String::from_utf8_lossy(value.as_bytes()).into_owned()))
            .collect();

        let bytes = response.bytes().await.map_err(|e| transport_error(url, &e))?;

        if bytes.len() > self.config.max_bytes {
            return Err(self.too_large(bytes.len()));
        }

        tracing::debug!(
            url = %url,
            status = status.as_u16(),
            kind = %kind,
            bytes = bytes.len(),
            bypass_cache = options.bypass_cache,
            fetch_ms = start.elapsed().as_millis() as u64,
            "fetched"
        );

        Ok(Snapshot {
            url: url.to_string(),
            status: status.as_u16(),
            kind,
            headers,
            body: bytes,
            fetched_at: chrono::Utc::now().to_rfc3339(),
        })
    }
}

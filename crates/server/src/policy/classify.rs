//! Request classification.
//!
//! Rule order matters: the root document and shell asset rules are checked
//! before the versioned asset substring, so an entry document whose path
//! happens to contain the marker still gets the root document policy.

use axum::http::Method;
use shellcache_client::same_origin;
use url::Url;

/// A request handed to the policy engine.
#[derive(Debug, Clone)]
pub struct InterceptedRequest {
    pub method: Method,
    pub url: Url,
}

impl InterceptedRequest {
    #[cfg(test)]
    pub fn get(url: Url) -> Self {
        Self { method: Method::GET, url }
    }
}

/// Which handler serves a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    RootDocument,
    /// Shell asset other than the root document.
    ShellAsset,
    Revalidate { skip_revalidate_if_cached: bool },
}

#[derive(Debug, Clone)]
pub struct ClassifyRules {
    pub origin: Url,
    /// Root path followed by its aliases.
    pub root_paths: Vec<String>,
    pub shell_asset_paths: Vec<String>,
    /// Substring marking a large immutable asset. Matched anywhere in the path.
    pub versioned_asset_marker: String,
}

/// Pick a handler, or `None` when the request is left to the default path.
pub fn classify(request: &InterceptedRequest, rules: &ClassifyRules) -> Option<Route> {
    if request.method != Method::GET {
        return None;
    }
    if !matches!(request.url.scheme(), "http" | "https") {
        return None;
    }

    let path = request.url.path();
    let local = same_origin(&request.url, &rules.origin);

    if local && rules.root_paths.iter().any(|p| p == path) {
        return Some(Route::RootDocument);
    }

    if local && rules.shell_asset_paths.iter().any(|p| p == path) {
        return Some(Route::ShellAsset);
    }

    Some(Route::Revalidate { skip_revalidate_if_cached: path.contains(&rules.versioned_asset_marker) })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules() -> ClassifyRules {
        ClassifyRules {
            origin: Url::parse("http://app.test").unwrap(),
            root_paths: vec!["/".into(), "/index.html".into()],
            shell_asset_paths: vec!["/app.js".into(), "/style.css".into()],
            versioned_asset_marker: "model.onnx.gz.".into(),
        }
    }

    fn route(url: &str) -> Option<Route> {
        classify(&InterceptedRequest::get(Url::parse(url).unwrap()), &rules())
    }

    #[test]
    fn test_non_get_is_unhandled() {
        let request = InterceptedRequest { method: Method::POST, url: Url::parse("http://app.test/").unwrap() };
        assert_eq!(classify(&request, &rules()), None);

        let head = InterceptedRequest { method: Method::HEAD, url: Url::parse("http://app.test/app.js").unwrap() };
        assert_eq!(classify(&head, &rules()), None);
    }

    #[test]
    fn test_unsupported_scheme_is_unhandled() {
        assert_eq!(route("chrome-extension://abc/index.html"), None);
        assert_eq!(route("ftp://app.test/"), None);
    }

    #[test]
    fn test_root_and_alias() {
        assert_eq!(route("http://app.test/"), Some(Route::RootDocument));
        assert_eq!(route("http://app.test/index.html"), Some(Route::RootDocument));
        assert_eq!(route("http://app.test/?utm=1"), Some(Route::RootDocument));
    }

    #[test]
    fn test_shell_assets() {
        assert_eq!(route("http://app.test/app.js"), Some(Route::ShellAsset));
        assert_eq!(route("http://app.test/style.css"), Some(Route::ShellAsset));
    }

    #[test]
    fn test_cross_origin_shell_paths_are_generic() {
        let generic = Some(Route::Revalidate { skip_revalidate_if_cached: false });
        assert_eq!(route("https://cdn.test/"), generic);
        assert_eq!(route("https://cdn.test/app.js"), generic);
        assert_eq!(route("https://app.test/app.js"), generic);
    }

    #[test]
    fn test_versioned_asset_substring_anywhere() {
        let skip = Some(Route::Revalidate { skip_revalidate_if_cached: true });
        assert_eq!(route("http://app.test/models/model.onnx.gz.v12"), skip);
        assert_eq!(route("http://app.test/model.onnx.gz.part1/meta"), skip);
        assert_eq!(route("https://cdn.test/x/model.onnx.gz.abc123"), skip);
    }

    #[test]
    fn test_near_miss_marker_revalidates() {
        let generic = Some(Route::Revalidate { skip_revalidate_if_cached: false });
        assert_eq!(route("http://app.test/models/model.onnx.gz"), generic);
        assert_eq!(route("http://app.test/models/model.onnx?x=model.onnx.gz.1"), generic);
    }

    #[test]
    fn test_root_precedes_versioned_marker() {
        let mut greedy = rules();
        greedy.versioned_asset_marker = "/".into();

        let classify_with = |url: &str| classify(&InterceptedRequest::get(Url::parse(url).unwrap()), &greedy);

        assert_eq!(classify_with("http://app.test/"), Some(Route::RootDocument));
        assert_eq!(classify_with("http://app.test/index.html"), Some(Route::RootDocument));
        assert_eq!(classify_with("http://app.test/app.js"), Some(Route::ShellAsset));
        assert_eq!(
            classify_with("http://app.test/data.json"),
            Some(Route::Revalidate { skip_revalidate_if_cached: true })
        );
    }
}

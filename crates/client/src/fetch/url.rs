//! Request target resolution.

use url::{ParseError, Url};

#[derive(Debug, Clone, thiserror::Error)]
pub enum UrlError {
    #[error("empty request target")]
    Empty,

    #[error("invalid request target: {0}")]
    InvalidUrl(String),
}

/// Resolve a request target into an absolute URL.
///
/// Absolute-form targets (`http://host/path`) are taken as-is; origin-form
/// targets (`/path?query`) are joined onto `origin`. The scheme is not
/// checked here, so callers can still see and reject non-network schemes.
pub fn resolve(origin: &Url, target: &str) -> Result<Url, UrlError> {
    let target = target.trim();
    if target.is_empty() {
        return Err(UrlError::Empty);
    }

    let mut url = match Url::parse(target) {
        Ok(url) => url,
        Err(ParseError::RelativeUrlWithoutBase) => {
            origin.join(target).map_err(|e| UrlError::InvalidUrl(e.to_string()))?
        }
        Err(e) => return Err(UrlError::InvalidUrl(e.to_string())),
    };

    url.set_fragment(None);
    Ok(url)
}

/// Whether two URLs share scheme, host, and port.
pub fn same_origin(a: &Url, b: &Url) -> bool {
    a.origin() == b.origin()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn origin() -> Url {
        Url::parse("http://127.0.0.1:8080").unwrap()
    }

    #[test]
    fn test_resolve_origin_form() {
        let url = resolve(&origin(), "/assets/model.onnx.gz.v3?x=1#frag").unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:8080/assets/model.onnx.gz.v3?x=1");
    }

    #[test]
    fn test_resolve_absolute_form() {
        let url = resolve(&origin(), "https://cdn.example.net/lib.js").unwrap();
        assert_eq!(url.as_str(), "https://cdn.example.net/lib.js");
    }

    #[test]
    fn test_resolve_keeps_foreign_scheme() {
        let url = resolve(&origin(), "chrome-extension://abc/page.html").unwrap();
        assert_eq!(url.scheme(), "chrome-extension");
    }

    #[test]
    fn test_resolve_index_alias_and_query() {
        let url = resolve(&origin(), "/index.html?utm=mail").unwrap();
        assert_eq!(url.path(), "/index.html");
        assert_eq!(url.query(), Some("utm=mail"));
    }

    #[test]
    fn test_resolve_empty() {
        assert!(matches!(resolve(&origin(), ""), Err(UrlError::Empty)));
    }

    #[test]
    fn test_same_origin() {
        let app = origin();
        assert!(same_origin(&app, &Url::parse("http://127.0.0.1:8080/app.js").unwrap()));
        assert!(!same_origin(&app, &Url::parse("https://127.0.0.1:8080/").unwrap()));
        assert!(!same_origin(&app, &Url::parse("http://127.0.0.1:9090/").unwrap()));
        assert!(!same_origin(&app, &Url::parse("http://localhost:8080/").unwrap()));
    }
}

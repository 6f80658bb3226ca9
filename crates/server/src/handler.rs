//! HTTP request source.
//!
//! Every request lands on one fallback handler. Absolute-form targets (the
//! process used as a forward proxy) keep their own origin; origin-form
//! targets are resolved against the application origin. Intercepted requests
//! are answered by the controller; the rest go straight to the network.
//!
//! Only reads are forwarded. Requests with any other method are answered
//! with `405 Method Not Allowed` and never reach the network, so an app that
//! writes through this proxy needs those calls routed to its backend directly.

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderName, HeaderValue, Method, StatusCode, Uri};
use axum::response::Response;
use shellcache_client::{FetchOptions, Fetcher, resolve};
use shellcache_core::{Error, Snapshot};
use url::Url;

use crate::controller::Controller;
use crate::error::ProxyError;
use crate::policy::InterceptedRequest;

/// Headers describing the upstream connection rather than the response.
const HOP_BY_HOP: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-connection",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
    "content-length",
];

#[derive(Debug, Clone)]
pub struct AppState {
    controller: Arc<Controller>,
    fetcher: Arc<dyn Fetcher>,
    origin: Url,
}

impl AppState {
    pub fn new(controller: Arc<Controller>, fetcher: Arc<dyn Fetcher>, origin: Url) -> Self {
        Self { controller, fetcher, origin }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new().fallback(proxy).with_state(state)
}

async fn proxy(State(state): State<AppState>, method: Method, uri: Uri) -> Result<Response, ProxyError> {
    let url = resolve(&state.origin, &uri.to_string()).map_err(|e| Error::InvalidUrl(e.to_string()))?;
    let request = InterceptedRequest { method, url };

    let snapshot = match state.controller.intercept(&request).await {
        Some(result) => result?,
        None => passthrough(&state, &request).await?,
    };

    Ok(into_response(snapshot))
}

/// Default path for requests no rule claims.
async fn passthrough(state: &AppState, request: &InterceptedRequest) -> Result<Snapshot, ProxyError> {
    if request.method != Method::GET {
        return Err(ProxyError::MethodNotAllowed(request.method.clone()));
    }
    if !matches!(request.url.scheme(), "http" | "https") {
        return Err(Error::InvalidUrl(format!("unsupported scheme: {}", request.url.scheme())).into());
    }
    tracing::debug!(url = %request.url, "not intercepted, fetching directly");
    Ok(state.fetcher.fetch(&request.url, FetchOptions::default()).await?)
}

fn into_response(snapshot: Snapshot) -> Response {
    let status = StatusCode::from_u16(snapshot.status).unwrap_or(StatusCode::BAD_GATEWAY);

    let mut response = Response::new(Body::from(snapshot.body));
    *response.status_mut() = status;

    let headers = response.headers_mut();
    for (name, value) in &snapshot.headers {
        if HOP_BY_HOP.iter().any(|h| name.eq_ignore_ascii_case(h)) {
            continue;
        }
        match (HeaderName::from_bytes(name.as_bytes()), HeaderValue::from_str(value)) {
            (Ok(name), Ok(value)) => {
                headers.append(name, value);
            }
            _ => tracing::debug!(header = %name, "dropping unrepresentable header"),
        }
    }

    response
}

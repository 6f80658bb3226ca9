//! Structured errors for the HTTP front.

use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use shellcache_core::Error;

/// Errors surfaced to the HTTP client.
#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    /// Network, store, or request error from the engine.
    #[error(transparent)]
    Engine(#[from] Error),

    /// Only reads are forwarded.
    #[error("METHOD_NOT_ALLOWED: {0}")]
    MethodNotAllowed(Method),
}

impl ProxyError {
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::Engine(e) => match e {
                Error::FetchTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
                Error::HttpError(_) | Error::FetchTooLarge(_) => StatusCode::BAD_GATEWAY,
                Error::InvalidUrl(_) | Error::InvalidInput(_) => StatusCode::BAD_REQUEST,
                Error::Database(_) | Error::MigrationFailed(_) | Error::CorruptEntry(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            ProxyError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::warn!(status = status.as_u16(), error = %self, "request failed");
        }
        (status, self.to_string()).into_response()
    }
}

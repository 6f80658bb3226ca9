//! Response snapshots.
//!
//! A snapshot is an immutable capture of a network response taken at fetch
//! time. The body is reference counted, so handing one copy to the store and
//! another to the caller never consumes or re-reads anything.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::hash::body_digest;
use crate::Error;

/// How much of a response the fetcher was allowed to inspect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseKind {
    /// Same-origin or CORS-permitted response.
    Basic,
    /// Cross-origin response without permissive headers. Its status is not
    /// trusted by policy decisions.
    Opaque,
}

impl ResponseKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseKind::Basic => "basic",
            ResponseKind::Opaque => "opaque",
        }
    }
}

impl fmt::Display for ResponseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResponseKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "basic" => Ok(ResponseKind::Basic),
            "opaque" => Ok(ResponseKind::Opaque),
            other => Err(Error::CorruptEntry(format!("unknown response kind: {other}"))),
        }
    }
}

/// A captured response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// The URL the response was fetched for.
    pub url: String,
    pub status: u16,
    pub kind: ResponseKind,
    /// Header name/value pairs in received order. Names may repeat.
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
    /// RFC 3339 timestamp of the fetch.
    pub fetched_at: String,
}

impl Snapshot {
    /// A basic (non-opaque) snapshot stamped with the current time.
    pub fn new(url: impl Into<String>, status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            url: url.into(),
            status,
            kind: ResponseKind::Basic,
            headers: Vec::new(),
            body: body.into(),
            fetched_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn with_kind(mut self, kind: ResponseKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Whether the status is in the 2xx range.
    pub fn is_ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_opaque(&self) -> bool {
        self.kind == ResponseKind::Opaque
    }

    /// Successful responses are cached, and so are opaque ones on faith.
    pub fn is_cacheable(&self) -> bool {
        self.is_ok() || self.is_opaque()
    }

    /// First header value with the given name, case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn body_digest(&self) -> String {
        body_digest(&self.body)
    }
}

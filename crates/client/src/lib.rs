//! Network fetch primitive for shellcache.
//!
//! This crate provides the `Fetcher` seam the policy engine calls through,
//! its reqwest-backed implementation, and URL resolution helpers.

pub mod fetch;

pub use fetch::{FetchConfig, FetchOptions, Fetcher, HttpFetcher};
pub use fetch::{UrlError, resolve, same_origin};

//! Core types and shared functionality for shellcache.
//!
//! This crate provides:
//! - Named response stores with a SQLite backend
//! - Request identity and response snapshot types
//! - Unified error types
//! - Configuration structures

pub mod config;
pub mod error;
pub mod store;

pub use config::{AppConfig, ConfigError};
pub use error::Error;
pub use store::{CacheDb, RequestKey, ResponseKind, Snapshot, Storage, Store};

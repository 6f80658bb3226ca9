//! Named response stores with a SQLite backend.
//!
//! A store is a durable mapping from [`RequestKey`] to [`Snapshot`]. Stores are
//! identified by name, created lazily on first open, and only ever destroyed
//! by an explicit [`Storage::delete`].
//!
//! - Async access via tokio-rusqlite (one background connection thread)
//! - Automatic schema migrations
//! - WAL mode for concurrent access
//! - Entries cascade away with their store

pub mod connection;
pub mod entries;
pub mod hash;
pub mod key;
pub mod migrations;
pub mod snapshots;

use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;

pub use crate::Error;

pub use connection::CacheDb;
pub use entries::SqliteStore;
pub use key::RequestKey;
pub use snapshots::{ResponseKind, Snapshot};

/// The set of named stores.
#[async_trait]
pub trait Storage: Send + Sync + Debug + 'static {
    /// Open the named store, creating it if it does not exist.
    async fn open(&self, name: &str) -> Result<Arc<dyn Store>, Error>;

    /// Delete the named store and every entry in it.
    ///
    /// Returns `true` if a store with that name existed.
    async fn delete(&self, name: &str) -> Result<bool, Error>;

    /// Names of all existing stores, sorted.
    async fn list_names(&self) -> Result<Vec<String>, Error>;
}

/// A single named store.
///
/// A `put` always replaces the full prior entry for the key; concurrent
/// puts to the same key resolve as last writer wins.
#[async_trait]
pub trait Store: Send + Sync + Debug + 'static {
    fn name(&self) -> &str;

    async fn get(&self, key: &RequestKey) -> Result<Option<Snapshot>, Error>;

    async fn put(&self, key: &RequestKey, snapshot: &Snapshot) -> Result<(), Error>;

    /// Keys in the order they were last written.
    async fn keys(&self) -> Result<Vec<RequestKey>, Error>;

    /// Returns `true` if an entry was removed.
    async fn delete(&self, key: &RequestKey) -> Result<bool, Error>;
}

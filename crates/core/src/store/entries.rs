//! Store and entry CRUD operations.
//!
//! [`CacheDb`] implements [`Storage`] over the `stores` table, and
//! [`SqliteStore`] implements [`Store`] over the `entries` rows of one store.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

use super::connection::CacheDb;
use super::{RequestKey, Snapshot, Storage, Store};
use crate::Error;

#[async_trait]
impl Storage for CacheDb {
    async fn open(&self, name: &str) -> Result<Arc<dyn Store>, Error> {
        if name.trim().is_empty() {
            return Err(Error::InvalidInput("store name must not be empty".to_string()));
        }

        let store_name = name.to_string();
        let now = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT OR IGNORE INTO stores (name, created_at) VALUES (?1, ?2)",
                    params![store_name, now],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)?;

        Ok(Arc::new(SqliteStore { db: self.clone(), name: name.to_string() }))
    }

    async fn delete(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let count = conn.execute("DELETE FROM stores WHERE name = ?1", params![name])?;
                Ok(count > 0)
            })
            .await
            .map_err(Error::from)
    }

    async fn list_names(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM stores ORDER BY name")?;
                let names = stmt
                    .query_map([], |row| row.get::<_, String>(0))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }
}

/// Handle to one named store inside a [`CacheDb`].
#[derive(Clone, Debug)]
pub struct SqliteStore {
    db: CacheDb,
    name: String,
}

/// Row shape shared by `get` and its decoder.
struct EntryRow {
    url: String,
    kind: String,
    status_code: i64,
    headers_json: String,
    body: Vec<u8>,
    fetched_at: String,
}

impl EntryRow {
    fn into_snapshot(self) -> Result<Snapshot, Error> {
        let status = u16::try_from(self.status_code)
            .map_err(|_| Error::CorruptEntry(format!("status out of range: {}", self.status_code)))?;
        Ok(Snapshot {
            url: self.url,
            status,
            kind: self.kind.parse()?,
            headers: serde_json::from_str(&self.headers_json)?,
            body: Bytes::from(self.body),
            fetched_at: self.fetched_at,
        })
    }
}

#[async_trait]
impl Store for SqliteStore {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get(&self, key: &RequestKey) -> Result<Option<Snapshot>, Error> {
        let store_name = self.name.clone();
        let url = key.as_str().to_string();
        let row = self
            .db
            .conn
            .call(move |conn| -> Result<Option<EntryRow>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT url, kind, status_code, headers_json, body, fetched_at
                    FROM entries WHERE store_name = ?1 AND url = ?2",
                )?;

                let result = stmt.query_row(params![store_name, url], |row| {
                    Ok(EntryRow {
                        url: row.get(0)?,
                        kind: row.get(1)?,
                        status_code: row.get(2)?,
                        headers_json: row.get(3)?,
                        body: row.get(4)?,
                        fetched_at: row.get(5)?,
                    })
                });

                match result {
                    Ok(r) => Ok(Some(r)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)?;

        row.map(EntryRow::into_snapshot).transpose()
    }

    async fn put(&self, key: &RequestKey, snapshot: &Snapshot) -> Result<(), Error> {
        let store_name = self.name.clone();
        let url = key.as_str().to_string();
        let headers_json = serde_json::to_string(&snapshot.headers)?;
        let digest = snapshot.body_digest();
        let snapshot = snapshot.clone();
        let stored_at = chrono::Utc::now().to_rfc3339();

        self.db
            .conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO entries (
                    store_name, url, kind, status_code, headers_json,
                    body, body_sha256, fetched_at, stored_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                ON CONFLICT(store_name, url) DO UPDATE SET
                    kind = excluded.kind,
                    status_code = excluded.status_code,
                    headers_json = excluded.headers_json,
                    body = excluded.body,
                    body_sha256 = excluded.body_sha256,
                    fetched_at = excluded.fetched_at,
                    stored_at = excluded.stored_at",
                    params![
                        &store_name,
                        &url,
                        snapshot.kind.as_str(),
                        i64::from(snapshot.status),
                        &headers_json,
                        &snapshot.body[..],
                        &digest,
                        &snapshot.fetched_at,
                        &stored_at,
                    ],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    async fn keys(&self) -> Result<Vec<RequestKey>, Error> {
        let store_name = self.name.clone();
        self.db
            .conn
            .call(move |conn| -> Result<Vec<RequestKey>, Error> {
                let mut stmt =
                    conn.prepare("SELECT url FROM entries WHERE store_name = ?1 ORDER BY stored_at ASC, url ASC")?;
                let keys = stmt
                    .query_map(params![store_name], |row| row.get::<_, String>(0))?
                    .map(|r| r.map(RequestKey::from_stored))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(keys)
            })
            .await
            .map_err(Error::from)
    }

    async fn delete(&self, key: &RequestKey) -> Result<bool, Error> {
        let store_name = self.name.clone();
        let url = key.as_str().to_string();
        self.db
            .conn
            .call(move |conn| -> Result<bool, Error> {
                let count = conn.execute(
                    "DELETE FROM entries WHERE store_name = ?1 AND url = ?2",
                    params![store_name, url],
                )?;
                Ok(count > 0)
            })
            .await
            .map_err(Error::from)
    }
}

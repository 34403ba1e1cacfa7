//! Stored entries and per-store CRUD operations.
//!
//! An entry is an immutable snapshot of a response: status, headers, body.
//! Only complete successful responses (status 200) are ever persisted, so a
//! truncated or ranged capture can never be replayed from a store.

use super::connection::CacheStorage;
use crate::{Error, ResourceId};
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite::OptionalExtension;

/// Status code of a complete, successful response.
pub const COMPLETE_STATUS: u16 = 200;

/// Whether a response with this status may be persisted.
pub fn is_cacheable_status(status: u16) -> bool {
    status == COMPLETE_STATUS
}

/// A captured response inside one store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredEntry {
    pub url: String,
    pub status: u16,
    pub content_type: Option<String>,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    pub stored_at: String,
}

impl StoredEntry {
    pub fn new(url: impl Into<String>, status: u16, body: Vec<u8>) -> Self {
        Self {
            url: url.into(),
            status,
            content_type: None,
            headers: Vec::new(),
            body,
            stored_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        let content_type = content_type.into();
        self.headers.push(("content-type".into(), content_type.clone()));
        self.content_type = Some(content_type);
        self
    }

    #[cfg(test)]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// Handle to a single named store.
#[derive(Clone, Debug)]
pub struct Store {
    storage: CacheStorage,
    name: String,
}

impl Store {
    pub(crate) fn new(storage: CacheStorage, name: &str) -> Self {
        Self { storage, name: name.to_string() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Look up the entry for an identifier.
    ///
    /// Returns None if the identifier (or the whole store) is absent.
    pub async fn match_entry(&self, id: &ResourceId) -> Result<Option<StoredEntry>, Error> {
        let store = self.name.clone();
        let url = id.as_str().to_string();
        self.storage
            .conn
            .call(move |conn| -> Result<Option<StoredEntry>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT url, status, content_type, headers_json, body, stored_at
                     FROM entries WHERE store = ?1 AND url = ?2",
                )?;

                let row = stmt
                    .query_row(params![store, url], |row| {
                        Ok((
                            row.get::<_, String>(0)?,
                            row.get::<_, u16>(1)?,
                            row.get::<_, Option<String>>(2)?,
                            row.get::<_, String>(3)?,
                            row.get::<_, Vec<u8>>(4)?,
                            row.get::<_, String>(5)?,
                        ))
                    })
                    .optional()?;

                match row {
                    Some((url, status, content_type, headers_json, body, stored_at)) => {
                        let headers = serde_json::from_str(&headers_json)?;
                        Ok(Some(StoredEntry { url, status, content_type, headers, body, stored_at }))
                    }
                    None => Ok(None),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Presence test without loading the body.
    pub async fn contains(&self, id: &ResourceId) -> Result<bool, Error> {
        let store = self.name.clone();
        let url = id.as_str().to_string();
        self.storage
            .conn
            .call(move |conn| -> Result<bool, Error> {
                let found: bool = conn.query_row(
                    "SELECT EXISTS(SELECT 1 FROM entries WHERE store = ?1 AND url = ?2)",
                    params![store, url],
                    |row| row.get(0),
                )?;
                Ok(found)
            })
            .await
            .map_err(Error::from)
    }

    /// Insert or replace an entry.
    ///
    /// Rejects non-200 entries with `Error::NotCacheable`. Recreates the
    /// store row if the store was deleted after this handle was opened.
    pub async fn put(&self, entry: &StoredEntry) -> Result<(), Error> {
        self.put_all(std::slice::from_ref(entry)).await
    }

    /// Insert or replace several entries in one transaction.
    ///
    /// Either every entry is written or none is.
    pub async fn put_all(&self, entries: &[StoredEntry]) -> Result<(), Error> {
        if let Some(bad) = entries.iter().find(|e| !is_cacheable_status(e.status)) {
            return Err(Error::NotCacheable(bad.status));
        }

        let rows = entries
            .iter()
            .map(|e| Ok((e.clone(), serde_json::to_string(&e.headers)?)))
            .collect::<Result<Vec<_>, Error>>()?;
        let store = self.name.clone();

        self.storage
            .conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                tx.execute(
                    "INSERT OR IGNORE INTO stores (name, created_at) VALUES (?1, ?2)",
                    params![store, chrono::Utc::now().to_rfc3339()],
                )?;
                {
                    let mut stmt = tx.prepare(
                        "INSERT INTO entries (store, url, status, content_type, headers_json, body, body_len, stored_at)
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                         ON CONFLICT(store, url) DO UPDATE SET
                            status = excluded.status,
                            content_type = excluded.content_type,
                            headers_json = excluded.headers_json,
                            body = excluded.body,
                            body_len = excluded.body_len,
                            stored_at = excluded.stored_at",
                    )?;
                    for (entry, headers_json) in &rows {
                        stmt.execute(params![
                            &store,
                            &entry.url,
                            entry.status,
                            &entry.content_type,
                            headers_json,
                            &entry.body,
                            entry.body.len() as i64,
                            &entry.stored_at,
                        ])?;
                    }
                }
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Remove one entry.
    ///
    /// Returns false if there was nothing to remove.
    pub async fn delete(&self, id: &ResourceId) -> Result<bool, Error> {
        let store = self.name.clone();
        let url = id.as_str().to_string();
        self.storage
            .conn
            .call(move |conn| -> Result<bool, Error> {
                let count = conn.execute("DELETE FROM entries WHERE store = ?1 AND url = ?2", params![store, url])?;
                Ok(count > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// Identifiers of every entry, in insertion order.
    pub async fn keys(&self) -> Result<Vec<String>, Error> {
        let store = self.name.clone();
        self.storage
            .conn
            .call(move |conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT url FROM entries WHERE store = ?1 ORDER BY rowid ASC")?;
                let urls = stmt
                    .query_map(params![store], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(urls)
            })
            .await
            .map_err(Error::from)
    }

    /// Number of entries and their total body size.
    pub async fn usage(&self) -> Result<(u64, u64), Error> {
        let store = self.name.clone();
        self.storage
            .conn
            .call(move |conn| -> Result<(u64, u64), Error> {
                let (count, bytes): (i64, i64) = conn.query_row(
                    "SELECT COUNT(*), COALESCE(SUM(body_len), 0) FROM entries WHERE store = ?1",
                    params![store],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )?;
                Ok((count as u64, bytes as u64))
            })
            .await
            .map_err(Error::from)
    }
}

//! Operations over the set of named stores.

use super::connection::CacheStorage;
use super::entry::Store;
use crate::Error;
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite::OptionalExtension;

impl CacheStorage {
    /// Handle to a named store without creating it.
    ///
    /// Reads on a missing store see nothing; the first write creates it.
    pub fn store(&self, name: &str) -> Store {
        Store::new(self.clone(), name)
    }

    /// Open a named store, creating it if it doesn't exist.
    pub async fn open_store(&self, name: &str) -> Result<Store, Error> {
        let owned = name.to_string();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT OR IGNORE INTO stores (name, created_at) VALUES (?1, ?2)",
                    params![owned, chrono::Utc::now().to_rfc3339()],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)?;

        Ok(Store::new(self.clone(), name))
    }

    /// Check whether a store exists.
    pub async fn has(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let exists = conn
                    .query_row("SELECT 1 FROM stores WHERE name = ?1", params![name], |_| Ok(()))
                    .optional()?
                    .is_some();
                Ok(exists)
            })
            .await
            .map_err(Error::from)
    }

    /// List store names in creation order.
    pub async fn keys(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM stores ORDER BY rowid ASC")?;
                let names = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete a store and all of its entries.
    ///
    /// Returns false if the store did not exist.
    pub async fn delete(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let count = conn.execute("DELETE FROM stores WHERE name = ?1", params![name])?;
                Ok(count > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// Replace a store with an empty one in a single transaction.
    ///
    /// Readers never observe the store as missing.
    pub async fn reset(&self, name: &str) -> Result<Store, Error> {
        let owned = name.to_string();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                tx.execute("DELETE FROM stores WHERE name = ?1", params![owned])?;
                tx.execute(
                    "INSERT INTO stores (name, created_at) VALUES (?1, ?2)",
                    params![owned, chrono::Utc::now().to_rfc3339()],
                )?;
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)?;

        Ok(Store::new(self.clone(), name))
    }

    /// Total stored body bytes across every store.
    pub async fn usage(&self) -> Result<u64, Error> {
        self.conn
            .call(|conn| -> Result<u64, Error> {
                let total: i64 = conn.query_row("SELECT COALESCE(SUM(body_len), 0) FROM entries", [], |row| row.get(0))?;
                Ok(total as u64)
            })
            .await
            .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoredEntry;

    #[tokio::test]
    async fn test_open_is_implicit_and_idempotent() {
        let storage = CacheStorage::open_in_memory().await.unwrap();
        assert!(!storage.has("videos-v1").await.unwrap());

        storage.open_store("videos-v1").await.unwrap();
        storage.open_store("videos-v1").await.unwrap();

        assert!(storage.has("videos-v1").await.unwrap());
        assert_eq!(storage.keys().await.unwrap(), vec!["videos-v1".to_string()]);
    }

    #[tokio::test]
    async fn test_store_handle_is_lazy() {
        let storage = CacheStorage::open_in_memory().await.unwrap();
        let store = storage.store("app-shell-v1");
        assert!(store.keys().await.unwrap().is_empty());
        assert!(!storage.has("app-shell-v1").await.unwrap());

        store.put(&StoredEntry::new("http://localhost/", 200, b"<html>".to_vec())).await.unwrap();
        assert!(storage.has("app-shell-v1").await.unwrap());
    }

    #[tokio::test]
    async fn test_keys_in_creation_order() {
        let storage = CacheStorage::open_in_memory().await.unwrap();
        for name in ["v1-app", "v2-app", "media-v1"] {
            storage.open_store(name).await.unwrap();
        }
        assert_eq!(storage.keys().await.unwrap(), vec!["v1-app", "v2-app", "media-v1"]);
    }

    #[tokio::test]
    async fn test_delete_cascades_entries() {
        let storage = CacheStorage::open_in_memory().await.unwrap();
        let store = storage.open_store("old").await.unwrap();
        store
            .put(&StoredEntry::new("http://localhost/a", 200, b"abc".to_vec()))
            .await
            .unwrap();

        assert!(storage.delete("old").await.unwrap());
        assert!(!storage.delete("old").await.unwrap());
        assert_eq!(storage.usage().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_reset_empties_store() {
        let storage = CacheStorage::open_in_memory().await.unwrap();
        let store = storage.open_store("videos-v1").await.unwrap();
        store
            .put(&StoredEntry::new("http://localhost/videos/a.mp4", 200, vec![0; 16]))
            .await
            .unwrap();

        let fresh = storage.reset("videos-v1").await.unwrap();
        assert!(storage.has("videos-v1").await.unwrap());
        assert!(fresh.keys().await.unwrap().is_empty());

        // resetting an empty or missing store is fine
        storage.reset("videos-v1").await.unwrap();
        storage.reset("never-opened").await.unwrap();
        assert!(storage.has("never-opened").await.unwrap());
    }

    #[tokio::test]
    async fn test_usage_sums_all_stores() {
        let storage = CacheStorage::open_in_memory().await.unwrap();
        let shell = storage.open_store("app-shell-v1").await.unwrap();
        let media = storage.open_store("videos-v1").await.unwrap();
        shell.put(&StoredEntry::new("http://localhost/", 200, vec![1; 10])).await.unwrap();
        media.put(&StoredEntry::new("http://localhost/v.mp4", 200, vec![2; 32])).await.unwrap();

        assert_eq!(storage.usage().await.unwrap(), 42);
    }
}

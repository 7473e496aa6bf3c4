//! SQLite implementation of the StoreView trait.
//!
//! Local persistence for a single node. Uses rusqlite with bundled SQLite,
//! wrapped in async via tokio::spawn_blocking.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use bytes::Bytes;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

use crate::error::{Result, StoreError};
use crate::migration;
use crate::traits::{
    validate_key, MutationNotifier, MutationOrigin, MutationSubscription, PutResult, StoreView,
};

/// SQLite-based store implementation.
///
/// Thread-safe via internal Mutex. All operations use spawn_blocking
/// to avoid blocking the async runtime.
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
    notifier: MutationNotifier,
}

impl SqliteStore {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if it doesn't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(path)?;
        migration::migrate(&mut conn)?;
        Ok(Self::from_connection(conn))
    }

    /// Open an in-memory SQLite database.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self::from_connection(conn))
    }

    fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
            notifier: MutationNotifier::new(),
        }
    }

    /// Apply several peer writes in one transaction and report them as one
    /// mutation.
    pub async fn apply_remote_batch(&self, writes: Vec<(String, Bytes)>) -> Result<Vec<PutResult>> {
        for (key, _) in &writes {
            validate_key(key)?;
        }
        let conn = self.conn.clone();

        let (results, changed) = tokio::task::spawn_blocking(move || {
            let mut conn = lock(&conn)?;
            let tx = conn.transaction()?;
            let mut results = Vec::with_capacity(writes.len());
            let mut changed = Vec::new();
            for (key, blob) in writes {
                let result = upsert(&tx, &key, &blob)?;
                if result.is_mutation() {
                    changed.push(key);
                }
                results.push(result);
            }
            tx.commit()?;
            Ok::<_, StoreError>((results, changed))
        })
        .await
        .map_err(|e| StoreError::Task(e.to_string()))??;

        debug!(changed = changed.len(), "applied remote batch");
        self.notifier.notify(changed, MutationOrigin::Remote);
        Ok(results)
    }
}

fn lock(conn: &Mutex<Connection>) -> Result<MutexGuard<'_, Connection>> {
    conn.lock().map_err(|e| {
        StoreError::Database(rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_LOCKED),
            Some(format!("mutex poisoned: {}", e)),
        ))
    })
}

fn upsert(conn: &Connection, key: &str, blob: &[u8]) -> Result<PutResult> {
    let existing: Option<Vec<u8>> = conn
        .query_row(
            "SELECT blob FROM entries WHERE key = ?1",
            params![key],
            |row| row.get(0),
        )
        .optional()?;

    let result = match existing {
        Some(bytes) if bytes == blob => return Ok(PutResult::Unchanged),
        Some(_) => PutResult::Overwritten,
        None => PutResult::Inserted,
    };

    conn.execute(
        "INSERT INTO entries (key, blob, updated_at) VALUES (?1, ?2, ?3)
         ON CONFLICT(key) DO UPDATE SET blob = excluded.blob, updated_at = excluded.updated_at",
        params![key, blob, migration::now_millis()],
    )?;

    Ok(result)
}

#[async_trait]
impl StoreView for SqliteStore {
    async fn put(&self, key: &str, blob: Bytes) -> Result<PutResult> {
        validate_key(key)?;
        let conn = self.conn.clone();
        let owned_key = key.to_string();

        let result = tokio::task::spawn_blocking(move || {
            let conn = lock(&conn)?;
            upsert(&conn, &owned_key, &blob)
        })
        .await
        .map_err(|e| StoreError::Task(e.to_string()))??;

        if result.is_mutation() {
            self.notifier
                .notify(vec![key.to_string()], MutationOrigin::Local);
        }
        Ok(result)
    }

    async fn get(&self, key: &str) -> Result<Option<Bytes>> {
        let conn = self.conn.clone();
        let key = key.to_string();

        tokio::task::spawn_blocking(move || {
            let conn = lock(&conn)?;
            let blob: Option<Vec<u8>> = conn
                .query_row(
                    "SELECT blob FROM entries WHERE key = ?1",
                    params![key],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(blob.map(Bytes::from))
        })
        .await
        .map_err(|e| StoreError::Task(e.to_string()))?
    }

    async fn list_keys(&self) -> Result<BTreeSet<String>> {
        let conn = self.conn.clone();

        tokio::task::spawn_blocking(move || {
            let conn = lock(&conn)?;
            let mut stmt = conn.prepare("SELECT key FROM entries")?;
            let keys = stmt
                .query_map([], |row| row.get::<_, String>(0))?
                .collect::<std::result::Result<BTreeSet<_>, _>>()?;
            Ok(keys)
        })
        .await
        .map_err(|e| StoreError::Task(e.to_string()))?
    }

    fn subscribe(&self) -> MutationSubscription {
        self.notifier.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_put_get_roundtrip() {
        let store = SqliteStore::open_memory().unwrap();
        let result = store
            .put("tech/2011-01-01_00-00-00/aa", Bytes::from_static(b"blob"))
            .await
            .unwrap();
        assert_eq!(result, PutResult::Inserted);

        let got = store.get("tech/2011-01-01_00-00-00/aa").await.unwrap();
        assert_eq!(got, Some(Bytes::from_static(b"blob")));
        assert_eq!(store.get("nope").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_put_idempotent_and_overwrite() {
        let store = SqliteStore::open_memory().unwrap();
        store.put("k", Bytes::from_static(b"v")).await.unwrap();
        assert_eq!(
            store.put("k", Bytes::from_static(b"v")).await.unwrap(),
            PutResult::Unchanged
        );
        assert_eq!(
            store.put("k", Bytes::from_static(b"w")).await.unwrap(),
            PutResult::Overwritten
        );
        assert_eq!(
            store.get("k").await.unwrap(),
            Some(Bytes::from_static(b"w"))
        );
    }

    #[tokio::test]
    async fn test_list_keys() {
        let store = SqliteStore::open_memory().unwrap();
        for key in ["b", "a", "c"] {
            store.put(key, Bytes::from_static(b"x")).await.unwrap();
        }
        let keys: Vec<_> = store.list_keys().await.unwrap().into_iter().collect();
        assert_eq!(keys, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_persists_across_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("feed.db");
        {
            let store = SqliteStore::open(&path).unwrap();
            store.put("k", Bytes::from_static(b"v")).await.unwrap();
        }
        let store = SqliteStore::open(&path).unwrap();
        assert_eq!(
            store.get("k").await.unwrap(),
            Some(Bytes::from_static(b"v"))
        );
    }

    #[tokio::test]
    async fn test_notifications() {
        let store = SqliteStore::open_memory().unwrap();
        let mut sub = store.subscribe();

        store.put("k", Bytes::from_static(b"v")).await.unwrap();
        store.put("k", Bytes::from_static(b"v")).await.unwrap();
        store
            .apply_remote_batch(vec![("r".into(), Bytes::from_static(b"1"))])
            .await
            .unwrap();

        let local = sub.recv().await.unwrap();
        assert_eq!(local.origin, MutationOrigin::Local);
        let remote = sub.recv().await.unwrap();
        assert_eq!(remote.origin, MutationOrigin::Remote);
        assert_eq!(remote.keys, vec!["r".to_string()]);
        assert!(sub.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_invalid_key() {
        let store = SqliteStore::open_memory().unwrap();
        assert!(matches!(
            store.put("", Bytes::new()).await,
            Err(StoreError::InvalidKey(_))
        ));
    }
}

//! The metadata store: an embedded, ordered key-value store with ACID
//! transactions over multiple keys, retry on conflict, and prefix
//! iteration, backed by `redb`.

use crate::tables;
use objectio_common::{Error, Result};
use redb::{Database, ReadTransaction, WriteTransaction};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Bounded retry cap for write transactions that fail to start, per the
/// transaction policy in spec §4.1.
const MAX_TRANSACT_ATTEMPTS: u32 = 10;
const INITIAL_BACKOFF: Duration = Duration::from_millis(1);

/// Embedded metadata store.
#[derive(Clone)]
pub struct MetaStore {
    db: Arc<Database>,
}

impl MetaStore {
    /// Open (creating if absent) the redb database at `path`, and ensure
    /// every table exists.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::create(path)
            .map_err(|e| Error::internal(format!("opening metadata store: {e}")))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        Ok(store)
    }

    fn ensure_tables(&self) -> Result<()> {
        let txn = self
            .db
            .begin_write()
            .map_err(|e| Error::internal(format!("opening metadata store: {e}")))?;
        {
            txn.open_table(tables::TENANTS)
                .map_err(|e| Error::internal(e.to_string()))?;
            txn.open_table(tables::USERS)
                .map_err(|e| Error::internal(e.to_string()))?;
            txn.open_table(tables::USERS_BY_ID)
                .map_err(|e| Error::internal(e.to_string()))?;
            txn.open_table(tables::ACCESS_KEYS)
                .map_err(|e| Error::internal(e.to_string()))?;
            txn.open_table(tables::BUCKETS)
                .map_err(|e| Error::internal(e.to_string()))?;
            txn.open_table(tables::OBJECTS)
                .map_err(|e| Error::internal(e.to_string()))?;
            txn.open_table(tables::OBJECT_VERSIONS)
                .map_err(|e| Error::internal(e.to_string()))?;
            txn.open_table(tables::MULTIPART_UPLOADS)
                .map_err(|e| Error::internal(e.to_string()))?;
            txn.open_table(tables::MULTIPART_PARTS)
                .map_err(|e| Error::internal(e.to_string()))?;
        }
        txn.commit()
            .map_err(|e| Error::internal(format!("initializing metadata store: {e}")))?;
        Ok(())
    }

    /// Run a read-only query against a consistent snapshot.
    pub fn view<T>(&self, f: impl FnOnce(&ReadTransaction) -> Result<T>) -> Result<T> {
        let txn = self
            .db
            .begin_read()
            .map_err(|e| Error::internal(format!("starting read transaction: {e}")))?;
        f(&txn)
    }

    /// Run a write operation inside a single transaction. `f` must commit
    /// no partial state of its own; the transaction commits iff `f`
    /// returns `Ok`. Starting the transaction is retried up to
    /// [`MAX_TRANSACT_ATTEMPTS`] times with exponential backoff starting
    /// at 1ms if the store is momentarily unable to begin a write (e.g. a
    /// prior writer has not yet released); `f` itself is never retried,
    /// so business errors (`NoSuchBucket`, `QuotaExceeded`, ...) surface
    /// immediately without being mistaken for a storage conflict.
    pub fn transact<T>(&self, f: impl Fn(&WriteTransaction) -> Result<T>) -> Result<T> {
        let mut backoff = INITIAL_BACKOFF;
        let mut last_err = None;
        for attempt in 0..MAX_TRANSACT_ATTEMPTS {
            match self.db.begin_write() {
                Ok(txn) => {
                    return match f(&txn) {
                        Ok(value) => {
                            txn.commit()
                                .map_err(|e| Error::internal(format!("commit failed: {e}")))?;
                            Ok(value)
                        }
                        Err(e) => {
                            // Dropping `txn` without commit discards any
                            // writes `f` staged before failing.
                            Err(e)
                        }
                    };
                }
                Err(e) => {
                    warn!(attempt, error = %e, "metadata store transaction start failed, retrying");
                    last_err = Some(e);
                    std::thread::sleep(backoff);
                    backoff *= 2;
                }
            }
        }
        Err(Error::internal(format!(
            "metadata store unavailable after {MAX_TRANSACT_ATTEMPTS} attempts: {}",
            last_err.map(|e| e.to_string()).unwrap_or_default()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_creates_tables() {
        let dir = tempfile::tempdir().unwrap();
        let store = MetaStore::open(dir.path().join("meta.redb")).unwrap();
        // Opening twice must not fail (tables already exist).
        drop(store);
        let _store2 = MetaStore::open(dir.path().join("meta.redb")).unwrap();
    }

    #[test]
    fn test_transact_commits_on_ok() {
        let dir = tempfile::tempdir().unwrap();
        let store = MetaStore::open(dir.path().join("meta.redb")).unwrap();
        store
            .transact(|txn| {
                let mut table = txn.open_table(tables::BUCKETS).unwrap();
                table.insert("b", &b"payload"[..]).unwrap();
                Ok(())
            })
            .unwrap();

        store
            .view(|txn| {
                let table = txn.open_table(tables::BUCKETS).unwrap();
                let value = table.get("b").unwrap().unwrap();
                assert_eq!(value.value(), b"payload");
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn test_transact_rolls_back_on_err() {
        let dir = tempfile::tempdir().unwrap();
        let store = MetaStore::open(dir.path().join("meta.redb")).unwrap();
        let result: Result<()> = store.transact(|txn| {
            let mut table = txn.open_table(tables::BUCKETS).unwrap();
            table.insert("b", &b"payload"[..]).unwrap();
            Err(Error::internal("abort"))
        });
        assert!(result.is_err());

        store
            .view(|txn| {
                let table = txn.open_table(tables::BUCKETS).unwrap();
                assert!(table.get("b").unwrap().is_none());
                Ok(())
            })
            .unwrap();
    }
}

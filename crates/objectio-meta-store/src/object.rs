//! Typed accessors over the `OBJECTS` and `OBJECT_VERSIONS` tables.

use crate::tables::{OBJECTS, OBJECT_VERSIONS};
use crate::types::StoredObject;
use objectio_common::{Error, Result};
use redb::{ReadTransaction, WriteTransaction};

fn object_key(bucket: &str, key: &str) -> String {
    format!("{bucket}/{key}")
}

/// Reverse-time version key so that newest sorts first under the
/// `<bucket>/<key>/` prefix: `u64::MAX - unix_nanos`, fixed-width hex.
fn version_key(bucket: &str, key: &str, created_at_nanos: u64) -> String {
    let reverse = u64::MAX - created_at_nanos;
    format!("{bucket}/{key}/{reverse:020}")
}

pub fn get_current(txn: &ReadTransaction, bucket: &str, key: &str) -> Result<Option<StoredObject>> {
    let table = txn
        .open_table(OBJECTS)
        .map_err(|e| Error::internal(e.to_string()))?;
    let composite = object_key(bucket, key);
    let Some(value) = table
        .get(composite.as_str())
        .map_err(|e| Error::internal(e.to_string()))?
    else {
        return Ok(None);
    };
    Ok(Some(
        bincode::deserialize(value.value()).map_err(|e| Error::internal(e.to_string()))?,
    ))
}

pub fn get_current_rw(
    txn: &WriteTransaction,
    bucket: &str,
    key: &str,
) -> Result<Option<StoredObject>> {
    let table = txn
        .open_table(OBJECTS)
        .map_err(|e| Error::internal(e.to_string()))?;
    let composite = object_key(bucket, key);
    let Some(value) = table
        .get(composite.as_str())
        .map_err(|e| Error::internal(e.to_string()))?
    else {
        return Ok(None);
    };
    Ok(Some(
        bincode::deserialize(value.value()).map_err(|e| Error::internal(e.to_string()))?,
    ))
}

pub fn put_current(txn: &WriteTransaction, object: &StoredObject) -> Result<()> {
    let mut table = txn
        .open_table(OBJECTS)
        .map_err(|e| Error::internal(e.to_string()))?;
    let composite = object_key(&object.bucket, &object.key);
    let bytes = bincode::serialize(object).map_err(|e| Error::internal(e.to_string()))?;
    table
        .insert(composite.as_str(), bytes.as_slice())
        .map_err(|e| Error::internal(e.to_string()))?;
    Ok(())
}

pub fn delete_current(txn: &WriteTransaction, bucket: &str, key: &str) -> Result<()> {
    let mut table = txn
        .open_table(OBJECTS)
        .map_err(|e| Error::internal(e.to_string()))?;
    let composite = object_key(bucket, key);
    table
        .remove(composite.as_str())
        .map_err(|e| Error::internal(e.to_string()))?;
    Ok(())
}

/// Archive `object` (the version being superseded, or a delete-marker
/// being recorded) into `OBJECT_VERSIONS`, keyed so that the newest
/// version sorts first under the `<bucket>/<key>/` prefix.
pub fn archive_version(
    txn: &WriteTransaction,
    object: &StoredObject,
    created_at_nanos: u64,
) -> Result<()> {
    let mut table = txn
        .open_table(OBJECT_VERSIONS)
        .map_err(|e| Error::internal(e.to_string()))?;
    let vkey = version_key(&object.bucket, &object.key, created_at_nanos);
    let bytes = bincode::serialize(object).map_err(|e| Error::internal(e.to_string()))?;
    table
        .insert(vkey.as_str(), bytes.as_slice())
        .map_err(|e| Error::internal(e.to_string()))?;
    Ok(())
}

pub fn list_versions(
    txn: &ReadTransaction,
    bucket: &str,
    key: &str,
) -> Result<Vec<StoredObject>> {
    let table = txn
        .open_table(OBJECT_VERSIONS)
        .map_err(|e| Error::internal(e.to_string()))?;
    let prefix = format!("{bucket}/{key}/");
    let mut out = Vec::new();
    for entry in table
        .range(prefix.as_str()..)
        .map_err(|e| Error::internal(e.to_string()))?
    {
        let (k, v) = entry.map_err(|e| Error::internal(e.to_string()))?;
        if !k.value().starts_with(prefix.as_str()) {
            break;
        }
        out.push(bincode::deserialize(v.value()).map_err(|e| Error::internal(e.to_string()))?);
    }
    Ok(out)
}

/// Find a specific historical version by its version id (the id
/// assigned at creation time, opaque to the caller).
pub fn get_version(
    txn: &ReadTransaction,
    bucket: &str,
    key: &str,
    version_id: &str,
) -> Result<Option<StoredObject>> {
    Ok(list_versions(txn, bucket, key)?
        .into_iter()
        .find(|v| v.version_id.as_deref() == Some(version_id)))
}

/// All objects whose composite key starts with `<bucket>/<prefix>`,
/// lexicographically ordered. The caller (Object Manager) applies
/// delimiter grouping, pagination and the `max_keys` cap — the store
/// only guarantees a snapshot-consistent, ordered prefix scan per spec
/// §4.1/§5.
pub fn list_prefix(
    txn: &ReadTransaction,
    bucket: &str,
    prefix: &str,
) -> Result<Vec<StoredObject>> {
    let table = txn
        .open_table(OBJECTS)
        .map_err(|e| Error::internal(e.to_string()))?;
    let scan_prefix = format!("{bucket}/{prefix}");
    let bucket_prefix = format!("{bucket}/");
    let mut out = Vec::new();
    for entry in table
        .range(scan_prefix.as_str()..)
        .map_err(|e| Error::internal(e.to_string()))?
    {
        let (k, v) = entry.map_err(|e| Error::internal(e.to_string()))?;
        if !k.value().starts_with(bucket_prefix.as_str()) {
            break;
        }
        if !k.value().starts_with(scan_prefix.as_str()) {
            break;
        }
        out.push(bincode::deserialize(v.value()).map_err(|e| Error::internal(e.to_string()))?);
    }
    Ok(out)
}

/// Same scan as [`list_prefix`] but callable from inside an in-progress
/// write transaction (used by bucket deletion's emptiness check).
pub fn list_prefix_rw(
    txn: &WriteTransaction,
    bucket: &str,
    prefix: &str,
) -> Result<Vec<StoredObject>> {
    let table = txn
        .open_table(OBJECTS)
        .map_err(|e| Error::internal(e.to_string()))?;
    let scan_prefix = format!("{bucket}/{prefix}");
    let bucket_prefix = format!("{bucket}/");
    let mut out = Vec::new();
    for entry in table
        .range(scan_prefix.as_str()..)
        .map_err(|e| Error::internal(e.to_string()))?
    {
        let (k, v) = entry.map_err(|e| Error::internal(e.to_string()))?;
        if !k.value().starts_with(bucket_prefix.as_str()) {
            break;
        }
        if !k.value().starts_with(scan_prefix.as_str()) {
            break;
        }
        out.push(bincode::deserialize(v.value()).map_err(|e| Error::internal(e.to_string()))?);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MetaStore;
    use std::collections::HashMap;

    fn sample(bucket: &str, key: &str) -> StoredObject {
        StoredObject {
            bucket: bucket.to_string(),
            key: key.to_string(),
            version_id: None,
            is_delete_marker: false,
            size: 5,
            content_type: "text/plain".into(),
            etag: "abc".into(),
            storage: None,
            last_modified: 0,
            metadata: HashMap::new(),
            tags: Vec::new(),
            acl: objectio_common::Acl::owner_full_control("t1"),
            checksum_sha256: None,
        }
    }

    #[test]
    fn test_put_get_delete_current() {
        let dir = tempfile::tempdir().unwrap();
        let store = MetaStore::open(dir.path().join("m.redb")).unwrap();
        store
            .transact(|txn| put_current(txn, &sample("b", "k")))
            .unwrap();
        let got = store.view(|txn| get_current(txn, "b", "k")).unwrap();
        assert!(got.is_some());
        store.transact(|txn| delete_current(txn, "b", "k")).unwrap();
        let got = store.view(|txn| get_current(txn, "b", "k")).unwrap();
        assert!(got.is_none());
    }

    #[test]
    fn test_list_prefix_scoped_to_bucket() {
        let dir = tempfile::tempdir().unwrap();
        let store = MetaStore::open(dir.path().join("m.redb")).unwrap();
        store
            .transact(|txn| {
                put_current(txn, &sample("b", "a/1"))?;
                put_current(txn, &sample("b", "a/2"))?;
                put_current(txn, &sample("other", "a/1"))?;
                Ok(())
            })
            .unwrap();
        let found = store.view(|txn| list_prefix(txn, "b", "a/")).unwrap();
        assert_eq!(found.len(), 2);
    }
}

//! Typed accessors over the `BUCKETS` table.
//!
//! These are plain functions over an open transaction rather than a
//! stateful store — callers compose them inside [`crate::MetaStore::transact`]
//! / [`crate::MetaStore::view`] so multi-key writes (e.g. bucket create +
//! tenant counter bump) land in one transaction.

use crate::tables::BUCKETS;
use crate::types::StoredBucket;
use objectio_common::{Error, Result};
use redb::{ReadTransaction, WriteTransaction};

pub fn get(txn: &ReadTransaction, name: &str) -> Result<Option<StoredBucket>> {
    let table = txn
        .open_table(BUCKETS)
        .map_err(|e| Error::internal(e.to_string()))?;
    let Some(value) = table.get(name).map_err(|e| Error::internal(e.to_string()))? else {
        return Ok(None);
    };
    let bucket: StoredBucket =
        bincode::deserialize(value.value()).map_err(|e| Error::internal(e.to_string()))?;
    Ok(Some(bucket))
}

pub fn get_rw(txn: &WriteTransaction, name: &str) -> Result<Option<StoredBucket>> {
    let table = txn
        .open_table(BUCKETS)
        .map_err(|e| Error::internal(e.to_string()))?;
    let Some(value) = table.get(name).map_err(|e| Error::internal(e.to_string()))? else {
        return Ok(None);
    };
    let bucket: StoredBucket =
        bincode::deserialize(value.value()).map_err(|e| Error::internal(e.to_string()))?;
    Ok(Some(bucket))
}

pub fn put(txn: &WriteTransaction, bucket: &StoredBucket) -> Result<()> {
    let mut table = txn
        .open_table(BUCKETS)
        .map_err(|e| Error::internal(e.to_string()))?;
    let bytes = bincode::serialize(bucket).map_err(|e| Error::internal(e.to_string()))?;
    table
        .insert(bucket.name.as_str(), bytes.as_slice())
        .map_err(|e| Error::internal(e.to_string()))?;
    Ok(())
}

pub fn delete(txn: &WriteTransaction, name: &str) -> Result<()> {
    let mut table = txn
        .open_table(BUCKETS)
        .map_err(|e| Error::internal(e.to_string()))?;
    table
        .remove(name)
        .map_err(|e| Error::internal(e.to_string()))?;
    Ok(())
}

pub fn list(txn: &ReadTransaction) -> Result<Vec<StoredBucket>> {
    let table = txn
        .open_table(BUCKETS)
        .map_err(|e| Error::internal(e.to_string()))?;
    let mut out = Vec::new();
    for entry in table.iter().map_err(|e| Error::internal(e.to_string()))? {
        let (_, value) = entry.map_err(|e| Error::internal(e.to_string()))?;
        out.push(bincode::deserialize(value.value()).map_err(|e| Error::internal(e.to_string()))?);
    }
    Ok(out)
}

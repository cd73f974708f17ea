//! Typed accessors over the `MULTIPART_UPLOADS` / `MULTIPART_PARTS` tables.

use crate::tables::{MULTIPART_PARTS, MULTIPART_UPLOADS};
use crate::types::{StoredMultipartUpload, StoredPart};
use objectio_common::{Error, Result};
use redb::{ReadTransaction, WriteTransaction};

fn part_key(upload_id: &str, part_number: u32) -> String {
    format!("{upload_id}/{part_number:010}")
}

pub fn get_upload(
    txn: &ReadTransaction,
    upload_id: &str,
) -> Result<Option<StoredMultipartUpload>> {
    let table = txn
        .open_table(MULTIPART_UPLOADS)
        .map_err(|e| Error::internal(e.to_string()))?;
    let Some(value) = table
        .get(upload_id)
        .map_err(|e| Error::internal(e.to_string()))?
    else {
        return Ok(None);
    };
    Ok(Some(
        bincode::deserialize(value.value()).map_err(|e| Error::internal(e.to_string()))?,
    ))
}

pub fn get_upload_rw(
    txn: &WriteTransaction,
    upload_id: &str,
) -> Result<Option<StoredMultipartUpload>> {
    let table = txn
        .open_table(MULTIPART_UPLOADS)
        .map_err(|e| Error::internal(e.to_string()))?;
    let Some(value) = table
        .get(upload_id)
        .map_err(|e| Error::internal(e.to_string()))?
    else {
        return Ok(None);
    };
    Ok(Some(
        bincode::deserialize(value.value()).map_err(|e| Error::internal(e.to_string()))?,
    ))
}

pub fn put_upload(txn: &WriteTransaction, upload: &StoredMultipartUpload) -> Result<()> {
    let mut table = txn
        .open_table(MULTIPART_UPLOADS)
        .map_err(|e| Error::internal(e.to_string()))?;
    let bytes = bincode::serialize(upload).map_err(|e| Error::internal(e.to_string()))?;
    table
        .insert(upload.upload_id.as_str(), bytes.as_slice())
        .map_err(|e| Error::internal(e.to_string()))?;
    Ok(())
}

pub fn delete_upload(txn: &WriteTransaction, upload_id: &str) -> Result<()> {
    let mut table = txn
        .open_table(MULTIPART_UPLOADS)
        .map_err(|e| Error::internal(e.to_string()))?;
    table
        .remove(upload_id)
        .map_err(|e| Error::internal(e.to_string()))?;
    Ok(())
}

pub fn list_uploads_for_bucket(
    txn: &ReadTransaction,
    bucket: &str,
) -> Result<Vec<StoredMultipartUpload>> {
    let table = txn
        .open_table(MULTIPART_UPLOADS)
        .map_err(|e| Error::internal(e.to_string()))?;
    let mut out = Vec::new();
    for entry in table.iter().map_err(|e| Error::internal(e.to_string()))? {
        let (_, v) = entry.map_err(|e| Error::internal(e.to_string()))?;
        let upload: StoredMultipartUpload =
            bincode::deserialize(v.value()).map_err(|e| Error::internal(e.to_string()))?;
        if upload.bucket == bucket {
            out.push(upload);
        }
    }
    Ok(out)
}

/// Same scan as [`list_uploads_for_bucket`] but callable from inside an
/// in-progress write transaction (used by bucket deletion's emptiness check).
pub fn list_uploads_for_bucket_rw(
    txn: &WriteTransaction,
    bucket: &str,
) -> Result<Vec<StoredMultipartUpload>> {
    let table = txn
        .open_table(MULTIPART_UPLOADS)
        .map_err(|e| Error::internal(e.to_string()))?;
    let mut out = Vec::new();
    for entry in table.iter().map_err(|e| Error::internal(e.to_string()))? {
        let (_, v) = entry.map_err(|e| Error::internal(e.to_string()))?;
        let upload: StoredMultipartUpload =
            bincode::deserialize(v.value()).map_err(|e| Error::internal(e.to_string()))?;
        if upload.bucket == bucket {
            out.push(upload);
        }
    }
    Ok(out)
}

pub fn put_part(txn: &WriteTransaction, upload_id: &str, part: &StoredPart) -> Result<()> {
    let mut table = txn
        .open_table(MULTIPART_PARTS)
        .map_err(|e| Error::internal(e.to_string()))?;
    let composite = part_key(upload_id, part.part_number);
    let bytes = bincode::serialize(part).map_err(|e| Error::internal(e.to_string()))?;
    table
        .insert(composite.as_str(), bytes.as_slice())
        .map_err(|e| Error::internal(e.to_string()))?;
    Ok(())
}

/// All uploaded parts for `upload_id`, ordered by part number ascending.
pub fn list_parts(txn: &ReadTransaction, upload_id: &str) -> Result<Vec<StoredPart>> {
    let table = txn
        .open_table(MULTIPART_PARTS)
        .map_err(|e| Error::internal(e.to_string()))?;
    let prefix = format!("{upload_id}/");
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

/// Drop every part record belonging to `upload_id`, used on abort/complete.
pub fn delete_parts(txn: &WriteTransaction, upload_id: &str) -> Result<()> {
    let keys: Vec<String> = {
        let table = txn
            .open_table(MULTIPART_PARTS)
            .map_err(|e| Error::internal(e.to_string()))?;
        let prefix = format!("{upload_id}/");
        let mut keys = Vec::new();
        for entry in table
            .range(prefix.as_str()..)
            .map_err(|e| Error::internal(e.to_string()))?
        {
            let (k, _) = entry.map_err(|e| Error::internal(e.to_string()))?;
            if !k.value().starts_with(prefix.as_str()) {
                break;
            }
            keys.push(k.value().to_string());
        }
        keys
    };
    let mut table = txn
        .open_table(MULTIPART_PARTS)
        .map_err(|e| Error::internal(e.to_string()))?;
    for key in keys {
        table
            .remove(key.as_str())
            .map_err(|e| Error::internal(e.to_string()))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MetaStore;
    use std::collections::HashMap;

    fn sample_upload(bucket: &str, upload_id: &str) -> StoredMultipartUpload {
        StoredMultipartUpload {
            upload_id: upload_id.to_string(),
            bucket: bucket.to_string(),
            key: "k".into(),
            initiator: "u1".into(),
            content_type: "application/octet-stream".into(),
            metadata: HashMap::new(),
            created_at: 0,
            state: crate::types::UploadState::InProgress,
        }
    }

    fn sample_part(part_number: u32) -> StoredPart {
        StoredPart {
            part_number,
            etag: format!("etag{part_number}"),
            etag_raw_md5: [0u8; 16],
            size: 5,
            storage_handle: format!("handle{part_number}"),
            last_modified: 0,
        }
    }

    #[test]
    fn test_put_get_delete_upload() {
        let dir = tempfile::tempdir().unwrap();
        let store = MetaStore::open(dir.path().join("m.redb")).unwrap();
        let upload = sample_upload("b", "u1");
        store.transact(|txn| put_upload(txn, &upload)).unwrap();
        assert!(store.view(|txn| get_upload(txn, "u1")).unwrap().is_some());
        store.transact(|txn| delete_upload(txn, "u1")).unwrap();
        assert!(store.view(|txn| get_upload(txn, "u1")).unwrap().is_none());
    }

    #[test]
    fn test_parts_ordered_by_number() {
        let dir = tempfile::tempdir().unwrap();
        let store = MetaStore::open(dir.path().join("m.redb")).unwrap();
        store
            .transact(|txn| {
                put_part(txn, "u1", &sample_part(2))?;
                put_part(txn, "u1", &sample_part(1))?;
                put_part(txn, "u1", &sample_part(10))?;
                Ok(())
            })
            .unwrap();
        let parts = store.view(|txn| list_parts(txn, "u1")).unwrap();
        let numbers: Vec<u32> = parts.iter().map(|p| p.part_number).collect();
        assert_eq!(numbers, vec![1, 2, 10]);
    }

    #[test]
    fn test_delete_parts_clears_all() {
        let dir = tempfile::tempdir().unwrap();
        let store = MetaStore::open(dir.path().join("m.redb")).unwrap();
        store
            .transact(|txn| {
                put_part(txn, "u1", &sample_part(1))?;
                put_part(txn, "u1", &sample_part(2))?;
                Ok(())
            })
            .unwrap();
        store.transact(|txn| delete_parts(txn, "u1")).unwrap();
        assert!(store.view(|txn| list_parts(txn, "u1")).unwrap().is_empty());
    }
}

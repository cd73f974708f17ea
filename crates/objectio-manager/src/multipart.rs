//! Multipart upload workflow: initiate, upload/copy parts, complete, abort,
//! list uploads, list parts.
//!
//! `CompleteMultipartUpload` concatenates all parts into one brand-new
//! blob rather than keeping [`objectio_meta_store::types::StorageLocation::Parts`]
//! around, so `GetObject`'s range-read path never has to stitch together
//! more than one handle. `Parts` stays defined in the metadata store for
//! callers that might want to model multi-blob storage later but this
//! manager never produces it.

use crate::manager::ObjectManager;
use bytes::{Bytes, BytesMut};
use md5::{Digest, Md5};
use objectio_auth::quota;
use objectio_common::{Acl, Error, ObjectKey, Result};
use objectio_meta_store::types::{
    QuotaResource, StorageLocation, StoredMultipartUpload, StoredObject, StoredPart, UploadState,
};
use objectio_meta_store::{bucket, multipart, object};
use std::collections::HashMap;

pub struct InitiateMultipartUploadResult {
    pub upload_id: String,
}

pub struct UploadPartResult {
    pub etag: String,
}

#[derive(Clone, Debug)]
pub struct CompletedPart {
    pub part_number: u32,
    pub etag: String,
}

pub struct ListMultipartUploadsResult {
    pub uploads: Vec<StoredMultipartUpload>,
}

pub struct ListPartsResult {
    pub parts: Vec<StoredPart>,
}

/// S3's multipart contract: every part but the last must be at least this
/// large, and no part (including the last) may exceed the maximum.
const MIN_PART_SIZE: u64 = 5 * 1024 * 1024;
const MAX_PART_SIZE: u64 = 5 * 1024 * 1024 * 1024;

fn now_secs() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

fn md5_hex(data: &[u8]) -> String {
    let mut hasher = Md5::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

impl ObjectManager {
    pub fn initiate_multipart_upload(
        &self,
        bucket_name: &str,
        key: &str,
        tenant_id: &str,
        initiator: &str,
        content_type: &str,
        metadata: HashMap<String, String>,
    ) -> Result<InitiateMultipartUploadResult> {
        let key = ObjectKey::new(key)?.as_str().to_string();
        let upload_id = uuid::Uuid::new_v4().to_string();
        self.meta.transact(|txn| {
            let b = bucket::get_rw(txn, bucket_name)?
                .ok_or_else(|| Error::NoSuchBucket(bucket_name.to_string()))?;
            if b.owner_tenant_id != tenant_id {
                return Err(Error::AccessDenied);
            }
            let upload = StoredMultipartUpload {
                upload_id: upload_id.clone(),
                bucket: bucket_name.to_string(),
                key: key.clone(),
                initiator: initiator.to_string(),
                content_type: content_type.to_string(),
                metadata: metadata.clone(),
                created_at: now_secs(),
                state: UploadState::InProgress,
            };
            multipart::put_upload(txn, &upload)
        })?;
        Ok(InitiateMultipartUploadResult { upload_id })
    }

    /// Looks up the upload's bucket and rejects unless `tenant_id` owns it.
    fn ensure_owns_bucket(&self, bucket_name: &str, tenant_id: &str) -> Result<()> {
        let b = self
            .meta
            .view(|txn| bucket::get(txn, bucket_name))?
            .ok_or_else(|| Error::NoSuchBucket(bucket_name.to_string()))?;
        if b.owner_tenant_id != tenant_id {
            return Err(Error::AccessDenied);
        }
        Ok(())
    }

    pub async fn upload_part(
        &self,
        upload_id: &str,
        tenant_id: &str,
        part_number: u32,
        body: Bytes,
    ) -> Result<UploadPartResult> {
        let upload = self
            .meta
            .view(|txn| multipart::get_upload(txn, upload_id))?
            .ok_or_else(|| Error::NoSuchUpload(upload_id.to_string()))?;
        self.ensure_owns_bucket(&upload.bucket, tenant_id)?;
        if upload.state != UploadState::InProgress {
            return Err(Error::invalid_argument("upload is not in progress"));
        }

        let etag = md5_hex(&body);
        let mut etag_raw_md5 = [0u8; 16];
        etag_raw_md5.copy_from_slice(&Md5::digest(body.as_ref()));
        let size = body.len() as u64;

        let handle = self.blobs.put(body).await?;
        let part = StoredPart {
            part_number,
            etag: etag.clone(),
            etag_raw_md5,
            size,
            storage_handle: handle.clone(),
            last_modified: now_secs(),
        };
        match self
            .meta
            .transact(|txn| multipart::put_part(txn, upload_id, &part))
        {
            Ok(()) => Ok(UploadPartResult { etag }),
            Err(e) => {
                let _ = self.blobs.delete(&handle).await;
                Err(e)
            }
        }
    }

    /// Copies a byte range (or the whole object) of an existing object
    /// into one part of an in-progress multipart upload.
    #[allow(clippy::too_many_arguments)]
    pub async fn upload_part_copy(
        &self,
        upload_id: &str,
        tenant_id: &str,
        part_number: u32,
        src_bucket: &str,
        src_key: &str,
        src_version: Option<&str>,
        range: Option<(u64, u64)>,
    ) -> Result<UploadPartResult> {
        let (_, body) = self.get_object(src_bucket, src_key, tenant_id, src_version, range).await?;
        self.upload_part(upload_id, tenant_id, part_number, body).await
    }

    /// Concatenates `parts` (in the order given by the caller, which must
    /// match what was uploaded) into a single new blob and records the
    /// completed object as current.
    pub async fn complete_multipart_upload(
        &self,
        upload_id: &str,
        tenant_id: &str,
        parts: &[CompletedPart],
    ) -> Result<StoredObject> {
        let upload = self
            .meta
            .view(|txn| multipart::get_upload(txn, upload_id))?
            .ok_or_else(|| Error::NoSuchUpload(upload_id.to_string()))?;
        self.ensure_owns_bucket(&upload.bucket, tenant_id)?;
        if upload.state != UploadState::InProgress {
            return Err(Error::invalid_argument("upload is not in progress"));
        }

        let stored_parts = self.meta.view(|txn| multipart::list_parts(txn, upload_id))?;
        let mut by_number: HashMap<u32, &StoredPart> =
            stored_parts.iter().map(|p| (p.part_number, p)).collect();

        let mut concatenated = BytesMut::new();
        let mut etags_raw = Vec::with_capacity(parts.len());
        for (idx, requested) in parts.iter().enumerate() {
            let stored = by_number
                .remove(&requested.part_number)
                .ok_or_else(|| Error::invalid_argument(format!("no such part {}", requested.part_number)))?;
            if stored.etag != requested.etag {
                return Err(Error::invalid_argument(format!(
                    "etag mismatch for part {}",
                    requested.part_number
                )));
            }
            let is_last = idx == parts.len() - 1;
            if !is_last && stored.size < MIN_PART_SIZE {
                return Err(Error::EntityTooSmall {
                    part_number: requested.part_number,
                    size: stored.size,
                    min: MIN_PART_SIZE,
                });
            }
            if stored.size > MAX_PART_SIZE {
                return Err(Error::EntityTooLarge {
                    part_number: requested.part_number,
                    size: stored.size,
                    max: MAX_PART_SIZE,
                });
            }
            let body = self.blobs.get(&stored.storage_handle).await?;
            concatenated.extend_from_slice(&body);
            etags_raw.push(stored.etag_raw_md5);
        }

        // S3's multipart ETag: hex(md5(concat(part md5 digests))) -
        // "-{n}", distinguishing it from a plain single-part MD5 ETag.
        let mut combined_hasher = Md5::new();
        for raw in &etags_raw {
            combined_hasher.update(raw);
        }
        let etag = format!("{}-{}", hex::encode(combined_hasher.finalize()), parts.len());

        let bytes = concatenated.freeze();
        let size = bytes.len() as u64;
        let handle = self.blobs.put(bytes).await?;

        let result = self.meta.transact(|txn| {
            let b = bucket::get_rw(txn, &upload.bucket)?
                .ok_or_else(|| Error::NoSuchBucket(upload.bucket.clone()))?;
            let prior = object::get_current_rw(txn, &upload.bucket, &upload.key)?;
            let prior_live_size = match &prior {
                Some(p) if !p.is_delete_marker => p.size as i64,
                _ => 0,
            };
            quota::acquire(
                txn,
                tenant_id,
                QuotaResource::StorageBytes,
                size as i64 - prior_live_size,
            )?;
            let prior_was_live = matches!(&prior, Some(p) if !p.is_delete_marker);
            if !prior_was_live {
                quota::acquire(txn, tenant_id, QuotaResource::Objects, 1)?;
            }

            let version_id = matches!(b.versioning, objectio_common::VersioningState::Enabled)
                .then(|| uuid::Uuid::new_v4().to_string());
            let record = StoredObject {
                bucket: upload.bucket.clone(),
                key: upload.key.clone(),
                version_id,
                is_delete_marker: false,
                size,
                content_type: upload.content_type.clone(),
                etag,
                storage: Some(StorageLocation::Single(handle.clone())),
                last_modified: now_secs(),
                metadata: upload.metadata.clone(),
                tags: Vec::new(),
                acl: Acl::owner_full_control(tenant_id),
                checksum_sha256: None,
            };

            let mut superseded_handle = None;
            if let Some(old) = &prior {
                if matches!(b.versioning, objectio_common::VersioningState::Enabled) {
                    object::archive_version(txn, old, now_nanos())?;
                } else if let Some(StorageLocation::Single(old_handle)) = &old.storage {
                    superseded_handle = Some(old_handle.clone());
                }
            }
            object::put_current(txn, &record)?;
            multipart::delete_parts(txn, upload_id)?;
            multipart::delete_upload(txn, upload_id)?;
            Ok((record, superseded_handle))
        });

        let (record, superseded_handle) = match result {
            Ok(v) => v,
            Err(e) => {
                let _ = self.blobs.delete(&handle).await;
                return Err(e);
            }
        };

        for part in stored_parts {
            let _ = self.blobs.delete(&part.storage_handle).await;
        }
        if let Some(old_handle) = superseded_handle {
            let _ = self.blobs.delete(&old_handle).await;
        }
        Ok(record)
    }

    pub async fn abort_multipart_upload(&self, upload_id: &str, tenant_id: &str) -> Result<()> {
        let upload = self
            .meta
            .view(|txn| multipart::get_upload(txn, upload_id))?
            .ok_or_else(|| Error::NoSuchUpload(upload_id.to_string()))?;
        self.ensure_owns_bucket(&upload.bucket, tenant_id)?;
        let parts = self.meta.view(|txn| multipart::list_parts(txn, upload_id))?;

        self.meta.transact(|txn| {
            multipart::delete_parts(txn, upload_id)?;
            multipart::delete_upload(txn, upload_id)
        })?;

        for part in parts {
            let _ = self.blobs.delete(&part.storage_handle).await;
        }
        Ok(())
    }

    pub fn list_multipart_uploads(&self, bucket_name: &str, tenant_id: &str) -> Result<ListMultipartUploadsResult> {
        self.ensure_owns_bucket(bucket_name, tenant_id)?;
        let mut uploads = self
            .meta
            .view(|txn| multipart::list_uploads_for_bucket(txn, bucket_name))?;
        uploads.retain(|u| u.state == UploadState::InProgress);
        uploads.sort_by(|a, b| a.key.cmp(&b.key).then(a.created_at.cmp(&b.created_at)));
        Ok(ListMultipartUploadsResult { uploads })
    }

    pub fn list_parts(&self, upload_id: &str, tenant_id: &str) -> Result<ListPartsResult> {
        let upload = self
            .meta
            .view(|txn| multipart::get_upload(txn, upload_id))?
            .ok_or_else(|| Error::NoSuchUpload(upload_id.to_string()))?;
        self.ensure_owns_bucket(&upload.bucket, tenant_id)?;
        let parts = self.meta.view(|txn| multipart::list_parts(txn, upload_id))?;
        Ok(ListPartsResult { parts })
    }
}

fn now_nanos() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manager::PutObjectRequest;
    use objectio_meta_store::{MetaStore, tenant, types::StoredTenant};
    use objectio_storage::BlobStore;

    async fn manager_with_tenant(tenant_id: &str) -> (tempfile::TempDir, ObjectManager) {
        let dir = tempfile::tempdir().unwrap();
        let meta = MetaStore::open(dir.path().join("m.redb")).unwrap();
        meta.transact(|txn| {
            tenant::put(
                txn,
                &StoredTenant {
                    tenant_id: tenant_id.to_string(),
                    display_name: tenant_id.to_string(),
                    created_at: 0,
                    max_buckets: 100,
                    current_buckets: 0,
                    max_storage_bytes: 0,
                    current_storage_bytes: 0,
                    max_access_keys: 100,
                    current_access_keys: 0,
                    max_objects: 1000,
                    current_objects: 0,
                },
            )
        })
        .unwrap();
        let blobs = BlobStore::open(dir.path().join("blobs")).await.unwrap();
        (dir, ObjectManager::new(meta, blobs))
    }

    fn part_etag_raw(body: &[u8]) -> (String, [u8; 16]) {
        let digest = Md5::digest(body);
        let mut raw = [0u8; 16];
        raw.copy_from_slice(&digest);
        (hex::encode(digest), raw)
    }

    #[tokio::test]
    async fn test_multipart_roundtrip_concatenates_parts_and_computes_etag() {
        let (_dir, mgr) = manager_with_tenant("t1").await;
        mgr.create_bucket("t1", "bucket-a", 0).unwrap();

        let init = mgr
            .initiate_multipart_upload(
                "bucket-a",
                "big.bin",
                "t1",
                "user-1",
                "application/octet-stream",
                HashMap::new(),
            )
            .unwrap();

        // Every part but the last must clear the 5 MiB minimum.
        let part1 = vec![b'a'; MIN_PART_SIZE as usize];
        let part2 = vec![b'b'; 24];
        let up1 = mgr.upload_part(&init.upload_id, "t1", 1, Bytes::from(part1.clone())).await.unwrap();
        let up2 = mgr.upload_part(&init.upload_id, "t1", 2, Bytes::from(part2.clone())).await.unwrap();

        let completed = mgr
            .complete_multipart_upload(
                &init.upload_id,
                "t1",
                &[
                    CompletedPart { part_number: 1, etag: up1.etag.clone() },
                    CompletedPart { part_number: 2, etag: up2.etag.clone() },
                ],
            )
            .await
            .unwrap();

        assert_eq!(completed.size, (part1.len() + part2.len()) as u64);

        let (_, raw1) = part_etag_raw(&part1);
        let (_, raw2) = part_etag_raw(&part2);
        let mut combined = Md5::new();
        combined.update(raw1);
        combined.update(raw2);
        let expected_etag = format!("{}-{}", hex::encode(combined.finalize()), 2);
        assert_eq!(completed.etag, expected_etag);

        let (_, body) = mgr.get_object("bucket-a", "big.bin", "t1", None, None).await.unwrap();
        let mut expected_body = part1;
        expected_body.extend_from_slice(&part2);
        assert_eq!(body.as_ref(), expected_body.as_slice());

        // The upload record and its parts are gone once completed.
        assert!(mgr.list_parts(&init.upload_id, "t1").is_err());
    }

    #[tokio::test]
    async fn test_complete_rejects_etag_mismatch() {
        let (_dir, mgr) = manager_with_tenant("t1").await;
        mgr.create_bucket("t1", "bucket-a", 0).unwrap();
        let init = mgr
            .initiate_multipart_upload("bucket-a", "k", "t1", "user-1", "text/plain", HashMap::new())
            .unwrap();
        mgr.upload_part(&init.upload_id, "t1", 1, Bytes::from_static(b"hello")).await.unwrap();
        let result = mgr
            .complete_multipart_upload(
                &init.upload_id,
                "t1",
                &[CompletedPart { part_number: 1, etag: "wrong".to_string() }],
            )
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_complete_rejects_undersized_non_final_part() {
        let (_dir, mgr) = manager_with_tenant("t1").await;
        mgr.create_bucket("t1", "bucket-a", 0).unwrap();
        let init = mgr
            .initiate_multipart_upload("bucket-a", "k", "t1", "user-1", "text/plain", HashMap::new())
            .unwrap();
        let up1 = mgr.upload_part(&init.upload_id, "t1", 1, Bytes::from_static(b"hello")).await.unwrap();
        let up2 = mgr.upload_part(&init.upload_id, "t1", 2, Bytes::from_static(b"world")).await.unwrap();
        let result = mgr
            .complete_multipart_upload(
                &init.upload_id,
                "t1",
                &[
                    CompletedPart { part_number: 1, etag: up1.etag },
                    CompletedPart { part_number: 2, etag: up2.etag },
                ],
            )
            .await;
        assert!(matches!(result, Err(Error::EntityTooSmall { part_number: 1, .. })));
    }

    #[tokio::test]
    async fn test_complete_allows_undersized_final_part() {
        let (_dir, mgr) = manager_with_tenant("t1").await;
        mgr.create_bucket("t1", "bucket-a", 0).unwrap();
        let init = mgr
            .initiate_multipart_upload("bucket-a", "k", "t1", "user-1", "text/plain", HashMap::new())
            .unwrap();
        let up1 = mgr
            .upload_part(&init.upload_id, "t1", 1, Bytes::from(vec![b'a'; MIN_PART_SIZE as usize]))
            .await
            .unwrap();
        let up2 = mgr.upload_part(&init.upload_id, "t1", 2, Bytes::from_static(b"tail")).await.unwrap();
        let result = mgr
            .complete_multipart_upload(
                &init.upload_id,
                "t1",
                &[
                    CompletedPart { part_number: 1, etag: up1.etag },
                    CompletedPart { part_number: 2, etag: up2.etag },
                ],
            )
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_abort_deletes_part_blobs() {
        let (_dir, mgr) = manager_with_tenant("t1").await;
        mgr.create_bucket("t1", "bucket-a", 0).unwrap();
        let init = mgr
            .initiate_multipart_upload("bucket-a", "k", "t1", "user-1", "text/plain", HashMap::new())
            .unwrap();
        mgr.upload_part(&init.upload_id, "t1", 1, Bytes::from_static(b"hello")).await.unwrap();
        mgr.upload_part(&init.upload_id, "t1", 2, Bytes::from_static(b"world")).await.unwrap();

        mgr.abort_multipart_upload(&init.upload_id, "t1").await.unwrap();

        assert!(mgr.list_parts(&init.upload_id, "t1").is_err());
        let mut count = 0;
        let mut stack = vec![mgr.blobs.root().to_path_buf()];
        while let Some(dir) = stack.pop() {
            let Ok(rd) = std::fs::read_dir(&dir) else { continue };
            for entry in rd.flatten() {
                let path = entry.path();
                if path.is_dir() {
                    stack.push(path);
                } else {
                    count += 1;
                }
            }
        }
        assert_eq!(count, 0, "abort must delete every part blob");
    }

    #[tokio::test]
    async fn test_upload_part_copy_reads_source_range() {
        let (_dir, mgr) = manager_with_tenant("t1").await;
        mgr.create_bucket("t1", "bucket-a", 0).unwrap();
        mgr.put_object(PutObjectRequest {
            bucket: "bucket-a".to_string(),
            key: "src.txt".to_string(),
            tenant_id: "t1".to_string(),
            body: Bytes::from_static(b"0123456789"),
            content_type: "text/plain".to_string(),
            metadata: HashMap::new(),
        })
        .await
        .unwrap();

        let init = mgr
            .initiate_multipart_upload("bucket-a", "dst.bin", "t1", "user-1", "text/plain", HashMap::new())
            .unwrap();
        let copied = mgr
            .upload_part_copy(&init.upload_id, "t1", 1, "bucket-a", "src.txt", None, Some((2, 5)))
            .await
            .unwrap();
        let (expected_etag, _) = part_etag_raw(b"2345");
        assert_eq!(copied.etag, expected_etag);
    }

    #[tokio::test]
    async fn test_upload_part_copy_from_unowned_bucket_is_denied() {
        let (_dir, mgr) = manager_with_tenant("t1").await;
        mgr.create_bucket("t1", "bucket-a", 0).unwrap();
        mgr.put_object(PutObjectRequest {
            bucket: "bucket-a".to_string(),
            key: "src.txt".to_string(),
            tenant_id: "t1".to_string(),
            body: Bytes::from_static(b"0123456789"),
            content_type: "text/plain".to_string(),
            metadata: HashMap::new(),
        })
        .await
        .unwrap();
        mgr.create_bucket("t2", "bucket-b", 0).unwrap();
        let init = mgr
            .initiate_multipart_upload("bucket-b", "dst.bin", "t2", "user-2", "text/plain", HashMap::new())
            .unwrap();
        let result = mgr
            .upload_part_copy(&init.upload_id, "t2", 1, "bucket-a", "src.txt", None, None)
            .await;
        assert!(matches!(result, Err(Error::AccessDenied)));
    }

    #[tokio::test]
    async fn test_list_multipart_uploads_excludes_completed() {
        let (_dir, mgr) = manager_with_tenant("t1").await;
        mgr.create_bucket("t1", "bucket-a", 0).unwrap();
        let init_a = mgr
            .initiate_multipart_upload("bucket-a", "a", "t1", "user-1", "text/plain", HashMap::new())
            .unwrap();
        let init_b = mgr
            .initiate_multipart_upload("bucket-a", "b", "t1", "user-1", "text/plain", HashMap::new())
            .unwrap();
        mgr.upload_part(&init_b.upload_id, "t1", 1, Bytes::from_static(b"x")).await.unwrap();
        mgr.complete_multipart_upload(
            &init_b.upload_id,
            "t1",
            &[CompletedPart { part_number: 1, etag: part_etag_raw(b"x").0 }],
        )
        .await
        .unwrap();

        let listed = mgr.list_multipart_uploads("bucket-a", "t1").unwrap();
        assert_eq!(listed.uploads.len(), 1);
        assert_eq!(listed.uploads[0].upload_id, init_a.upload_id);
    }
}

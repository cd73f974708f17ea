//! Object Manager (component C): bucket and object lifecycle, composing
//! the metadata store (A) and blob store (B), gated by the Quota Gate (G).

use bytes::Bytes;
use md5::{Digest, Md5};
use objectio_auth::quota;
use objectio_common::{
    Acl, BucketName, CorsRule, Error, LifecycleRule, ObjectKey, Result, Tag, VersioningState,
};
use objectio_meta_store::types::{QuotaResource, StorageLocation, StoredBucket, StoredObject};
use objectio_meta_store::{MetaStore, bucket, object};
use objectio_storage::BlobStore;
use std::collections::HashMap;

/// Composes the metadata store and blob store behind the nine operation
/// groups in the object/bucket contract.
#[derive(Clone)]
pub struct ObjectManager {
    pub(crate) meta: MetaStore,
    pub(crate) blobs: BlobStore,
}

/// What to do with an object's custom metadata and content-type on copy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MetadataDirective {
    Copy,
    Replace,
}

/// Fields supplied by the caller for a `PutObject` call.
pub struct PutObjectRequest {
    pub bucket: String,
    pub key: String,
    pub tenant_id: String,
    pub body: Bytes,
    pub content_type: String,
    pub metadata: HashMap<String, String>,
}

#[derive(Debug, Default)]
pub struct ListObjectsResult {
    pub objects: Vec<StoredObject>,
    pub common_prefixes: Vec<String>,
    pub next_continuation_token: Option<String>,
    pub is_truncated: bool,
}

const MAX_KEYS_CAP: usize = 1000;

fn now_nanos() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}

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

/// Every object/multipart/bucket-config operation must check this before
/// touching a bucket's contents: ownership is the tenant isolation
/// boundary, not just an attribute shown back to the caller.
fn check_owner(b: &StoredBucket, tenant_id: &str) -> Result<()> {
    if b.owner_tenant_id != tenant_id {
        return Err(Error::AccessDenied);
    }
    Ok(())
}

impl ObjectManager {
    #[must_use]
    pub const fn new(meta: MetaStore, blobs: BlobStore) -> Self {
        Self { meta, blobs }
    }

    // ---- Bucket lifecycle -------------------------------------------------

    pub fn create_bucket(&self, tenant_id: &str, name: &str, now: i64) -> Result<StoredBucket> {
        let validated = BucketName::new(name)?;
        self.meta.transact(|txn| {
            if bucket::get_rw(txn, validated.as_str())?.is_some() {
                return Err(Error::BucketAlreadyExists(name.to_string()));
            }
            quota::acquire(txn, tenant_id, QuotaResource::Buckets, 1)?;
            let record = StoredBucket {
                name: validated.as_str().to_string(),
                owner_tenant_id: tenant_id.to_string(),
                created_at: now,
                versioning: VersioningState::Off,
                cors: Vec::new(),
                lifecycle: Vec::new(),
                tags: Vec::new(),
                acl: Acl::owner_full_control(tenant_id),
            };
            bucket::put(txn, &record)?;
            Ok(record)
        })
    }

    pub fn delete_bucket(&self, tenant_id: &str, name: &str) -> Result<()> {
        self.meta.transact(|txn| {
            let Some(b) = bucket::get_rw(txn, name)? else {
                return Err(Error::NoSuchBucket(name.to_string()));
            };
            check_owner(&b, tenant_id)?;
            let has_live_objects = object::list_prefix_rw(txn, name, "")?
                .iter()
                .any(|o| !o.is_delete_marker);
            if has_live_objects {
                return Err(Error::BucketNotEmpty(name.to_string()));
            }
            let has_in_progress_upload = objectio_meta_store::multipart::list_uploads_for_bucket_rw(
                txn, name,
            )?
            .iter()
            .any(|u| u.state == objectio_meta_store::types::UploadState::InProgress);
            if has_in_progress_upload {
                return Err(Error::BucketNotEmpty(name.to_string()));
            }
            bucket::delete(txn, name)?;
            quota::release(txn, tenant_id, QuotaResource::Buckets, 1);
            Ok(())
        })
    }

    pub fn get_bucket(&self, tenant_id: &str, name: &str) -> Result<StoredBucket> {
        let b = self
            .meta
            .view(|txn| bucket::get(txn, name))?
            .ok_or_else(|| Error::NoSuchBucket(name.to_string()))?;
        check_owner(&b, tenant_id)?;
        Ok(b)
    }

    pub fn list_buckets(&self, tenant_id: &str) -> Result<Vec<StoredBucket>> {
        Ok(self
            .meta
            .view(|txn| bucket::list(txn))?
            .into_iter()
            .filter(|b| b.owner_tenant_id == tenant_id)
            .collect())
    }

    pub fn set_bucket_versioning(&self, tenant_id: &str, name: &str, state: VersioningState) -> Result<()> {
        self.meta.transact(|txn| {
            let mut b = bucket::get_rw(txn, name)?.ok_or_else(|| Error::NoSuchBucket(name.to_string()))?;
            check_owner(&b, tenant_id)?;
            b.versioning = state;
            bucket::put(txn, &b)
        })
    }

    pub fn set_bucket_cors(&self, tenant_id: &str, name: &str, rules: Vec<CorsRule>) -> Result<()> {
        self.meta.transact(|txn| {
            let mut b = bucket::get_rw(txn, name)?.ok_or_else(|| Error::NoSuchBucket(name.to_string()))?;
            check_owner(&b, tenant_id)?;
            b.cors = rules.clone();
            bucket::put(txn, &b)
        })
    }

    pub fn set_bucket_lifecycle(&self, tenant_id: &str, name: &str, rules: Vec<LifecycleRule>) -> Result<()> {
        self.meta.transact(|txn| {
            let mut b = bucket::get_rw(txn, name)?.ok_or_else(|| Error::NoSuchBucket(name.to_string()))?;
            check_owner(&b, tenant_id)?;
            b.lifecycle = rules.clone();
            bucket::put(txn, &b)
        })
    }

    pub fn get_bucket_tagging(&self, tenant_id: &str, name: &str) -> Result<Vec<Tag>> {
        Ok(self.get_bucket(tenant_id, name)?.tags)
    }

    pub fn set_bucket_tagging(&self, tenant_id: &str, name: &str, tags: Vec<Tag>) -> Result<()> {
        if tags.len() > 10 {
            return Err(Error::InvalidTagCount(tags.len()));
        }
        self.meta.transact(|txn| {
            let mut b = bucket::get_rw(txn, name)?.ok_or_else(|| Error::NoSuchBucket(name.to_string()))?;
            check_owner(&b, tenant_id)?;
            b.tags = tags.clone();
            bucket::put(txn, &b)
        })
    }

    pub fn delete_bucket_tagging(&self, tenant_id: &str, name: &str) -> Result<()> {
        self.set_bucket_tagging(tenant_id, name, Vec::new())
    }

    // ---- Object CRUD --------------------------------------------------

    pub async fn put_object(&self, req: PutObjectRequest) -> Result<StoredObject> {
        let key = ObjectKey::new(&req.key)?.as_str().to_string();
        let etag = md5_hex(&req.body);
        let size = req.body.len() as u64;

        let handle = self.blobs.put(req.body).await?;

        match self
            .commit_put(
                &req.bucket,
                &key,
                &req.tenant_id,
                size,
                &req.content_type,
                req.metadata,
                etag,
                handle.clone(),
            )
            .await
        {
            Ok(stored) => Ok(stored),
            Err(e) => {
                let _ = self.blobs.delete(&handle).await;
                Err(e)
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn commit_put(&self,
        bucket_name: &str,
        key: &str,
        tenant_id: &str,
        size: u64,
        content_type: &str,
        metadata: HashMap<String, String>,
        etag: String,
        handle: String,
    ) -> Result<StoredObject> {
        let now = now_secs();
        let now_ns = now_nanos();
        let (record, superseded_handle) = self.meta.transact(|txn| {
            let b = bucket::get_rw(txn, bucket_name)?
                .ok_or_else(|| Error::NoSuchBucket(bucket_name.to_string()))?;
            check_owner(&b, tenant_id)?;
            let prior = object::get_current_rw(txn, bucket_name, key)?;

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

            let version_id = matches!(b.versioning, VersioningState::Enabled)
                .then(|| uuid::Uuid::new_v4().to_string());

            let record = StoredObject {
                bucket: bucket_name.to_string(),
                key: key.to_string(),
                version_id,
                is_delete_marker: false,
                size,
                content_type: content_type.to_string(),
                etag: etag.clone(),
                storage: Some(StorageLocation::Single(handle.clone())),
                last_modified: now,
                metadata: metadata.clone(),
                tags: Vec::new(),
                acl: Acl::owner_full_control(tenant_id),
                checksum_sha256: None,
            };

            let mut superseded_handle = None;
            if let Some(old) = &prior {
                if matches!(b.versioning, VersioningState::Enabled) {
                    object::archive_version(txn, old, now_ns)?;
                } else if let Some(StorageLocation::Single(old_handle)) = &old.storage {
                    superseded_handle = Some(old_handle.clone());
                }
            }
            object::put_current(txn, &record)?;
            Ok((record, superseded_handle))
        })?;

        if let Some(old_handle) = superseded_handle {
            let _ = self.blobs.delete(&old_handle).await;
        }
        Ok(record)
    }

    pub async fn get_object(
        &self,
        bucket_name: &str,
        key: &str,
        tenant_id: &str,
        version_id: Option<&str>,
        range: Option<(u64, u64)>,
    ) -> Result<(StoredObject, Bytes)> {
        let b = self
            .meta
            .view(|txn| bucket::get(txn, bucket_name))?
            .ok_or_else(|| Error::NoSuchBucket(bucket_name.to_string()))?;
        check_owner(&b, tenant_id)?;
        let record = self.meta.view(|txn| {
            if let Some(v) = version_id {
                object::get_version(txn, bucket_name, key, v)
            } else {
                object::get_current(txn, bucket_name, key)
            }
        })?;
        let record = record.ok_or_else(|| Error::NoSuchKey {
            bucket: bucket_name.to_string(),
            key: key.to_string(),
        })?;
        if record.is_delete_marker {
            return Err(Error::NoSuchKey {
                bucket: bucket_name.to_string(),
                key: key.to_string(),
            });
        }
        let Some(StorageLocation::Single(handle)) = &record.storage else {
            return Err(Error::internal("object has no storage handle"));
        };
        let body = match range {
            Some((start, end)) => self.blobs.get_range(handle, start, end).await,
            None => self.blobs.get(handle).await,
        }?;
        Ok((record, body))
    }

    pub fn head_object(&self, bucket_name: &str, key: &str, tenant_id: &str) -> Result<StoredObject> {
        let b = self
            .meta
            .view(|txn| bucket::get(txn, bucket_name))?
            .ok_or_else(|| Error::NoSuchBucket(bucket_name.to_string()))?;
        check_owner(&b, tenant_id)?;
        let record = self
            .meta
            .view(|txn| object::get_current(txn, bucket_name, key))?
            .ok_or_else(|| Error::NoSuchKey {
                bucket: bucket_name.to_string(),
                key: key.to_string(),
            })?;
        if record.is_delete_marker {
            return Err(Error::NoSuchKey {
                bucket: bucket_name.to_string(),
                key: key.to_string(),
            });
        }
        Ok(record)
    }

    pub async fn delete_object(&self, bucket_name: &str, key: &str, tenant_id: &str) -> Result<()> {
        let now_ns = now_nanos();
        let blob_to_delete = self.meta.transact(|txn| {
            let b = bucket::get_rw(txn, bucket_name)?
                .ok_or_else(|| Error::NoSuchBucket(bucket_name.to_string()))?;
            check_owner(&b, tenant_id)?;
            let current = object::get_current_rw(txn, bucket_name, key)?;

            if matches!(b.versioning, VersioningState::Enabled) {
                if let Some(old) = &current {
                    object::archive_version(txn, old, now_ns)?;
                    if !old.is_delete_marker {
                        quota::release(txn, tenant_id, QuotaResource::StorageBytes, old.size as i64);
                        quota::release(txn, tenant_id, QuotaResource::Objects, 1);
                    }
                }
                let marker = StoredObject {
                    bucket: bucket_name.to_string(),
                    key: key.to_string(),
                    version_id: Some(uuid::Uuid::new_v4().to_string()),
                    is_delete_marker: true,
                    size: 0,
                    content_type: String::new(),
                    etag: String::new(),
                    storage: None,
                    last_modified: now_secs(),
                    metadata: HashMap::new(),
                    tags: Vec::new(),
                    acl: Acl::owner_full_control(tenant_id),
                    checksum_sha256: None,
                };
                object::put_current(txn, &marker)?;
                return Ok(None);
            }

            // Non-versioned: missing key is a no-op success (idempotent).
            let Some(current) = current else {
                return Ok(None);
            };
            object::delete_current(txn, bucket_name, key)?;
            if !current.is_delete_marker {
                quota::release(txn, tenant_id, QuotaResource::StorageBytes, current.size as i64);
                quota::release(txn, tenant_id, QuotaResource::Objects, 1);
            }
            Ok(match current.storage {
                Some(StorageLocation::Single(handle)) => Some(handle),
                _ => None,
            })
        })?;

        if let Some(handle) = blob_to_delete {
            let _ = self.blobs.delete(&handle).await;
        }
        Ok(())
    }

    /// Bulk delete, per spec §8 S3: reports per-key success/failure rather
    /// than failing the whole batch on the first missing key.
    pub async fn delete_objects(
        &self,
        bucket_name: &str,
        tenant_id: &str,
        keys: &[String],
    ) -> Vec<(String, Result<()>)> {
        let mut results = Vec::with_capacity(keys.len());
        for k in keys {
            let outcome = self.delete_object(bucket_name, k, tenant_id).await;
            results.push((k.clone(), outcome));
        }
        results
    }

    pub fn list_objects(
        &self,
        bucket_name: &str,
        tenant_id: &str,
        prefix: &str,
        delimiter: Option<&str>,
        continuation_token: Option<&str>,
        max_keys: usize,
    ) -> Result<ListObjectsResult> {
        let b = self
            .meta
            .view(|txn| bucket::get(txn, bucket_name))?
            .ok_or_else(|| Error::NoSuchBucket(bucket_name.to_string()))?;
        check_owner(&b, tenant_id)?;
        let max_keys = max_keys.min(MAX_KEYS_CAP);
        let all = self.meta.view(|txn| object::list_prefix(txn, bucket_name, prefix))?;
        let mut all: Vec<StoredObject> = all.into_iter().filter(|o| !o.is_delete_marker).collect();
        all.sort_by(|a, b| a.key.cmp(&b.key));

        let start_idx = match continuation_token {
            Some(token) => all.iter().position(|o| o.key.as_str() > token).unwrap_or(all.len()),
            None => 0,
        };

        let mut objects = Vec::new();
        let mut common_prefixes: Vec<String> = Vec::new();
        let mut is_truncated = false;
        let mut next_token = None;

        for obj in &all[start_idx..] {
            if let Some(delim) = delimiter {
                let rest = &obj.key[prefix.len().min(obj.key.len())..];
                if let Some(pos) = rest.find(delim) {
                    let cp = format!("{prefix}{}", &rest[..=pos + delim.len() - 1]);
                    if !common_prefixes.contains(&cp) {
                        if objects.len() + common_prefixes.len() >= max_keys {
                            is_truncated = true;
                            next_token = Some(obj.key.clone());
                            break;
                        }
                        common_prefixes.push(cp);
                    }
                    continue;
                }
            }
            if objects.len() + common_prefixes.len() >= max_keys {
                is_truncated = true;
                next_token = Some(obj.key.clone());
                break;
            }
            objects.push(obj.clone());
        }

        Ok(ListObjectsResult {
            objects,
            common_prefixes,
            next_continuation_token: next_token,
            is_truncated,
        })
    }

    pub async fn copy_object(
        &self,
        src_bucket: &str,
        src_key: &str,
        src_version: Option<&str>,
        dst_bucket: &str,
        dst_key: &str,
        tenant_id: &str,
        directive: MetadataDirective,
        override_content_type: Option<String>,
        override_metadata: Option<HashMap<String, String>>,
    ) -> Result<StoredObject> {
        let (src_record, bytes) = self.get_object(src_bucket, src_key, tenant_id, src_version, None).await?;

        let (content_type, metadata) = match directive {
            MetadataDirective::Copy => (src_record.content_type.clone(), src_record.metadata.clone()),
            MetadataDirective::Replace => (
                override_content_type.unwrap_or(src_record.content_type.clone()),
                override_metadata.unwrap_or_default(),
            ),
        };

        let req = PutObjectRequest {
            bucket: dst_bucket.to_string(),
            key: dst_key.to_string(),
            tenant_id: tenant_id.to_string(),
            body: bytes,
            content_type,
            metadata,
        };
        // Tags travel with the copy regardless of metadata directive; the
        // spec defines no separate tagging directive.
        let mut stored = self.put_object(req).await?;
        stored.tags = src_record.tags;
        self.meta.transact(|txn| object::put_current(txn, &stored))?;
        Ok(stored)
    }

    // ---- Tagging trio (dedicated path, never via a generic update) ----

    pub fn get_object_tagging(&self, bucket_name: &str, key: &str, tenant_id: &str) -> Result<Vec<Tag>> {
        Ok(self.head_object(bucket_name, key, tenant_id)?.tags)
    }

    pub fn set_object_tagging(&self, bucket_name: &str, key: &str, tenant_id: &str, tags: Vec<Tag>) -> Result<()> {
        if tags.len() > 10 {
            return Err(Error::InvalidTagCount(tags.len()));
        }
        self.meta.transact(|txn| {
            let b = bucket::get_rw(txn, bucket_name)?
                .ok_or_else(|| Error::NoSuchBucket(bucket_name.to_string()))?;
            check_owner(&b, tenant_id)?;
            let mut record = object::get_current_rw(txn, bucket_name, key)?.ok_or_else(|| {
                Error::NoSuchKey {
                    bucket: bucket_name.to_string(),
                    key: key.to_string(),
                }
            })?;
            record.tags = tags.clone();
            object::put_current(txn, &record)
        })
    }

    pub fn delete_object_tagging(&self, bucket_name: &str, key: &str, tenant_id: &str) -> Result<()> {
        self.set_object_tagging(bucket_name, key, tenant_id, Vec::new())
    }
}

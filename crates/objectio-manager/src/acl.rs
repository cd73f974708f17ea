//! Bucket and object ACL get/set, mirroring the tagging trio's pattern of
//! a dedicated read-modify-write path rather than a generic field patch.

use crate::manager::ObjectManager;
use objectio_common::{Acl, Error, Result};
use objectio_meta_store::{bucket, object};

impl ObjectManager {
    pub fn get_bucket_acl(&self, bucket_name: &str, tenant_id: &str) -> Result<Acl> {
        Ok(self.get_bucket(tenant_id, bucket_name)?.acl)
    }

    pub fn set_bucket_acl(&self, bucket_name: &str, tenant_id: &str, acl: Acl) -> Result<()> {
        self.meta.transact(|txn| {
            let mut b = bucket::get_rw(txn, bucket_name)?
                .ok_or_else(|| Error::NoSuchBucket(bucket_name.to_string()))?;
            if b.owner_tenant_id != tenant_id {
                return Err(Error::AccessDenied);
            }
            b.acl = acl.clone();
            bucket::put(txn, &b)
        })
    }

    pub fn get_object_acl(&self, bucket_name: &str, key: &str, tenant_id: &str) -> Result<Acl> {
        Ok(self.head_object(bucket_name, key, tenant_id)?.acl)
    }

    pub fn set_object_acl(&self, bucket_name: &str, key: &str, tenant_id: &str, acl: Acl) -> Result<()> {
        self.meta.transact(|txn| {
            let b = bucket::get_rw(txn, bucket_name)?
                .ok_or_else(|| Error::NoSuchBucket(bucket_name.to_string()))?;
            if b.owner_tenant_id != tenant_id {
                return Err(Error::AccessDenied);
            }
            let mut record = object::get_current_rw(txn, bucket_name, key)?.ok_or_else(|| {
                Error::NoSuchKey {
                    bucket: bucket_name.to_string(),
                    key: key.to_string(),
                }
            })?;
            record.acl = acl.clone();
            object::put_current(txn, &record)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manager::PutObjectRequest;
    use bytes::Bytes;
    use objectio_common::{Grant, Permission};
    use objectio_meta_store::{MetaStore, tenant, types::StoredTenant};
    use objectio_storage::BlobStore;
    use std::collections::HashMap;

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

    #[tokio::test]
    async fn test_bucket_acl_defaults_to_owner_full_control() {
        let (_dir, mgr) = manager_with_tenant("t1").await;
        mgr.create_bucket("t1", "bucket-a", 0).unwrap();
        let acl = mgr.get_bucket_acl("bucket-a", "t1").unwrap();
        assert_eq!(acl.owner, "t1");
        assert_eq!(acl.grants.len(), 1);
        assert_eq!(acl.grants[0].permission, Permission::FullControl);
    }

    #[tokio::test]
    async fn test_set_bucket_acl_replaces_grants() {
        let (_dir, mgr) = manager_with_tenant("t1").await;
        mgr.create_bucket("t1", "bucket-a", 0).unwrap();
        let mut acl = mgr.get_bucket_acl("bucket-a", "t1").unwrap();
        acl.grants.push(Grant { grantee: "t2".to_string(), permission: Permission::Read });
        mgr.set_bucket_acl("bucket-a", "t1", acl).unwrap();
        let reloaded = mgr.get_bucket_acl("bucket-a", "t1").unwrap();
        assert_eq!(reloaded.grants.len(), 2);
    }

    #[tokio::test]
    async fn test_cross_tenant_acl_access_is_denied() {
        let (_dir, mgr) = manager_with_tenant("t1").await;
        mgr.create_bucket("t1", "bucket-a", 0).unwrap();
        assert!(mgr.get_bucket_acl("bucket-a", "t2").is_err());
        assert!(mgr.set_bucket_acl("bucket-a", "t2", Acl::owner_full_control("t2")).is_err());
    }

    #[tokio::test]
    async fn test_set_object_acl_persists_independently_of_reupload() {
        let (_dir, mgr) = manager_with_tenant("t1").await;
        mgr.create_bucket("t1", "bucket-a", 0).unwrap();
        mgr.put_object(PutObjectRequest {
            bucket: "bucket-a".to_string(),
            key: "k".to_string(),
            tenant_id: "t1".to_string(),
            body: Bytes::from_static(b"v"),
            content_type: "text/plain".to_string(),
            metadata: HashMap::new(),
        })
        .await
        .unwrap();

        let acl = Acl {
            owner: "t1".to_string(),
            grants: vec![Grant { grantee: "t2".to_string(), permission: Permission::Read }],
        };
        mgr.set_object_acl("bucket-a", "k", "t1", acl).unwrap();
        let reloaded = mgr.get_object_acl("bucket-a", "k", "t1").unwrap();
        assert_eq!(reloaded.grants.len(), 1);
        assert_eq!(reloaded.grants[0].grantee, "t2");
    }

    #[tokio::test]
    async fn test_set_object_acl_missing_key_fails() {
        let (_dir, mgr) = manager_with_tenant("t1").await;
        mgr.create_bucket("t1", "bucket-a", 0).unwrap();
        let acl = Acl::owner_full_control("t1");
        assert!(mgr.set_object_acl("bucket-a", "missing", "t1", acl).is_err());
    }
}

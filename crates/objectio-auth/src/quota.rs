//! Quota Gate (component G): per-tenant resource ceilings.
//!
//! A thin wrapper over [`objectio_meta_store::tenant::bump_counter`] so
//! the Object Manager and Console API share one place that decides
//! whether a tenant may acquire one more bucket, object, access key, or
//! byte of storage.

use objectio_common::Result;
use objectio_meta_store::MetaStore;
use objectio_meta_store::tenant;
use objectio_meta_store::types::QuotaResource;
use redb::WriteTransaction;

/// Acquire one unit of `resource` for `tenant_id` inside `txn`, failing
/// with [`objectio_common::Error::QuotaExceeded`] if the tenant's max is
/// already reached. Call from within the same transaction that performs
/// the underlying bucket/object/access-key write so the two never
/// diverge.
pub fn acquire(
    txn: &WriteTransaction,
    tenant_id: &str,
    resource: QuotaResource,
    amount: i64,
) -> Result<()> {
    if tenant_id.is_empty() {
        // The global scope carries no quota.
        return Ok(());
    }
    tenant::bump_counter(txn, tenant_id, resource, amount)
}

/// Release `amount` units of `resource` previously acquired for
/// `tenant_id`. Never fails: releasing never exceeds a quota.
pub fn release(txn: &WriteTransaction, tenant_id: &str, resource: QuotaResource, amount: i64) {
    if tenant_id.is_empty() {
        return;
    }
    let _ = tenant::bump_counter(txn, tenant_id, resource, -amount);
}

#[cfg(test)]
mod tests {
    use super::*;
    use objectio_meta_store::types::StoredTenant;

    fn store_with_tenant(max_buckets: u64) -> MetaStore {
        let dir = tempfile::tempdir().unwrap();
        let meta = MetaStore::open(dir.path().join("m.redb")).unwrap();
        meta.transact(|txn| {
            tenant::put(
                txn,
                &StoredTenant {
                    tenant_id: "t1".into(),
                    display_name: "t1".into(),
                    created_at: 0,
                    max_buckets,
                    current_buckets: 0,
                    max_storage_bytes: 0,
                    current_storage_bytes: 0,
                    max_access_keys: 0,
                    current_access_keys: 0,
                    max_objects: 0,
                    current_objects: 0,
                },
            )
        })
        .unwrap();
        meta
    }

    #[test]
    fn test_acquire_within_limit() {
        let meta = store_with_tenant(2);
        meta.transact(|txn| acquire(txn, "t1", QuotaResource::Buckets, 1))
            .unwrap();
        let tenant = meta.view(|txn| tenant::get(txn, "t1")).unwrap().unwrap();
        assert_eq!(tenant.current_buckets, 1);
    }

    #[test]
    fn test_acquire_over_limit_fails() {
        let meta = store_with_tenant(1);
        meta.transact(|txn| acquire(txn, "t1", QuotaResource::Buckets, 1))
            .unwrap();
        let result = meta.transact(|txn| acquire(txn, "t1", QuotaResource::Buckets, 1));
        assert!(result.is_err());
    }

    #[test]
    fn test_global_scope_has_no_quota() {
        let dir = tempfile::tempdir().unwrap();
        let meta = MetaStore::open(dir.path().join("m.redb")).unwrap();
        meta.transact(|txn| acquire(txn, "", QuotaResource::Buckets, 1_000_000))
            .unwrap();
    }
}

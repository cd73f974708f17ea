//! Typed accessors over the `TENANTS` table.

use crate::tables::TENANTS;
use crate::types::{QuotaResource, StoredTenant};
use objectio_common::{Error, Result};
use redb::{ReadTransaction, WriteTransaction};

pub fn get(txn: &ReadTransaction, tenant_id: &str) -> Result<Option<StoredTenant>> {
    let table = txn
        .open_table(TENANTS)
        .map_err(|e| Error::internal(e.to_string()))?;
    let Some(value) = table
        .get(tenant_id)
        .map_err(|e| Error::internal(e.to_string()))?
    else {
        return Ok(None);
    };
    Ok(Some(
        bincode::deserialize(value.value()).map_err(|e| Error::internal(e.to_string()))?,
    ))
}

pub fn get_rw(txn: &WriteTransaction, tenant_id: &str) -> Result<Option<StoredTenant>> {
    let table = txn
        .open_table(TENANTS)
        .map_err(|e| Error::internal(e.to_string()))?;
    let Some(value) = table
        .get(tenant_id)
        .map_err(|e| Error::internal(e.to_string()))?
    else {
        return Ok(None);
    };
    Ok(Some(
        bincode::deserialize(value.value()).map_err(|e| Error::internal(e.to_string()))?,
    ))
}

pub fn put(txn: &WriteTransaction, tenant: &StoredTenant) -> Result<()> {
    let mut table = txn
        .open_table(TENANTS)
        .map_err(|e| Error::internal(e.to_string()))?;
    let bytes = bincode::serialize(tenant).map_err(|e| Error::internal(e.to_string()))?;
    table
        .insert(tenant.tenant_id.as_str(), bytes.as_slice())
        .map_err(|e| Error::internal(e.to_string()))?;
    Ok(())
}

pub fn delete(txn: &WriteTransaction, tenant_id: &str) -> Result<()> {
    let mut table = txn
        .open_table(TENANTS)
        .map_err(|e| Error::internal(e.to_string()))?;
    table
        .remove(tenant_id)
        .map_err(|e| Error::internal(e.to_string()))?;
    Ok(())
}

/// Adjust a tenant's live counter for `resource` by `delta` (positive on
/// acquire, negative on release) inside the caller's write transaction,
/// rejecting the change with [`Error::QuotaExceeded`] if it would push the
/// counter above the tenant's configured max. `delta < 0` never fails.
pub fn bump_counter(
    txn: &WriteTransaction,
    tenant_id: &str,
    resource: QuotaResource,
    delta: i64,
) -> Result<()> {
    let mut tenant = get_rw(txn, tenant_id)?
        .ok_or_else(|| Error::internal(format!("tenant {tenant_id} not found")))?;
    let (current, max): (&mut u64, u64) = match resource {
        QuotaResource::Buckets => (&mut tenant.current_buckets, tenant.max_buckets),
        QuotaResource::Objects => (&mut tenant.current_objects, tenant.max_objects),
        QuotaResource::StorageBytes => (
            &mut tenant.current_storage_bytes,
            tenant.max_storage_bytes,
        ),
        QuotaResource::AccessKeys => (&mut tenant.current_access_keys, tenant.max_access_keys),
    };
    let next = if delta >= 0 {
        let next = current.saturating_add(delta as u64);
        if max > 0 && next > max {
            return Err(Error::QuotaExceeded {
                resource: resource.as_str(),
                current: *current,
                max,
            });
        }
        next
    } else {
        current.saturating_sub(delta.unsigned_abs())
    };
    *current = next;
    put(txn, &tenant)
}

pub fn list(txn: &ReadTransaction) -> Result<Vec<StoredTenant>> {
    let table = txn
        .open_table(TENANTS)
        .map_err(|e| Error::internal(e.to_string()))?;
    let mut out = Vec::new();
    for entry in table.iter().map_err(|e| Error::internal(e.to_string()))? {
        let (_, v) = entry.map_err(|e| Error::internal(e.to_string()))?;
        out.push(bincode::deserialize(v.value()).map_err(|e| Error::internal(e.to_string()))?);
    }
    Ok(out)
}

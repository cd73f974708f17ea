//! Typed accessors over the `USERS` / `USERS_BY_ID` / `ACCESS_KEYS` tables.

use crate::tables::{ACCESS_KEYS, USERS, USERS_BY_ID};
use crate::types::{StoredAccessKey, StoredUser};
use objectio_common::{Error, Result};
use redb::{ReadTransaction, WriteTransaction};

fn login_key(tenant_id: &str, login: &str) -> String {
    format!("{tenant_id}/{login}")
}

pub fn get_by_login(
    txn: &ReadTransaction,
    tenant_id: &str,
    login: &str,
) -> Result<Option<StoredUser>> {
    let table = txn
        .open_table(USERS)
        .map_err(|e| Error::internal(e.to_string()))?;
    let composite = login_key(tenant_id, login);
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

pub fn get_by_login_rw(
    txn: &WriteTransaction,
    tenant_id: &str,
    login: &str,
) -> Result<Option<StoredUser>> {
    let table = txn
        .open_table(USERS)
        .map_err(|e| Error::internal(e.to_string()))?;
    let composite = login_key(tenant_id, login);
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

pub fn get_by_id(txn: &ReadTransaction, user_id: &str) -> Result<Option<StoredUser>> {
    let pointer = txn
        .open_table(USERS_BY_ID)
        .map_err(|e| Error::internal(e.to_string()))?;
    let Some(composite) = pointer
        .get(user_id)
        .map_err(|e| Error::internal(e.to_string()))?
    else {
        return Ok(None);
    };
    let table = txn
        .open_table(USERS)
        .map_err(|e| Error::internal(e.to_string()))?;
    let Some(value) = table
        .get(composite.value())
        .map_err(|e| Error::internal(e.to_string()))?
    else {
        return Ok(None);
    };
    Ok(Some(
        bincode::deserialize(value.value()).map_err(|e| Error::internal(e.to_string()))?,
    ))
}

/// Insert or overwrite a user, maintaining the `user_id -> login` pointer
/// table alongside the primary `tenant_id/login -> StoredUser` record.
pub fn put(txn: &WriteTransaction, user: &StoredUser) -> Result<()> {
    let composite = login_key(&user.tenant_id, &user.login);
    {
        let mut table = txn
            .open_table(USERS)
            .map_err(|e| Error::internal(e.to_string()))?;
        let bytes = bincode::serialize(user).map_err(|e| Error::internal(e.to_string()))?;
        table
            .insert(composite.as_str(), bytes.as_slice())
            .map_err(|e| Error::internal(e.to_string()))?;
    }
    {
        let mut pointer = txn
            .open_table(USERS_BY_ID)
            .map_err(|e| Error::internal(e.to_string()))?;
        pointer
            .insert(user.user_id.as_str(), composite.as_str())
            .map_err(|e| Error::internal(e.to_string()))?;
    }
    Ok(())
}

pub fn delete(txn: &WriteTransaction, tenant_id: &str, login: &str) -> Result<()> {
    let composite = login_key(tenant_id, login);
    if let Some(user) = get_by_login_rw(txn, tenant_id, login)? {
        let mut pointer = txn
            .open_table(USERS_BY_ID)
            .map_err(|e| Error::internal(e.to_string()))?;
        pointer
            .remove(user.user_id.as_str())
            .map_err(|e| Error::internal(e.to_string()))?;
    }
    let mut table = txn
        .open_table(USERS)
        .map_err(|e| Error::internal(e.to_string()))?;
    table
        .remove(composite.as_str())
        .map_err(|e| Error::internal(e.to_string()))?;
    Ok(())
}

pub fn list_for_tenant(txn: &ReadTransaction, tenant_id: &str) -> Result<Vec<StoredUser>> {
    let table = txn
        .open_table(USERS)
        .map_err(|e| Error::internal(e.to_string()))?;
    let prefix = format!("{tenant_id}/");
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

pub fn get_access_key(
    txn: &ReadTransaction,
    access_key_id: &str,
) -> Result<Option<StoredAccessKey>> {
    let table = txn
        .open_table(ACCESS_KEYS)
        .map_err(|e| Error::internal(e.to_string()))?;
    let Some(value) = table
        .get(access_key_id)
        .map_err(|e| Error::internal(e.to_string()))?
    else {
        return Ok(None);
    };
    Ok(Some(
        bincode::deserialize(value.value()).map_err(|e| Error::internal(e.to_string()))?,
    ))
}

pub fn put_access_key(txn: &WriteTransaction, key: &StoredAccessKey) -> Result<()> {
    let mut table = txn
        .open_table(ACCESS_KEYS)
        .map_err(|e| Error::internal(e.to_string()))?;
    let bytes = bincode::serialize(key).map_err(|e| Error::internal(e.to_string()))?;
    table
        .insert(key.access_key_id.as_str(), bytes.as_slice())
        .map_err(|e| Error::internal(e.to_string()))?;
    Ok(())
}

pub fn delete_access_key(txn: &WriteTransaction, access_key_id: &str) -> Result<()> {
    let mut table = txn
        .open_table(ACCESS_KEYS)
        .map_err(|e| Error::internal(e.to_string()))?;
    table
        .remove(access_key_id)
        .map_err(|e| Error::internal(e.to_string()))?;
    Ok(())
}

pub fn list_access_keys_for_user(
    txn: &ReadTransaction,
    user_id: &str,
) -> Result<Vec<StoredAccessKey>> {
    let table = txn
        .open_table(ACCESS_KEYS)
        .map_err(|e| Error::internal(e.to_string()))?;
    let mut out = Vec::new();
    for entry in table.iter().map_err(|e| Error::internal(e.to_string()))? {
        let (_, v) = entry.map_err(|e| Error::internal(e.to_string()))?;
        let key: StoredAccessKey =
            bincode::deserialize(v.value()).map_err(|e| Error::internal(e.to_string()))?;
        if key.user_id == user_id {
            out.push(key);
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MetaStore;

    fn sample_user(tenant_id: &str, login: &str) -> StoredUser {
        StoredUser {
            user_id: uuid::Uuid::new_v4().to_string(),
            tenant_id: tenant_id.to_string(),
            login: login.to_string(),
            password_hash: "hash".into(),
            roles: vec!["admin".into()],
            failed_login_attempts: 0,
            locked_until_epoch_secs: 0,
            last_failed_login_epoch_secs: 0,
            created_at: 0,
        }
    }

    #[test]
    fn test_put_get_by_login_and_by_id() {
        let dir = tempfile::tempdir().unwrap();
        let store = MetaStore::open(dir.path().join("m.redb")).unwrap();
        let user = sample_user("t1", "alice");
        let user_id = user.user_id.clone();
        store.transact(|txn| put(txn, &user)).unwrap();

        let by_login = store
            .view(|txn| get_by_login(txn, "t1", "alice"))
            .unwrap()
            .unwrap();
        assert_eq!(by_login.user_id, user_id);

        let by_id = store.view(|txn| get_by_id(txn, &user_id)).unwrap().unwrap();
        assert_eq!(by_id.login, "alice");
    }

    #[test]
    fn test_delete_removes_pointer() {
        let dir = tempfile::tempdir().unwrap();
        let store = MetaStore::open(dir.path().join("m.redb")).unwrap();
        let user = sample_user("t1", "bob");
        let user_id = user.user_id.clone();
        store.transact(|txn| put(txn, &user)).unwrap();
        store.transact(|txn| delete(txn, "t1", "bob")).unwrap();

        assert!(store.view(|txn| get_by_id(txn, &user_id)).unwrap().is_none());
        assert!(store
            .view(|txn| get_by_login(txn, "t1", "bob"))
            .unwrap()
            .is_none());
    }
}

//! User and access key storage, backed by the metadata store.

use crate::user::{generate_access_key_id, generate_secret_access_key};
use objectio_common::{Error, Result};
use objectio_meta_store::types::{StoredAccessKey, StoredUser};
use objectio_meta_store::{MetaStore, user};

/// Thin, tenant-aware façade over [`objectio_meta_store::user`] for the
/// identity data the S3 and Console endpoints need.
#[derive(Clone)]
pub struct UserStore {
    meta: MetaStore,
}

impl UserStore {
    #[must_use]
    pub const fn new(meta: MetaStore) -> Self {
        Self { meta }
    }

    pub fn create_user(
        &self,
        tenant_id: &str,
        login: &str,
        password_hash: String,
        roles: Vec<String>,
        created_at: i64,
    ) -> Result<StoredUser> {
        self.meta.transact(|txn| {
            if user::get_by_login_rw(txn, tenant_id, login)?.is_some() {
                return Err(Error::invalid_argument(format!(
                    "user {login} already exists in tenant {tenant_id}"
                )));
            }
            let record = StoredUser {
                user_id: uuid::Uuid::new_v4().to_string(),
                tenant_id: tenant_id.to_string(),
                login: login.to_string(),
                password_hash: password_hash.clone(),
                roles: roles.clone(),
                failed_login_attempts: 0,
                locked_until_epoch_secs: 0,
                last_failed_login_epoch_secs: 0,
                created_at,
            };
            user::put(txn, &record)?;
            Ok(record)
        })
    }

    pub fn get_user_by_login(&self, tenant_id: &str, login: &str) -> Result<StoredUser> {
        self.meta
            .view(|txn| user::get_by_login(txn, tenant_id, login))?
            .ok_or_else(|| Error::AccessDenied)
    }

    pub fn get_user_by_id(&self, user_id: &str) -> Result<StoredUser> {
        self.meta
            .view(|txn| user::get_by_id(txn, user_id))?
            .ok_or_else(|| Error::AccessDenied)
    }

    pub fn put_user(&self, record: &StoredUser) -> Result<()> {
        self.meta.transact(|txn| user::put(txn, record))
    }

    pub fn delete_user(&self, tenant_id: &str, login: &str) -> Result<()> {
        self.meta.transact(|txn| user::delete(txn, tenant_id, login))
    }

    pub fn list_users(&self, tenant_id: &str) -> Result<Vec<StoredUser>> {
        self.meta.view(|txn| user::list_for_tenant(txn, tenant_id))
    }

    pub fn create_access_key(
        &self,
        owner: &StoredUser,
        created_at: i64,
    ) -> Result<StoredAccessKey> {
        let key = StoredAccessKey {
            access_key_id: generate_access_key_id(),
            secret_access_key: generate_secret_access_key(),
            user_id: owner.user_id.clone(),
            tenant_id: owner.tenant_id.clone(),
            created_at,
            expires_at: None,
            enabled: true,
        };
        self.meta
            .transact(|txn| user::put_access_key(txn, &key))?;
        Ok(key)
    }

    pub fn delete_access_key(&self, access_key_id: &str) -> Result<()> {
        self.meta
            .transact(|txn| user::delete_access_key(txn, access_key_id))
    }

    pub fn list_access_keys(&self, user_id: &str) -> Result<Vec<StoredAccessKey>> {
        self.meta
            .view(|txn| user::list_access_keys_for_user(txn, user_id))
    }

    /// Resolve an access key id to its key record and owning user,
    /// rejecting disabled keys or expired keys up front so callers never
    /// have to re-check.
    pub fn lookup_for_auth(
        &self,
        access_key_id: &str,
        now_epoch_secs: i64,
    ) -> Result<(StoredAccessKey, StoredUser)> {
        let key = self
            .meta
            .view(|txn| user::get_access_key(txn, access_key_id))?
            .ok_or(Error::SignatureDoesNotMatch)?;
        if !key.enabled {
            return Err(Error::AccessDenied);
        }
        if let Some(expires_at) = key.expires_at
            && expires_at <= now_epoch_secs
        {
            return Err(Error::AccessDenied);
        }
        let user = self
            .meta
            .view(|txn| user::get_by_id(txn, &key.user_id))?
            .ok_or(Error::AccessDenied)?;
        Ok((key, user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> UserStore {
        let dir = tempfile::tempdir().unwrap();
        let meta = MetaStore::open(dir.path().join("m.redb")).unwrap();
        UserStore::new(meta)
    }

    #[test]
    fn test_create_and_lookup_user() {
        let store = store();
        let user = store
            .create_user("t1", "alice", "hash".into(), vec!["admin".into()], 0)
            .unwrap();
        let fetched = store.get_user_by_login("t1", "alice").unwrap();
        assert_eq!(fetched.user_id, user.user_id);
    }

    #[test]
    fn test_duplicate_user_rejected() {
        let store = store();
        store
            .create_user("t1", "alice", "hash".into(), vec![], 0)
            .unwrap();
        let result = store.create_user("t1", "alice", "hash".into(), vec![], 0);
        assert!(result.is_err());
    }

    #[test]
    fn test_access_key_lookup() {
        let store = store();
        let user = store
            .create_user("t1", "alice", "hash".into(), vec![], 0)
            .unwrap();
        let key = store.create_access_key(&user, 0).unwrap();
        let (found_key, found_user) = store.lookup_for_auth(&key.access_key_id, 1).unwrap();
        assert_eq!(found_key.access_key_id, key.access_key_id);
        assert_eq!(found_user.user_id, user.user_id);
    }

    #[test]
    fn test_expired_access_key_denied() {
        let store = store();
        let user = store
            .create_user("t1", "alice", "hash".into(), vec![], 0)
            .unwrap();
        let mut key = store.create_access_key(&user, 0).unwrap();
        key.expires_at = Some(100);
        store.meta.transact(|txn| user::put_access_key(txn, &key)).unwrap();
        let result = store.lookup_for_auth(&key.access_key_id, 200);
        assert!(result.is_err());
    }
}

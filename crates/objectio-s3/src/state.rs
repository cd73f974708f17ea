//! Shared state handed to every S3 handler.

use objectio_auth::SigV4Verifier;
use objectio_common::config::S3CorsConfig;
use objectio_manager::ObjectManager;

/// Application state shared across S3 handlers.
pub struct AppState {
    pub manager: ObjectManager,
    pub verifier: SigV4Verifier,
    pub cors: S3CorsConfig,
}

impl AppState {
    #[must_use]
    pub const fn new(manager: ObjectManager, verifier: SigV4Verifier, cors: S3CorsConfig) -> Self {
        Self { manager, verifier, cors }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::AppState;
    use objectio_auth::{SigV4Verifier, UserStore};
    use objectio_manager::ObjectManager;
    use objectio_meta_store::{MetaStore, tenant, types::StoredTenant};
    use objectio_storage::BlobStore;
    use std::sync::Arc;

    /// Builds an `AppState` with a single tenant already provisioned.
    /// The returned `TempDir` must stay bound for the state's lifetime.
    pub async fn state_with_tenant(tenant_id: &str) -> (tempfile::TempDir, Arc<AppState>) {
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
        let manager = ObjectManager::new(meta.clone(), blobs);
        let verifier = SigV4Verifier::new(UserStore::new(meta), "us-east-1");
        let state = AppState::new(manager, verifier, Default::default());
        (dir, Arc::new(state))
    }

    pub fn auth_result(tenant_id: &str) -> objectio_auth::AuthResult {
        objectio_auth::AuthResult {
            user_id: "user-1".to_string(),
            tenant_id: tenant_id.to_string(),
            access_key_id: "AKIATEST".to_string(),
            roles: vec![],
        }
    }

    pub async fn body_bytes(response: axum::response::Response) -> Vec<u8> {
        use http_body_util::BodyExt;
        response.into_body().collect().await.unwrap().to_bytes().to_vec()
    }
}

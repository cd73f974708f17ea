//! Shared state handed to every Console handler.

use objectio_auth::{IpRateLimiter, LockoutPolicy, UserStore};
use objectio_manager::ObjectManager;
use objectio_meta_store::MetaStore;
use objectio_storage::BlobStore;
use std::path::PathBuf;

/// Application state shared across Console handlers.
pub struct AppState {
    pub meta: MetaStore,
    pub users: UserStore,
    pub manager: ObjectManager,
    pub rate_limiter: IpRateLimiter,
    pub lockout: LockoutPolicy,
    pub jwt_secret: String,
    /// `<data-dir>/blobs`, stat'd by the health probe only.
    pub blobs_dir: PathBuf,
}

impl AppState {
    #[must_use]
    pub fn new(
        meta: MetaStore,
        blobs: BlobStore,
        blobs_dir: PathBuf,
        rate_limiter: IpRateLimiter,
        lockout: LockoutPolicy,
        jwt_secret: String,
    ) -> Self {
        let users = UserStore::new(meta.clone());
        let manager = ObjectManager::new(meta.clone(), blobs);
        Self { meta, users, manager, rate_limiter, lockout, jwt_secret, blobs_dir }
    }
}

//! Stored types for metadata persistence.
//!
//! These are the bincode-serialized record shapes behind each table in
//! [`crate::tables`]. They mirror the domain types in `objectio-auth` /
//! `objectio-manager` closely but are kept separate so that a change to
//! the wire format (this module) is never silently coupled to a change in
//! in-memory business types.

use objectio_common::{Acl, CorsRule, LifecycleRule, Tag, VersioningState};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Tenant record with live quota counters.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StoredTenant {
    pub tenant_id: String,
    pub display_name: String,
    pub created_at: i64,
    pub max_buckets: u64,
    pub current_buckets: u64,
    pub max_storage_bytes: u64,
    pub current_storage_bytes: u64,
    pub max_access_keys: u64,
    pub current_access_keys: u64,
    pub max_objects: u64,
    pub current_objects: u64,
}

/// Named resources a [`StoredTenant`]'s quota gates. Matches the S3
/// error's `resource` field for `QuotaExceeded`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QuotaResource {
    Buckets,
    Objects,
    StorageBytes,
    AccessKeys,
}

impl QuotaResource {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Buckets => "buckets",
            Self::Objects => "objects",
            Self::StorageBytes => "storage_bytes",
            Self::AccessKeys => "access_keys",
        }
    }
}

/// User record. `tenant_id` empty denotes the global scope.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StoredUser {
    pub user_id: String,
    pub tenant_id: String,
    pub login: String,
    pub password_hash: String,
    pub roles: Vec<String>,
    pub failed_login_attempts: u32,
    pub locked_until_epoch_secs: i64,
    pub last_failed_login_epoch_secs: i64,
    pub created_at: i64,
}

impl StoredUser {
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.roles.iter().any(|r| r == "admin")
    }

    #[must_use]
    pub fn is_global_admin(&self) -> bool {
        self.tenant_id.is_empty() && self.is_admin()
    }
}

/// Access key record, used only by the S3 endpoint.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StoredAccessKey {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub user_id: String,
    pub tenant_id: String,
    pub created_at: i64,
    pub expires_at: Option<i64>,
    pub enabled: bool,
}

/// Bucket record.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StoredBucket {
    pub name: String,
    pub owner_tenant_id: String,
    pub created_at: i64,
    pub versioning: VersioningState,
    pub cors: Vec<CorsRule>,
    pub lifecycle: Vec<LifecycleRule>,
    pub tags: Vec<Tag>,
    pub acl: Acl,
}

/// Where an object's payload lives.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum StorageLocation {
    /// A single blob handle (non-multipart object, or a composed copy).
    Single(String),
    /// An ordered list of part blob handles (multipart object left
    /// unconcatenated; see `CompleteMultipartUpload`).
    Parts(Vec<String>),
}

/// Object record: either a live object or a versioned delete-marker.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StoredObject {
    pub bucket: String,
    pub key: String,
    pub version_id: Option<String>,
    pub is_delete_marker: bool,
    pub size: u64,
    pub content_type: String,
    pub etag: String,
    pub storage: Option<StorageLocation>,
    pub last_modified: i64,
    pub metadata: HashMap<String, String>,
    pub tags: Vec<Tag>,
    pub acl: Acl,
    pub checksum_sha256: Option<String>,
}

/// State for an in-progress or terminal multipart upload.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StoredMultipartUpload {
    pub upload_id: String,
    pub bucket: String,
    pub key: String,
    pub initiator: String,
    pub content_type: String,
    pub metadata: HashMap<String, String>,
    pub created_at: i64,
    pub state: UploadState,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum UploadState {
    InProgress,
    Completed,
    Aborted,
}

/// A single uploaded part.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StoredPart {
    pub part_number: u32,
    pub etag: String,
    pub etag_raw_md5: [u8; 16],
    pub size: u64,
    pub storage_handle: String,
    pub last_modified: i64,
}

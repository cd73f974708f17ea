//! Redb table definitions for persistent metadata storage.
//!
//! One table per key prefix from the design's key layout rather than one
//! flat table keyed by a prefixed string — redb tables are already
//! namespaced, so this is the same scheme with typed access.

use redb::TableDefinition;

/// `T/<tenant_id>` -> bincode `Tenant`
pub const TENANTS: TableDefinition<&str, &[u8]> = TableDefinition::new("tenants");

/// `U/<tenant_id>/<login>` -> bincode `StoredUser`
pub const USERS: TableDefinition<&str, &[u8]> = TableDefinition::new("users");

/// `UID/<user_id>` -> `<tenant_id>/<login>` pointer into `USERS`
pub const USERS_BY_ID: TableDefinition<&str, &str> = TableDefinition::new("users_by_id");

/// `K/<access_key_id>` -> bincode `StoredAccessKey`
pub const ACCESS_KEYS: TableDefinition<&str, &[u8]> = TableDefinition::new("access_keys");

/// `B/<bucket>` -> bincode `StoredBucket`
pub const BUCKETS: TableDefinition<&str, &[u8]> = TableDefinition::new("buckets");

/// `O/<bucket>/<key>` -> bincode `StoredObject` (current version, or a
/// delete-marker record).
pub const OBJECTS: TableDefinition<&str, &[u8]> = TableDefinition::new("objects");

/// `OV/<bucket>/<key>/<version_id_reverse_time>` -> bincode `StoredObject`
/// (historical versions, newest-first by construction of the key).
pub const OBJECT_VERSIONS: TableDefinition<&str, &[u8]> =
    TableDefinition::new("object_versions");

/// `M/<upload_id>` -> bincode `StoredMultipartUpload`
pub const MULTIPART_UPLOADS: TableDefinition<&str, &[u8]> =
    TableDefinition::new("multipart_uploads");

/// `MP/<upload_id>/<part_number, 10-digit zero-padded>` -> bincode `StoredPart`
pub const MULTIPART_PARTS: TableDefinition<&str, &[u8]> = TableDefinition::new("multipart_parts");

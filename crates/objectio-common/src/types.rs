//! Core type definitions for ObjectIO
//!
//! This module defines the fundamental types used throughout the system:
//! identifiers, bucket/object name validation, and the small shared value
//! types (tags, ACLs, CORS/lifecycle rules) referenced by both the
//! metadata store and the object manager.

use derive_more::{Display, From, Into};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for an object version or upload (random, opaque).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, From, Into)]
pub struct ObjectId(Uuid);

impl ObjectId {
    /// Generate a new random id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }
}

impl Default for ObjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({})", self.0)
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Tenant id. The empty string denotes the global/root scope.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Display, Default)]
#[display("{_0}")]
pub struct TenantId(String);

impl TenantId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The global/root scope: the empty tenant id.
    #[must_use]
    pub fn global() -> Self {
        Self(String::new())
    }

    #[must_use]
    pub fn is_global(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TenantId({:?})", self.0)
    }
}

/// Bucket name (unique globally, validated per S3 naming rules).
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[display("{_0}")]
pub struct BucketName(String);

impl BucketName {
    /// Create a new bucket name, validating S3 naming rules.
    pub fn new(name: impl Into<String>) -> Result<Self, BucketNameError> {
        let name = name.into();
        Self::validate(&name)?;
        Ok(Self(name))
    }

    /// Create without validation (internal use only, e.g. reading stored keys).
    #[must_use]
    pub fn new_unchecked(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn validate(name: &str) -> Result<(), BucketNameError> {
        if name.len() < 3 {
            return Err(BucketNameError::TooShort);
        }
        if name.len() > 63 {
            return Err(BucketNameError::TooLong);
        }

        let first = name.chars().next().unwrap();
        if !first.is_ascii_lowercase() && !first.is_ascii_digit() {
            return Err(BucketNameError::InvalidStartChar);
        }

        let last = name.chars().last().unwrap();
        if !last.is_ascii_lowercase() && !last.is_ascii_digit() {
            return Err(BucketNameError::InvalidEndChar);
        }

        for c in name.chars() {
            if !c.is_ascii_lowercase() && !c.is_ascii_digit() && c != '-' && c != '.' {
                return Err(BucketNameError::InvalidChar(c));
            }
        }

        if name.contains("..") {
            return Err(BucketNameError::ConsecutivePeriods);
        }

        if name.parse::<std::net::Ipv4Addr>().is_ok() {
            return Err(BucketNameError::LooksLikeIpAddress);
        }

        Ok(())
    }
}

impl fmt::Debug for BucketName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BucketName({:?})", self.0)
    }
}

/// Errors that can occur when creating a bucket name.
#[derive(Debug, Clone, thiserror::Error)]
pub enum BucketNameError {
    #[error("bucket name must be at least 3 characters")]
    TooShort,
    #[error("bucket name must be at most 63 characters")]
    TooLong,
    #[error("bucket name must start with a lowercase letter or number")]
    InvalidStartChar,
    #[error("bucket name must end with a lowercase letter or number")]
    InvalidEndChar,
    #[error("bucket name contains invalid character: {0}")]
    InvalidChar(char),
    #[error("bucket name cannot contain consecutive periods")]
    ConsecutivePeriods,
    #[error("bucket name cannot be formatted as an IP address")]
    LooksLikeIpAddress,
}

/// Object key (path within a bucket).
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[display("{_0}")]
pub struct ObjectKey(String);

impl ObjectKey {
    pub fn new(key: impl Into<String>) -> Result<Self, ObjectKeyError> {
        let key = key.into();
        Self::validate(&key)?;
        Ok(Self(key))
    }

    #[must_use]
    pub fn new_unchecked(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn validate(key: &str) -> Result<(), ObjectKeyError> {
        if key.is_empty() {
            return Err(ObjectKeyError::Empty);
        }
        if key.len() > 1024 {
            return Err(ObjectKeyError::TooLong);
        }
        if key.contains('\0') {
            return Err(ObjectKeyError::NullByte);
        }
        if key.split('/').any(|component| component == "..") {
            return Err(ObjectKeyError::PathTraversal);
        }
        Ok(())
    }
}

impl fmt::Debug for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectKey({:?})", self.0)
    }
}

/// Errors that can occur when creating an object key.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ObjectKeyError {
    #[error("object key cannot be empty")]
    Empty,
    #[error("object key cannot exceed 1024 bytes")]
    TooLong,
    #[error("object key cannot contain a null byte")]
    NullByte,
    #[error("object key cannot contain a '..' path component")]
    PathTraversal,
}

/// An S3 tag (key/value pair). Distinct from custom object metadata.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub key: String,
    pub value: String,
}

/// Bucket versioning state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum VersioningState {
    #[default]
    Off,
    Enabled,
    Suspended,
}

/// ACL grant permission.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Permission {
    FullControl,
    Read,
    Write,
    ReadAcp,
    WriteAcp,
}

/// A single ACL grant.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grant {
    pub grantee: String,
    pub permission: Permission,
}

/// Access control list for a bucket or object. Default is owner-full-control.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Acl {
    pub owner: String,
    pub grants: Vec<Grant>,
}

impl Acl {
    #[must_use]
    pub fn owner_full_control(owner: impl Into<String>) -> Self {
        let owner = owner.into();
        Self {
            grants: vec![Grant {
                grantee: owner.clone(),
                permission: Permission::FullControl,
            }],
            owner,
        }
    }
}

/// A single CORS rule for a bucket.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorsRule {
    pub allowed_origins: Vec<String>,
    pub allowed_methods: Vec<String>,
    pub allowed_headers: Vec<String>,
    pub max_age_seconds: Option<u32>,
}

/// A single lifecycle rule for a bucket. Stored and returned faithfully;
/// no background sweep currently enforces expiration (see DESIGN.md).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleRule {
    pub id: String,
    pub prefix: String,
    pub expiration_days: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_id() {
        let id = ObjectId::new();
        assert_eq!(id.as_bytes().len(), 16);
    }

    #[test]
    fn test_bucket_name_valid() {
        assert!(BucketName::new("my-bucket").is_ok());
        assert!(BucketName::new("bucket123").is_ok());
        assert!(BucketName::new("a.b.c").is_ok());
    }

    #[test]
    fn test_bucket_name_invalid() {
        assert!(BucketName::new("ab").is_err());
        assert!(BucketName::new("-bucket").is_err());
        assert!(BucketName::new("bucket-").is_err());
        assert!(BucketName::new("Bucket").is_err());
        assert!(BucketName::new("bucket..name").is_err());
        assert!(BucketName::new("192.168.1.1").is_err());
    }

    #[test]
    fn test_object_key_valid() {
        assert!(ObjectKey::new("path/to/file.txt").is_ok());
        assert!(ObjectKey::new("a").is_ok());
    }

    #[test]
    fn test_object_key_invalid() {
        assert!(ObjectKey::new("").is_err());
        assert!(ObjectKey::new("a\0b").is_err());
        assert!(ObjectKey::new("../etc/passwd").is_err());
        assert!(ObjectKey::new("foo/../bar").is_err());
        assert!(ObjectKey::new("a".repeat(1025)).is_err());
    }

    #[test]
    fn test_tenant_id_global() {
        let t = TenantId::global();
        assert!(t.is_global());
        assert!(!TenantId::new("acme").is_global());
    }
}

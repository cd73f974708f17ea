//! Error types for ObjectIO
//!
//! Defines the single error taxonomy shared by the metadata store, blob
//! store, object manager and auth manager. The S3 dispatcher and console
//! API each render this into their own wire format rather than keeping a
//! second error enum.

use crate::types::{BucketNameError, ObjectKeyError};
use thiserror::Error;

/// Common result type for ObjectIO operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Common error type for ObjectIO.
#[derive(Debug, Error)]
pub enum Error {
    #[error("disk I/O error: {0}")]
    DiskIo(#[from] std::io::Error),

    #[error("no such bucket: {0}")]
    NoSuchBucket(String),

    #[error("no such key: {bucket}/{key}")]
    NoSuchKey { bucket: String, key: String },

    #[error("no such upload: {0}")]
    NoSuchUpload(String),

    /// Resource-not-found for Console entities (tenant, user, access key)
    /// that have no S3-specific `NoSuch*` variant of their own.
    #[error("not found: {0}")]
    NotFound(String),

    #[error("bucket already exists: {0}")]
    BucketAlreadyExists(String),

    #[error("bucket already owned by you: {0}")]
    BucketAlreadyOwnedByYou(String),

    #[error("bucket not empty: {0}")]
    BucketNotEmpty(String),

    #[error("invalid bucket name: {0}")]
    InvalidBucketName(#[from] BucketNameError),

    #[error("invalid object key: {0}")]
    InvalidObjectKey(#[from] ObjectKeyError),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("invalid tag count: at most 10 tags are allowed, got {0}")]
    InvalidTagCount(usize),

    #[error("part {part_number} is {size} bytes, below the {min} byte minimum")]
    EntityTooSmall { part_number: u32, size: u64, min: u64 },

    #[error("part {part_number} is {size} bytes, above the {max} byte maximum")]
    EntityTooLarge { part_number: u32, size: u64, max: u64 },

    #[error("signature does not match")]
    SignatureDoesNotMatch,

    #[error("access denied")]
    AccessDenied,

    #[error("account is locked until {locked_until_epoch_secs}")]
    AccountLocked { locked_until_epoch_secs: i64 },

    #[error("rate limited: too many attempts from this source")]
    RateLimited,

    #[error("quota exceeded for {resource}: current {current}, max {max}")]
    QuotaExceeded {
        resource: &'static str,
        current: u64,
        max: u64,
    },

    #[error("insufficient storage")]
    InsufficientStorage,

    #[error("request timed out")]
    Timeout,

    #[error("not implemented: {0}")]
    NotImplemented(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    #[must_use]
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    #[must_use]
    pub fn not_implemented(feature: impl Into<String>) -> Self {
        Self::NotImplemented(feature.into())
    }

    #[must_use]
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Whether a retry loop (e.g. a metadata store transaction) should
    /// keep this error private and retry, rather than surface it.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        false
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::NoSuchBucket(_) | Self::NoSuchKey { .. } | Self::NoSuchUpload(_) | Self::NotFound(_)
        )
    }

    /// HTTP status this error maps to on the S3 endpoint, per the table
    /// in spec §7.
    #[must_use]
    pub fn http_status_code(&self) -> u16 {
        match self {
            Self::NoSuchBucket(_) | Self::NoSuchKey { .. } | Self::NoSuchUpload(_) | Self::NotFound(_) => 404,
            Self::BucketAlreadyExists(_) | Self::BucketAlreadyOwnedByYou(_) => 409,
            Self::BucketNotEmpty(_) => 409,
            Self::InvalidBucketName(_) | Self::InvalidArgument(_) | Self::InvalidObjectKey(_) => {
                400
            }
            Self::InvalidTagCount(_) => 400,
            Self::EntityTooSmall { .. } | Self::EntityTooLarge { .. } => 400,
            Self::SignatureDoesNotMatch | Self::AccessDenied | Self::AccountLocked { .. } => 403,
            Self::RateLimited => 429,
            Self::QuotaExceeded { .. } => 403,
            Self::InsufficientStorage => 507,
            Self::Timeout => 504,
            Self::NotImplemented(_) => 501,
            Self::Internal(_) | Self::DiskIo(_) => 500,
        }
    }

    /// S3 error code this error renders as, per the table in spec §7.
    #[must_use]
    pub fn s3_error_code(&self) -> &'static str {
        match self {
            Self::NoSuchBucket(_) => "NoSuchBucket",
            Self::NoSuchKey { .. } => "NoSuchKey",
            Self::NoSuchUpload(_) => "NoSuchUpload",
            Self::NotFound(_) => "NotFound",
            Self::BucketAlreadyExists(_) => "BucketAlreadyExists",
            Self::BucketAlreadyOwnedByYou(_) => "BucketAlreadyOwnedByYou",
            Self::BucketNotEmpty(_) => "BucketNotEmpty",
            Self::InvalidBucketName(_) => "InvalidBucketName",
            Self::InvalidArgument(_) | Self::InvalidObjectKey(_) => "InvalidArgument",
            Self::InvalidTagCount(_) => "InvalidTagCount",
            Self::EntityTooSmall { .. } => "EntityTooSmall",
            Self::EntityTooLarge { .. } => "EntityTooLarge",
            Self::SignatureDoesNotMatch => "SignatureDoesNotMatch",
            Self::AccessDenied => "AccessDenied",
            Self::AccountLocked { .. } => "AccountLocked",
            Self::RateLimited => "RateLimited",
            Self::QuotaExceeded { .. } => "QuotaExceeded",
            Self::InsufficientStorage => "InsufficientStorage",
            Self::Timeout => "Timeout",
            Self::NotImplemented(_) => "NotImplemented",
            Self::Internal(_) | Self::DiskIo(_) => "InternalError",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_not_found() {
        assert!(Error::NoSuchBucket("b".into()).is_not_found());
        assert!(Error::NoSuchKey {
            bucket: "b".into(),
            key: "k".into()
        }
        .is_not_found());
        assert!(!Error::AccessDenied.is_not_found());
    }

    #[test]
    fn test_error_http_status_matches_table() {
        assert_eq!(Error::AccessDenied.http_status_code(), 403);
        assert_eq!(Error::NoSuchBucket("b".into()).http_status_code(), 404);
        assert_eq!(Error::Internal("x".into()).http_status_code(), 500);
        assert_eq!(Error::RateLimited.http_status_code(), 429);
        assert_eq!(Error::InsufficientStorage.http_status_code(), 507);
        assert_eq!(Error::Timeout.http_status_code(), 504);
        assert_eq!(
            Error::QuotaExceeded {
                resource: "storage",
                current: 1,
                max: 1
            }
            .http_status_code(),
            403
        );
    }

    #[test]
    fn test_error_s3_code() {
        assert_eq!(Error::NoSuchKey {
            bucket: "b".into(),
            key: "k".into()
        }
        .s3_error_code(), "NoSuchKey");
        assert_eq!(
            Error::AccountLocked {
                locked_until_epoch_secs: 0
            }
            .s3_error_code(),
            "AccountLocked"
        );
    }
}

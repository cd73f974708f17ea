//! ObjectIO Object Manager (component C).
//!
//! Owns bucket and object lifecycle on top of the metadata store
//! (`objectio-meta-store`) and blob store (`objectio-storage`), enforcing
//! per-tenant quotas (`objectio-auth::quota`) on every write. This is the
//! only crate that knows how a `PutObject` call touches both a blob and a
//! metadata record, and how to unwind one if the other fails.

mod acl;
mod manager;
mod multipart;

pub use manager::{ListObjectsResult, MetadataDirective, ObjectManager, PutObjectRequest};
pub use multipart::{
    CompletedPart, InitiateMultipartUploadResult, ListMultipartUploadsResult, ListPartsResult,
    UploadPartResult,
};

//! Bucket-policy sub-resource. Per the design notes this spec's scope
//! stops at `NotImplemented`; the query key is still recognized so it
//! never falls through to the generic bucket handler.

use crate::error::error_response;
use axum::response::Response;
use objectio_common::Error;

pub async fn get_bucket_policy() -> Response {
    error_response(&Error::not_implemented("GetBucketPolicy"), None)
}

pub async fn put_bucket_policy() -> Response {
    error_response(&Error::not_implemented("PutBucketPolicy"), None)
}

pub async fn delete_bucket_policy() -> Response {
    error_response(&Error::not_implemented("DeleteBucketPolicy"), None)
}

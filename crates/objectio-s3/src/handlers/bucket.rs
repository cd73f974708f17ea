//! Bucket-level handlers: lifecycle, listing, and the per-bucket
//! sub-resources (versioning, CORS, lifecycle, tagging, ACL) that share
//! the bucket's method+path and are discriminated by query key.

use crate::error::error_response;
use crate::state::AppState;
use crate::xml::{
    self, Bucket, Buckets, ListBucketResult, ListBucketsResult, Owner, VersioningConfigurationXml,
};
use axum::extract::{Extension, Path, Query, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use objectio_auth::AuthResult;
use objectio_common::VersioningState;
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Deserialize, Default)]
pub struct BucketPutParams {
    versioning: Option<String>,
    cors: Option<String>,
    lifecycle: Option<String>,
    tagging: Option<String>,
    acl: Option<String>,
    policy: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct BucketGetParams {
    prefix: Option<String>,
    delimiter: Option<String>,
    #[serde(rename = "max-keys")]
    max_keys: Option<u32>,
    #[serde(rename = "continuation-token")]
    continuation_token: Option<String>,
    versioning: Option<String>,
    cors: Option<String>,
    lifecycle: Option<String>,
    tagging: Option<String>,
    acl: Option<String>,
    uploads: Option<String>,
    policy: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct BucketDeleteParams {
    cors: Option<String>,
    lifecycle: Option<String>,
    tagging: Option<String>,
    policy: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct BucketPostParams {
    delete: Option<String>,
}

fn xml_ok(body: impl serde::Serialize) -> Response {
    let xml = xml::xml_prolog(&quick_xml::se::to_string(&body).unwrap_or_default());
    (StatusCode::OK, [(header::CONTENT_TYPE, "application/xml")], xml).into_response()
}

/// `GET /` — list the buckets owned by the caller's tenant.
pub async fn list_buckets(State(state): State<Arc<AppState>>, Extension(auth): Extension<AuthResult>) -> Response {
    match state.manager.list_buckets(&auth.tenant_id) {
        Ok(buckets) => xml_ok(ListBucketsResult {
            owner: Owner { id: auth.tenant_id.clone(), display_name: auth.tenant_id.clone() },
            buckets: Buckets { bucket: buckets.iter().map(Bucket::from).collect() },
        }),
        Err(e) => error_response(&e, None),
    }
}

/// `PUT /{bucket}` and its sub-resources.
pub async fn put_bucket(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthResult>,
    Path(bucket): Path<String>,
    Query(params): Query<BucketPutParams>,
    body: Bytes,
) -> Response {
    if params.versioning.is_some() {
        return put_bucket_versioning(&state, &auth.tenant_id, &bucket, &body);
    }
    if params.cors.is_some() {
        return put_bucket_cors(&state, &auth.tenant_id, &bucket, &body);
    }
    if params.lifecycle.is_some() {
        return put_bucket_lifecycle(&state, &auth.tenant_id, &bucket, &body);
    }
    if params.tagging.is_some() {
        return put_bucket_tagging(&state, &auth.tenant_id, &bucket, &body);
    }
    if params.acl.is_some() {
        return put_bucket_acl(&state, &auth.tenant_id, &bucket, &body);
    }
    if params.policy.is_some() {
        return crate::handlers::policy::put_bucket_policy().await;
    }

    let now = chrono::Utc::now().timestamp();
    match state.manager.create_bucket(&auth.tenant_id, &bucket, now) {
        Ok(_) => Response::builder()
            .status(StatusCode::OK)
            .header("Location", format!("/{bucket}"))
            .body(axum::body::Body::empty())
            .expect("bucket creation response is well-formed"),
        Err(e) => error_response(&e, Some(&bucket)),
    }
}

fn put_bucket_versioning(state: &AppState, tenant_id: &str, bucket: &str, body: &[u8]) -> Response {
    let parsed: VersioningConfigurationXml = match quick_xml::de::from_reader(body) {
        Ok(p) => p,
        Err(e) => return error_response(&objectio_common::Error::invalid_argument(e.to_string()), Some(bucket)),
    };
    let target = match parsed.status.as_deref() {
        Some("Enabled") => VersioningState::Enabled,
        Some("Suspended") => VersioningState::Suspended,
        _ => VersioningState::Off,
    };
    match state.manager.set_bucket_versioning(tenant_id, bucket, target) {
        Ok(()) => StatusCode::OK.into_response(),
        Err(e) => error_response(&e, Some(bucket)),
    }
}

fn put_bucket_cors(state: &AppState, tenant_id: &str, bucket: &str, body: &[u8]) -> Response {
    let parsed = match quick_xml::de::from_reader(body) {
        Ok(p) => p,
        Err(e) => return error_response(&objectio_common::Error::invalid_argument(e.to_string()), Some(bucket)),
    };
    match state.manager.set_bucket_cors(tenant_id, bucket, xml::cors_from_xml(&parsed)) {
        Ok(()) => StatusCode::OK.into_response(),
        Err(e) => error_response(&e, Some(bucket)),
    }
}

fn put_bucket_lifecycle(state: &AppState, tenant_id: &str, bucket: &str, body: &[u8]) -> Response {
    let parsed = match quick_xml::de::from_reader(body) {
        Ok(p) => p,
        Err(e) => return error_response(&objectio_common::Error::invalid_argument(e.to_string()), Some(bucket)),
    };
    match state.manager.set_bucket_lifecycle(tenant_id, bucket, xml::lifecycle_from_xml(&parsed)) {
        Ok(()) => StatusCode::OK.into_response(),
        Err(e) => error_response(&e, Some(bucket)),
    }
}

fn put_bucket_tagging(state: &AppState, tenant_id: &str, bucket: &str, body: &[u8]) -> Response {
    let parsed: xml::TaggingXml = match quick_xml::de::from_reader(body) {
        Ok(p) => p,
        Err(e) => return error_response(&objectio_common::Error::invalid_argument(e.to_string()), Some(bucket)),
    };
    let tags = parsed.tag_set.tag.iter().map(objectio_common::Tag::from).collect();
    match state.manager.set_bucket_tagging(tenant_id, bucket, tags) {
        Ok(()) => StatusCode::OK.into_response(),
        Err(e) => error_response(&e, Some(bucket)),
    }
}

fn put_bucket_acl(state: &AppState, tenant_id: &str, bucket: &str, body: &[u8]) -> Response {
    let parsed = match quick_xml::de::from_reader(body) {
        Ok(p) => p,
        Err(e) => return error_response(&objectio_common::Error::invalid_argument(e.to_string()), Some(bucket)),
    };
    match state.manager.set_bucket_acl(bucket, tenant_id, xml::acl_from_xml(&parsed)) {
        Ok(()) => StatusCode::OK.into_response(),
        Err(e) => error_response(&e, Some(bucket)),
    }
}

/// `HEAD /{bucket}` — existence probe only.
pub async fn head_bucket(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthResult>,
    Path(bucket): Path<String>,
) -> Response {
    match state.manager.get_bucket(&auth.tenant_id, &bucket) {
        Ok(_) => StatusCode::OK.into_response(),
        Err(e) => StatusCode::from_u16(e.http_status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR).into_response(),
    }
}

/// `DELETE /{bucket}` and its sub-resources.
pub async fn delete_bucket(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthResult>,
    Path(bucket): Path<String>,
    Query(params): Query<BucketDeleteParams>,
) -> Response {
    if params.cors.is_some() {
        return match state.manager.set_bucket_cors(&auth.tenant_id, &bucket, Vec::new()) {
            Ok(()) => StatusCode::NO_CONTENT.into_response(),
            Err(e) => error_response(&e, Some(&bucket)),
        };
    }
    if params.lifecycle.is_some() {
        return match state.manager.set_bucket_lifecycle(&auth.tenant_id, &bucket, Vec::new()) {
            Ok(()) => StatusCode::NO_CONTENT.into_response(),
            Err(e) => error_response(&e, Some(&bucket)),
        };
    }
    if params.tagging.is_some() {
        return match state.manager.delete_bucket_tagging(&auth.tenant_id, &bucket) {
            Ok(()) => StatusCode::NO_CONTENT.into_response(),
            Err(e) => error_response(&e, Some(&bucket)),
        };
    }
    if params.policy.is_some() {
        return crate::handlers::policy::delete_bucket_policy().await;
    }

    match state.manager.delete_bucket(&auth.tenant_id, &bucket) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => error_response(&e, Some(&bucket)),
    }
}

/// `GET /{bucket}` and its sub-resources (ListObjects plus versioning,
/// CORS, lifecycle, tagging, ACL, and in-progress multipart uploads).
pub async fn get_bucket(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthResult>,
    Path(bucket): Path<String>,
    Query(params): Query<BucketGetParams>,
) -> Response {
    if params.versioning.is_some() {
        return match state.manager.get_bucket(&auth.tenant_id, &bucket) {
            Ok(b) => xml_ok(VersioningConfigurationXml {
                status: match b.versioning {
                    VersioningState::Off => None,
                    VersioningState::Enabled => Some("Enabled".to_string()),
                    VersioningState::Suspended => Some("Suspended".to_string()),
                },
            }),
            Err(e) => error_response(&e, Some(&bucket)),
        };
    }
    if params.cors.is_some() {
        return match state.manager.get_bucket(&auth.tenant_id, &bucket) {
            Ok(b) => xml_ok(xml::cors_to_xml(&b.cors)),
            Err(e) => error_response(&e, Some(&bucket)),
        };
    }
    if params.lifecycle.is_some() {
        return match state.manager.get_bucket(&auth.tenant_id, &bucket) {
            Ok(b) => xml_ok(xml::lifecycle_to_xml(&b.lifecycle)),
            Err(e) => error_response(&e, Some(&bucket)),
        };
    }
    if params.tagging.is_some() {
        return match state.manager.get_bucket_tagging(&auth.tenant_id, &bucket) {
            Ok(tags) => xml_ok(xml::tagging_xml(&tags)),
            Err(e) => error_response(&e, Some(&bucket)),
        };
    }
    if params.acl.is_some() {
        return match state.manager.get_bucket_acl(&bucket, &auth.tenant_id) {
            Ok(acl) => xml_ok(xml::acl_to_xml(&acl)),
            Err(e) => error_response(&e, Some(&bucket)),
        };
    }
    if params.policy.is_some() {
        return crate::handlers::policy::get_bucket_policy().await;
    }
    if params.uploads.is_some() {
        return match state.manager.list_multipart_uploads(&bucket, &auth.tenant_id) {
            Ok(result) => xml_ok(crate::xml::ListMultipartUploadsResult {
                bucket: bucket.clone(),
                is_truncated: false,
                upload: result.uploads.iter().map(crate::xml::UploadItem::from).collect(),
            }),
            Err(e) => error_response(&e, Some(&bucket)),
        };
    }

    let prefix = params.prefix.clone().unwrap_or_default();
    let max_keys = params.max_keys.unwrap_or(1000) as usize;
    match state.manager.list_objects(
        &bucket,
        &auth.tenant_id,
        &prefix,
        params.delimiter.as_deref(),
        params.continuation_token.as_deref(),
        max_keys,
    ) {
        Ok(result) => xml_ok(ListBucketResult {
            name: bucket.clone(),
            prefix,
            delimiter: params.delimiter.clone(),
            max_keys: max_keys as u32,
            is_truncated: result.is_truncated,
            next_continuation_token: result.next_continuation_token,
            common_prefixes: result
                .common_prefixes
                .into_iter()
                .map(|prefix| xml::CommonPrefix { prefix })
                .collect(),
            contents: result.objects.iter().map(xml::ObjectContent::from).collect(),
        }),
        Err(e) => error_response(&e, Some(&bucket)),
    }
}

/// `POST /{bucket}?delete` — bulk delete.
pub async fn post_bucket(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthResult>,
    Path(bucket): Path<String>,
    Query(params): Query<BucketPostParams>,
    body: Bytes,
) -> Response {
    if params.delete.is_none() {
        return error_response(
            &objectio_common::Error::invalid_argument("unsupported POST on bucket"),
            Some(&bucket),
        );
    }

    let parsed: xml::DeleteObjectsRequest = match quick_xml::de::from_reader(body.as_ref()) {
        Ok(p) => p,
        Err(e) => return error_response(&objectio_common::Error::invalid_argument(e.to_string()), Some(&bucket)),
    };
    let keys: Vec<String> = parsed.object.iter().map(|o| o.key.clone()).collect();
    let results = state.manager.delete_objects(&bucket, &auth.tenant_id, &keys).await;

    let mut deleted = Vec::new();
    let mut errors = Vec::new();
    for (key, outcome) in results {
        match outcome {
            Ok(()) => deleted.push(xml::DeletedObject { key }),
            Err(e) => errors.push(xml::DeleteError {
                key,
                code: e.s3_error_code().to_string(),
                message: e.to_string(),
            }),
        }
    }
    xml_ok(xml::DeleteObjectsResult { deleted, error: errors })
}

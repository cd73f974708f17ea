//! Object-level handlers: PutObject, GetObject, HeadObject, DeleteObject,
//! CopyObject, and the object tagging/ACL sub-resources. UploadPart and
//! UploadPartCopy share this crate's path shape but live in
//! [`crate::handlers::multipart`] since they mutate an in-progress upload
//! rather than the object itself.

use crate::error::error_response;
use crate::handlers::multipart::{ObjectPostParams, initiate_multipart_upload, upload_part, upload_part_copy};
use crate::state::AppState;
use crate::xml::{self, CopyObjectResult};
use axum::body::Body;
use axum::extract::{Extension, Path, Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use objectio_auth::AuthResult;
use objectio_common::Tag;
use objectio_manager::MetadataDirective;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Deserialize, Default)]
pub struct ObjectPutParams {
    #[serde(rename = "uploadId")]
    pub upload_id: Option<String>,
    #[serde(rename = "partNumber")]
    pub part_number: Option<u32>,
    pub tagging: Option<String>,
    pub acl: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct ObjectGetParams {
    #[serde(rename = "uploadId")]
    pub upload_id: Option<String>,
    pub tagging: Option<String>,
    pub acl: Option<String>,
    #[serde(rename = "versionId")]
    pub version_id: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct ObjectDeleteParams {
    #[serde(rename = "uploadId")]
    pub upload_id: Option<String>,
    pub tagging: Option<String>,
}

fn extract_user_metadata(headers: &HeaderMap) -> HashMap<String, String> {
    let mut metadata = HashMap::new();
    for (name, value) in headers.iter() {
        let name_str = name.as_str().to_lowercase();
        if let Some(stripped) = name_str.strip_prefix("x-amz-meta-") {
            if let Ok(value_str) = value.to_str() {
                metadata.insert(stripped.to_string(), value_str.to_string());
            }
        }
    }
    metadata
}

fn add_metadata_headers(mut builder: axum::http::response::Builder, metadata: &HashMap<String, String>) -> axum::http::response::Builder {
    for (key, value) in metadata {
        builder = builder.header(format!("x-amz-meta-{key}"), value);
    }
    builder
}

/// `x-amz-copy-source` is `"bucket/key"`, optionally URL-encoded and
/// leading-slashed.
fn parse_copy_source(header: &str) -> Option<(String, String)> {
    let decoded = urlencoding::decode(header).ok()?;
    let trimmed = decoded.trim_start_matches('/');
    let (bucket, key) = trimmed.split_once('/')?;
    Some((bucket.to_string(), key.to_string()))
}

/// Parses a `Range: bytes=start-end` header into an inclusive `(start, end)`
/// pair, resolving open-ended and suffix forms against `total_size`.
fn parse_range_header(range_header: &str, total_size: u64) -> Option<(u64, u64)> {
    let spec = range_header.trim().strip_prefix("bytes=")?;
    let (start_str, end_str) = spec.split_once('-')?;
    if start_str.is_empty() && end_str.is_empty() {
        return None;
    }
    if start_str.is_empty() {
        let suffix_len: u64 = end_str.parse().ok()?;
        let suffix_len = suffix_len.min(total_size);
        return Some((total_size.saturating_sub(suffix_len), total_size.saturating_sub(1)));
    }
    let start: u64 = start_str.parse().ok()?;
    let end = if end_str.is_empty() { total_size.saturating_sub(1) } else { end_str.parse().ok()? };
    if start > end || start >= total_size {
        return None;
    }
    Some((start, end.min(total_size.saturating_sub(1))))
}

/// `PUT /{bucket}/{*key}` and its sub-resources, plus `UploadPart`,
/// `UploadPartCopy`, and `CopyObject`.
pub async fn put_object(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthResult>,
    Path((bucket, key)): Path<(String, String)>,
    Query(params): Query<ObjectPutParams>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if let (Some(upload_id), Some(part_number)) = (&params.upload_id, params.part_number) {
        let copy_source = headers.get("x-amz-copy-source").and_then(|v| v.to_str().ok());
        return if let Some(source) = copy_source {
            upload_part_copy(&state, upload_id, &auth.tenant_id, part_number, source, &headers).await
        } else {
            upload_part(&state, upload_id, &auth.tenant_id, part_number, body).await
        };
    }

    if params.tagging.is_some() {
        let parsed: xml::TaggingXml = match quick_xml::de::from_reader(body.as_ref()) {
            Ok(p) => p,
            Err(e) => return error_response(&objectio_common::Error::invalid_argument(e.to_string()), Some(&key)),
        };
        let tags: Vec<Tag> = parsed.tag_set.tag.iter().map(Tag::from).collect();
        return match state.manager.set_object_tagging(&bucket, &key, &auth.tenant_id, tags) {
            Ok(()) => StatusCode::OK.into_response(),
            Err(e) => error_response(&e, Some(&key)),
        };
    }

    if params.acl.is_some() {
        let parsed = match quick_xml::de::from_reader(body.as_ref()) {
            Ok(p) => p,
            Err(e) => return error_response(&objectio_common::Error::invalid_argument(e.to_string()), Some(&key)),
        };
        return match state.manager.set_object_acl(&bucket, &key, &auth.tenant_id, xml::acl_from_xml(&parsed)) {
            Ok(()) => StatusCode::OK.into_response(),
            Err(e) => error_response(&e, Some(&key)),
        };
    }

    if let Some(source) = headers.get("x-amz-copy-source").and_then(|v| v.to_str().ok()) {
        let Some((src_bucket, src_key)) = parse_copy_source(source) else {
            return error_response(
                &objectio_common::Error::invalid_argument("invalid x-amz-copy-source"),
                Some(&key),
            );
        };
        let directive = match headers.get("x-amz-metadata-directive").and_then(|v| v.to_str().ok()) {
            Some("REPLACE") => MetadataDirective::Replace,
            _ => MetadataDirective::Copy,
        };
        let content_type = headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let metadata = extract_user_metadata(&headers);
        return match state
            .manager
            .copy_object(
                &src_bucket,
                &src_key,
                None,
                &bucket,
                &key,
                &auth.tenant_id,
                directive,
                content_type,
                Some(metadata),
            )
            .await
        {
            Ok(stored) => {
                let xml = xml::xml_prolog(
                    &quick_xml::se::to_string(&CopyObjectResult {
                        etag: stored.etag,
                        last_modified: xml::timestamp_to_iso(stored.last_modified),
                    })
                    .unwrap_or_default(),
                );
                (StatusCode::OK, [(header::CONTENT_TYPE, "application/xml")], xml).into_response()
            }
            Err(e) => error_response(&e, Some(&key)),
        };
    }

    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("application/octet-stream")
        .to_string();
    let metadata = extract_user_metadata(&headers);

    match state
        .manager
        .put_object(objectio_manager::PutObjectRequest {
            bucket: bucket.clone(),
            key: key.clone(),
            tenant_id: auth.tenant_id.clone(),
            body,
            content_type,
            metadata,
        })
        .await
    {
        Ok(stored) => Response::builder()
            .status(StatusCode::OK)
            .header(header::ETAG, format!("\"{}\"", stored.etag))
            .body(Body::empty())
            .expect("put object response is well-formed"),
        Err(e) => error_response(&e, Some(&key)),
    }
}

/// `GET /{bucket}/{*key}` and its sub-resources, plus `ListParts`.
pub async fn get_object(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthResult>,
    Path((bucket, key)): Path<(String, String)>,
    Query(params): Query<ObjectGetParams>,
    headers: HeaderMap,
) -> Response {
    if let Some(upload_id) = &params.upload_id {
        return crate::handlers::multipart::list_parts(&state, &auth.tenant_id, &bucket, &key, upload_id).await;
    }
    if params.tagging.is_some() {
        return match state.manager.get_object_tagging(&bucket, &key, &auth.tenant_id) {
            Ok(tags) => {
                let xml = xml::xml_prolog(&quick_xml::se::to_string(&xml::tagging_xml(&tags)).unwrap_or_default());
                (StatusCode::OK, [(header::CONTENT_TYPE, "application/xml")], xml).into_response()
            }
            Err(e) => error_response(&e, Some(&key)),
        };
    }
    if params.acl.is_some() {
        return match state.manager.get_object_acl(&bucket, &key, &auth.tenant_id) {
            Ok(acl) => {
                let xml = xml::xml_prolog(&quick_xml::se::to_string(&xml::acl_to_xml(&acl)).unwrap_or_default());
                (StatusCode::OK, [(header::CONTENT_TYPE, "application/xml")], xml).into_response()
            }
            Err(e) => error_response(&e, Some(&key)),
        };
    }

    let head = match state.manager.head_object(&bucket, &key, &auth.tenant_id) {
        Ok(h) => h,
        Err(e) => return error_response(&e, Some(&key)),
    };
    let range = headers
        .get(header::RANGE)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| parse_range_header(s, head.size));

    match state
        .manager
        .get_object(&bucket, &key, &auth.tenant_id, params.version_id.as_deref(), range)
        .await
    {
        Ok((record, body)) => {
            let status = if range.is_some() { StatusCode::PARTIAL_CONTENT } else { StatusCode::OK };
            let mut builder = Response::builder()
                .status(status)
                .header(header::CONTENT_TYPE, &record.content_type)
                .header(header::CONTENT_LENGTH, body.len())
                .header(header::ETAG, format!("\"{}\"", record.etag))
                .header(header::LAST_MODIFIED, xml::timestamp_to_iso(record.last_modified));
            if let Some((start, end)) = range {
                builder = builder.header(
                    header::CONTENT_RANGE,
                    format!("bytes {start}-{end}/{}", record.size),
                );
            }
            builder = add_metadata_headers(builder, &record.metadata);
            builder.body(Body::from(body)).expect("get object response is well-formed")
        }
        Err(e) => error_response(&e, Some(&key)),
    }
}

/// `HEAD /{bucket}/{*key}` — metadata probe, no body.
pub async fn head_object(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthResult>,
    Path((bucket, key)): Path<(String, String)>,
) -> Response {
    match state.manager.head_object(&bucket, &key, &auth.tenant_id) {
        Ok(record) => {
            let mut builder = Response::builder()
                .status(StatusCode::OK)
                .header(header::CONTENT_TYPE, &record.content_type)
                .header(header::CONTENT_LENGTH, record.size)
                .header(header::ETAG, format!("\"{}\"", record.etag))
                .header(header::LAST_MODIFIED, xml::timestamp_to_iso(record.last_modified));
            builder = add_metadata_headers(builder, &record.metadata);
            builder.body(Body::empty()).expect("head object response is well-formed")
        }
        Err(e) => StatusCode::from_u16(e.http_status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR).into_response(),
    }
}

/// `DELETE /{bucket}/{*key}` and its sub-resources, plus `AbortMultipartUpload`.
pub async fn delete_object(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthResult>,
    Path((bucket, key)): Path<(String, String)>,
    Query(params): Query<ObjectDeleteParams>,
) -> Response {
    if let Some(upload_id) = &params.upload_id {
        return match state.manager.abort_multipart_upload(upload_id, &auth.tenant_id).await {
            Ok(()) => StatusCode::NO_CONTENT.into_response(),
            Err(e) => error_response(&e, Some(&key)),
        };
    }
    if params.tagging.is_some() {
        return match state.manager.delete_object_tagging(&bucket, &key, &auth.tenant_id) {
            Ok(()) => StatusCode::NO_CONTENT.into_response(),
            Err(e) => error_response(&e, Some(&key)),
        };
    }

    match state.manager.delete_object(&bucket, &key, &auth.tenant_id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => error_response(&e, Some(&key)),
    }
}

/// `POST /{bucket}/{*key}` — `InitiateMultipartUpload` / `CompleteMultipartUpload`.
pub async fn post_object(
    state: State<Arc<AppState>>,
    auth: Extension<AuthResult>,
    path: Path<(String, String)>,
    Query(params): Query<ObjectPostParams>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if params.uploads.is_some() {
        return initiate_multipart_upload(state, auth, path, headers).await;
    }
    if params.upload_id.is_some() {
        return crate::handlers::multipart::complete_multipart_upload(state, auth, path, Query(params), body).await;
    }
    error_response(&objectio_common::Error::invalid_argument("unsupported POST on object"), None)
}

//! Multipart upload handlers: initiate, upload part (plus its copy
//! variant), complete, list parts. List-in-progress-uploads lives on the
//! bucket (`?uploads`); abort lives on the object (`DELETE ?uploadId`).

use crate::error::error_response;
use crate::state::AppState;
use crate::xml::{self, CompleteMultipartUploadResult, CompleteMultipartUploadXml, InitiateMultipartUploadResult};
use axum::extract::{Extension, Path, Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use objectio_auth::AuthResult;
use objectio_manager::CompletedPart;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Deserialize, Default)]
pub struct ObjectPostParams {
    pub uploads: Option<String>,
    #[serde(rename = "uploadId")]
    pub upload_id: Option<String>,
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

/// `POST /{bucket}/{*key}?uploads` — start a multipart upload.
pub async fn initiate_multipart_upload(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthResult>,
    Path((bucket, key)): Path<(String, String)>,
    headers: HeaderMap,
) -> Response {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("application/octet-stream")
        .to_string();
    let metadata = extract_user_metadata(&headers);

    match state.manager.initiate_multipart_upload(
        &bucket,
        &key,
        &auth.tenant_id,
        &auth.user_id,
        &content_type,
        metadata,
    ) {
        Ok(result) => {
            let xml = xml::xml_prolog(
                &quick_xml::se::to_string(&InitiateMultipartUploadResult {
                    bucket,
                    key,
                    upload_id: result.upload_id,
                })
                .unwrap_or_default(),
            );
            (StatusCode::OK, [(header::CONTENT_TYPE, "application/xml")], xml).into_response()
        }
        Err(e) => error_response(&e, Some(&key)),
    }
}

/// `PUT /{bucket}/{*key}?uploadId=..&partNumber=..` without a copy source.
pub async fn upload_part(state: &AppState, upload_id: &str, tenant_id: &str, part_number: u32, body: Bytes) -> Response {
    match state.manager.upload_part(upload_id, tenant_id, part_number, body).await {
        Ok(result) => Response::builder()
            .status(StatusCode::OK)
            .header(header::ETAG, format!("\"{}\"", result.etag))
            .body(axum::body::Body::empty())
            .expect("upload part response is well-formed"),
        Err(e) => error_response(&e, None),
    }
}

/// Same as [`upload_part`] but the part body is copied from another object,
/// named by the `x-amz-copy-source` header with an optional
/// `x-amz-copy-source-range`.
pub async fn upload_part_copy(
    state: &AppState,
    upload_id: &str,
    tenant_id: &str,
    part_number: u32,
    source: &str,
    headers: &HeaderMap,
) -> Response {
    let decoded = match urlencoding::decode(source) {
        Ok(d) => d,
        Err(e) => return error_response(&objectio_common::Error::invalid_argument(e.to_string()), None),
    };
    let trimmed = decoded.trim_start_matches('/');
    let Some((src_bucket, src_key)) = trimmed.split_once('/') else {
        return error_response(&objectio_common::Error::invalid_argument("invalid x-amz-copy-source"), None);
    };
    let range = headers
        .get("x-amz-copy-source-range")
        .and_then(|v| v.to_str().ok())
        .and_then(parse_copy_range);

    match state
        .manager
        .upload_part_copy(upload_id, tenant_id, part_number, src_bucket, src_key, None, range)
        .await
    {
        Ok(result) => Response::builder()
            .status(StatusCode::OK)
            .header(header::ETAG, format!("\"{}\"", result.etag))
            .body(axum::body::Body::empty())
            .expect("upload part copy response is well-formed"),
        Err(e) => error_response(&e, None),
    }
}

fn parse_copy_range(header: &str) -> Option<(u64, u64)> {
    let spec = header.trim().strip_prefix("bytes=")?;
    let (start, end) = spec.split_once('-')?;
    Some((start.parse().ok()?, end.parse().ok()?))
}

/// `POST /{bucket}/{*key}?uploadId=..` — concatenate uploaded parts.
pub async fn complete_multipart_upload(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthResult>,
    Path((bucket, key)): Path<(String, String)>,
    Query(params): Query<ObjectPostParams>,
    body: Bytes,
) -> Response {
    let Some(upload_id) = params.upload_id else {
        return error_response(&objectio_common::Error::invalid_argument("missing uploadId"), Some(&key));
    };
    let parsed: CompleteMultipartUploadXml = match quick_xml::de::from_reader(body.as_ref()) {
        Ok(p) => p,
        Err(e) => return error_response(&objectio_common::Error::invalid_argument(e.to_string()), Some(&key)),
    };
    let parts: Vec<CompletedPart> = parsed
        .part
        .iter()
        .map(|p| CompletedPart { part_number: p.part_number, etag: p.etag.trim_matches('"').to_string() })
        .collect();

    match state
        .manager
        .complete_multipart_upload(&upload_id, &auth.tenant_id, &parts)
        .await
    {
        Ok(stored) => {
            let xml = xml::xml_prolog(
                &quick_xml::se::to_string(&CompleteMultipartUploadResult {
                    location: format!("/{bucket}/{key}"),
                    bucket,
                    key,
                    etag: stored.etag,
                })
                .unwrap_or_default(),
            );
            (StatusCode::OK, [(header::CONTENT_TYPE, "application/xml")], xml).into_response()
        }
        Err(e) => error_response(&e, Some(&key)),
    }
}

/// `GET /{bucket}/{*key}?uploadId=..` — list the parts uploaded so far.
pub async fn list_parts(state: &AppState, tenant_id: &str, bucket: &str, key: &str, upload_id: &str) -> Response {
    match state.manager.list_parts(upload_id, tenant_id) {
        Ok(result) => {
            let xml = xml::xml_prolog(
                &quick_xml::se::to_string(&xml::ListPartsResult {
                    bucket: bucket.to_string(),
                    key: key.to_string(),
                    upload_id: upload_id.to_string(),
                    is_truncated: false,
                    part: result.parts.iter().map(xml::PartItem::from).collect(),
                })
                .unwrap_or_default(),
            );
            (StatusCode::OK, [(header::CONTENT_TYPE, "application/xml")], xml).into_response()
        }
        Err(e) => error_response(&e, Some(key)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::test_support::{auth_result, body_bytes, state_with_tenant};

    #[tokio::test]
    async fn initiate_upload_part_complete_roundtrip() {
        let (_dir, state) = state_with_tenant("tenant-a").await;
        let auth = auth_result("tenant-a");
        state.manager.create_bucket(&auth.tenant_id, "bucket", 0).unwrap();

        let initiated = initiate_multipart_upload(
            State(state.clone()),
            Extension(auth.clone()),
            Path(("bucket".to_string(), "big.bin".to_string())),
            HeaderMap::new(),
        )
        .await;
        assert_eq!(initiated.status(), StatusCode::OK);
        let body = String::from_utf8(body_bytes(initiated).await).unwrap();
        let upload_id = extract_tag(&body, "UploadId").expect("UploadId present");

        let part_resp = upload_part(&state, &upload_id, &auth.tenant_id, 1, Bytes::from_static(b"part-one-data")).await;
        assert_eq!(part_resp.status(), StatusCode::OK);
        let etag = part_resp
            .headers()
            .get(header::ETAG)
            .and_then(|v| v.to_str().ok())
            .unwrap()
            .trim_matches('"')
            .to_string();

        let complete_body = format!(
            "<CompleteMultipartUpload><Part><PartNumber>1</PartNumber><ETag>\"{etag}\"</ETag></Part></CompleteMultipartUpload>"
        );
        let complete_resp = complete_multipart_upload(
            State(state),
            Extension(auth),
            Path(("bucket".to_string(), "big.bin".to_string())),
            Query(ObjectPostParams { uploads: None, upload_id: Some(upload_id) }),
            Bytes::from(complete_body),
        )
        .await;
        assert_eq!(complete_resp.status(), StatusCode::OK);
    }

    fn extract_tag(xml: &str, tag: &str) -> Option<String> {
        let open = format!("<{tag}>");
        let close = format!("</{tag}>");
        let start = xml.find(&open)? + open.len();
        let end = xml[start..].find(&close)? + start;
        Some(xml[start..end].to_string())
    }

    #[test]
    fn parse_copy_range_reads_inclusive_bounds() {
        assert_eq!(parse_copy_range("bytes=0-99"), Some((0, 99)));
        assert_eq!(parse_copy_range("garbage"), None);
    }
}

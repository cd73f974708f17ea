//! Rendering [`objectio_common::Error`] into the S3 XML error envelope.
//!
//! The error taxonomy itself (variants, HTTP status, S3 error code) lives
//! in `objectio_common::Error`; this module only knows how to wrap it in
//! the wire format the S3 endpoint speaks.

use axum::body::Body;
use axum::http::{StatusCode, header};
use axum::response::Response;
use objectio_common::Error;
use serde::Serialize;

#[derive(Serialize)]
#[serde(rename = "Error")]
struct ErrorXml {
    #[serde(rename = "Code")]
    code: String,
    #[serde(rename = "Message")]
    message: String,
    #[serde(rename = "Resource")]
    #[serde(skip_serializing_if = "Option::is_none")]
    resource: Option<String>,
    #[serde(rename = "RequestId")]
    request_id: String,
}

fn status_for(err: &Error) -> StatusCode {
    StatusCode::from_u16(err.http_status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

/// Render `err` as the standard S3 XML error body, optionally naming the
/// bucket/key `resource` the request addressed.
pub fn error_response(err: &Error, resource: Option<&str>) -> Response {
    let body = ErrorXml {
        code: err.s3_error_code().to_string(),
        message: err.to_string(),
        resource: resource.map(str::to_string),
        request_id: uuid::Uuid::new_v4().to_string(),
    };
    let xml = format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n{}",
        quick_xml::se::to_string(&body).unwrap_or_default()
    );
    Response::builder()
        .status(status_for(err))
        .header(header::CONTENT_TYPE, "application/xml")
        .body(Body::from(xml))
        .expect("error response is well-formed")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_maps_to_404() {
        let err = Error::NoSuchBucket("b".to_string());
        let resp = error_response(&err, Some("b"));
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_quota_exceeded_maps_to_403() {
        let err = Error::QuotaExceeded { resource: "storage_bytes", current: 1, max: 1 };
        let resp = error_response(&err, None);
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }
}

//! Rendering [`objectio_common::Error`] into the Console's JSON error body.
//!
//! The error taxonomy itself lives in `objectio_common::Error`; this
//! module only knows how to wrap it in the wire format the Console
//! endpoint speaks.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use objectio_common::Error;
use serde::Serialize;

#[derive(Serialize)]
struct ErrorBody {
    code: String,
    message: String,
}

fn status_for(err: &Error) -> StatusCode {
    StatusCode::from_u16(err.http_status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

/// Render `err` as the Console's JSON error body.
pub fn error_response(err: &Error) -> Response {
    let body = ErrorBody { code: err.s3_error_code().to_string(), message: err.to_string() };
    (status_for(err), Json(body)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_maps_to_404() {
        let resp = error_response(&Error::NoSuchBucket("b".to_string()));
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn access_denied_maps_to_403() {
        let resp = error_response(&Error::AccessDenied);
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }
}

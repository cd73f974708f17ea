//! Session middleware: verifies the `Authorization: Bearer <token>` header
//! and stores the decoded [`crate::jwt::Claims`] in request extensions.

use crate::error::error_response;
use crate::jwt;
use crate::state::AppState;
use axum::extract::{Request, State};
use axum::http::header;
use axum::middleware::Next;
use axum::response::Response;
use objectio_common::Error;
use std::sync::Arc;

pub async fn session_layer(State(state): State<Arc<AppState>>, mut request: Request, next: Next) -> Response {
    let token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    let Some(token) = token else {
        return error_response(&Error::AccessDenied);
    };
    let Some(claims) = jwt::verify(&state.jwt_secret, token) else {
        return error_response(&Error::AccessDenied);
    };

    request.extensions_mut().insert(claims);
    next.run(request).await
}

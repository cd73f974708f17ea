//! Request-level SigV4 authentication middleware.
//!
//! Verification itself lives in [`objectio_auth::SigV4Verifier`]; this
//! module only wires it into the axum middleware stack and stores the
//! resulting [`objectio_auth::AuthResult`] in request extensions for
//! handlers to read.

use crate::error::error_response;
use crate::state::AppState;
use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use std::sync::Arc;

pub async fn auth_layer(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    if request.method() == axum::http::Method::OPTIONS {
        return next.run(request).await;
    }

    match state.verifier.verify(&request) {
        Ok(auth_result) => {
            request.extensions_mut().insert(auth_result);
            next.run(request).await
        }
        Err(e) => error_response(&e, None),
    }
}

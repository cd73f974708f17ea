//! Router construction for the S3 wire endpoint.
//!
//! Each method+path shape gets exactly one route; query-qualified
//! sub-resources (`?tagging`, `?acl`, `?uploads`, `?uploadId`,
//! `?versioning`, `?cors`, `?lifecycle`, `?policy`) are dispatched inside
//! the handler by inspecting the parsed query struct, so there is no
//! generic fallback route left for them to fall through to.

use crate::auth::auth_layer;
use crate::handlers::{bucket, object};
use crate::state::AppState;
use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderName, HeaderValue, Method};
use axum::routing::{delete, get, head, post, put};
use axum::{Router, middleware};
use objectio_common::config::S3CorsConfig;
use std::str::FromStr;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

// Single-part uploads above this size must go through multipart upload.
const MAX_SINGLE_PART_BODY: usize = 100 * 1024 * 1024;

fn cors_layer(cfg: &S3CorsConfig) -> CorsLayer {
    let methods: Vec<Method> = cfg
        .allowed_methods
        .iter()
        .filter_map(|m| Method::from_str(m).ok())
        .collect();
    let headers: Vec<HeaderName> = cfg
        .allowed_headers
        .iter()
        .filter_map(|h| HeaderName::from_str(h).ok())
        .collect();

    let origin = if cfg.allowed_origins.iter().any(|o| o == "*") {
        AllowOrigin::any()
    } else {
        let origins: Vec<HeaderValue> = cfg
            .allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods(methods)
        .allow_headers(headers)
        .max_age(std::time::Duration::from_secs(u64::from(cfg.max_age)))
}

pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.cors);

    Router::new()
        .route("/", get(bucket::list_buckets))
        .route("/{bucket}", put(bucket::put_bucket))
        .route("/{bucket}", delete(bucket::delete_bucket))
        .route("/{bucket}", head(bucket::head_bucket))
        .route("/{bucket}", get(bucket::get_bucket))
        .route("/{bucket}", post(bucket::post_bucket))
        .route("/{bucket}/{*key}", put(object::put_object))
        .route("/{bucket}/{*key}", get(object::get_object))
        .route("/{bucket}/{*key}", head(object::head_object))
        .route("/{bucket}/{*key}", delete(object::delete_object))
        // InitiateMultipartUpload and CompleteMultipartUpload both post to
        // this same path shape; object::post_object dispatches between them.
        .route("/{bucket}/{*key}", post(object::post_object))
        .layer(DefaultBodyLimit::max(MAX_SINGLE_PART_BODY))
        .layer(middleware::from_fn_with_state(state.clone(), auth_layer))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

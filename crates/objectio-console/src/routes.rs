//! Router construction for the Console JSON endpoint.
//!
//! `/api/v1/health` and `/api/v1/login` are open; everything else sits
//! behind [`crate::auth::session_layer`], which decodes the bearer
//! token into a [`crate::jwt::Claims`] extension for the handler to use.

use crate::auth::session_layer;
use crate::handlers::{access_keys, buckets, health, login, tenants, users};
use crate::state::AppState;
use axum::routing::{delete, get, post};
use axum::{Router, middleware};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub fn build_router(state: Arc<AppState>) -> Router {
    let protected = Router::new()
        .route("/api/v1/tenants", get(tenants::list_tenants).post(tenants::create_tenant))
        .route("/api/v1/tenants/{tenant_id}", get(tenants::get_tenant).delete(tenants::delete_tenant))
        .route("/api/v1/tenants/{tenant_id}/users", get(users::list_users).post(users::create_user))
        .route("/api/v1/tenants/{tenant_id}/users/{login}", delete(users::delete_user))
        .route("/api/v1/users/{user_id}/unlock", post(users::unlock_user))
        .route(
            "/api/v1/users/{user_id}/access-keys",
            get(access_keys::list_access_keys).post(access_keys::create_access_key),
        )
        .route("/api/v1/users/{user_id}/access-keys/{access_key_id}", delete(access_keys::delete_access_key))
        .route("/api/v1/tenants/{tenant_id}/buckets", get(buckets::list_buckets).post(buckets::create_bucket))
        .route(
            "/api/v1/tenants/{tenant_id}/buckets/{bucket}",
            get(buckets::get_bucket).delete(buckets::delete_bucket),
        )
        .layer(middleware::from_fn_with_state(state.clone(), session_layer));

    Router::new()
        .route("/api/v1/health", get(health::health))
        .route("/api/v1/login", post(login::login))
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

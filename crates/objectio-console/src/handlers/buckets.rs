//! `/api/v1/tenants/:tenant_id/buckets` — JSON view over bucket
//! management, for operators who would rather not speak S3 XML.

use crate::error::error_response;
use crate::jwt::Claims;
use crate::state::AppState;
use axum::Json;
use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use objectio_common::Error;
use std::sync::Arc;

fn require_tenant_admin(claims: &Claims, tenant_id: &str) -> Result<(), Error> {
    if claims.is_global_admin() || (claims.is_admin() && claims.tenant_id == tenant_id) {
        Ok(())
    } else {
        Err(Error::AccessDenied)
    }
}

pub async fn list_buckets(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path(tenant_id): Path<String>,
) -> Response {
    if let Err(e) = require_tenant_admin(&claims, &tenant_id) {
        return error_response(&e);
    }
    match state.manager.list_buckets(&tenant_id) {
        Ok(buckets) => Json(buckets).into_response(),
        Err(e) => error_response(&e),
    }
}

pub async fn get_bucket(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path((tenant_id, bucket)): Path<(String, String)>,
) -> Response {
    if let Err(e) = require_tenant_admin(&claims, &tenant_id) {
        return error_response(&e);
    }
    match state.manager.get_bucket(&tenant_id, &bucket) {
        Ok(b) => Json(b).into_response(),
        Err(Error::AccessDenied) => error_response(&Error::NoSuchBucket(bucket)),
        Err(e) => error_response(&e),
    }
}

pub async fn create_bucket(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path((tenant_id, bucket)): Path<(String, String)>,
) -> Response {
    if let Err(e) = require_tenant_admin(&claims, &tenant_id) {
        return error_response(&e);
    }
    let now = chrono::Utc::now().timestamp();
    match state.manager.create_bucket(&tenant_id, &bucket, now) {
        Ok(b) => (StatusCode::CREATED, Json(b)).into_response(),
        Err(e) => error_response(&e),
    }
}

pub async fn delete_bucket(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path((tenant_id, bucket)): Path<(String, String)>,
) -> Response {
    if let Err(e) = require_tenant_admin(&claims, &tenant_id) {
        return error_response(&e);
    }
    match state.manager.delete_bucket(&tenant_id, &bucket) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => error_response(&e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::test_support::state_with_tenant;

    fn admin(tenant_id: &str) -> Claims {
        Claims { sub: "u1".to_string(), tenant_id: tenant_id.to_string(), roles: vec!["admin".to_string()], exp: i64::MAX }
    }

    #[tokio::test]
    async fn create_then_list_buckets_roundtrip() {
        let (_dir, state) = state_with_tenant("t1").await;
        let created = create_bucket(State(state.clone()), Extension(admin("t1")), Path(("t1".to_string(), "photos".to_string()))).await;
        assert_eq!(created.status(), StatusCode::CREATED);

        let listed = list_buckets(State(state), Extension(admin("t1")), Path("t1".to_string())).await;
        assert_eq!(listed.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn other_tenants_admin_cannot_see_bucket() {
        let (_dir, state) = state_with_tenant("t1").await;
        create_bucket(State(state.clone()), Extension(admin("t1")), Path(("t1".to_string(), "photos".to_string()))).await;

        let resp = get_bucket(State(state), Extension(admin("other")), Path(("t1".to_string(), "photos".to_string()))).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }
}

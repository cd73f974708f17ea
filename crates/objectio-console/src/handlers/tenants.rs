//! `/api/v1/tenants` — global-admin-only tenant CRUD.

use crate::error::error_response;
use crate::jwt::Claims;
use crate::state::AppState;
use axum::Json;
use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use objectio_common::Error;
use objectio_meta_store::tenant;
use objectio_meta_store::types::StoredTenant;
use serde::Deserialize;
use std::sync::Arc;

fn require_global_admin(claims: &Claims) -> Result<(), Error> {
    if claims.is_global_admin() { Ok(()) } else { Err(Error::AccessDenied) }
}

#[derive(Debug, Deserialize)]
pub struct CreateTenantRequest {
    pub tenant_id: String,
    pub display_name: String,
    #[serde(default)]
    pub max_buckets: u64,
    #[serde(default)]
    pub max_storage_bytes: u64,
    #[serde(default)]
    pub max_access_keys: u64,
    #[serde(default)]
    pub max_objects: u64,
}

pub async fn list_tenants(State(state): State<Arc<AppState>>, Extension(claims): Extension<Claims>) -> Response {
    if let Err(e) = require_global_admin(&claims) {
        return error_response(&e);
    }
    match state.meta.view(tenant::list) {
        Ok(tenants) => Json(tenants).into_response(),
        Err(e) => error_response(&e),
    }
}

pub async fn get_tenant(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path(tenant_id): Path<String>,
) -> Response {
    if let Err(e) = require_global_admin(&claims) {
        return error_response(&e);
    }
    match state.meta.view(|txn| tenant::get(txn, &tenant_id)) {
        Ok(Some(t)) => Json(t).into_response(),
        Ok(None) => error_response(&Error::NotFound(format!("tenant {tenant_id}"))),
        Err(e) => error_response(&e),
    }
}

pub async fn create_tenant(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateTenantRequest>,
) -> Response {
    if let Err(e) = require_global_admin(&claims) {
        return error_response(&e);
    }
    let record = StoredTenant {
        tenant_id: req.tenant_id,
        display_name: req.display_name,
        created_at: chrono::Utc::now().timestamp(),
        max_buckets: req.max_buckets,
        current_buckets: 0,
        max_storage_bytes: req.max_storage_bytes,
        current_storage_bytes: 0,
        max_access_keys: req.max_access_keys,
        current_access_keys: 0,
        max_objects: req.max_objects,
        current_objects: 0,
    };
    match state.meta.transact(|txn| tenant::put(txn, &record)) {
        Ok(()) => (StatusCode::CREATED, Json(record)).into_response(),
        Err(e) => error_response(&e),
    }
}

pub async fn delete_tenant(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path(tenant_id): Path<String>,
) -> Response {
    if let Err(e) = require_global_admin(&claims) {
        return error_response(&e);
    }
    match state.meta.transact(|txn| tenant::delete(txn, &tenant_id)) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => error_response(&e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::test_support::state_with_tenant;

    fn admin_claims() -> Claims {
        Claims { sub: "root".to_string(), tenant_id: String::new(), roles: vec!["admin".to_string()], exp: i64::MAX }
    }

    fn tenant_admin_claims(tenant_id: &str) -> Claims {
        Claims { sub: "u1".to_string(), tenant_id: tenant_id.to_string(), roles: vec!["admin".to_string()], exp: i64::MAX }
    }

    #[tokio::test]
    async fn create_then_list_tenants_roundtrip() {
        let (_dir, state) = state_with_tenant("seed").await;
        let created = create_tenant(
            State(state.clone()),
            Extension(admin_claims()),
            Json(CreateTenantRequest {
                tenant_id: "acme".to_string(),
                display_name: "Acme Corp".to_string(),
                max_buckets: 10,
                max_storage_bytes: 0,
                max_access_keys: 10,
                max_objects: 100,
            }),
        )
        .await;
        assert_eq!(created.status(), StatusCode::CREATED);

        let listed = list_tenants(State(state), Extension(admin_claims())).await;
        assert_eq!(listed.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn tenant_admin_cannot_list_all_tenants() {
        let (_dir, state) = state_with_tenant("seed").await;
        let resp = list_tenants(State(state), Extension(tenant_admin_claims("seed"))).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }
}

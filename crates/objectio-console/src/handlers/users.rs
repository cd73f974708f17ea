//! `/api/v1/tenants/:tenant_id/users` — user CRUD and account unlock.
//!
//! A tenant admin may manage users within their own tenant; a global
//! admin may manage any tenant's users. The unlock action additionally
//! enforces the rule in spec §4.6: a global admin may unlock any user,
//! a tenant admin only users in their own tenant.

use crate::error::error_response;
use crate::jwt::Claims;
use crate::state::AppState;
use axum::Json;
use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use objectio_common::Error;
use serde::Deserialize;
use std::sync::Arc;

fn require_tenant_admin(claims: &Claims, tenant_id: &str) -> Result<(), Error> {
    if claims.is_global_admin() || (claims.is_admin() && claims.tenant_id == tenant_id) {
        Ok(())
    } else {
        Err(Error::AccessDenied)
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub login: String,
    pub password: String,
    #[serde(default)]
    pub roles: Vec<String>,
}

pub async fn list_users(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path(tenant_id): Path<String>,
) -> Response {
    if let Err(e) = require_tenant_admin(&claims, &tenant_id) {
        return error_response(&e);
    }
    match state.users.list_users(&tenant_id) {
        Ok(users) => Json(users).into_response(),
        Err(e) => error_response(&e),
    }
}

pub async fn create_user(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path(tenant_id): Path<String>,
    Json(req): Json<CreateUserRequest>,
) -> Response {
    if let Err(e) = require_tenant_admin(&claims, &tenant_id) {
        return error_response(&e);
    }
    let hash = match objectio_auth::password::hash(&req.password) {
        Ok(h) => h,
        Err(e) => return error_response(&e),
    };
    let now = chrono::Utc::now().timestamp();
    match state.users.create_user(&tenant_id, &req.login, hash, req.roles, now) {
        Ok(user) => (StatusCode::CREATED, Json(user)).into_response(),
        Err(e) => error_response(&e),
    }
}

pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path((tenant_id, login)): Path<(String, String)>,
) -> Response {
    if let Err(e) = require_tenant_admin(&claims, &tenant_id) {
        return error_response(&e);
    }
    match state.users.delete_user(&tenant_id, &login) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => error_response(&e),
    }
}

/// `POST /api/v1/users/:user_id/unlock` — clears the lockout counters on
/// a user, regardless of how they got locked.
pub async fn unlock_user(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path(user_id): Path<String>,
) -> Response {
    let user = match state.users.get_user_by_id(&user_id) {
        Ok(u) => u,
        Err(_) => return error_response(&Error::NotFound(format!("user {user_id}"))),
    };

    let authorized = claims.is_global_admin() || (claims.is_admin() && claims.tenant_id == user.tenant_id);
    if !authorized {
        return error_response(&Error::AccessDenied);
    }

    if let Err(e) = state.lockout.record_success(&state.meta, &user) {
        return error_response(&e);
    }
    StatusCode::NO_CONTENT.into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::test_support::state_with_tenant;
    use objectio_auth::ratelimit::LockoutPolicy;

    fn global_admin() -> Claims {
        Claims { sub: "root".to_string(), tenant_id: String::new(), roles: vec!["admin".to_string()], exp: i64::MAX }
    }

    fn tenant_admin(tenant_id: &str) -> Claims {
        Claims { sub: "u1".to_string(), tenant_id: tenant_id.to_string(), roles: vec!["admin".to_string()], exp: i64::MAX }
    }

    #[tokio::test]
    async fn create_then_list_users_roundtrip() {
        let (_dir, state) = state_with_tenant("t1").await;
        let created = create_user(
            State(state.clone()),
            Extension(global_admin()),
            Path("t1".to_string()),
            Json(CreateUserRequest { login: "alice".to_string(), password: "hunter2".to_string(), roles: vec![] }),
        )
        .await;
        assert_eq!(created.status(), StatusCode::CREATED);

        let listed = list_users(State(state), Extension(tenant_admin("t1")), Path("t1".to_string())).await;
        assert_eq!(listed.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn tenant_admin_cannot_manage_other_tenants_users() {
        let (_dir, state) = state_with_tenant("t1").await;
        let resp = list_users(State(state), Extension(tenant_admin("other")), Path("t1".to_string())).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn global_admin_can_unlock_any_tenants_user() {
        let (_dir, state) = state_with_tenant("t1").await;
        let user = state.users.create_user("t1", "bob", "hash".to_string(), vec![], 0).unwrap();
        let locked = LockoutPolicy { threshold: 1, duration_secs: 900 };
        locked.record_failure(&state.meta, &user, 0).unwrap();

        let resp = unlock_user(State(state.clone()), Extension(global_admin()), Path(user.user_id.clone())).await;
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);

        let refreshed = state.users.get_user_by_id(&user.user_id).unwrap();
        assert_eq!(refreshed.failed_login_attempts, 0);
    }

    #[tokio::test]
    async fn tenant_admin_cannot_unlock_another_tenants_user() {
        let (_dir, state) = state_with_tenant("t1").await;
        let user = state.users.create_user("t1", "bob", "hash".to_string(), vec![], 0).unwrap();
        let resp = unlock_user(State(state), Extension(tenant_admin("other")), Path(user.user_id)).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }
}

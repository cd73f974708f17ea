//! `/api/v1/users/:user_id/access-keys` — access key issuance and
//! revocation for S3 clients.

use crate::error::error_response;
use crate::jwt::Claims;
use crate::state::AppState;
use axum::Json;
use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use objectio_common::Error;
use std::sync::Arc;

fn require_owner_or_admin(claims: &Claims, owner: &objectio_meta_store::types::StoredUser) -> Result<(), Error> {
    if claims.sub == owner.user_id || claims.is_global_admin() || (claims.is_admin() && claims.tenant_id == owner.tenant_id) {
        Ok(())
    } else {
        Err(Error::AccessDenied)
    }
}

pub async fn create_access_key(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path(user_id): Path<String>,
) -> Response {
    let owner = match state.users.get_user_by_id(&user_id) {
        Ok(u) => u,
        Err(_) => return error_response(&Error::NotFound(format!("user {user_id}"))),
    };
    if let Err(e) = require_owner_or_admin(&claims, &owner) {
        return error_response(&e);
    }
    let now = chrono::Utc::now().timestamp();
    match state.users.create_access_key(&owner, now) {
        Ok(key) => (StatusCode::CREATED, Json(key)).into_response(),
        Err(e) => error_response(&e),
    }
}

pub async fn list_access_keys(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path(user_id): Path<String>,
) -> Response {
    let owner = match state.users.get_user_by_id(&user_id) {
        Ok(u) => u,
        Err(_) => return error_response(&Error::NotFound(format!("user {user_id}"))),
    };
    if let Err(e) = require_owner_or_admin(&claims, &owner) {
        return error_response(&e);
    }
    match state.users.list_access_keys(&user_id) {
        Ok(keys) => Json(keys).into_response(),
        Err(e) => error_response(&e),
    }
}

pub async fn delete_access_key(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path((user_id, access_key_id)): Path<(String, String)>,
) -> Response {
    let owner = match state.users.get_user_by_id(&user_id) {
        Ok(u) => u,
        Err(_) => return error_response(&Error::NotFound(format!("user {user_id}"))),
    };
    if let Err(e) = require_owner_or_admin(&claims, &owner) {
        return error_response(&e);
    }
    match state.users.delete_access_key(&access_key_id) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => error_response(&e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::test_support::state_with_tenant;

    fn claims_for(user: &objectio_meta_store::types::StoredUser) -> Claims {
        Claims { sub: user.user_id.clone(), tenant_id: user.tenant_id.clone(), roles: vec![], exp: i64::MAX }
    }

    #[tokio::test]
    async fn owner_can_create_then_list_own_keys() {
        let (_dir, state) = state_with_tenant("t1").await;
        let user = state.users.create_user("t1", "alice", "hash".to_string(), vec![], 0).unwrap();
        let claims = claims_for(&user);

        let created = create_access_key(State(state.clone()), Extension(claims.clone()), Path(user.user_id.clone())).await;
        assert_eq!(created.status(), StatusCode::CREATED);

        let listed = list_access_keys(State(state), Extension(claims), Path(user.user_id)).await;
        assert_eq!(listed.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn stranger_cannot_create_keys_for_another_user() {
        let (_dir, state) = state_with_tenant("t1").await;
        let user = state.users.create_user("t1", "alice", "hash".to_string(), vec![], 0).unwrap();
        let stranger = Claims { sub: "someone-else".to_string(), tenant_id: "t1".to_string(), roles: vec![], exp: i64::MAX };

        let resp = create_access_key(State(state), Extension(stranger), Path(user.user_id)).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }
}

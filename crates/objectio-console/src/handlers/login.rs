//! `POST /api/v1/login` — exchanges a login/password for a session token.
//!
//! Reuses the Auth Manager's password verification and lockout/rate-limit
//! path so the S3 endpoint's admin flows never need a second copy of it.

use crate::error::error_response;
use crate::jwt;
use crate::state::AppState;
use axum::Json;
use axum::extract::{ConnectInfo, State};
use axum::response::{IntoResponse, Response};
use objectio_auth::{password, ratelimit::LockoutPolicy};
use objectio_common::Error;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub login: String,
    pub password: String,
    #[serde(default)]
    pub tenant_id: String,
}

#[derive(Serialize)]
struct LoginResponse {
    token: String,
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(req): Json<LoginRequest>,
) -> Response {
    if let Err(e) = state.rate_limiter.check(addr.ip()) {
        return error_response(&e);
    }

    let user = match state.users.get_user_by_login(&req.tenant_id, &req.login) {
        Ok(u) => u,
        Err(_) => return error_response(&Error::AccessDenied),
    };

    let now = chrono::Utc::now().timestamp();
    if let Err(e) = LockoutPolicy::guard(&user, now) {
        return error_response(&e);
    }

    let outcome = match password::verify(&req.password, &user.password_hash) {
        Ok(o) => o,
        Err(e) => return error_response(&e),
    };

    if !outcome.matches {
        if let Err(e) = state.lockout.record_failure(&state.meta, &user, now) {
            tracing::warn!(error = %e, user_id = %user.user_id, "failed to record login failure");
        }
        return error_response(&Error::AccessDenied);
    }

    if let Err(e) = state.lockout.record_success(&state.meta, &user) {
        tracing::warn!(error = %e, user_id = %user.user_id, "failed to clear login failure count");
    }

    if outcome.needs_rehash {
        let mut updated = user.clone();
        match password::hash(&req.password) {
            Ok(hash) => {
                updated.password_hash = hash;
                if let Err(e) = state.users.put_user(&updated) {
                    tracing::warn!(error = %e, user_id = %user.user_id, "failed to persist rehashed password");
                }
            }
            Err(e) => tracing::warn!(error = %e, user_id = %user.user_id, "failed to rehash password"),
        }
    }

    let token = jwt::issue(&state.jwt_secret, &user.user_id, &user.tenant_id, user.roles.clone(), now);
    Json(LoginResponse { token }).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::test_support::state_with_tenant;
    use axum::http::StatusCode;

    #[tokio::test]
    async fn login_with_correct_password_succeeds() {
        let (_dir, state) = state_with_tenant("t1").await;
        let hash = password::hash("hunter2").unwrap();
        state.users.create_user("t1", "alice", hash, vec!["admin".to_string()], 0).unwrap();

        let resp = login(
            State(state),
            ConnectInfo("127.0.0.1:1234".parse().unwrap()),
            Json(LoginRequest { login: "alice".to_string(), password: "hunter2".to_string(), tenant_id: "t1".to_string() }),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn login_with_wrong_password_is_denied() {
        let (_dir, state) = state_with_tenant("t1").await;
        let hash = password::hash("hunter2").unwrap();
        state.users.create_user("t1", "alice", hash, vec![], 0).unwrap();

        let resp = login(
            State(state),
            ConnectInfo("127.0.0.1:1234".parse().unwrap()),
            Json(LoginRequest { login: "alice".to_string(), password: "wrong".to_string(), tenant_id: "t1".to_string() }),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn repeated_failures_lock_the_account() {
        let (_dir, state) = state_with_tenant("t1").await;
        let hash = password::hash("hunter2").unwrap();
        state.users.create_user("t1", "bob", hash, vec![], 0).unwrap();

        for _ in 0..5 {
            login(
                State(state.clone()),
                ConnectInfo(format!("10.0.0.{}:1234", rand::random::<u8>()).parse().unwrap()),
                Json(LoginRequest { login: "bob".to_string(), password: "wrong".to_string(), tenant_id: "t1".to_string() }),
            )
            .await;
        }

        let resp = login(
            State(state),
            ConnectInfo("10.0.0.99:1234".parse().unwrap()),
            Json(LoginRequest { login: "bob".to_string(), password: "hunter2".to_string(), tenant_id: "t1".to_string() }),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }
}

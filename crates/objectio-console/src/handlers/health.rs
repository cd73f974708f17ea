//! `GET /api/v1/health` — liveness probe for the metadata store and blob
//! store, with no authentication required.

use crate::state::AppState;
use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use std::sync::Arc;

#[derive(Serialize)]
struct HealthBody {
    status: &'static str,
    meta_store: &'static str,
    blob_store: &'static str,
}

pub async fn health(State(state): State<Arc<AppState>>) -> Response {
    let meta_ok = state.meta.view(objectio_meta_store::tenant::list).is_ok();
    let blob_ok = tokio::fs::metadata(&state.blobs_dir).await.is_ok();

    let body = HealthBody {
        status: if meta_ok && blob_ok { "ok" } else { "degraded" },
        meta_store: if meta_ok { "ok" } else { "error" },
        blob_store: if blob_ok { "ok" } else { "error" },
    };
    let status = if meta_ok && blob_ok { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status, Json(body)).into_response()
}

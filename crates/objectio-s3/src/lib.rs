//! ObjectIO S3 API - S3-compatible HTTP API
//!
//! This crate implements the S3 REST API for ObjectIO.

pub mod auth;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;
pub mod xml;

// Re-exports
pub use auth::auth_layer;
pub use routes::build_router;
pub use state::AppState;

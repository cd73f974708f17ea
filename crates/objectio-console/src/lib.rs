//! ObjectIO Console API - JSON management API (component F)
//!
//! This crate implements tenant, user and bucket administration over a
//! JSON wire format, separate from the S3-compatible data path.

pub mod auth;
pub mod error;
pub mod handlers;
pub mod jwt;
pub mod routes;
pub mod state;

// Re-exports
pub use auth::session_layer;
pub use routes::build_router;
pub use state::AppState;

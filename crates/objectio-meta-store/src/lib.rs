//! Embedded, transactional metadata store for ObjectIO (component A).
//!
//! Backed by `redb`, a single-node embedded ordered key-value store, with
//! one logical table per record kind (see [`tables`]) and typed accessor
//! modules (`bucket`, `object`, `tenant`, `user`, `multipart`) layered on
//! top of [`store::MetaStore`]'s transaction primitives.

pub mod bucket;
pub mod multipart;
pub mod object;
pub mod store;
pub mod tables;
pub mod tenant;
pub mod types;
pub mod user;

pub use store::MetaStore;

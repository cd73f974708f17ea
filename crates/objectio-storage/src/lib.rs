//! ObjectIO Blob Store (component B): filesystem-backed payload storage.
//!
//! Object and multipart-part bodies are written to handle-addressed files
//! under a sharded directory tree, with atomic temp-then-rename writes.
//! Metadata about what a handle corresponds to lives entirely in
//! `objectio-meta-store`; this crate only knows about bytes and handles.

pub mod blob;

pub use blob::BlobStore;

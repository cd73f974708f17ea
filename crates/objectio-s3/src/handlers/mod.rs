//! S3 operation handlers, grouped by the resource they act on.

pub mod bucket;
pub mod multipart;
pub mod object;
pub mod policy;

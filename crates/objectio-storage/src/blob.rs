//! Filesystem-backed blob store (component B).
//!
//! Each stored object or multipart part is addressed by an opaque storage
//! handle (a random UUIDv4, hex-encoded) rather than a content hash --
//! the Object Manager already computes an MD5 ETag over the body, so a
//! second full-body hash pass here would be pure overhead. Handles are
//! sharded two levels deep (`blobs/<h[0..2]>/<h[2..4]>/<h>`) so that no
//! single directory accumulates millions of entries.
//!
//! Writes are atomic: the body is written to a temp file in the same
//! shard directory, then renamed into place, so a reader never observes a
//! partially written blob and a crash mid-write leaves only an orphaned
//! temp file behind.

use bytes::Bytes;
use objectio_common::{Error, Result};
use std::path::{Path, PathBuf};
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use tracing::{debug, trace, warn};
use uuid::Uuid;

/// Filesystem-backed blob store rooted at `<data_dir>/blobs`.
#[derive(Clone, Debug)]
pub struct BlobStore {
    root: PathBuf,
}

impl BlobStore {
    /// Open (creating if absent) a blob store rooted at `root`.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    /// Write `data` to a freshly generated storage handle and return it.
    pub async fn put(&self, data: Bytes) -> Result<String> {
        let handle = Uuid::new_v4().simple().to_string();
        self.put_with_handle(&handle, data).await?;
        Ok(handle)
    }

    /// Write `data` under a caller-chosen handle, overwriting any existing
    /// blob at that handle. Used when the Object Manager needs the handle
    /// known before the body is written (none of the current operations
    /// do, but callers composing retries may).
    pub async fn put_with_handle(&self, handle: &str, data: Bytes) -> Result<()> {
        let dir = self.shard_dir(handle);
        tokio::fs::create_dir_all(&dir).await?;
        let final_path = dir.join(handle);
        let tmp_path = dir.join(format!(".{handle}.{}.tmp", Uuid::new_v4().simple()));

        let write_result = async {
            let mut file = tokio::fs::File::create(&tmp_path).await?;
            file.write_all(&data).await?;
            file.sync_all().await?;
            Ok::<(), std::io::Error>(())
        }
        .await;

        if let Err(e) = write_result {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(map_io_error(e));
        }

        tokio::fs::rename(&tmp_path, &final_path).await?;
        trace!(handle, size = data.len(), "wrote blob");
        Ok(())
    }

    /// Read the full body for `handle`.
    pub async fn get(&self, handle: &str) -> Result<Bytes> {
        let path = self.path_for(handle);
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| map_missing(e, handle))?;
        Ok(Bytes::from(bytes))
    }

    /// Read an inclusive byte range `[start, end]` for `handle`.
    pub async fn get_range(&self, handle: &str, start: u64, end: u64) -> Result<Bytes> {
        let path = self.path_for(handle);
        let mut file = tokio::fs::File::open(&path)
            .await
            .map_err(|e| map_missing(e, handle))?;
        let len = file.metadata().await?.len();
        if start > end || end >= len {
            return Err(Error::invalid_argument(format!(
                "range {start}-{end} out of bounds for blob of size {len}"
            )));
        }
        let count = end - start + 1;
        file.seek(std::io::SeekFrom::Start(start)).await?;
        let mut buf = vec![0u8; count as usize];
        file.read_exact(&mut buf).await?;
        Ok(Bytes::from(buf))
    }

    /// Size of the blob at `handle`, in bytes.
    pub async fn size(&self, handle: &str) -> Result<u64> {
        let path = self.path_for(handle);
        let meta = tokio::fs::metadata(&path)
            .await
            .map_err(|e| map_missing(e, handle))?;
        Ok(meta.len())
    }

    /// Delete the blob at `handle`. Idempotent: deleting an already-absent
    /// handle is not an error.
    pub async fn delete(&self, handle: &str) -> Result<()> {
        let path = self.path_for(handle);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                debug!(handle, "deleted blob");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => {
                warn!(handle, error = %e, "failed to delete blob");
                Err(e.into())
            }
        }
    }

    fn shard_dir(&self, handle: &str) -> PathBuf {
        let a = &handle[0..2.min(handle.len())];
        let b = &handle[2..4.min(handle.len())];
        self.root.join(a).join(b)
    }

    fn path_for(&self, handle: &str) -> PathBuf {
        self.shard_dir(handle).join(handle)
    }

    /// Root directory this store writes under, for diagnostics.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }
}

fn map_missing(e: std::io::Error, handle: &str) -> Error {
    if e.kind() == std::io::ErrorKind::NotFound {
        Error::internal(format!("blob handle {handle} not found"))
    } else {
        e.into()
    }
}

fn map_io_error(e: std::io::Error) -> Error {
    if e.kind() == std::io::ErrorKind::StorageFull {
        Error::InsufficientStorage
    } else {
        e.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_get_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = BlobStore::open(dir.path()).await.unwrap();
        let handle = store.put(Bytes::from("hello world")).await.unwrap();
        let data = store.get(&handle).await.unwrap();
        assert_eq!(data.as_ref(), b"hello world");
    }

    #[tokio::test]
    async fn test_get_range() {
        let dir = tempfile::tempdir().unwrap();
        let store = BlobStore::open(dir.path()).await.unwrap();
        let handle = store.put(Bytes::from("hello world")).await.unwrap();
        let data = store.get_range(&handle, 0, 4).await.unwrap();
        assert_eq!(data.as_ref(), b"hello");
        let data = store.get_range(&handle, 6, 10).await.unwrap();
        assert_eq!(data.as_ref(), b"world");
    }

    #[tokio::test]
    async fn test_range_out_of_bounds() {
        let dir = tempfile::tempdir().unwrap();
        let store = BlobStore::open(dir.path()).await.unwrap();
        let handle = store.put(Bytes::from("abc")).await.unwrap();
        let result = store.get_range(&handle, 0, 100).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = BlobStore::open(dir.path()).await.unwrap();
        let handle = store.put(Bytes::from("x")).await.unwrap();
        store.delete(&handle).await.unwrap();
        store.delete(&handle).await.unwrap();
        assert!(store.get(&handle).await.is_err());
    }

    #[tokio::test]
    async fn test_sharded_layout() {
        let dir = tempfile::tempdir().unwrap();
        let store = BlobStore::open(dir.path()).await.unwrap();
        let handle = store.put(Bytes::from("x")).await.unwrap();
        let expected = dir
            .path()
            .join(&handle[0..2])
            .join(&handle[2..4])
            .join(&handle);
        assert!(expected.exists());
    }
}

//! Backend trait for the blob store.
//!
//! Defines the capability set every storage provider exposes, enabling
//! pluggable blob storage (memory, filesystem, null, cloud object stores).

use super::types::{ByteStream, ObjectMeta};
use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;

/// Backend trait for opaque blob storage keyed by object key.
///
/// All backends must be thread-safe (`Send + Sync`) for use with tokio.
/// A missing key is reported as `Ok(None)`; `Err` always means the provider
/// could not answer ("could not check"), never "definitely missing".
///
/// # Example
///
/// ```ignore
/// use photovault::services::blob::{BlobBackend, MemoryBlobBackend};
///
/// let backend = MemoryBlobBackend::new();
/// backend.put("2024/beach.jpg", image_bytes, Some("image/jpeg")).await?;
/// let (data, meta) = backend.get("2024/beach.jpg").await?.unwrap();
/// ```
#[async_trait]
pub trait BlobBackend: Send + Sync + 'static {
    /// Short provider name used in logs and the health endpoint.
    fn name(&self) -> &'static str;

    /// Prepares the provider namespace (create directories, check access).
    ///
    /// Called once at startup. Defaults to a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if the namespace cannot be prepared.
    async fn init(&self) -> Result<()> {
        Ok(())
    }

    /// Stores a blob, overwriting any existing object under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Key is invalid (empty, absolute, or contains `..`)
    /// - Storage operation fails
    async fn put(&self, key: &str, data: Bytes, content_type: Option<&str>) -> Result<ObjectMeta>;

    /// Retrieves a blob and its metadata.
    ///
    /// # Returns
    /// * `Ok(Some((data, meta)))` - Object found
    /// * `Ok(None)` - Object not found
    ///
    /// # Errors
    ///
    /// Returns an error if the key is invalid or the provider cannot be read.
    async fn get(&self, key: &str) -> Result<Option<(Bytes, ObjectMeta)>>;

    /// Opens a blob for reading without loading it into memory.
    ///
    /// Defaults to [`get`](Self::get) delivered as a single chunk; providers
    /// backed by files or remote stores override it.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is invalid or the provider cannot be read.
    /// Failures after the stream is opened arrive as stream items.
    async fn get_stream(&self, key: &str) -> Result<Option<(ByteStream, ObjectMeta)>> {
        Ok(self
            .get(key)
            .await?
            .map(|(data, meta)| (futures::stream::once(async move { Ok(data) }).boxed(), meta)))
    }

    /// Retrieves blob metadata without downloading the blob.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is invalid or the provider cannot be read.
    async fn head(&self, key: &str) -> Result<Option<ObjectMeta>>;

    /// Lists all objects, optionally filtered by key prefix, sorted by key.
    ///
    /// # Errors
    ///
    /// Returns an error if listing fails.
    async fn list(&self, prefix: Option<&str>) -> Result<Vec<ObjectMeta>>;

    /// Checks whether an object exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider cannot be read.
    async fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.head(key).await?.is_some())
    }
}

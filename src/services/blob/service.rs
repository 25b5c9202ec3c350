//! High-level `BlobStore` wrapper over backend implementations.
//!
//! Wraps any `BlobBackend` and bounds every provider call with a deadline,
//! so an unreachable provider fails fast instead of hanging a request.
//! Calls are never retried here.

use super::backend::BlobBackend;
use super::cloud::ObjectStoreBlobBackend;
use super::filesystem::FilesystemBlobBackend;
use super::memory::MemoryBlobBackend;
use super::null::NullBlobBackend;
use super::types::{ByteStream, ObjectMeta};
use crate::config::{ProviderKind, StorageConfig};
use anyhow::{Context, Result, anyhow};
use bytes::Bytes;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Default deadline for a single provider call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// High-level blob storage interface.
///
/// # Thread Safety
///
/// `BlobStore` is `Clone` and can be shared across tasks. The underlying
/// backend handles concurrent access.
///
/// # Example
///
/// ```ignore
/// use photovault::services::blob::BlobStore;
///
/// let blobs = BlobStore::memory();
/// blobs.put("2024/beach.jpg", image_bytes, None).await?;
/// let keys = blobs.list_keys().await?;
/// ```
#[derive(Clone)]
pub struct BlobStore {
    backend: Arc<dyn BlobBackend>,
    timeout: Duration,
}

impl BlobStore {
    /// Creates the provider named in `config` and initializes it.
    ///
    /// # Errors
    ///
    /// Returns an error if required provider options are missing or the
    /// provider cannot be initialized.
    pub async fn from_config(config: &StorageConfig) -> Result<Self> {
        let store = match config.provider {
            ProviderKind::Memory => Self::memory(),
            ProviderKind::Null => Self::null(),
            ProviderKind::Filesystem => {
                let root = config
                    .root
                    .as_ref()
                    .context("Filesystem provider requires a storage root")?;
                Self::custom(FilesystemBlobBackend::new(root))
            },
            ProviderKind::ObjectStore => {
                let url = config
                    .url
                    .as_deref()
                    .context("Object store provider requires a storage URL")?;
                Self::custom(ObjectStoreBlobBackend::from_url(url)?)
            },
        }
        .with_timeout(config.timeout());

        store
            .deadline("init", store.backend.init())
            .await
            .with_context(|| format!("Failed to initialize {} blob provider", store.name()))?;

        Ok(store)
    }

    /// Creates a `BlobStore` backed by an in-memory store.
    pub fn memory() -> Self {
        Self::custom(MemoryBlobBackend::new())
    }

    /// Creates a `BlobStore` that discards writes and finds nothing.
    pub fn null() -> Self {
        Self::custom(NullBlobBackend)
    }

    /// Creates a `BlobStore` rooted at a filesystem directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn file<P: AsRef<Path>>(root: P) -> Result<Self> {
        Ok(Self::custom(FilesystemBlobBackend::open(root)?))
    }

    /// Creates a `BlobStore` with a custom backend.
    pub fn custom<B: BlobBackend>(backend: B) -> Self {
        Self {
            backend: Arc::new(backend),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Sets the per-call deadline.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Provider name (e.g. `filesystem`).
    pub fn name(&self) -> &'static str {
        self.backend.name()
    }

    async fn deadline<T>(
        &self,
        operation: &'static str,
        call: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(anyhow!(
                "{} provider {operation} timed out after {:?}",
                self.name(),
                self.timeout
            )),
        }
    }

    /// Stores a blob.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is invalid, the write fails or times out.
    pub async fn put(&self, key: &str, data: Bytes, content_type: Option<&str>) -> Result<ObjectMeta> {
        self.deadline("put", self.backend.put(key, data, content_type))
            .await
    }

    /// Retrieves a blob; `Ok(None)` when the provider reports it absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is invalid, the read fails or times out.
    pub async fn get(&self, key: &str) -> Result<Option<(Bytes, ObjectMeta)>> {
        self.deadline("get", self.backend.get(key)).await
    }

    /// Opens a blob as a stream; `Ok(None)` when the provider reports it
    /// absent. The deadline covers opening, not the transfer.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is invalid, the open fails or times out.
    pub async fn get_stream(&self, key: &str) -> Result<Option<(ByteStream, ObjectMeta)>> {
        self.deadline("get", self.backend.get_stream(key)).await
    }

    /// Retrieves blob metadata.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is invalid, the call fails or times out.
    pub async fn head(&self, key: &str) -> Result<Option<ObjectMeta>> {
        self.deadline("head", self.backend.head(key)).await
    }

    /// Lists every object in the provider namespace, sorted by key.
    ///
    /// # Errors
    ///
    /// Returns an error if listing fails or times out.
    pub async fn list(&self, prefix: Option<&str>) -> Result<Vec<ObjectMeta>> {
        self.deadline("list", self.backend.list(prefix)).await
    }

    /// Lists every object key, sorted.
    ///
    /// # Errors
    ///
    /// Returns an error if listing fails or times out.
    pub async fn list_keys(&self) -> Result<Vec<String>> {
        Ok(self.list(None).await?.into_iter().map(|m| m.key).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    /// Backend whose calls never complete.
    struct HangingBackend;

    #[async_trait]
    impl BlobBackend for HangingBackend {
        fn name(&self) -> &'static str {
            "hanging"
        }

        async fn put(&self, _: &str, _: Bytes, _: Option<&str>) -> Result<ObjectMeta> {
            std::future::pending().await
        }

        async fn get(&self, _: &str) -> Result<Option<(Bytes, ObjectMeta)>> {
            std::future::pending().await
        }

        async fn head(&self, _: &str) -> Result<Option<ObjectMeta>> {
            std::future::pending().await
        }

        async fn list(&self, _: Option<&str>) -> Result<Vec<ObjectMeta>> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn test_unreachable_provider_fails_fast() {
        let store = BlobStore::custom(HangingBackend).with_timeout(Duration::from_millis(20));

        let err = store.get("a.jpg").await.unwrap_err();
        assert!(err.to_string().contains("timed out"));
        assert!(store.get_stream("a.jpg").await.is_err());
        assert!(store.list_keys().await.is_err());
    }

    #[tokio::test]
    async fn test_from_config_filesystem() {
        let tmp = tempfile::TempDir::new().unwrap();
        let config = StorageConfig {
            provider: ProviderKind::Filesystem,
            root: Some(tmp.path().join("blobs")),
            ..StorageConfig::default()
        };

        let store = BlobStore::from_config(&config).await.unwrap();
        assert_eq!(store.name(), "filesystem");
        assert!(tmp.path().join("blobs").is_dir());
    }

    #[tokio::test]
    async fn test_from_config_requires_root() {
        let config = StorageConfig {
            provider: ProviderKind::Filesystem,
            ..StorageConfig::default()
        };
        assert!(BlobStore::from_config(&config).await.is_err());
    }

    #[tokio::test]
    async fn test_list_keys() {
        let store = BlobStore::memory();
        store.put("b.jpg", Bytes::from_static(b"b"), None).await.unwrap();
        store.put("a.jpg", Bytes::from_static(b"a"), None).await.unwrap();
        assert_eq!(store.list_keys().await.unwrap(), ["a.jpg", "b.jpg"]);
    }
}

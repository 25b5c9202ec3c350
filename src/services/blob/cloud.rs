//! Cloud object-store blob backend.
//!
//! Wraps any [`object_store::ObjectStore`] (S3 and S3-compatible services,
//! GCS, Azure, local or in-memory stores) selected from a URL. A provider
//! `NotFound` becomes `Ok(None)`; every other provider failure, including
//! connectivity problems, is returned as an error so callers can tell
//! "definitely missing" from "could not check".

use super::backend::BlobBackend;
use super::types::{ByteStream, ObjectMeta, guess_content_type};
use super::validation::validate_key;
use anyhow::{Context, Result};
use async_trait::async_trait;
use bytes::Bytes;
use futures::{StreamExt, TryStreamExt};
use object_store::path::Path;
use object_store::{GetResult, ObjectStore, ObjectStoreScheme, PutPayload, parse_url_opts};
use std::sync::Arc;
use tracing::info;
use url::Url;

/// Blob backend over a remote (or local) object store.
#[derive(Clone)]
pub struct ObjectStoreBlobBackend {
    store: Arc<dyn ObjectStore>,
    prefix: Path,
    scheme: &'static str,
}

impl ObjectStoreBlobBackend {
    /// Builds a backend from a URL such as `s3://bucket/photos`.
    ///
    /// Credentials come from `AWS_*` environment variables so they are
    /// never part of the URL or config file.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL cannot be parsed or names an unsupported
    /// scheme.
    pub fn from_url(url: &str) -> Result<Self> {
        let parsed: Url = url
            .parse()
            .with_context(|| format!("Invalid object store URL: {url}"))?;
        let (scheme, _) = ObjectStoreScheme::parse(&parsed)
            .with_context(|| format!("Unsupported object store URL: {url}"))?;

        // Prefer explicit keys over instance metadata credentials.
        let options: Vec<(String, String)> = std::env::vars()
            .filter(|(key, _)| key.starts_with("AWS_"))
            .map(|(key, value)| (key.to_ascii_lowercase(), value))
            .collect();

        let (store, prefix) = parse_url_opts(&parsed, options)
            .with_context(|| format!("Failed to build object store for: {url}"))?;

        let scheme = match scheme {
            ObjectStoreScheme::AmazonS3 => "s3",
            ObjectStoreScheme::GoogleCloudStorage => "gcs",
            ObjectStoreScheme::MicrosoftAzure => "azure",
            ObjectStoreScheme::Local => "local",
            ObjectStoreScheme::Memory => "memory",
            _ => "object_store",
        };
        info!(scheme, prefix = %prefix, "Using object store blob backend");

        Ok(Self {
            store: Arc::from(store),
            prefix,
            scheme,
        })
    }

    /// Wraps an already-built store rooted at `prefix`.
    pub fn new(store: Arc<dyn ObjectStore>, prefix: impl Into<Path>) -> Self {
        Self {
            store,
            prefix: prefix.into(),
            scheme: "object_store",
        }
    }

    /// Scheme of the underlying store (e.g. `s3`).
    pub fn scheme(&self) -> &'static str {
        self.scheme
    }

    fn location(&self, key: &str) -> Result<Path> {
        let key = validate_key(key)?;
        let raw = if self.prefix.as_ref().is_empty() {
            key
        } else {
            format!("{}/{key}", self.prefix)
        };
        Path::parse(&raw).with_context(|| format!("Invalid object key for object store: {raw}"))
    }

    /// Key relative to this backend's prefix.
    fn relative_key(&self, location: &Path) -> Option<String> {
        let parts: Vec<String> = location
            .prefix_match(&self.prefix)?
            .map(|part| part.as_ref().to_string())
            .collect();
        (!parts.is_empty()).then(|| parts.join("/"))
    }

    /// Starts a download; `Ok(None)` when the provider reports `NotFound`.
    async fn open(&self, key: &str) -> Result<Option<(GetResult, ObjectMeta)>> {
        let location = self.location(key)?;

        let result = match self.store.get(&location).await {
            Ok(result) => result,
            Err(object_store::Error::NotFound { .. }) => return Ok(None),
            Err(e) => return Err(e).with_context(|| format!("Failed to read object: {key}")),
        };

        let meta = Self::meta_for(validate_key(key)?, &result.meta);
        Ok(Some((result, meta)))
    }

    fn meta_for(key: String, meta: &object_store::ObjectMeta) -> ObjectMeta {
        ObjectMeta {
            content_type: guess_content_type(&key),
            key,
            size: meta.size as u64,
            modified_at: meta.last_modified,
        }
    }
}

#[async_trait]
impl BlobBackend for ObjectStoreBlobBackend {
    fn name(&self) -> &'static str {
        "object_store"
    }

    async fn put(&self, key: &str, data: Bytes, content_type: Option<&str>) -> Result<ObjectMeta> {
        let location = self.location(key)?;
        let size = data.len() as u64;

        let result = self
            .store
            .put(&location, PutPayload::from(data))
            .await
            .with_context(|| format!("Failed to write object: {key}"))?;
        tracing::debug!(key, e_tag = ?result.e_tag, "Stored object");

        let key = validate_key(key)?;
        Ok(ObjectMeta {
            content_type: content_type
                .map(std::string::ToString::to_string)
                .unwrap_or_else(|| guess_content_type(&key)),
            key,
            size,
            modified_at: chrono::Utc::now(),
        })
    }

    async fn get(&self, key: &str) -> Result<Option<(Bytes, ObjectMeta)>> {
        let Some((result, meta)) = self.open(key).await? else {
            return Ok(None);
        };

        let data = result
            .bytes()
            .await
            .with_context(|| format!("Failed to read object body: {key}"))?;

        Ok(Some((data, meta)))
    }

    async fn get_stream(&self, key: &str) -> Result<Option<(ByteStream, ObjectMeta)>> {
        let Some((result, meta)) = self.open(key).await? else {
            return Ok(None);
        };

        let key = key.to_string();
        let stream = result
            .into_stream()
            .map_err(move |e| anyhow::Error::new(e).context(format!("Failed to read object body: {key}")))
            .boxed();

        Ok(Some((stream, meta)))
    }

    async fn head(&self, key: &str) -> Result<Option<ObjectMeta>> {
        let location = self.location(key)?;

        match self.store.head(&location).await {
            Ok(meta) => Ok(Some(Self::meta_for(validate_key(key)?, &meta))),
            Err(object_store::Error::NotFound { .. }) => Ok(None),
            Err(e) => Err(e).with_context(|| format!("Failed to stat object: {key}")),
        }
    }

    async fn list(&self, prefix: Option<&str>) -> Result<Vec<ObjectMeta>> {
        let root = (!self.prefix.as_ref().is_empty()).then_some(&self.prefix);

        let listed: Vec<object_store::ObjectMeta> = self
            .store
            .list(root)
            .try_collect()
            .await
            .context("Failed to list objects")?;

        let mut objects: Vec<ObjectMeta> = listed
            .iter()
            .filter_map(|meta| {
                let key = self.relative_key(&meta.location)?;
                Some(Self::meta_for(key, meta))
            })
            .filter(|meta| prefix.is_none_or(|prefix| meta.key.starts_with(prefix)))
            .collect();

        objects.sort_by(|a, b| a.key.cmp(&b.key));

        Ok(objects)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use object_store::memory::InMemory;

    fn create_backend() -> ObjectStoreBlobBackend {
        ObjectStoreBlobBackend::new(Arc::new(InMemory::new()), "photos")
    }

    #[tokio::test]
    async fn test_put_get_under_prefix() {
        let backend = create_backend();

        backend
            .put("2024/a.jpg", Bytes::from_static(b"jpeg"), None)
            .await
            .unwrap();

        let (data, meta) = backend.get("2024/a.jpg").await.unwrap().unwrap();
        assert_eq!(&data[..], b"jpeg");
        assert_eq!(meta.key, "2024/a.jpg");
        assert_eq!(meta.size, 4);

        let raw = backend
            .store
            .head(&Path::from("photos/2024/a.jpg"))
            .await
            .unwrap();
        assert_eq!(raw.location.as_ref(), "photos/2024/a.jpg");
    }

    #[tokio::test]
    async fn test_get_stream() {
        let backend = create_backend();
        backend
            .put("a.png", Bytes::from_static(b"\x89PNG"), None)
            .await
            .unwrap();

        let (stream, meta) = backend.get_stream("a.png").await.unwrap().unwrap();
        assert_eq!(meta.content_type, "image/png");
        let chunks: Vec<Bytes> = stream.try_collect().await.unwrap();
        assert_eq!(chunks.concat(), b"\x89PNG");
    }

    #[tokio::test]
    async fn test_not_found_is_none() {
        let backend = create_backend();
        assert!(backend.get("missing.jpg").await.unwrap().is_none());
        assert!(backend.get_stream("missing.jpg").await.unwrap().is_none());
        assert!(backend.head("missing.jpg").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_strips_prefix() {
        let backend = create_backend();
        backend
            .store
            .put(
                &Path::from("elsewhere/x.jpg"),
                PutPayload::from(Bytes::from_static(b"x")),
            )
            .await
            .unwrap();
        for key in ["b.jpg", "a/c.png"] {
            backend.put(key, Bytes::from_static(b"x"), None).await.unwrap();
        }

        let keys: Vec<String> = backend
            .list(None)
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.key)
            .collect();
        assert_eq!(keys, ["a/c.png", "b.jpg"]);
    }

    #[tokio::test]
    async fn test_from_memory_url() {
        let backend = ObjectStoreBlobBackend::from_url("memory:///").unwrap();
        assert_eq!(backend.scheme(), "memory");
        backend.put("a.jpg", Bytes::from_static(b"x"), None).await.unwrap();
        assert!(backend.exists("a.jpg").await.unwrap());
    }

    #[tokio::test]
    async fn test_traversal_rejected() {
        let backend = create_backend();
        assert!(backend.get("../secrets.txt").await.is_err());
    }
}

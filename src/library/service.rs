//! `PhotoLibrary`: the provider-independent photo API.
//!
//! Joins the active blob store with the metadata store and translates
//! backend failures into the typed [`Error`] taxonomy.

use super::signature;
use crate::audit::{AuditEvent, log_audit_event};
use crate::error::{Error, Result};
use crate::photo::{Metadata, Photo};
use crate::services::blob::{BlobStore, ByteStream, InvalidObjectKey, OCTET_STREAM};
use crate::services::metadata::{MetadataStore, Registration, UpdateOutcome};
use chrono::{DateTime, Utc};
use futures::StreamExt;
use serde::Serialize;
use uuid::Uuid;

/// Page size used when the caller gives none.
pub const DEFAULT_PAGE_LIMIT: usize = 100;
/// Largest page size a caller can request.
pub const MAX_PAGE_LIMIT: usize = 500;

/// One window of the photo listing.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PhotoPage {
    pub total: usize,
    pub limit: usize,
    pub offset: usize,
    pub items: Vec<Photo>,
}

/// An opened blob: its body as a stream, the byte count and the content
/// type to serve it as.
pub struct Blob {
    pub stream: ByteStream,
    pub size: u64,
    pub content_type: String,
}

impl std::fmt::Debug for Blob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Blob")
            .field("size", &self.size)
            .field("content_type", &self.content_type)
            .finish_non_exhaustive()
    }
}

/// Converts a blob store failure into the error taxonomy.
///
/// Invalid keys are the caller's fault; anything else means the provider
/// could not answer.
pub(crate) fn blob_error(err: anyhow::Error) -> Error {
    if let Some(invalid) = err.downcast_ref::<InvalidObjectKey>() {
        if let InvalidObjectKey::Traversal(key) | InvalidObjectKey::Absolute(key) = invalid {
            log_audit_event(AuditEvent::PathTraversalBlocked { key: key.clone() });
        }
        return Error::validation("Invalid object key");
    }
    Error::unavailable(err)
}

/// Unified photo operations over one blob provider and the metadata store.
///
/// # Thread Safety
///
/// `PhotoLibrary` is `Clone` and can be shared across request handlers.
#[derive(Clone)]
pub struct PhotoLibrary {
    blobs: BlobStore,
    metadata: MetadataStore,
}

impl PhotoLibrary {
    pub fn new(blobs: BlobStore, metadata: MetadataStore) -> Self {
        Self { blobs, metadata }
    }

    pub fn blobs(&self) -> &BlobStore {
        &self.blobs
    }

    pub fn metadata(&self) -> &MetadataStore {
        &self.metadata
    }

    /// Lists photos in registration order.
    ///
    /// `limit` defaults to 100 and is clamped to 500; `offset` defaults to 0.
    /// `total` counts every record regardless of the window.
    pub async fn list_photos(&self, limit: Option<usize>, offset: Option<usize>) -> Result<PhotoPage> {
        let limit = limit.unwrap_or(DEFAULT_PAGE_LIMIT).min(MAX_PAGE_LIMIT);
        let offset = offset.unwrap_or(0);

        let (items, total) = self
            .metadata
            .list(limit, offset)
            .await
            .map_err(Error::unavailable)?;

        Ok(PhotoPage {
            total,
            limit,
            offset,
            items,
        })
    }

    /// Returns a photo's record without touching its blob.
    pub async fn get_photo(&self, id: Uuid) -> Result<Photo> {
        self.metadata
            .get(id)
            .await
            .map_err(Error::unavailable)?
            .ok_or(Error::PhotoNotFound { id })
    }

    /// Merges `patch` into a photo's metadata if the caller saw the current
    /// version.
    ///
    /// A missing `expected_last_modified` is treated as stale.
    pub async fn set_metadata(
        &self,
        id: Uuid,
        patch: Metadata,
        expected_last_modified: Option<DateTime<Utc>>,
    ) -> Result<Photo> {
        let Some(expected) = expected_last_modified else {
            // Still report unknown ids as missing rather than conflicting
            self.get_photo(id).await?;
            return Err(Error::Conflict { id });
        };

        let outcome = self
            .metadata
            .update_if_unmodified(id, expected, patch)
            .await
            .map_err(Error::unavailable)?;

        match outcome {
            UpdateOutcome::Updated(photo) => {
                tracing::debug!(%id, last_modified = %photo.last_modified, "Metadata updated");
                Ok(photo)
            },
            UpdateOutcome::NotFound => Err(Error::PhotoNotFound { id }),
            UpdateOutcome::Conflict { current } => {
                tracing::debug!(%id, %expected, %current, "Stale metadata update rejected");
                Err(Error::Conflict { id })
            },
        }
    }

    /// Opens a blob on the active provider.
    ///
    /// The body is streamed from the provider, never read into memory up
    /// front. Absent keys fail with `ObjectNotFound`; provider failures fail
    /// with `BackendUnavailable` immediately.
    pub async fn fetch_blob(&self, object_key: &str) -> Result<Blob> {
        let (mut stream, meta) = self
            .blobs
            .get_stream(object_key)
            .await
            .map_err(blob_error)?
            .ok_or_else(|| Error::ObjectNotFound {
                key: object_key.to_string(),
            })?;

        if meta.content_type != OCTET_STREAM {
            return Ok(Blob {
                stream,
                size: meta.size,
                content_type: meta.content_type,
            });
        }

        // Providers guess from the key; fall back to the first chunk
        let first = stream.next().await;
        let content_type = match &first {
            Some(Ok(chunk)) => signature::sniff(chunk).map_or(OCTET_STREAM, signature::ImageFormat::mime_type),
            _ => OCTET_STREAM,
        };

        Ok(Blob {
            stream: futures::stream::iter(first).chain(stream).boxed(),
            size: meta.size,
            content_type: content_type.to_string(),
        })
    }

    /// Registers an object key, returning the existing record if there is one.
    pub async fn register(&self, object_key: &str) -> Result<Registration> {
        self.metadata
            .register(Photo::register(object_key))
            .await
            .map_err(Error::unavailable)
    }
}

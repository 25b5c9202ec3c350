//! Backend trait for the metadata store.
//!
//! Defines the record operations every metadata backend must provide,
//! including the atomic conditional update that backs optimistic
//! concurrency.

use crate::photo::{Metadata, Photo};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use uuid::Uuid;

/// Outcome of registering an object key.
#[derive(Debug, Clone, PartialEq)]
pub enum Registration {
    /// A new record was stored.
    Created(Photo),
    /// The object key already had a record; nothing was written.
    Existing(Photo),
}

impl Registration {
    pub fn photo(&self) -> &Photo {
        match self {
            Self::Created(photo) | Self::Existing(photo) => photo,
        }
    }
}

/// Outcome of a conditional metadata update.
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOutcome {
    /// Timestamps matched; the merged record was stored.
    Updated(Photo),
    /// No record with that id.
    NotFound,
    /// Stored `last_modified` differs from the expected one; nothing changed.
    Conflict { current: DateTime<Utc> },
}

/// Backend trait for photo records.
///
/// All backends must be thread-safe (`Send + Sync`) for use with tokio.
/// Reads return `metadata` and `last_modified` from the same committed
/// state, and `update_if_unmodified` must run its read-compare-write as one
/// atomic step per record.
///
/// # Example
///
/// ```ignore
/// use photovault::services::metadata::{MetadataBackend, MemoryMetadataBackend};
///
/// let backend = MemoryMetadataBackend::new();
/// let photo = backend.register(Photo::register("a.jpg")).await?.photo().clone();
/// let outcome = backend
///     .update_if_unmodified(photo.id, photo.last_modified, patch)
///     .await?;
/// ```
#[async_trait]
pub trait MetadataBackend: Send + Sync + 'static {
    /// Retrieves a record by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying storage operation fails.
    async fn get(&self, id: Uuid) -> Result<Option<Photo>>;

    /// Stores `photo` unless its object key is already registered.
    ///
    /// Records are ordered by registration; the new record goes last.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying storage operation fails.
    async fn register(&self, photo: Photo) -> Result<Registration>;

    /// Returns a window of records in registration order plus the total
    /// number of records.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying storage operation fails.
    async fn list(&self, limit: usize, offset: usize) -> Result<(Vec<Photo>, usize)>;

    /// Maps every registered object key to its photo id.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying storage operation fails.
    async fn object_keys(&self) -> Result<HashMap<String, Uuid>>;

    /// Merges `patch` into the record if its `last_modified` equals
    /// `expected`, assigning a strictly later `last_modified`.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying storage operation fails.
    async fn update_if_unmodified(
        &self,
        id: Uuid,
        expected: DateTime<Utc>,
        patch: Metadata,
    ) -> Result<UpdateOutcome>;
}

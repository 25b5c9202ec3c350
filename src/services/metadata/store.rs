//! High-level `MetadataStore` wrapper over backend implementations.

use super::backend::{MetadataBackend, Registration, UpdateOutcome};
use super::memory::MemoryMetadataBackend;
use super::redb::RedbMetadataBackend;
use crate::photo::{Metadata, Photo};
use anyhow::Result;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

/// High-level photo record store.
///
/// Wraps a `MetadataBackend` implementation and provides a consistent API
/// regardless of the underlying storage mechanism.
///
/// # Thread Safety
///
/// `MetadataStore` is `Clone` and can be shared across tasks. The
/// underlying backend handles concurrent access safely.
///
/// # Example
///
/// ```ignore
/// use photovault::services::metadata::MetadataStore;
///
/// let store = MetadataStore::file("/var/lib/photovault/metadata.redb")?;
/// let registration = store.register(Photo::register("2024/beach.jpg")).await?;
/// ```
#[derive(Clone)]
pub struct MetadataStore {
    backend: Arc<dyn MetadataBackend>,
}

impl MetadataStore {
    /// Creates a `MetadataStore` backed by a redb database file.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or created.
    pub fn file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self::custom(RedbMetadataBackend::open(path)?))
    }

    /// Creates a `MetadataStore` held in memory. Records are lost on exit.
    pub fn memory() -> Self {
        Self::custom(MemoryMetadataBackend::new())
    }

    /// Creates a `MetadataStore` with a custom backend.
    pub fn custom<B: MetadataBackend>(backend: B) -> Self {
        Self {
            backend: Arc::new(backend),
        }
    }

    /// Retrieves a record by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying storage operation fails.
    pub async fn get(&self, id: Uuid) -> Result<Option<Photo>> {
        self.backend.get(id).await
    }

    /// Registers a photo unless its object key already has a record.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying storage operation fails.
    pub async fn register(&self, photo: Photo) -> Result<Registration> {
        self.backend.register(photo).await
    }

    /// Returns a window of records in registration order plus the total.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying storage operation fails.
    pub async fn list(&self, limit: usize, offset: usize) -> Result<(Vec<Photo>, usize)> {
        self.backend.list(limit, offset).await
    }

    /// Maps every registered object key to its photo id.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying storage operation fails.
    pub async fn object_keys(&self) -> Result<HashMap<String, Uuid>> {
        self.backend.object_keys().await
    }

    /// Atomically merges `patch` if the record was not modified since
    /// `expected`.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying storage operation fails.
    pub async fn update_if_unmodified(
        &self,
        id: Uuid,
        expected: DateTime<Utc>,
        patch: Metadata,
    ) -> Result<UpdateOutcome> {
        self.backend.update_if_unmodified(id, expected, patch).await
    }
}

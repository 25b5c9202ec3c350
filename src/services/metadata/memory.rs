//! In-memory metadata backend.
//!
//! Keeps records behind a single `RwLock`; the write lock makes each
//! conditional update atomic. Nothing survives a restart.

use super::backend::{MetadataBackend, Registration, UpdateOutcome};
use crate::photo::{Metadata, Photo};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Default)]
struct Records {
    photos: HashMap<Uuid, Photo>,
    /// Ids in registration order.
    order: Vec<Uuid>,
    by_key: HashMap<String, Uuid>,
}

/// In-memory metadata backend.
#[derive(Default)]
pub struct MemoryMetadataBackend {
    records: RwLock<Records>,
}

impl MemoryMetadataBackend {
    /// Creates a new empty in-memory backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of records.
    pub fn len(&self) -> usize {
        self.records.read().order.len()
    }

    /// Returns true if there are no records.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl MetadataBackend for MemoryMetadataBackend {
    async fn get(&self, id: Uuid) -> Result<Option<Photo>> {
        Ok(self.records.read().photos.get(&id).cloned())
    }

    async fn register(&self, photo: Photo) -> Result<Registration> {
        let mut records = self.records.write();

        if let Some(existing) = records.by_key.get(&photo.object_key) {
            let existing = records.photos[existing].clone();
            return Ok(Registration::Existing(existing));
        }

        records.by_key.insert(photo.object_key.clone(), photo.id);
        records.order.push(photo.id);
        records.photos.insert(photo.id, photo.clone());

        Ok(Registration::Created(photo))
    }

    async fn list(&self, limit: usize, offset: usize) -> Result<(Vec<Photo>, usize)> {
        let records = self.records.read();
        let items = records
            .order
            .iter()
            .skip(offset)
            .take(limit)
            .filter_map(|id| records.photos.get(id).cloned())
            .collect();
        Ok((items, records.order.len()))
    }

    async fn object_keys(&self) -> Result<HashMap<String, Uuid>> {
        Ok(self.records.read().by_key.clone())
    }

    async fn update_if_unmodified(
        &self,
        id: Uuid,
        expected: DateTime<Utc>,
        patch: Metadata,
    ) -> Result<UpdateOutcome> {
        let mut records = self.records.write();

        let Some(photo) = records.photos.get_mut(&id) else {
            return Ok(UpdateOutcome::NotFound);
        };
        if photo.last_modified != expected {
            return Ok(UpdateOutcome::Conflict {
                current: photo.last_modified,
            });
        }

        photo.apply_patch(patch);
        Ok(UpdateOutcome::Updated(photo.clone()))
    }
}

//! In-memory blob storage backend.
//!
//! Provides a fast, non-persistent blob store using DashMap for
//! concurrent access. Nothing survives a process restart.

use super::backend::BlobBackend;
use super::types::{ObjectMeta, guess_content_type};
use super::validation::validate_key;
use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use dashmap::DashMap;

/// Entry stored in the memory backend.
#[derive(Clone)]
struct MemoryObject {
    data: Bytes,
    meta: ObjectMeta,
}

/// In-memory blob backend using DashMap.
///
/// # Thread Safety
///
/// Uses `DashMap` internally for sharded concurrent access; the backend is
/// shared behind an `Arc` by [`BlobStore`](super::BlobStore).
#[derive(Default)]
pub struct MemoryBlobBackend {
    data: DashMap<String, MemoryObject>,
}

impl MemoryBlobBackend {
    /// Creates a new empty in-memory backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of objects in the store.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[async_trait]
impl BlobBackend for MemoryBlobBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn put(&self, key: &str, data: Bytes, content_type: Option<&str>) -> Result<ObjectMeta> {
        let key = validate_key(key)?;

        let content_type = content_type
            .map(std::string::ToString::to_string)
            .unwrap_or_else(|| guess_content_type(&key));

        let meta = ObjectMeta {
            key: key.clone(),
            size: data.len() as u64,
            content_type,
            modified_at: Utc::now(),
        };

        self.data.insert(
            key,
            MemoryObject {
                data,
                meta: meta.clone(),
            },
        );

        Ok(meta)
    }

    async fn get(&self, key: &str) -> Result<Option<(Bytes, ObjectMeta)>> {
        let key = validate_key(key)?;

        Ok(self.data.get(&key).map(|entry| {
            let obj = entry.value();
            (obj.data.clone(), obj.meta.clone())
        }))
    }

    async fn head(&self, key: &str) -> Result<Option<ObjectMeta>> {
        let key = validate_key(key)?;

        Ok(self.data.get(&key).map(|entry| entry.value().meta.clone()))
    }

    async fn list(&self, prefix: Option<&str>) -> Result<Vec<ObjectMeta>> {
        let mut objects: Vec<ObjectMeta> = self
            .data
            .iter()
            .filter(|entry| prefix.is_none_or(|prefix| entry.key().starts_with(prefix)))
            .map(|entry| entry.value().meta.clone())
            .collect();

        objects.sort_by(|a, b| a.key.cmp(&b.key));

        Ok(objects)
    }
}

//! Redb-backed metadata backend.
//!
//! Provides persistent photo records using redb with ACID guarantees.
//! Redb serializes write transactions, so the conditional update's
//! read-compare-write runs inside a single write transaction.

use super::backend::{MetadataBackend, Registration, UpdateOutcome};
use crate::photo::{Metadata, Photo};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redb::{Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

/// Photo id -> JSON-encoded `Photo`
pub(crate) const PHOTOS_TABLE: TableDefinition<'static, &'static str, &'static [u8]> =
    TableDefinition::new("photos");

/// Registration sequence -> photo id
pub(crate) const ORDER_TABLE: TableDefinition<'static, u64, &'static str> =
    TableDefinition::new("photo_order");

/// Object key -> photo id
pub(crate) const KEYS_TABLE: TableDefinition<'static, &'static str, &'static str> =
    TableDefinition::new("object_keys");

/// Redb-backed metadata backend.
///
/// # Thread Safety
///
/// `RedbMetadataBackend` is `Clone` and can be shared across threads. The
/// underlying database handles concurrent access safely.
#[derive(Clone)]
pub struct RedbMetadataBackend {
    db: Arc<Database>,
}

fn decode(id: &str, json: &[u8]) -> Result<Photo> {
    serde_json::from_slice(json).with_context(|| format!("Failed to deserialize photo '{id}'"))
}

impl RedbMetadataBackend {
    /// Opens or creates a redb database at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Parent directory cannot be created
    /// - Database file cannot be opened or created
    /// - Initialization transaction fails to begin or commit
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create metadata directory: {}", parent.display())
            })?;
        }

        let db = Database::create(path)
            .with_context(|| format!("Failed to open metadata database: {}", path.display()))?;

        // Create tables up front so read transactions can open them
        let write_txn = db
            .begin_write()
            .context("Failed to begin initialization transaction")?;
        {
            write_txn
                .open_table(PHOTOS_TABLE)
                .context("Failed to initialize photos table")?;
            write_txn
                .open_table(ORDER_TABLE)
                .context("Failed to initialize order table")?;
            write_txn
                .open_table(KEYS_TABLE)
                .context("Failed to initialize object key table")?;
        }
        write_txn
            .commit()
            .context("Failed to commit initialization transaction")?;

        Ok(Self { db: Arc::new(db) })
    }

    fn get_sync(&self, id: Uuid) -> Result<Option<Photo>> {
        let read_txn = self
            .db
            .begin_read()
            .context("Failed to begin read transaction")?;
        let table = read_txn
            .open_table(PHOTOS_TABLE)
            .context("Failed to open photos table")?;

        let id = id.to_string();
        let result = table
            .get(id.as_str())
            .with_context(|| format!("Failed to read photo '{id}'"))?;

        result.map(|guard| decode(&id, guard.value())).transpose()
    }

    fn register_sync(&self, photo: Photo) -> Result<Registration> {
        let write_txn = self
            .db
            .begin_write()
            .context("Failed to begin write transaction")?;

        let id = photo.id.to_string();
        let existing = {
            let keys = write_txn
                .open_table(KEYS_TABLE)
                .context("Failed to open object key table")?;
            keys.get(photo.object_key.as_str())
                .with_context(|| format!("Failed to read object key '{}'", photo.object_key))?
                .map(|guard| guard.value().to_string())
        };

        if let Some(existing_id) = existing {
            let photos = write_txn
                .open_table(PHOTOS_TABLE)
                .context("Failed to open photos table")?;
            let json = photos
                .get(existing_id.as_str())
                .with_context(|| format!("Failed to read photo '{existing_id}'"))?
                .map(|guard| guard.value().to_vec())
                .with_context(|| format!("Object key '{}' points at a missing photo", photo.object_key))?;
            return Ok(Registration::Existing(decode(&existing_id, &json)?));
        }

        {
            let mut photos = write_txn
                .open_table(PHOTOS_TABLE)
                .context("Failed to open photos table")?;
            let json = serde_json::to_vec(&photo).context("Failed to serialize photo to JSON")?;
            photos
                .insert(id.as_str(), json.as_slice())
                .with_context(|| format!("Failed to insert photo '{id}'"))?;

            let mut order = write_txn
                .open_table(ORDER_TABLE)
                .context("Failed to open order table")?;
            let next_seq = order
                .last()
                .context("Failed to read last sequence number")?
                .map_or(0, |(seq, _)| seq.value() + 1);
            order
                .insert(next_seq, id.as_str())
                .context("Failed to append to order table")?;

            let mut keys = write_txn
                .open_table(KEYS_TABLE)
                .context("Failed to open object key table")?;
            keys.insert(photo.object_key.as_str(), id.as_str())
                .with_context(|| format!("Failed to index object key '{}'", photo.object_key))?;
        }

        write_txn
            .commit()
            .context("Failed to commit register transaction")?;

        Ok(Registration::Created(photo))
    }

    fn list_sync(&self, limit: usize, offset: usize) -> Result<(Vec<Photo>, usize)> {
        let read_txn = self
            .db
            .begin_read()
            .context("Failed to begin read transaction")?;
        let order = read_txn
            .open_table(ORDER_TABLE)
            .context("Failed to open order table")?;
        let photos = read_txn
            .open_table(PHOTOS_TABLE)
            .context("Failed to open photos table")?;

        let total = usize::try_from(order.len().context("Failed to count photos")?)
            .context("Photo count overflows usize")?;

        let mut items = Vec::with_capacity(limit.min(total));
        for entry in order
            .iter()
            .context("Failed to iterate order table")?
            .skip(offset)
            .take(limit)
        {
            let (_, id) = entry.context("Failed to read order entry")?;
            let id = id.value();
            if let Some(guard) = photos
                .get(id)
                .with_context(|| format!("Failed to read photo '{id}'"))?
            {
                items.push(decode(id, guard.value())?);
            }
        }

        Ok((items, total))
    }

    fn object_keys_sync(&self) -> Result<HashMap<String, Uuid>> {
        let read_txn = self
            .db
            .begin_read()
            .context("Failed to begin read transaction")?;
        let keys = read_txn
            .open_table(KEYS_TABLE)
            .context("Failed to open object key table")?;

        let mut result = HashMap::new();
        for entry in keys.iter().context("Failed to iterate object key table")? {
            let (key, id) = entry.context("Failed to read object key entry")?;
            let id = Uuid::parse_str(id.value())
                .with_context(|| format!("Corrupt photo id for object key '{}'", key.value()))?;
            result.insert(key.value().to_string(), id);
        }

        Ok(result)
    }

    fn update_if_unmodified_sync(
        &self,
        id: Uuid,
        expected: DateTime<Utc>,
        patch: Metadata,
    ) -> Result<UpdateOutcome> {
        let write_txn = self
            .db
            .begin_write()
            .context("Failed to begin write transaction")?;

        let id = id.to_string();
        let outcome = {
            let mut photos = write_txn
                .open_table(PHOTOS_TABLE)
                .context("Failed to open photos table")?;

            let stored = photos
                .get(id.as_str())
                .with_context(|| format!("Failed to read photo '{id}'"))?
                .map(|guard| guard.value().to_vec());

            match stored {
                None => UpdateOutcome::NotFound,
                Some(json) => {
                    let mut photo = decode(&id, &json)?;
                    if photo.last_modified == expected {
                        photo.apply_patch(patch);
                        let json = serde_json::to_vec(&photo)
                            .context("Failed to serialize photo to JSON")?;
                        photos
                            .insert(id.as_str(), json.as_slice())
                            .with_context(|| format!("Failed to update photo '{id}'"))?;
                        UpdateOutcome::Updated(photo)
                    } else {
                        UpdateOutcome::Conflict {
                            current: photo.last_modified,
                        }
                    }
                },
            }
        };

        if matches!(outcome, UpdateOutcome::Updated(_)) {
            write_txn
                .commit()
                .context("Failed to commit update transaction")?;
        } else {
            write_txn
                .abort()
                .context("Failed to abort update transaction")?;
        }

        Ok(outcome)
    }
}

#[async_trait]
impl MetadataBackend for RedbMetadataBackend {
    async fn get(&self, id: Uuid) -> Result<Option<Photo>> {
        let backend = self.clone();
        tokio::task::spawn_blocking(move || backend.get_sync(id))
            .await
            .context("Task join error")?
    }

    async fn register(&self, photo: Photo) -> Result<Registration> {
        let backend = self.clone();
        tokio::task::spawn_blocking(move || backend.register_sync(photo))
            .await
            .context("Task join error")?
    }

    async fn list(&self, limit: usize, offset: usize) -> Result<(Vec<Photo>, usize)> {
        let backend = self.clone();
        tokio::task::spawn_blocking(move || backend.list_sync(limit, offset))
            .await
            .context("Task join error")?
    }

    async fn object_keys(&self) -> Result<HashMap<String, Uuid>> {
        let backend = self.clone();
        tokio::task::spawn_blocking(move || backend.object_keys_sync())
            .await
            .context("Task join error")?
    }

    async fn update_if_unmodified(
        &self,
        id: Uuid,
        expected: DateTime<Utc>,
        patch: Metadata,
    ) -> Result<UpdateOutcome> {
        let backend = self.clone();
        tokio::task::spawn_blocking(move || backend.update_if_unmodified_sync(id, expected, patch))
            .await
            .context("Task join error")?
    }
}

//! Redb-backed token storage backend.
//!
//! Provides persistent token storage using redb with ACID guarantees, so
//! issued refresh tokens and revocations survive restarts.

use super::backend::TokenBackend;
use super::types::TokenEntry;
use anyhow::{Context, Result};
use async_trait::async_trait;
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Table name for tokens with expiration metadata
pub(crate) const TOKENS_TABLE: TableDefinition<'static, &'static str, &'static [u8]> =
    TableDefinition::new("tokens");

/// Redb-backed token storage backend.
///
/// # Thread Safety
///
/// `RedbTokenBackend` is `Clone` and can be shared across threads. Redb
/// runs one write transaction at a time, which makes `compare_and_swap`
/// atomic.
#[derive(Clone)]
pub struct RedbTokenBackend {
    db: Arc<Database>,
}

fn decode(key: &str, json: &[u8]) -> Result<TokenEntry> {
    serde_json::from_slice(json).with_context(|| format!("Failed to deserialize entry for key '{key}'"))
}

impl RedbTokenBackend {
    /// Opens or creates a redb database at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Parent directory cannot be created
    /// - Database file cannot be opened or created (permissions, disk full, etc.)
    /// - Initialization transaction fails to begin or commit
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create token store directory: {}", parent.display())
            })?;
        }

        let db = Database::create(path)
            .with_context(|| format!("Failed to open token database: {}", path.display()))?;

        // Initialize table on first open so reads can find it
        let write_txn = db
            .begin_write()
            .context("Failed to begin initialization transaction")?;
        {
            let _table = write_txn
                .open_table(TOKENS_TABLE)
                .context("Failed to initialize tokens table")?;
        }
        write_txn
            .commit()
            .context("Failed to commit initialization transaction")?;

        Ok(Self { db: Arc::new(db) })
    }

    fn get_sync(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let read_txn = self
            .db
            .begin_read()
            .context("Failed to begin read transaction")?;

        let table = read_txn
            .open_table(TOKENS_TABLE)
            .context("Failed to open tokens table")?;

        let result = table
            .get(key)
            .with_context(|| format!("Failed to read key '{key}'"))?;

        match result {
            Some(guard) => {
                let entry = decode(key, guard.value())?;
                if entry.is_expired() {
                    drop(guard);
                    drop(table);
                    drop(read_txn);

                    self.remove_expired_sync(key)?;
                    Ok(None)
                } else {
                    Ok(Some(entry.value))
                }
            },
            None => Ok(None),
        }
    }

    fn set_sync(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> Result<()> {
        let entry = TokenEntry::new(value, ttl);
        let json = serde_json::to_vec(&entry).context("Failed to serialize entry to JSON")?;

        let write_txn = self
            .db
            .begin_write()
            .context("Failed to begin write transaction")?;
        {
            let mut table = write_txn
                .open_table(TOKENS_TABLE)
                .context("Failed to open tokens table")?;
            table
                .insert(key, json.as_slice())
                .with_context(|| format!("Failed to insert key '{key}'"))?;
        }
        write_txn
            .commit()
            .context("Failed to commit set transaction")?;

        Ok(())
    }

    /// Removes `key` if its entry has expired; a concurrent `set` wins.
    fn remove_expired_sync(&self, key: &str) -> Result<()> {
        let write_txn = self
            .db
            .begin_write()
            .context("Failed to begin write transaction")?;

        let removed = {
            let mut table = write_txn
                .open_table(TOKENS_TABLE)
                .context("Failed to open tokens table")?;

            let current = table
                .get(key)
                .with_context(|| format!("Failed to read key '{key}'"))?
                .map(|guard| guard.value().to_vec());

            match current {
                Some(json) if decode(key, &json)?.is_expired() => {
                    table
                        .remove(key)
                        .with_context(|| format!("Failed to remove key '{key}'"))?;
                    true
                },
                _ => false,
            }
        };

        if removed {
            write_txn
                .commit()
                .context("Failed to commit expiry transaction")?;
        } else {
            write_txn
                .abort()
                .context("Failed to abort expiry transaction")?;
        }

        Ok(())
    }

    fn compare_and_swap_sync(
        &self,
        key: &str,
        expected: &[u8],
        new: Vec<u8>,
        ttl: Option<Duration>,
    ) -> Result<bool> {
        let write_txn = self
            .db
            .begin_write()
            .context("Failed to begin write transaction")?;

        let swapped = {
            let mut table = write_txn
                .open_table(TOKENS_TABLE)
                .context("Failed to open tokens table")?;

            let current = table
                .get(key)
                .with_context(|| format!("Failed to read key '{key}'"))?
                .map(|guard| guard.value().to_vec());

            let matches = match current {
                Some(json) => {
                    let entry = decode(key, &json)?;
                    !entry.is_expired() && entry.value == expected
                },
                None => false,
            };

            if matches {
                let json = serde_json::to_vec(&TokenEntry::new(new, ttl))
                    .context("Failed to serialize entry to JSON")?;
                table
                    .insert(key, json.as_slice())
                    .with_context(|| format!("Failed to swap key '{key}'"))?;
            }
            matches
        };

        if swapped {
            write_txn
                .commit()
                .context("Failed to commit swap transaction")?;
        } else {
            write_txn
                .abort()
                .context("Failed to abort swap transaction")?;
        }

        Ok(swapped)
    }

    fn purge_expired_sync(&self) -> Result<usize> {
        let write_txn = self
            .db
            .begin_write()
            .context("Failed to begin write transaction")?;

        let removed = {
            let mut table = write_txn
                .open_table(TOKENS_TABLE)
                .context("Failed to open tokens table")?;

            let mut expired = Vec::new();
            for item in table.iter().context("Failed to iterate tokens table")? {
                let (key, value) = item.context("Failed to read token entry")?;
                if decode(key.value(), value.value())?.is_expired() {
                    expired.push(key.value().to_string());
                }
            }

            for key in &expired {
                table
                    .remove(key.as_str())
                    .with_context(|| format!("Failed to remove key '{key}'"))?;
            }
            expired.len()
        };

        write_txn
            .commit()
            .context("Failed to commit purge transaction")?;

        Ok(removed)
    }
}

#[async_trait]
impl TokenBackend for RedbTokenBackend {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let backend = self.clone();
        let key = key.to_string();
        tokio::task::spawn_blocking(move || backend.get_sync(&key))
            .await
            .context("Task join error")?
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> Result<()> {
        let backend = self.clone();
        let key = key.to_string();
        tokio::task::spawn_blocking(move || backend.set_sync(&key, value, ttl))
            .await
            .context("Task join error")?
    }

    async fn compare_and_swap(
        &self,
        key: &str,
        expected: &[u8],
        new: Vec<u8>,
        ttl: Option<Duration>,
    ) -> Result<bool> {
        let backend = self.clone();
        let key = key.to_string();
        let expected = expected.to_vec();
        tokio::task::spawn_blocking(move || backend.compare_and_swap_sync(&key, &expected, new, ttl))
            .await
            .context("Task join error")?
    }

    async fn purge_expired(&self) -> Result<usize> {
        let backend = self.clone();
        tokio::task::spawn_blocking(move || backend.purge_expired_sync())
            .await
            .context("Task join error")?
    }
}

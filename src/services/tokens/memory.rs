//! In-memory token storage backend.
//!
//! Uses DashMap for concurrent access. Nothing survives a restart, so every
//! issued refresh token becomes invalid when the process exits.

use super::backend::TokenBackend;
use super::types::TokenEntry;
use anyhow::Result;
use async_trait::async_trait;
use dashmap::DashMap;
use std::time::Duration;

/// In-memory token backend using DashMap.
///
/// # Thread Safety
///
/// Entry-level operations lock only the shard holding the key, which makes
/// `compare_and_swap` atomic per key.
#[derive(Default)]
pub struct MemoryTokenBackend {
    data: DashMap<String, TokenEntry>,
}

impl MemoryTokenBackend {
    /// Creates a new empty in-memory backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of entries in the store (including expired).
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[async_trait]
impl TokenBackend for MemoryTokenBackend {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        if let Some(entry) = self.data.get(key) {
            if entry.is_expired() {
                drop(entry);
                self.data.remove_if(key, |_, entry| entry.is_expired());
                Ok(None)
            } else {
                Ok(Some(entry.value.clone()))
            }
        } else {
            Ok(None)
        }
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> Result<()> {
        self.data.insert(key.to_string(), TokenEntry::new(value, ttl));
        Ok(())
    }

    async fn compare_and_swap(
        &self,
        key: &str,
        expected: &[u8],
        new: Vec<u8>,
        ttl: Option<Duration>,
    ) -> Result<bool> {
        let Some(mut entry) = self.data.get_mut(key) else {
            return Ok(false);
        };
        if entry.is_expired() || entry.value != expected {
            return Ok(false);
        }
        *entry = TokenEntry::new(new, ttl);
        Ok(true)
    }

    async fn purge_expired(&self) -> Result<usize> {
        let before = self.data.len();
        self.data.retain(|_, entry| !entry.is_expired());
        Ok(before.saturating_sub(self.data.len()))
    }
}

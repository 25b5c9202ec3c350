//! High-level `TokenStore` wrapper over backend implementations.

use super::backend::TokenBackend;
use super::memory::MemoryTokenBackend;
use super::redb::RedbTokenBackend;
use crate::config::TokenStoreAddress;
use anyhow::Result;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// High-level token store interface.
///
/// # Thread Safety
///
/// `TokenStore` is `Clone` and can be shared across tasks. The underlying
/// backend handles concurrent access safely.
///
/// # Example
///
/// ```ignore
/// use photovault::services::tokens::TokenStore;
///
/// let store = TokenStore::open(&"redb:///var/lib/photovault/tokens.redb".parse()?)?;
/// store.set("refresh:ab12", record, Some(Duration::from_secs(3600))).await?;
/// ```
#[derive(Clone)]
pub struct TokenStore {
    backend: Arc<dyn TokenBackend>,
}

impl TokenStore {
    /// Connects to the store named by `address`.
    ///
    /// # Errors
    ///
    /// Returns an error if a persistent store cannot be opened.
    pub fn open(address: &TokenStoreAddress) -> Result<Self> {
        match address {
            TokenStoreAddress::Memory => Ok(Self::memory()),
            TokenStoreAddress::Redb(path) => Self::file(path),
        }
    }

    /// Creates a `TokenStore` backed by a redb database file.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or created.
    pub fn file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self::custom(RedbTokenBackend::open(path)?))
    }

    /// Creates a `TokenStore` held in memory. All data is lost on exit.
    pub fn memory() -> Self {
        Self::custom(MemoryTokenBackend::new())
    }

    /// Creates a `TokenStore` with a custom backend.
    pub fn custom<B: TokenBackend>(backend: B) -> Self {
        Self {
            backend: Arc::new(backend),
        }
    }

    /// Retrieves a value by key; `Ok(None)` if missing or expired.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying storage operation fails.
    pub async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.backend.get(key).await
    }

    /// Stores a value with an optional TTL.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying storage operation fails.
    pub async fn set(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> Result<()> {
        self.backend.set(key, value.to_vec(), ttl).await
    }

    /// Atomically replaces `expected` with `new`. Returns `true` on success.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying storage operation fails.
    pub async fn compare_and_swap(
        &self,
        key: &str,
        expected: &[u8],
        new: &[u8],
        ttl: Option<Duration>,
    ) -> Result<bool> {
        self.backend
            .compare_and_swap(key, expected, new.to_vec(), ttl)
            .await
    }

    /// Removes every expired entry. Returns how many were removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying storage operation fails.
    pub async fn purge_expired(&self) -> Result<usize> {
        self.backend.purge_expired().await
    }
}

//! Backend trait for token storage.
//!
//! Defines the interface every token backend must implement. Backends
//! expire entries on their own: an expired entry behaves exactly like a
//! missing one.

use anyhow::Result;
use async_trait::async_trait;
use std::time::Duration;

/// Backend trait for token storage implementations.
///
/// All backends must be thread-safe (`Send + Sync`) for use with tokio.
///
/// # Example
///
/// ```ignore
/// use photovault::services::tokens::{TokenBackend, MemoryTokenBackend};
///
/// let backend = MemoryTokenBackend::new();
/// backend.set("refresh:ab12", record, Some(Duration::from_secs(3600))).await?;
/// let swapped = backend.compare_and_swap("refresh:ab12", record, revoked, None).await?;
/// ```
#[async_trait]
pub trait TokenBackend: Send + Sync + 'static {
    /// Retrieves a value by key.
    ///
    /// Returns `Ok(None)` if the key doesn't exist or has expired.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying storage operation fails.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Stores a value with an optional TTL, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying storage operation fails.
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> Result<()>;

    /// Replaces the value at `key` with `new` only if the live value equals
    /// `expected`. Returns `true` if the swap happened.
    ///
    /// The comparison and the write are one atomic step: of several
    /// concurrent swaps from the same `expected` value, at most one wins.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying storage operation fails.
    async fn compare_and_swap(
        &self,
        key: &str,
        expected: &[u8],
        new: Vec<u8>,
        ttl: Option<Duration>,
    ) -> Result<bool>;

    /// Removes every expired entry. Returns how many were removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying storage operation fails.
    async fn purge_expired(&self) -> Result<usize>;
}

//! Token store with pluggable backends.
//!
//! A small TTL key-value store holding issued refresh tokens and their
//! revocation state, independent of the metadata store. Supports:
//!
//! - **RedbTokenBackend**: persistent storage with ACID guarantees
//! - **MemoryTokenBackend**: fast, non-persistent storage
//!
//! # Example
//!
//! ```ignore
//! use photovault::services::tokens::TokenStore;
//!
//! let store = TokenStore::memory();
//! store.set("refresh:ab12", b"{...}", Some(Duration::from_secs(60))).await?;
//! ```

mod backend;
mod memory;
mod redb;
mod store;
mod types;


pub use backend::TokenBackend;
pub use memory::MemoryTokenBackend;
pub use redb::RedbTokenBackend;
pub use store::TokenStore;

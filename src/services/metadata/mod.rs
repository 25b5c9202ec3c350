//! Metadata store with pluggable backends.
//!
//! Persists one record per photo: id, object key, metadata and
//! `last_modified`. Supports multiple backends:
//!
//! - **RedbMetadataBackend**: persistent storage with ACID guarantees
//! - **MemoryMetadataBackend**: process-local storage for tests and demos
//!
//! Every backend offers an atomic conditional update keyed on
//! `last_modified`, which is what optimistic concurrency is built on.

mod backend;
mod memory;
mod redb;
mod store;


pub use backend::{MetadataBackend, Registration, UpdateOutcome};
pub use memory::MemoryMetadataBackend;
pub use redb::RedbMetadataBackend;
pub use store::MetadataStore;

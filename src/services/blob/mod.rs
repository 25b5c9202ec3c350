//! Blob store with pluggable providers.
//!
//! Opaque byte storage keyed by object key. Exactly one provider is active
//! per deployment:
//!
//! - **MemoryBlobBackend**: process-local, lost on restart
//! - **FilesystemBlobBackend**: files under a configured root, traversal-safe
//! - **NullBlobBackend**: accepts writes, stores nothing
//! - **ObjectStoreBlobBackend**: S3-class cloud stores via `object_store`
//!
//! The blob store knows nothing about photos or metadata.

mod backend;
mod cloud;
mod filesystem;
mod memory;
mod null;
mod service;
mod types;
mod validation;

pub use backend::BlobBackend;
pub use cloud::ObjectStoreBlobBackend;
pub use filesystem::FilesystemBlobBackend;
pub use memory::MemoryBlobBackend;
pub use null::NullBlobBackend;
pub use service::{BlobStore, DEFAULT_TIMEOUT};
pub use types::{ByteStream, OCTET_STREAM, ObjectMeta, guess_content_type};
pub use validation::{InvalidObjectKey, validate_key};

//! No-op blob backend.
//!
//! Every operation succeeds: writes are discarded, reads report the key
//! absent and listings are empty. Used to exercise the rest of the system
//! without real storage.

use super::backend::BlobBackend;
use super::types::{ObjectMeta, guess_content_type};
use super::validation::validate_key;
use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;

/// Blob backend that stores nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullBlobBackend;

#[async_trait]
impl BlobBackend for NullBlobBackend {
    fn name(&self) -> &'static str {
        "null"
    }

    async fn put(&self, key: &str, data: Bytes, content_type: Option<&str>) -> Result<ObjectMeta> {
        let key = validate_key(key)?;
        let content_type = content_type
            .map(std::string::ToString::to_string)
            .unwrap_or_else(|| guess_content_type(&key));

        Ok(ObjectMeta {
            key,
            size: data.len() as u64,
            content_type,
            modified_at: Utc::now(),
        })
    }

    async fn get(&self, key: &str) -> Result<Option<(Bytes, ObjectMeta)>> {
        validate_key(key)?;
        Ok(None)
    }

    async fn head(&self, key: &str) -> Result<Option<ObjectMeta>> {
        validate_key(key)?;
        Ok(None)
    }

    async fn list(&self, _prefix: Option<&str>) -> Result<Vec<ObjectMeta>> {
        Ok(Vec::new())
    }
}

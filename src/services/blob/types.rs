//! Types shared by blob store backends.

use anyhow::Result;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

/// Blob body delivered chunk by chunk.
pub type ByteStream = BoxStream<'static, Result<Bytes>>;

/// Fallback MIME type when neither the key nor the content identifies one.
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Metadata for a stored blob
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ObjectMeta {
    /// Object key within the provider namespace (e.g., "2024/beach.jpg")
    pub key: String,
    /// Size in bytes
    pub size: u64,
    /// MIME content type guessed from the key
    pub content_type: String,
    /// Timestamp when the object was last written
    pub modified_at: DateTime<Utc>,
}

/// Guesses a content type from the key's extension.
pub fn guess_content_type(key: &str) -> String {
    mime_guess::from_path(key)
        .first()
        .map_or_else(|| OCTET_STREAM.to_string(), |mime| mime.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guess_content_type() {
        assert_eq!(guess_content_type("a/b.jpg"), "image/jpeg");
        assert_eq!(guess_content_type("b.png"), "image/png");
        assert_eq!(guess_content_type("noext"), OCTET_STREAM);
    }
}

//! Photo records and the metadata/timestamp rules shared by every store.

use chrono::{DateTime, SubsecRound, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::{Error, Result};

/// Open mapping of metadata keys to JSON values.
pub type Metadata = serde_json::Map<String, Value>;

/// Key every photo's metadata carries.
pub const DESCRIPTION_KEY: &str = "description";

/// A registered photo: identity, blob handle and versioned metadata.
///
/// `metadata` and `last_modified` are always read and written as a pair.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Photo {
    pub id: Uuid,
    pub object_key: String,
    pub metadata: Metadata,
    pub last_modified: DateTime<Utc>,
}

impl Photo {
    /// Creates a freshly registered photo with default metadata.
    pub fn register(object_key: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            object_key: object_key.into(),
            metadata: default_metadata(),
            last_modified: now(),
        }
    }

    /// Returns the description, or an empty string if absent.
    pub fn description(&self) -> &str {
        self.metadata
            .get(DESCRIPTION_KEY)
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    /// Merges `patch` into the stored metadata and advances `last_modified`.
    ///
    /// New keys are added, existing keys overwritten, everything else kept.
    pub fn apply_patch(&mut self, patch: Metadata) {
        for (key, value) in patch {
            self.metadata.insert(key, value);
        }
        self.last_modified = next_last_modified(self.last_modified);
    }
}

/// Metadata assigned to a photo on first registration.
pub fn default_metadata() -> Metadata {
    let mut metadata = Metadata::new();
    metadata.insert(DESCRIPTION_KEY.to_string(), Value::String(String::new()));
    metadata
}

/// Current time at the precision stored for `last_modified`.
///
/// Timestamps are kept at microsecond precision so they survive a
/// round-trip through RFC 3339 text and databases unchanged.
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Returns a timestamp strictly greater than `previous`.
pub fn next_last_modified(previous: DateTime<Utc>) -> DateTime<Utc> {
    let candidate = now();
    if candidate > previous {
        candidate
    } else {
        previous + TimeDelta::microseconds(1)
    }
}

/// Validates a client-supplied metadata payload.
///
/// The payload must be a JSON object; `description`, when present, must
/// be a string.
pub fn validate_patch(value: Value) -> Result<Metadata> {
    let Value::Object(patch) = value else {
        return Err(Error::validation("metadata must be a JSON object"));
    };

    if let Some(description) = patch.get(DESCRIPTION_KEY)
        && !description.is_string()
    {
        return Err(Error::validation("metadata.description must be a string"));
    }

    Ok(patch)
}

/// Parses a client-supplied RFC 3339 `last_modified` value.
pub fn parse_last_modified(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|_| Error::validation("last_modified must be an RFC 3339 timestamp"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_register_has_default_description() {
        let photo = Photo::register("2024/beach.jpg");
        assert_eq!(photo.object_key, "2024/beach.jpg");
        assert_eq!(photo.description(), "");
        assert_eq!(photo.metadata.len(), 1);
    }

    #[test]
    fn test_next_last_modified_is_strictly_greater() {
        let future = Utc::now() + TimeDelta::hours(1);
        let next = next_last_modified(future);
        assert!(next > future);

        let past = Utc::now() - TimeDelta::hours(1);
        assert!(next_last_modified(past) > past);
    }

    #[test]
    fn test_apply_patch_merges_and_advances() {
        let mut photo = Photo::register("a.jpg");
        photo.metadata.insert("camera".into(), json!("X100"));
        let before = photo.last_modified;

        let patch = validate_patch(json!({"description": "Nice", "rating": 5})).unwrap();
        photo.apply_patch(patch);

        assert_eq!(photo.description(), "Nice");
        assert_eq!(photo.metadata["rating"], json!(5));
        assert_eq!(photo.metadata["camera"], json!("X100"));
        assert!(photo.last_modified > before);
    }

    #[test]
    fn test_validate_patch_rejects_non_objects() {
        assert!(validate_patch(json!(["description"])).is_err());
        assert!(validate_patch(json!("text")).is_err());
        assert!(validate_patch(json!({"description": 3})).is_err());
        assert!(validate_patch(json!({})).is_ok());
    }

    #[test]
    fn test_wire_shape() {
        let photo = Photo::register("a.jpg");
        let value = serde_json::to_value(&photo).unwrap();
        assert!(value["id"].is_string());
        assert_eq!(value["object_key"], "a.jpg");
        assert_eq!(value["metadata"]["description"], "");

        let raw = value["last_modified"].as_str().unwrap();
        assert_eq!(parse_last_modified(raw).unwrap(), photo.last_modified);
    }

    #[test]
    fn test_parse_last_modified_accepts_offsets() {
        let a = parse_last_modified("2025-04-22T12:00:00Z").unwrap();
        let b = parse_last_modified("2025-04-22T14:00:00+02:00").unwrap();
        assert_eq!(a, b);
        assert!(parse_last_modified("yesterday").is_err());
    }
}

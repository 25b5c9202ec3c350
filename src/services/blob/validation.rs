//! Object key validation.
//!
//! Keys are relative, `/`-separated names. Every provider normalizes keys
//! through [`validate_key`] so that no key can address anything outside the
//! provider's namespace.

use std::path::{Component, Path, PathBuf};

/// Reason an object key was rejected.
///
/// Carried inside `anyhow::Error` by backends; callers downcast to tell a
/// bad key apart from an unreachable provider.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidObjectKey {
    #[error("object key cannot be empty")]
    Empty,
    #[error("object key contains null bytes")]
    NullByte,
    #[error("object key cannot be absolute: {0}")]
    Absolute(String),
    #[error("object key cannot contain '..': {0}")]
    Traversal(String),
}

/// Validates and normalizes an object key.
///
/// Rejects keys that:
/// - Are empty (or normalize to empty)
/// - Contain null bytes
/// - Are absolute (start with `/` or a drive prefix)
/// - Contain `..` components
///
/// `.` components are dropped.
///
/// # Examples
/// ```ignore
/// validate_key("2024/beach.jpg")    // Ok("2024/beach.jpg")
/// validate_key("./2024/beach.jpg")  // Ok("2024/beach.jpg")
/// validate_key("../etc/passwd")     // Err(Traversal)
/// validate_key("/etc/passwd")       // Err(Absolute)
/// ```
pub fn validate_key(key: &str) -> Result<String, InvalidObjectKey> {
    if key.is_empty() {
        return Err(InvalidObjectKey::Empty);
    }
    if key.contains('\0') {
        return Err(InvalidObjectKey::NullByte);
    }

    let path = Path::new(key);
    if path.is_absolute() {
        return Err(InvalidObjectKey::Absolute(key.to_string()));
    }

    let mut segments: Vec<String> = Vec::new();
    for component in path.components() {
        match component {
            Component::Normal(name) => segments.push(name.to_string_lossy().into_owned()),
            Component::CurDir => {},
            Component::ParentDir => return Err(InvalidObjectKey::Traversal(key.to_string())),
            Component::RootDir | Component::Prefix(_) => {
                return Err(InvalidObjectKey::Absolute(key.to_string()));
            },
        }
    }

    if segments.is_empty() {
        return Err(InvalidObjectKey::Empty);
    }

    Ok(segments.join("/"))
}

/// Returns the filesystem path for a key under `root`.
pub(crate) fn object_path(root: &Path, key: &str) -> Result<PathBuf, InvalidObjectKey> {
    let normalized = validate_key(key)?;
    Ok(root.join(normalized))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_keys() {
        assert_eq!(validate_key("a.jpg").unwrap(), "a.jpg");
        assert_eq!(validate_key("2024/07/a.jpg").unwrap(), "2024/07/a.jpg");
        assert_eq!(validate_key("./2024/a.jpg").unwrap(), "2024/a.jpg");
    }

    #[test]
    fn test_traversal_rejected() {
        for key in [
            "../etc/passwd",
            "../../etc/passwd",
            "2024/../../etc/passwd",
            "a/../b.jpg",
        ] {
            assert!(
                matches!(validate_key(key), Err(InvalidObjectKey::Traversal(_))),
                "traversal not rejected for {key}"
            );
        }
    }

    #[test]
    fn test_absolute_and_empty_rejected() {
        assert!(matches!(
            validate_key("/etc/passwd"),
            Err(InvalidObjectKey::Absolute(_))
        ));
        assert_eq!(validate_key(""), Err(InvalidObjectKey::Empty));
        assert_eq!(validate_key("."), Err(InvalidObjectKey::Empty));
        assert_eq!(validate_key("a\0.jpg"), Err(InvalidObjectKey::NullByte));
    }

    #[test]
    fn test_object_path_stays_under_root() {
        let root = Path::new("/srv/photos");
        let path = object_path(root, "2024/a.jpg").unwrap();
        assert!(path.starts_with(root));
        assert!(object_path(root, "../a.jpg").is_err());
    }
}

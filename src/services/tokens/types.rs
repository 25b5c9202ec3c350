//! Entry type stored by token backends.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Value plus optional absolute expiry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub(crate) struct TokenEntry {
    pub value: Vec<u8>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl TokenEntry {
    pub fn new(value: Vec<u8>, ttl: Option<Duration>) -> Self {
        let expires_at = ttl.map(|ttl| {
            // Durations past chrono's range never expire in practice
            chrono::Duration::from_std(ttl)
                .ok()
                .and_then(|ttl| Utc::now().checked_add_signed(ttl))
                .unwrap_or(DateTime::<Utc>::MAX_UTC)
        });
        Self { value, expires_at }
    }

    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|exp| Utc::now() >= exp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_without_ttl_never_expires() {
        assert!(!TokenEntry::new(b"v".to_vec(), None).is_expired());
    }

    #[test]
    fn test_entry_with_zero_ttl_is_expired() {
        assert!(TokenEntry::new(b"v".to_vec(), Some(Duration::ZERO)).is_expired());
    }

    #[test]
    fn test_huge_ttl_saturates() {
        let entry = TokenEntry::new(b"v".to_vec(), Some(Duration::MAX));
        assert!(!entry.is_expired());
    }
}

//! Rescan: import blobs that have no photo record yet.
//!
//! One pass diffs the provider's object keys against the registered keys,
//! validates every unknown blob as an image and registers the valid ones.
//! Per-item failures are collected, never fatal, and retried on the next
//! pass because nothing is recorded for them.

use super::service::{PhotoLibrary, blob_error};
use super::signature;
use crate::error::{Error, Result};
use crate::services::metadata::Registration;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Outcome of one rescan pass.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct RescanReport {
    /// Ids of records created by this pass.
    pub imported: Vec<Uuid>,
    /// Ids of records that already existed for a provider key.
    pub skipped: Vec<Uuid>,
    /// Object keys that could not be read or are not images.
    pub errors: Vec<String>,
}

/// Why a single blob was not imported.
#[derive(Debug, thiserror::Error)]
enum ImportError {
    #[error("blob disappeared before it could be read")]
    Vanished,
    #[error("blob is empty")]
    Empty,
    #[error("blob is not a recognized image")]
    NotAnImage,
    #[error(transparent)]
    Storage(#[from] Error),
}

/// Single-flight reconciler over a [`PhotoLibrary`].
///
/// Concurrent `rescan` calls queue behind the running pass and then run
/// their own, so a pass never overlaps another.
#[derive(Clone)]
pub struct Reconciler {
    library: PhotoLibrary,
    gate: Arc<Mutex<()>>,
}

impl Reconciler {
    pub fn new(library: PhotoLibrary) -> Self {
        Self {
            library,
            gate: Arc::new(Mutex::new(())),
        }
    }

    /// Runs one reconciliation pass.
    ///
    /// # Errors
    ///
    /// Fails only when the provider or metadata store cannot be enumerated;
    /// individual blob failures are reported in `errors`.
    pub async fn rescan(&self) -> Result<RescanReport> {
        let _pass = self.gate.lock().await;

        let provider_keys = self.library.blobs().list_keys().await.map_err(blob_error)?;
        let known = self
            .library
            .metadata()
            .object_keys()
            .await
            .map_err(Error::unavailable)?;

        tracing::info!(
            provider = self.library.blobs().name(),
            objects = provider_keys.len(),
            records = known.len(),
            "Rescan started"
        );

        let mut report = RescanReport::default();
        for key in provider_keys {
            if let Some(id) = known.get(&key) {
                report.skipped.push(*id);
                continue;
            }

            match self.import(&key).await {
                Ok(Registration::Created(photo)) => {
                    tracing::debug!(key = %key, id = %photo.id, "Imported photo");
                    report.imported.push(photo.id);
                },
                // Registered by another path since the key list was read
                Ok(Registration::Existing(photo)) => report.skipped.push(photo.id),
                Err(err) => {
                    tracing::warn!(key = %key, error = %err, "Skipping unreadable blob");
                    report.errors.push(key);
                },
            }
        }

        tracing::info!(
            imported = report.imported.len(),
            skipped = report.skipped.len(),
            errors = report.errors.len(),
            "Rescan finished"
        );

        Ok(report)
    }

    async fn import(&self, key: &str) -> std::result::Result<Registration, ImportError> {
        let (bytes, _) = self
            .library
            .blobs()
            .get(key)
            .await
            .map_err(blob_error)?
            .ok_or(ImportError::Vanished)?;

        if bytes.is_empty() {
            return Err(ImportError::Empty);
        }
        if signature::sniff(&bytes).is_none() {
            return Err(ImportError::NotAnImage);
        }

        Ok(self.library.register(key).await?)
    }
}

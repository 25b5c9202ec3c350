//! Filesystem-backed blob storage backend.
//!
//! Maps object keys to files under a configured root directory. Keys are
//! validated lexically, and the nearest existing ancestor of every resolved
//! path is checked against the canonical root so symlinks cannot lead
//! outside it either. Writes go through a staging file and a rename.

use super::backend::BlobBackend;
use super::types::{ByteStream, ObjectMeta, guess_content_type};
use super::validation::{InvalidObjectKey, object_path};
use anyhow::{Context, Result};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::{StreamExt, TryStreamExt};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::io::ReaderStream;

/// Filesystem-backed blob backend.
///
/// # Thread Safety
///
/// `FilesystemBlobBackend` is `Clone`; all blocking IO runs on tokio's
/// blocking pool.
#[derive(Clone)]
pub struct FilesystemBlobBackend {
    root: Arc<PathBuf>,
}

impl FilesystemBlobBackend {
    /// Creates a backend rooted at `root`.
    ///
    /// The directory is created by [`BlobBackend::init`], not here.
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: Arc::new(root.as_ref().to_path_buf()),
        }
    }

    /// Creates the root directory and returns a ready backend.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage directory cannot be created.
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self> {
        let backend = Self::new(root);
        backend.init_sync()?;
        Ok(backend)
    }

    /// Root directory of this backend.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn init_sync(&self) -> Result<()> {
        fs::create_dir_all(self.root.as_path()).with_context(|| {
            format!("Failed to create storage directory: {}", self.root.display())
        })
    }

    /// Resolves a key to a path, rejecting anything that escapes the root.
    ///
    /// Lexical checks cannot see symlinks, so the nearest existing ancestor
    /// of the target (the target itself when present) must canonicalize to
    /// a path under the canonical root. A dangling symlink never resolves.
    fn resolve(&self, key: &str) -> Result<PathBuf> {
        let path = object_path(&self.root, key)?;
        let canonical_root = fs::canonicalize(self.root.as_path())
            .with_context(|| format!("Failed to resolve root: {}", self.root.display()))?;

        let mut existing = path.as_path();
        while fs::symlink_metadata(existing).is_err() {
            match existing.parent() {
                Some(parent) => existing = parent,
                None => break,
            }
        }

        match fs::canonicalize(existing) {
            Ok(canonical) if canonical.starts_with(&canonical_root) => Ok(path),
            _ => Err(InvalidObjectKey::Traversal(key.to_string()).into()),
        }
    }

    fn meta_for(key: &str, metadata: &fs::Metadata) -> ObjectMeta {
        let modified_at = metadata
            .modified()
            .map(DateTime::<Utc>::from)
            .unwrap_or_else(|_| Utc::now());

        ObjectMeta {
            key: key.to_string(),
            size: metadata.len(),
            content_type: guess_content_type(key),
            modified_at,
        }
    }

    fn put_sync(&self, key: &str, data: &[u8], content_type: Option<&str>) -> Result<ObjectMeta> {
        let file_path = self.resolve(key)?;
        let parent = file_path
            .parent()
            .with_context(|| format!("Object has no parent directory: {key}"))?;
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create parent directories for: {key}"))?;

        // Write beside the target and rename over it; rename replaces a
        // symlink at the target instead of following it.
        let staging = parent.join(format!(".{}.tmp", uuid::Uuid::new_v4().simple()));
        if let Err(e) = fs::write(&staging, data) {
            let _ = fs::remove_file(&staging);
            return Err(e).with_context(|| format!("Failed to write object: {key}"));
        }
        if let Err(e) = fs::rename(&staging, &file_path) {
            let _ = fs::remove_file(&staging);
            return Err(e).with_context(|| format!("Failed to write object: {key}"));
        }

        let metadata = fs::symlink_metadata(&file_path)
            .with_context(|| format!("Failed to get file metadata: {key}"))?;
        let mut meta = Self::meta_for(key, &metadata);
        if let Some(content_type) = content_type {
            meta.content_type = content_type.to_string();
        }

        Ok(meta)
    }

    fn get_sync(&self, key: &str) -> Result<Option<(Bytes, ObjectMeta)>> {
        let file_path = self.resolve(key)?;

        if !file_path.is_file() {
            return Ok(None);
        }

        let data = fs::read(&file_path).with_context(|| format!("Failed to read object: {key}"))?;
        let metadata = fs::metadata(&file_path)
            .with_context(|| format!("Failed to get file metadata: {key}"))?;

        Ok(Some((Bytes::from(data), Self::meta_for(key, &metadata))))
    }

    /// Opens the file and stats the handle, so the metadata matches the
    /// bytes read even if the key is rewritten meanwhile.
    fn open_sync(&self, key: &str) -> Result<Option<(fs::File, ObjectMeta)>> {
        let file_path = self.resolve(key)?;

        if !file_path.is_file() {
            return Ok(None);
        }

        let file =
            fs::File::open(&file_path).with_context(|| format!("Failed to open object: {key}"))?;
        let metadata = file
            .metadata()
            .with_context(|| format!("Failed to get file metadata: {key}"))?;

        Ok(Some((file, Self::meta_for(key, &metadata))))
    }

    fn head_sync(&self, key: &str) -> Result<Option<ObjectMeta>> {
        let file_path = self.resolve(key)?;

        if !file_path.is_file() {
            return Ok(None);
        }

        let metadata = fs::metadata(&file_path)
            .with_context(|| format!("Failed to get file metadata: {key}"))?;

        Ok(Some(Self::meta_for(key, &metadata)))
    }

    fn list_sync(&self, prefix: Option<&str>) -> Result<Vec<ObjectMeta>> {
        let mut objects = Vec::new();
        scan_directory(&self.root, &self.root, &mut objects)?;

        if let Some(prefix) = prefix {
            objects.retain(|meta| meta.key.starts_with(prefix));
        }

        objects.sort_by(|a, b| a.key.cmp(&b.key));

        Ok(objects)
    }
}

/// Recursively scans a directory and collects metadata for every file.
///
/// Hidden entries and embedded database files are skipped so a metadata
/// store kept under the same root never shows up as a blob. Symlinks are
/// not followed, so a link back into the root cannot repeat a subtree.
fn scan_directory(root: &Path, dir: &Path, objects: &mut Vec<ObjectMeta>) -> Result<()> {
    if !dir.is_dir() {
        return Ok(());
    }

    for entry in
        fs::read_dir(dir).with_context(|| format!("Failed to read directory: {}", dir.display()))?
    {
        let entry = entry.context("Failed to read directory entry")?;
        let path = entry.path();

        if path
            .file_name()
            .is_some_and(|n| n.to_string_lossy().starts_with('.'))
        {
            continue;
        }
        if path
            .extension()
            .is_some_and(|e| e == "redb" || e == "lock")
        {
            continue;
        }

        let file_type = entry
            .file_type()
            .with_context(|| format!("Failed to read file type: {}", path.display()))?;
        if file_type.is_dir() {
            scan_directory(root, &path, objects)?;
        } else if file_type.is_file()
            && let Ok(relative) = path.strip_prefix(root)
        {
            // Normalize path separators for cross-platform consistency
            let key = relative.to_string_lossy().replace('\\', "/");
            let metadata = entry
                .metadata()
                .with_context(|| format!("Failed to get file metadata: {key}"))?;
            objects.push(FilesystemBlobBackend::meta_for(&key, &metadata));
        }
    }

    Ok(())
}

#[async_trait]
impl BlobBackend for FilesystemBlobBackend {
    fn name(&self) -> &'static str {
        "filesystem"
    }

    async fn init(&self) -> Result<()> {
        let backend = self.clone();
        tokio::task::spawn_blocking(move || backend.init_sync())
            .await
            .context("Task join error")?
    }

    async fn put(&self, key: &str, data: Bytes, content_type: Option<&str>) -> Result<ObjectMeta> {
        let backend = self.clone();
        let key = key.to_string();
        let content_type = content_type.map(std::string::ToString::to_string);
        tokio::task::spawn_blocking(move || backend.put_sync(&key, &data, content_type.as_deref()))
            .await
            .context("Task join error")?
    }

    async fn get(&self, key: &str) -> Result<Option<(Bytes, ObjectMeta)>> {
        let backend = self.clone();
        let key = key.to_string();
        tokio::task::spawn_blocking(move || backend.get_sync(&key))
            .await
            .context("Task join error")?
    }

    async fn get_stream(&self, key: &str) -> Result<Option<(ByteStream, ObjectMeta)>> {
        let backend = self.clone();
        let key = key.to_string();
        let opened = tokio::task::spawn_blocking(move || backend.open_sync(&key))
            .await
            .context("Task join error")??;

        Ok(opened.map(|(file, meta)| {
            let stream = ReaderStream::new(tokio::fs::File::from_std(file))
                .map_err(anyhow::Error::from)
                .boxed();
            (stream, meta)
        }))
    }

    async fn head(&self, key: &str) -> Result<Option<ObjectMeta>> {
        let backend = self.clone();
        let key = key.to_string();
        tokio::task::spawn_blocking(move || backend.head_sync(&key))
            .await
            .context("Task join error")?
    }

    async fn list(&self, prefix: Option<&str>) -> Result<Vec<ObjectMeta>> {
        let backend = self.clone();
        let prefix = prefix.map(std::string::ToString::to_string);
        tokio::task::spawn_blocking(move || backend.list_sync(prefix.as_deref()))
            .await
            .context("Task join error")?
    }
}

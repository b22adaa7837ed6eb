//! Local-disk object store.

use std::path::{Path, PathBuf};

use actix_web::web::Bytes;
use async_trait::async_trait;
use chrono::Utc;

use crate::models::StorageKind;

use super::{is_audio_file, ObjectStore, StorageError, StoredObject};

/// Object store backed by a folder on local disk.
///
/// Stored locations are absolute paths inside that folder; `delete`
/// refuses anything that resolves outside it.
#[derive(Debug)]
pub struct LocalObjectStore {
    folder: PathBuf,
}

impl LocalObjectStore {
    /// Create a store rooted at `folder`.
    ///
    /// The folder must already exist; it is canonicalized so the
    /// containment check on delete survives symlinks.
    pub fn new(folder: impl AsRef<Path>) -> Result<Self, StorageError> {
        let folder = folder.as_ref().canonicalize()?;
        Ok(Self { folder })
    }

    /// The folder this store writes into.
    pub fn folder(&self) -> &Path {
        &self.folder
    }

    /// Resolve `location` and verify it stays inside the store folder.
    fn contained(&self, location: &str) -> Result<PathBuf, StorageError> {
        let canonical = Path::new(location)
            .canonicalize()
            .map_err(|_| StorageError::InvalidLocation(location.to_string()))?;

        if !canonical.starts_with(&self.folder) {
            tracing::warn!(
                requested = %canonical.display(),
                folder = %self.folder.display(),
                "delete outside store folder blocked"
            );
            return Err(StorageError::InvalidLocation(location.to_string()));
        }

        Ok(canonical)
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    fn kind(&self) -> StorageKind {
        StorageKind::Local
    }

    async fn put(&self, filename: &str, bytes: Bytes) -> Result<StoredObject, StorageError> {
        // Timestamp prefix keeps a re-upload of the same file from
        // clobbering the earlier object.
        let stored_name = format!("{}-{}", Utc::now().timestamp_millis(), filename);
        let path = self.folder.join(&stored_name);

        tokio::fs::write(&path, &bytes).await?;

        tracing::debug!(path = %path.display(), size = bytes.len(), "stored local object");

        Ok(StoredObject {
            location: path.display().to_string(),
        })
    }

    async fn delete(&self, location: &str) -> Result<(), StorageError> {
        let path = self.contained(location)?;
        tokio::fs::remove_file(&path).await?;

        tracing::debug!(path = %path.display(), "deleted local object");
        Ok(())
    }

    async fn list(&self) -> Result<Vec<StoredObject>, StorageError> {
        let mut entries = tokio::fs::read_dir(&self.folder).await?;
        let mut objects = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.is_file() && is_audio_file(&path) {
                objects.push(StoredObject {
                    location: path.display().to_string(),
                });
            }
        }

        Ok(objects)
    }
}

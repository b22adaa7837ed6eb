//! Catalog orchestration: ingest, list, remove, resync.
//!
//! The service owns no storage itself; both adapters are injected at
//! construction so tests can swap in doubles.

pub mod store;

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{Song, SongDraft, SongView, StorageKind, UploadedFile};
use crate::storage::{is_audio_file, ObjectStore};

pub use store::{CatalogStore, JsonCatalogStore};

/// Most files accepted in one upload batch.
pub const MAX_BATCH_SIZE: usize = 10;

/// The catalog service behind every API operation.
pub struct CatalogService {
    store: Arc<dyn CatalogStore>,
    objects: Arc<dyn ObjectStore>,
    public_url: String,
}

impl CatalogService {
    /// Create a service over the given adapters.
    ///
    /// `public_url` is the base under which locally stored songs are
    /// served (the `/audio` mount).
    pub fn new(
        store: Arc<dyn CatalogStore>,
        objects: Arc<dyn ObjectStore>,
        public_url: impl Into<String>,
    ) -> Self {
        Self {
            store,
            objects,
            public_url: public_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Store an upload batch and catalog one song per file.
    ///
    /// The whole batch is rejected when it is empty, oversized, or
    /// contains any non-mp3 filename. Object writes happen before the
    /// catalog insert; when an insert fails the already written objects
    /// stay behind (accepted gap, no compensating delete).
    pub async fn ingest(&self, files: Vec<UploadedFile>) -> AppResult<Vec<Song>> {
        if files.is_empty() {
            return Err(AppError::empty_batch());
        }

        if files.len() > MAX_BATCH_SIZE {
            return Err(AppError::BadRequest(format!(
                "At most {} files per upload",
                MAX_BATCH_SIZE
            )));
        }

        if let Some(bad) = files
            .iter()
            .find(|f| !is_audio_file(Path::new(&f.filename)))
        {
            return Err(AppError::BadRequest(format!(
                "Only .mp3 files are accepted, got '{}'",
                bad.filename
            )));
        }

        let mut songs = Vec::with_capacity(files.len());
        for file in files {
            let object = self.objects.put(&file.filename, file.bytes).await?;
            let song = self.store.insert(SongDraft {
                title: title_of(&file.filename),
                location: object.location,
                storage: self.objects.kind(),
            })?;

            tracing::info!(song_id = %song.id, title = %song.title, "Cataloged song");
            songs.push(song);
        }

        Ok(songs)
    }

    /// All songs projected to what a client needs, in insertion order.
    pub fn list(&self) -> AppResult<Vec<SongView>> {
        let songs = self.store.list()?;
        Ok(songs
            .into_iter()
            .map(|song| SongView {
                id: song.id,
                url: self.playback_url(&song),
                title: song.title,
            })
            .collect())
    }

    /// Delete a song's stored object, then its record.
    ///
    /// A failed object delete aborts before the record delete, so the
    /// catalog never points at bytes that are known to be gone. The
    /// inverse failure (record delete after object delete) can still
    /// leave a dangling record.
    pub async fn remove(&self, id: Uuid) -> AppResult<()> {
        let song = self
            .store
            .find(id)?
            .ok_or_else(|| AppError::song_not_found(&id.to_string()))?;

        self.objects.delete(&song.location).await?;
        self.store.delete(id)?;

        tracing::info!(song_id = %id, title = %song.title, "Removed song");
        Ok(())
    }

    /// Catalog files already present in the local songs folder.
    ///
    /// Compares on-disk locations against cataloged ones and inserts
    /// records only for the difference. Nothing new is a Conflict, which
    /// is what makes re-running this harmless.
    pub async fn resync(&self) -> AppResult<Vec<Song>> {
        if self.objects.kind() != StorageKind::Local {
            return Err(AppError::BadRequest(
                "Resync is only available with local storage".to_string(),
            ));
        }

        let known: HashSet<String> = self
            .store
            .list()?
            .into_iter()
            .map(|s| s.location)
            .collect();

        let mut inserted = Vec::new();
        for object in self.objects.list().await? {
            if known.contains(&object.location) {
                continue;
            }

            let song = self.store.insert(SongDraft {
                title: title_of(&object.location),
                location: object.location,
                storage: StorageKind::Local,
            })?;

            tracing::info!(song_id = %song.id, title = %song.title, "Resynced song");
            inserted.push(song);
        }

        if inserted.is_empty() {
            return Err(AppError::Conflict(
                "All songs in the folder are already cataloged".to_string(),
            ));
        }

        Ok(inserted)
    }
}

/// Derive a song title: the filename without its extension.
fn title_of(filename: &str) -> String {
    Path::new(filename)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(filename)
        .to_string()
}

//! Song document collection and its JSON-file persistence.

use chrono::Utc;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::{Song, SongDraft};

/// On-disk format of the catalog file.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct CatalogFile {
    songs: Vec<Song>,
}

/// Trait for catalog store operations.
pub trait CatalogStore: Send + Sync {
    /// Insert a draft. The store assigns the id and creation time.
    fn insert(&self, draft: SongDraft) -> AppResult<Song>;

    /// Find a song by id.
    fn find(&self, id: Uuid) -> AppResult<Option<Song>>;

    /// All songs, in insertion order.
    fn list(&self) -> AppResult<Vec<Song>>;

    /// Delete a song by id. Returns whether anything was removed.
    fn delete(&self, id: Uuid) -> AppResult<bool>;

    /// Number of cataloged songs.
    fn count(&self) -> AppResult<usize> {
        Ok(self.list()?.len())
    }
}

/// JSON file-based catalog store.
///
/// Documents are kept in a Vec so listing preserves insertion order.
#[derive(Debug)]
pub struct JsonCatalogStore {
    file_path: PathBuf,
    cache: RwLock<Vec<Song>>,
}

impl JsonCatalogStore {
    /// Create a new JSON catalog store.
    pub fn new(file_path: impl AsRef<Path>) -> AppResult<Self> {
        let file_path = file_path.as_ref().to_path_buf();
        let store = Self {
            file_path,
            cache: RwLock::new(Vec::new()),
        };

        // Load existing songs or start empty
        store.load()?;

        Ok(store)
    }

    /// Load songs from file into cache.
    fn load(&self) -> AppResult<()> {
        if !self.file_path.exists() {
            tracing::info!(path = %self.file_path.display(), "Catalog file not found, starting fresh");
            return Ok(());
        }

        let content = std::fs::read_to_string(&self.file_path)?;
        let file: CatalogFile = serde_json::from_str(&content)?;

        let mut cache = self.cache.write();
        *cache = file.songs;

        tracing::info!(count = cache.len(), "Loaded catalog from file");
        Ok(())
    }

    /// Save songs from cache to file.
    fn save(&self) -> AppResult<()> {
        let cache = self.cache.read();
        let file = CatalogFile {
            songs: cache.clone(),
        };

        let content = serde_json::to_string_pretty(&file)?;

        // Ensure parent directory exists
        if let Some(parent) = self.file_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        // Write atomically using temp file
        let temp_path = self.file_path.with_extension("json.tmp");
        std::fs::write(&temp_path, &content)?;
        std::fs::rename(&temp_path, &self.file_path)?;

        tracing::debug!(path = %self.file_path.display(), count = cache.len(), "Saved catalog to file");
        Ok(())
    }
}

impl CatalogStore for JsonCatalogStore {
    fn insert(&self, draft: SongDraft) -> AppResult<Song> {
        let song = Song {
            id: Uuid::new_v4(),
            title: draft.title,
            location: draft.location,
            storage: draft.storage,
            created_at: Utc::now(),
        };

        {
            let mut cache = self.cache.write();
            cache.push(song.clone());
        }

        self.save()?;
        tracing::debug!(song_id = %song.id, title = %song.title, "Inserted song");
        Ok(song)
    }

    fn find(&self, id: Uuid) -> AppResult<Option<Song>> {
        let cache = self.cache.read();
        Ok(cache.iter().find(|s| s.id == id).cloned())
    }

    fn list(&self) -> AppResult<Vec<Song>> {
        let cache = self.cache.read();
        Ok(cache.clone())
    }

    fn delete(&self, id: Uuid) -> AppResult<bool> {
        let removed = {
            let mut cache = self.cache.write();
            let before = cache.len();
            cache.retain(|s| s.id != id);
            cache.len() != before
        };

        if removed {
            self.save()?;
            tracing::debug!(song_id = %id, "Deleted song");
        }

        Ok(removed)
    }

    fn count(&self) -> AppResult<usize> {
        let cache = self.cache.read();
        Ok(cache.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::StorageKind;
    use tempfile::tempdir;

    fn draft(title: &str) -> SongDraft {
        SongDraft {
            title: title.to_string(),
            location: format!("/srv/songs/{}.mp3", title),
            storage: StorageKind::Local,
        }
    }

    #[test]
    fn test_insert_assigns_id_and_timestamp() {
        let dir = tempdir().unwrap();
        let store = JsonCatalogStore::new(dir.path().join("songs.json")).unwrap();

        let a = store.insert(draft("first")).unwrap();
        let b = store.insert(draft("second")).unwrap();

        assert_ne!(a.id, b.id);
        assert_eq!(a.title, "first");
        assert!(store.find(a.id).unwrap().is_some());
    }

    #[test]
    fn test_list_preserves_insertion_order() {
        let dir = tempdir().unwrap();
        let store = JsonCatalogStore::new(dir.path().join("songs.json")).unwrap();

        for title in ["one", "two", "three"] {
            store.insert(draft(title)).unwrap();
        }

        let titles: Vec<String> = store.list().unwrap().into_iter().map(|s| s.title).collect();
        assert_eq!(titles, vec!["one", "two", "three"]);
    }

    #[test]
    fn test_delete_is_single_shot() {
        let dir = tempdir().unwrap();
        let store = JsonCatalogStore::new(dir.path().join("songs.json")).unwrap();

        let song = store.insert(draft("track")).unwrap();

        assert!(store.delete(song.id).unwrap());
        assert!(!store.delete(song.id).unwrap());
        assert!(store.find(song.id).unwrap().is_none());
    }

    #[test]
    fn test_catalog_survives_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("songs.json");

        let first = JsonCatalogStore::new(&path).unwrap();
        let song = first.insert(draft("persisted")).unwrap();
        drop(first);

        let second = JsonCatalogStore::new(&path).unwrap();
        assert_eq!(second.count().unwrap(), 1);

        let found = second.find(song.id).unwrap().unwrap();
        assert_eq!(found.title, "persisted");
        assert_eq!(found.created_at, song.created_at);
    }
}

//! Object storage backends for uploaded audio.
//!
//! The catalog service only ever talks to the [`ObjectStore`] trait;
//! which backend is live gets decided once at startup.

pub mod local;
pub mod remote;

use std::path::Path;

use actix_web::web::Bytes;
use async_trait::async_trait;

use crate::models::StorageKind;

pub use local::LocalObjectStore;
pub use remote::RemoteObjectStore;

/// The one audio extension this catalog accepts.
pub const AUDIO_EXTENSION: &str = "mp3";

/// Errors from an object-store backend.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Media cloud rejected the request with status {0}")]
    Rejected(u16),

    #[error("Location cannot be mapped to a stored object: {0}")]
    InvalidLocation(String),

    #[error("Operation not supported by the {0} backend")]
    Unsupported(&'static str),
}

/// Reference to an object held by a storage backend.
#[derive(Debug, Clone)]
pub struct StoredObject {
    /// Absolute local path or remote https URL.
    pub location: String,
}

/// Abstraction over the backend holding raw audio bytes.
///
/// Trait-based so the catalog service can run against a test double
/// without touching disk or network.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Which backend this is; recorded on every song stored through it.
    fn kind(&self) -> StorageKind;

    /// Store `bytes` under a key derived from `filename` and return a
    /// reference the bytes can later be retrieved through.
    async fn put(&self, filename: &str, bytes: Bytes) -> Result<StoredObject, StorageError>;

    /// Delete the object a song's `location` points at.
    async fn delete(&self, location: &str) -> Result<(), StorageError>;

    /// Enumerate audio objects already present in the backend.
    async fn list(&self) -> Result<Vec<StoredObject>, StorageError>;
}

/// Check if a file has the accepted audio extension.
pub fn is_audio_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case(AUDIO_EXTENSION))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_audio_file() {
        assert!(is_audio_file(Path::new("song.mp3")));
        assert!(is_audio_file(Path::new("song.MP3")));
        assert!(!is_audio_file(Path::new("song.flac")));
        assert!(!is_audio_file(Path::new("noextension")));
    }
}

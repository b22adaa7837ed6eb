//! Core data model: song documents and their wire projections.

use actix_web::web::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::catalog::CatalogService;

/// Shared application state handed to request handlers.
#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<CatalogService>,
}

/// Which object-store backend holds a song's bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    Local,
    Remote,
}

/// A cataloged song document.
///
/// `id` and `created_at` are assigned by the catalog store at insertion
/// and never change afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Song {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub title: String,
    /// Absolute local path or remote https URL.
    pub location: String,
    pub storage: StorageKind,
    pub created_at: DateTime<Utc>,
}

/// Caller-supplied fields for a new song; the store assigns the rest.
#[derive(Debug, Clone)]
pub struct SongDraft {
    pub title: String,
    pub location: String,
    pub storage: StorageKind,
}

/// List projection: exactly what a client needs to render and play a song.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SongView {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub title: String,
    pub url: String,
}

/// One file decoded from a multipart upload request.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub filename: String,
    pub bytes: Bytes,
}

/// Response body for upload and resync.
#[derive(Debug, Serialize)]
pub struct SongsResponse {
    pub message: String,
    pub songs: Vec<Song>,
}

/// Response body carrying only a human-readable message.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

//! Remote media-cloud object store.
//!
//! Speaks the signed upload/destroy API of a Cloudinary-style media
//! cloud: request parameters are SHA-1 signed with the account secret
//! and posted as multipart form fields. Audio counts as `video` on the
//! cloud side.

use std::path::Path;

use actix_web::web::Bytes;
use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use sha1::{Digest, Sha1};

use crate::models::StorageKind;

use super::{ObjectStore, StorageError, StoredObject};

/// Cloud-side folder every upload lands in.
const UPLOAD_FOLDER: &str = "songs";

/// Object store backed by a remote media cloud account.
#[derive(Debug, Clone)]
pub struct RemoteObjectStore {
    http: reqwest::Client,
    endpoint: String,
    cloud_name: String,
    api_key: String,
    api_secret: String,
}

/// The slice of the upload response we care about.
#[derive(Debug, Deserialize)]
struct UploadResult {
    secure_url: String,
}

impl RemoteObjectStore {
    /// Create a store for the given account.
    pub fn new(
        endpoint: impl Into<String>,
        cloud_name: impl Into<String>,
        api_key: impl Into<String>,
        api_secret: impl Into<String>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            cloud_name: cloud_name.into(),
            api_key: api_key.into(),
            api_secret: api_secret.into(),
        }
    }

    fn upload_url(&self) -> String {
        format!("{}/v1_1/{}/video/upload", self.endpoint, self.cloud_name)
    }

    fn destroy_url(&self) -> String {
        format!("{}/v1_1/{}/video/destroy", self.endpoint, self.cloud_name)
    }

    /// Sign a sorted `k=v&k=v` parameter string: SHA-1 over the string
    /// followed by the account secret, hex encoded.
    fn sign(&self, params: &str) -> String {
        let mut hasher = Sha1::new();
        hasher.update(params.as_bytes());
        hasher.update(self.api_secret.as_bytes());
        hex::encode(hasher.finalize())
    }
}

/// Derive the cloud-side object key from a song's URL: the last path
/// segment with its extension stripped, under the upload folder.
pub fn object_key(location: &str) -> Result<String, StorageError> {
    let last = location
        .rsplit('/')
        .next()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| StorageError::InvalidLocation(location.to_string()))?;

    let stem = last.rsplit_once('.').map(|(s, _)| s).unwrap_or(last);
    if stem.is_empty() {
        return Err(StorageError::InvalidLocation(location.to_string()));
    }

    Ok(format!("{}/{}", UPLOAD_FOLDER, stem))
}

#[async_trait]
impl ObjectStore for RemoteObjectStore {
    fn kind(&self) -> StorageKind {
        StorageKind::Remote
    }

    async fn put(&self, filename: &str, bytes: Bytes) -> Result<StoredObject, StorageError> {
        let stem = Path::new(filename)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(filename)
            .to_string();

        let timestamp = Utc::now().timestamp().to_string();
        let signature = self.sign(&format!(
            "folder={}&public_id={}&timestamp={}",
            UPLOAD_FOLDER, stem, timestamp
        ));

        let form = reqwest::multipart::Form::new()
            .text("api_key", self.api_key.clone())
            .text("timestamp", timestamp)
            .text("folder", UPLOAD_FOLDER)
            .text("public_id", stem)
            .text("signature", signature)
            .part(
                "file",
                reqwest::multipart::Part::bytes(bytes.to_vec())
                    .file_name(filename.to_string()),
            );

        let response = self.http.post(self.upload_url()).multipart(form).send().await?;

        if !response.status().is_success() {
            return Err(StorageError::Rejected(response.status().as_u16()));
        }

        let result: UploadResult = response.json().await?;

        tracing::debug!(url = %result.secure_url, "stored remote object");

        Ok(StoredObject {
            location: result.secure_url,
        })
    }

    async fn delete(&self, location: &str) -> Result<(), StorageError> {
        let public_id = object_key(location)?;

        let timestamp = Utc::now().timestamp().to_string();
        let signature = self.sign(&format!(
            "public_id={}&timestamp={}",
            public_id, timestamp
        ));

        let form = reqwest::multipart::Form::new()
            .text("api_key", self.api_key.clone())
            .text("timestamp", timestamp)
            .text("public_id", public_id.clone())
            .text("signature", signature);

        let response = self.http.post(self.destroy_url()).multipart(form).send().await?;

        if !response.status().is_success() {
            return Err(StorageError::Rejected(response.status().as_u16()));
        }

        tracing::debug!(%public_id, "deleted remote object");
        Ok(())
    }

    async fn list(&self) -> Result<Vec<StoredObject>, StorageError> {
        Err(StorageError::Unsupported("remote"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_key_strips_extension() {
        let key = object_key("https://cdn.example.com/v123/songs/track.mp3").unwrap();
        assert_eq!(key, "songs/track");
    }

    #[test]
    fn test_object_key_keeps_inner_dots() {
        let key = object_key("https://cdn.example.com/songs/track.v2.mp3").unwrap();
        assert_eq!(key, "songs/track.v2");
    }

    #[test]
    fn test_object_key_without_extension() {
        let key = object_key("https://cdn.example.com/songs/track").unwrap();
        assert_eq!(key, "songs/track");
    }

    #[test]
    fn test_object_key_rejects_trailing_slash() {
        assert!(matches!(
            object_key("https://cdn.example.com/songs/"),
            Err(StorageError::InvalidLocation(_))
        ));
    }

    #[test]
    fn test_signature_is_hex_and_secret_dependent() {
        let a = RemoteObjectStore::new("https://api.example.com", "demo", "key", "secret-a");
        let b = RemoteObjectStore::new("https://api.example.com", "demo", "key", "secret-b");

        let sig_a = a.sign("public_id=songs/track&timestamp=1");
        let sig_b = b.sign("public_id=songs/track&timestamp=1");

        assert_eq!(sig_a.len(), 40);
        assert!(sig_a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(sig_a, sig_b);
        assert_eq!(sig_a, a.sign("public_id=songs/track&timestamp=1"));
    }

    #[test]
    fn test_endpoint_trailing_slash_is_trimmed() {
        let store = RemoteObjectStore::new("https://api.example.com/", "demo", "k", "s");
        assert_eq!(
            store.upload_url(),
            "https://api.example.com/v1_1/demo/video/upload"
        );
    }
}

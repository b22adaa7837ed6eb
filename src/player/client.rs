//! Blocking HTTP client for the catalog API.

use uuid::Uuid;

use crate::models::SongView;

/// Errors surfaced to the player as a readable string.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Could not reach the catalog server: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Catalog server answered with status {0}")]
    Status(u16),
}

/// Client for a running catalog server.
pub struct CatalogClient {
    base: String,
    http: reqwest::blocking::Client,
}

impl CatalogClient {
    /// Create a client for the server at `base`.
    pub fn new(base: impl Into<String>) -> Self {
        Self {
            base: base.into().trim_end_matches('/').to_string(),
            http: reqwest::blocking::Client::new(),
        }
    }

    /// Fetch every cataloged song.
    pub fn fetch_songs(&self) -> Result<Vec<SongView>, ClientError> {
        let response = self.http.get(format!("{}/music", self.base)).send()?;

        if !response.status().is_success() {
            return Err(ClientError::Status(response.status().as_u16()));
        }

        Ok(response.json()?)
    }

    /// Ask the server to delete a song.
    pub fn delete_song(&self, id: Uuid) -> Result<(), ClientError> {
        let response = self
            .http
            .delete(format!("{}/songs/{}", self.base, id))
            .send()?;

        if !response.status().is_success() {
            return Err(ClientError::Status(response.status().as_u16()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let client = CatalogClient::new("http://localhost:3000/");
        assert_eq!(client.base, "http://localhost:3000");
    }

    #[test]
    fn test_song_list_wire_format_parses() {
        let json = r#"[
            {"_id": "7f2f9a5e-55b4-4f2e-a9b7-0c3a3a1f0d42",
             "title": "track",
             "url": "http://localhost:3000/audio/track.mp3"}
        ]"#;

        let songs: Vec<SongView> = serde_json::from_str(json).unwrap();
        assert_eq!(songs.len(), 1);
        assert_eq!(songs[0].title, "track");
        assert_eq!(
            songs[0].id,
            Uuid::parse_str("7f2f9a5e-55b4-4f2e-a9b7-0c3a3a1f0d42").unwrap()
        );
    }
}

//! Song API endpoints.

use actix_multipart::Multipart;
use actix_web::{delete, post, web, HttpResponse};
use futures_util::TryStreamExt;
use uuid::Uuid;

use crate::catalog::MAX_BATCH_SIZE;
use crate::error::{AppError, AppResult};
use crate::models::{AppState, MessageResponse, SongsResponse, UploadedFile};

/// Validate a multipart filename to prevent path traversal attacks.
///
/// Returns an error if the filename is empty or contains path
/// traversal sequences.
fn sanitize_filename(filename: &str) -> AppResult<()> {
    // Reject empty filenames
    if filename.is_empty() {
        return Err(AppError::BadRequest("Filename cannot be empty".to_string()));
    }

    // Reject path traversal attempts
    if filename.contains("..") || filename.contains('/') || filename.contains('\\') {
        tracing::warn!(filename = %filename, "Path traversal attempt blocked");
        return Err(AppError::BadRequest(
            "Invalid filename: path separators not allowed".to_string(),
        ));
    }

    // Reject absolute paths (Unix and Windows)
    if filename.starts_with('/') || filename.chars().nth(1) == Some(':') {
        return Err(AppError::BadRequest(
            "Invalid filename: absolute paths not allowed".to_string(),
        ));
    }

    Ok(())
}

fn bad_multipart(err: actix_multipart::MultipartError) -> AppError {
    AppError::BadRequest(format!("Malformed multipart payload: {}", err))
}

/// Drain the multipart payload into memory.
///
/// Only file fields are taken; a batch beyond the cap is a hard error
/// rather than a silent cut.
async fn collect_files(mut payload: Multipart) -> AppResult<Vec<UploadedFile>> {
    let mut files = Vec::new();

    while let Some(mut field) = payload.try_next().await.map_err(bad_multipart)? {
        let filename = match field.content_disposition().get_filename() {
            Some(name) => name.to_string(),
            // Non-file form field
            None => continue,
        };

        sanitize_filename(&filename)?;

        if files.len() == MAX_BATCH_SIZE {
            return Err(AppError::BadRequest(format!(
                "At most {} files per upload",
                MAX_BATCH_SIZE
            )));
        }

        let mut data = web::BytesMut::new();
        while let Some(chunk) = field.try_next().await.map_err(bad_multipart)? {
            data.extend_from_slice(&chunk);
        }

        files.push(UploadedFile {
            filename,
            bytes: data.freeze(),
        });
    }

    Ok(files)
}

/// Accept a batch of mp3 files and catalog each one.
///
/// POST /upload-songs
#[post("/upload-songs")]
pub async fn upload_songs(
    data: web::Data<AppState>,
    payload: Multipart,
) -> AppResult<HttpResponse> {
    let files = collect_files(payload).await?;
    let songs = data.catalog.ingest(files).await?;

    Ok(HttpResponse::Created().json(SongsResponse {
        message: "Files uploaded successfully".to_string(),
        songs,
    }))
}

/// List the catalog, projected to playable entries.
///
/// GET /music (also mounted at /musics)
pub async fn list_songs(data: web::Data<AppState>) -> AppResult<HttpResponse> {
    let songs = data.catalog.list()?;
    Ok(HttpResponse::Ok().json(songs))
}

/// Delete a song and its stored audio.
///
/// DELETE /songs/{id}
#[delete("/songs/{id}")]
pub async fn delete_song(
    data: web::Data<AppState>,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    // An unparsable id is just an unknown id
    let id = Uuid::parse_str(&path).map_err(|_| AppError::song_not_found(&path))?;

    data.catalog.remove(id).await?;

    Ok(HttpResponse::Ok().json(MessageResponse {
        message: "Song deleted successfully".to_string(),
    }))
}

/// Catalog files already present in the songs folder.
///
/// POST /resync
#[post("/resync")]
pub async fn resync_songs(data: web::Data<AppState>) -> AppResult<HttpResponse> {
    let songs = data.catalog.resync().await?;

    Ok(HttpResponse::Created().json(SongsResponse {
        message: format!("Cataloged {} new song(s) from the songs folder", songs.len()),
        songs,
    }))
}

/// Configure song routes.
///
/// `/music` and `/musics` are aliases of one handler, not separate
/// implementations.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(upload_songs)
        .service(delete_song)
        .service(resync_songs)
        .route("/music", web::get().to(list_songs))
        .route("/musics", web::get().to(list_songs));
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::StatusCode;
    use actix_web::{test, App};
    use std::sync::Arc;
    use tempfile::tempdir;

    use crate::catalog::{CatalogService, JsonCatalogStore};
    use crate::storage::LocalObjectStore;

    const BOUNDARY: &str = "----shellac-test-boundary";

    fn app_state(dir: &tempfile::TempDir) -> AppState {
        let songs_dir = dir.path().join("songs");
        std::fs::create_dir_all(&songs_dir).unwrap();

        let store = Arc::new(JsonCatalogStore::new(dir.path().join("catalog.json")).unwrap());
        let objects = Arc::new(LocalObjectStore::new(&songs_dir).unwrap());

        AppState {
            catalog: Arc::new(CatalogService::new(store, objects, "http://localhost:3000")),
        }
    }

    fn multipart_body(parts: &[(&str, &[u8])]) -> (String, Vec<u8>) {
        let mut body = Vec::new();
        for (filename, content) in parts {
            body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
            body.extend_from_slice(
                format!(
                    "Content-Disposition: form-data; name=\"files\"; filename=\"{}\"\r\n",
                    filename
                )
                .as_bytes(),
            );
            body.extend_from_slice(b"Content-Type: audio/mpeg\r\n\r\n");
            body.extend_from_slice(content);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

        (format!("multipart/form-data; boundary={}", BOUNDARY), body)
    }

    #[actix_rt::test]
    async fn test_upload_list_delete_roundtrip() {
        let dir = tempdir().unwrap();
        let state = app_state(&dir);
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .configure(configure)
                .service(actix_files::Files::new("/audio", dir.path().join("songs"))),
        )
        .await;

        // Upload one file
        let (content_type, body) = multipart_body(&[("track.mp3", b"mp3-bytes")]);
        let req = test::TestRequest::post()
            .uri("/upload-songs")
            .insert_header(("content-type", content_type))
            .set_payload(body)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);

        let created: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(created["songs"][0]["title"], "track");
        let id = created["songs"][0]["_id"].as_str().unwrap().to_string();

        // The list contains it, with a playable local URL
        let req = test::TestRequest::get().uri("/musics").to_request();
        let songs: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(songs[0]["title"], "track");
        let url = songs[0]["url"].as_str().unwrap().to_string();
        assert!(url.starts_with("http://localhost:3000/audio/"));

        // The playback URL serves back exactly the uploaded bytes
        let path = url.strip_prefix("http://localhost:3000").unwrap();
        let req = test::TestRequest::get().uri(path).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body = test::read_body(resp).await;
        assert_eq!(&body[..], b"mp3-bytes");

        // Delete it
        let req = test::TestRequest::delete()
            .uri(&format!("/songs/{}", id))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        // Gone from the list (both aliases)
        let req = test::TestRequest::get().uri("/music").to_request();
        let songs: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(songs.as_array().unwrap().len(), 0);

        // A second delete of the same id is a 404
        let req = test::TestRequest::delete()
            .uri(&format!("/songs/{}", id))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_rt::test]
    async fn test_upload_without_files_is_400() {
        let dir = tempdir().unwrap();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(app_state(&dir)))
                .configure(configure),
        )
        .await;

        let (content_type, body) = multipart_body(&[]);
        let req = test::TestRequest::post()
            .uri("/upload-songs")
            .insert_header(("content-type", content_type))
            .set_payload(body)
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_rt::test]
    async fn test_upload_non_mp3_rejects_whole_batch() {
        let dir = tempdir().unwrap();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(app_state(&dir)))
                .configure(configure),
        )
        .await;

        let (content_type, body) =
            multipart_body(&[("track.mp3", b"audio"), ("cover.png", b"image")]);
        let req = test::TestRequest::post()
            .uri("/upload-songs")
            .insert_header(("content-type", content_type))
            .set_payload(body)
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let req = test::TestRequest::get().uri("/music").to_request();
        let songs: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(songs.as_array().unwrap().len(), 0);
    }

    #[actix_rt::test]
    async fn test_delete_unparsable_id_is_404() {
        let dir = tempdir().unwrap();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(app_state(&dir)))
                .configure(configure),
        )
        .await;

        let req = test::TestRequest::delete()
            .uri("/songs/not-a-uuid")
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_rt::test]
    async fn test_resync_then_resync_again_conflicts() {
        let dir = tempdir().unwrap();
        let state = app_state(&dir);
        std::fs::write(dir.path().join("songs").join("found.mp3"), b"bytes").unwrap();

        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .configure(configure),
        )
        .await;

        let req = test::TestRequest::post().uri("/resync").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);

        let req = test::TestRequest::post().uri("/resync").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CONFLICT);
    }

    #[::std::prelude::v1::test]
    fn test_sanitize_filename_valid() {
        assert!(sanitize_filename("song.mp3").is_ok());
        assert!(sanitize_filename("My Song (2023).mp3").is_ok());
    }

    #[::std::prelude::v1::test]
    fn test_sanitize_filename_path_traversal() {
        assert!(sanitize_filename("../etc/passwd").is_err());
        assert!(sanitize_filename("..\\windows\\system32").is_err());
        assert!(sanitize_filename("foo/../bar").is_err());
        assert!(sanitize_filename("/etc/passwd").is_err());
    }

    #[::std::prelude::v1::test]
    fn test_sanitize_filename_empty() {
        assert!(sanitize_filename("").is_err());
    }
}

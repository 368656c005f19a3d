use axum::{
    Json, Router,
    body::Body,
    extract::{
        DefaultBodyLimit, Multipart, Path, Query, State,
        multipart::MultipartRejection,
        rejection::JsonRejection,
    },
    http::{HeaderMap, StatusCode, header},
    response::Response,
    routing::get,
};
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio_util::io::ReaderStream;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::audio;
use crate::error::{Result, ServiceError};
use crate::model::{
    DeleteConfirmation, Playlist, PlaylistQuery, PlaylistRequest, Track, TrackFilter, TrackQuery,
    TrackRequest, parse_int,
};
use crate::service::{AudioUpload, PlaylistService, TrackService};

#[derive(Clone)]
pub struct AppState {
    pub tracks: TrackService,
    pub playlists: PlaylistService,
}

pub fn create_router(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/v1/track", get(list_tracks).post(create_track))
        .route(
            "/v1/track/:id",
            get(get_track).put(update_track).delete(delete_track),
        )
        .route("/v1/track/:id/download", get(download_track))
        .route("/v1/playlist", get(list_playlists).post(create_playlist))
        .route(
            "/v1/playlist/:id",
            get(get_playlist)
                .put(update_playlist)
                .delete(delete_playlist),
        )
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Root endpoint
async fn root() -> &'static str {
    concat!("Music API v", env!("CARGO_PKG_VERSION"))
}

async fn list_tracks(
    State(state): State<AppState>,
    Query(query): Query<TrackQuery>,
) -> Result<Json<Vec<Track>>> {
    let filter: TrackFilter = query.into();
    tracing::debug!("Listing tracks with {:?}", filter);
    let tracks = state.tracks.list(&filter).await?;
    tracing::debug!("Returning {} tracks", tracks.len());
    Ok(Json(tracks))
}

async fn get_track(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Track>> {
    tracing::debug!("Fetching track with id: {}", id);
    Ok(Json(state.tracks.get(&id).await?))
}

async fn create_track(
    State(state): State<AppState>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<Json<Track>> {
    let (request, upload) = read_track_form(multipart).await?;
    Ok(Json(state.tracks.create(request, upload).await?))
}

async fn update_track(
    State(state): State<AppState>,
    Path(id): Path<String>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<Json<Track>> {
    let (request, upload) = read_track_form(multipart).await?;
    Ok(Json(state.tracks.update(&id, request, upload).await?))
}

async fn delete_track(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DeleteConfirmation>> {
    state.tracks.delete(&id).await?;
    Ok(Json(DeleteConfirmation::new("track", id)))
}

/// Collect the track fields and the optional `mp3_file` part of a form.
async fn read_track_form(
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<(TrackRequest, Option<AudioUpload>)> {
    let mut multipart = multipart.map_err(|e| ServiceError::Validation(e.body_text()))?;

    let mut request = TrackRequest::default();
    let mut upload = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        ServiceError::Validation(format!("Error reading multipart field: {}", e.body_text()))
    })? {
        let name = field.name().unwrap_or("").to_string();

        if name == "mp3_file" {
            let file_name = field.file_name().unwrap_or("").to_string();
            let content_type = field.content_type().unwrap_or("").to_string();
            let data = field.bytes().await.map_err(|e| {
                ServiceError::Validation(format!("Error reading mp3_file: {}", e.body_text()))
            })?;

            // Browsers send an empty part when no file was picked.
            if file_name.is_empty() && data.is_empty() {
                continue;
            }
            upload = Some(AudioUpload {
                file_name,
                content_type,
                data,
            });
            continue;
        }

        let value = field.text().await.map_err(|e| {
            ServiceError::Validation(format!("Error reading field {}: {}", name, e.body_text()))
        })?;
        match name.as_str() {
            "title" => request.title = value,
            "artist" => request.artist = value,
            "album" => request.album = value,
            "genre" => request.genre = value,
            "release_year" => {
                request.release_year = i32::try_from(parse_int(&value)).unwrap_or_default()
            }
            other => tracing::debug!("Ignoring unknown form field: {}", other),
        }
    }

    Ok((request, upload))
}

/// Download a track's audio file, honouring a single byte `Range`.
async fn download_track(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Response> {
    let (track, path) = state.tracks.open_audio(&id).await?;
    tracing::debug!("Downloading file: {}", path.display());

    let mut file = tokio::fs::File::open(&path)
        .await
        .map_err(|e| ServiceError::Unavailable(format!("Failed to open {}: {}", path.display(), e)))?;
    let file_size = file
        .metadata()
        .await
        .map_err(|e| ServiceError::Unavailable(format!("Failed to stat {}: {}", path.display(), e)))?
        .len();

    let mut head = [0u8; 16];
    let read = file
        .read(&mut head)
        .await
        .map_err(|e| ServiceError::Unavailable(format!("Failed to read {}: {}", path.display(), e)))?;
    let content_type = audio::sniff_content_type(&head[..read]);

    let range = headers
        .get(header::RANGE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| parse_range(value, file_size));
    let (start, end) = range.unwrap_or((0, file_size.saturating_sub(1)));
    let length = if file_size == 0 { 0 } else { end - start + 1 };

    file.seek(std::io::SeekFrom::Start(start))
        .await
        .map_err(|e| ServiceError::Unavailable(format!("Failed to seek {}: {}", path.display(), e)))?;

    let mut response = Response::builder()
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CONTENT_LENGTH, length)
        .header(header::ACCEPT_RANGES, "bytes")
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", header_safe(&track.mp3_file)),
        )
        .header(header::CACHE_CONTROL, "no-cache, must-revalidate");

    if range.is_some() {
        tracing::debug!(
            "Streaming range {}-{}/{} ({} bytes)",
            start,
            end,
            file_size,
            length
        );
        response = response.status(StatusCode::PARTIAL_CONTENT).header(
            header::CONTENT_RANGE,
            format!("bytes {}-{}/{}", start, end, file_size),
        );
    } else {
        tracing::debug!("Streaming {} bytes for track {}", file_size, id);
    }

    response
        .body(Body::from_stream(ReaderStream::new(file.take(length))))
        .map_err(|e| ServiceError::Unavailable(format!("Failed to build response: {}", e)))
}

/// Filename usable inside a quoted header parameter.
fn header_safe(name: &str) -> String {
    name.chars()
        .filter(|c| !c.is_control())
        .map(|c| if c == '"' { '\'' } else { c })
        .collect()
}

/// Parse Range header value
/// Returns (start, end) tuple if valid
fn parse_range(range_str: &str, file_size: u64) -> Option<(u64, u64)> {
    // Expected format: "bytes=start-end" or "bytes=start-" or "bytes=-end"
    let range_part = range_str.strip_prefix("bytes=")?;
    let (start_str, end_str) = range_part.split_once('-')?;
    let start_str = start_str.trim();
    let end_str = end_str.trim();

    match (start_str.is_empty(), end_str.is_empty()) {
        (false, false) => {
            let start = start_str.parse::<u64>().ok()?;
            let end = end_str.parse::<u64>().ok()?;
            if start > end || start >= file_size {
                return None;
            }
            Some((start, end.min(file_size - 1)))
        }
        (false, true) => {
            let start = start_str.parse::<u64>().ok()?;
            if start >= file_size {
                return None;
            }
            Some((start, file_size - 1))
        }
        (true, false) => {
            // last N bytes
            let suffix_length = end_str.parse::<u64>().ok()?;
            if suffix_length == 0 || suffix_length > file_size {
                return None;
            }
            Some((file_size - suffix_length, file_size - 1))
        }
        (true, true) => None,
    }
}

async fn list_playlists(
    State(state): State<AppState>,
    Query(query): Query<PlaylistQuery>,
) -> Result<Json<Vec<Playlist>>> {
    let playlists = state.playlists.list(&query.into()).await?;
    tracing::debug!("Returning {} playlists", playlists.len());
    Ok(Json(playlists))
}

async fn get_playlist(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Playlist>> {
    tracing::debug!("Fetching playlist with id: {}", id);
    Ok(Json(state.playlists.get(&id).await?))
}

async fn create_playlist(
    State(state): State<AppState>,
    body: std::result::Result<Json<PlaylistRequest>, JsonRejection>,
) -> Result<Json<Playlist>> {
    let Json(request) = body.map_err(|e| ServiceError::Validation(e.body_text()))?;
    Ok(Json(state.playlists.create(request).await?))
}

async fn update_playlist(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: std::result::Result<Json<PlaylistRequest>, JsonRejection>,
) -> Result<Json<Playlist>> {
    let Json(request) = body.map_err(|e| ServiceError::Validation(e.body_text()))?;
    Ok(Json(state.playlists.update(&id, request).await?))
}

async fn delete_playlist(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DeleteConfirmation>> {
    state.playlists.delete(&id).await?;
    Ok(Json(DeleteConfirmation::new("playlist", id)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_range_forms() {
        assert_eq!(parse_range("bytes=0-99", 1000), Some((0, 99)));
        assert_eq!(parse_range("bytes=900-", 1000), Some((900, 999)));
        assert_eq!(parse_range("bytes=-100", 1000), Some((900, 999)));
        assert_eq!(parse_range("bytes=990-2000", 1000), Some((990, 999)));
    }

    #[test]
    fn test_parse_range_rejects_unsatisfiable() {
        assert_eq!(parse_range("bytes=1000-", 1000), None);
        assert_eq!(parse_range("bytes=50-10", 1000), None);
        assert_eq!(parse_range("bytes=-0", 1000), None);
        assert_eq!(parse_range("bytes=-", 1000), None);
        assert_eq!(parse_range("items=0-1", 1000), None);
        assert_eq!(parse_range("bytes=0-1", 0), None);
    }

    #[test]
    fn test_header_safe_filename() {
        assert_eq!(header_safe("Blue \"Train\".mp3"), "Blue 'Train'.mp3");
        assert_eq!(header_safe("a\nb.mp3"), "ab.mp3");
    }
}

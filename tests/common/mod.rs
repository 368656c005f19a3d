//! Shared helpers for HTTP integration tests.

#![allow(dead_code)]

use axum::{
    Router,
    body::{Body, Bytes},
    http::{HeaderMap, Request, StatusCode, header},
};
use http_body_util::BodyExt;
use serde_json::Value;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

use music_api::library::SqliteTrackRepository;
use music_api::playlist::SqlitePlaylistRepository;
use music_api::server::{AppState, create_router};
use music_api::service::{PlaylistService, TrackService};
use music_api::storage::AudioStore;

const BOUNDARY: &str = "----music-api-test-boundary";

/// Seconds covered by one synthetic frame.
pub const FRAME_SECONDS: f64 = 1152.0 / 44100.0;

/// MPEG-1 Layer III frames (128 kbps, 44.1 kHz, mono) with silent bodies.
pub fn mp3_frames(count: usize) -> Vec<u8> {
    let mut data = Vec::with_capacity(count * 417);
    for _ in 0..count {
        data.extend_from_slice(&[0xFF, 0xFB, 0x90, 0xC4]);
        data.extend(std::iter::repeat_n(0u8, 413));
    }
    data
}

/// A `multipart/form-data` body under construction.
#[derive(Default)]
pub struct Form {
    body: Vec<u8>,
}

impl Form {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                BOUNDARY, name, value
            )
            .as_bytes(),
        );
        self
    }

    pub fn file(mut self, name: &str, file_name: &str, content_type: &str, data: &[u8]) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                BOUNDARY, name, file_name, content_type
            )
            .as_bytes(),
        );
        self.body.extend_from_slice(data);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    /// Track fields shared by most tests.
    pub fn track(title: &str) -> Self {
        Self::new()
            .text("title", title)
            .text("artist", "John Coltrane")
            .text("album", "Giant Steps")
            .text("genre", "jazz")
            .text("release_year", "1960")
    }

    pub fn mp3(self, file_name: &str, frames: usize) -> Self {
        self.file("mp3_file", file_name, "audio/mpeg", &mp3_frames(frames))
    }

    fn finish(mut self) -> Vec<u8> {
        self.body
            .extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
        self.body
    }
}

pub struct Reply {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl Reply {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).expect("response body should be JSON")
    }

    pub fn header(&self, name: header::HeaderName) -> &str {
        self.headers
            .get(&name)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_else(|| panic!("missing header {}", name))
    }
}

pub struct TestApp {
    router: Router,
    pub store: AudioStore,
    _dir: TempDir,
}

impl TestApp {
    pub async fn new() -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp directory");
        let pool = music_api::db::connect(dir.path().join("music.db"))
            .await
            .expect("Failed to initialize test database");
        let store = AudioStore::new(dir.path().join("audio"));

        let state = AppState {
            tracks: TrackService::new(
                Arc::new(SqliteTrackRepository::new(pool.clone())),
                store.clone(),
            ),
            playlists: PlaylistService::new(Arc::new(SqlitePlaylistRepository::new(pool))),
        };

        Self {
            router: create_router(state, 10 * 1024 * 1024),
            store,
            _dir: dir,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> Reply {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router should not fail");
        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .into_body()
            .collect()
            .await
            .expect("Failed to read body")
            .to_bytes();
        Reply {
            status,
            headers,
            body,
        }
    }

    pub async fn get(&self, uri: &str) -> Reply {
        self.send(Request::get(uri).body(Body::empty()).unwrap()).await
    }

    pub async fn delete(&self, uri: &str) -> Reply {
        self.send(Request::delete(uri).body(Body::empty()).unwrap())
            .await
    }

    pub async fn send_form(&self, method: &str, uri: &str, form: Form) -> Reply {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(form.finish()))
            .unwrap();
        self.send(request).await
    }

    pub async fn send_json(&self, method: &str, uri: &str, body: &Value) -> Reply {
        self.send_raw_json(method, uri, body.to_string()).await
    }

    pub async fn send_raw_json(&self, method: &str, uri: &str, body: String) -> Reply {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body))
            .unwrap();
        self.send(request).await
    }

    /// Upload a track and return its JSON.
    pub async fn create_track(&self, title: &str, frames: usize) -> Value {
        let reply = self
            .send_form("POST", "/v1/track", Form::track(title).mp3("upload.mp3", frames))
            .await;
        assert_eq!(reply.status, StatusCode::OK, "body: {:?}", reply.body);
        reply.json()
    }
}

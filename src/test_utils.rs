//! Fixtures shared by unit tests.

use std::sync::Arc;

use axum::body::Bytes;
use tempfile::TempDir;

use crate::library::SqliteTrackRepository;
use crate::playlist::SqlitePlaylistRepository;
use crate::service::{AudioUpload, PlaylistService, TrackService};
use crate::storage::AudioStore;

/// MPEG-1 Layer III frames (128 kbps, 44.1 kHz, mono, 417 bytes each) with
/// silent bodies. Each frame lasts 1152 / 44100 seconds.
pub fn mpeg1_frames(count: usize) -> Vec<u8> {
    let mut data = Vec::with_capacity(count * 417);
    for _ in 0..count {
        data.extend_from_slice(&[0xFF, 0xFB, 0x90, 0xC4]);
        data.extend(std::iter::repeat_n(0u8, 413));
    }
    data
}

pub fn mp3_upload(file_name: &str, frames: usize) -> AudioUpload {
    AudioUpload {
        file_name: file_name.to_string(),
        content_type: "audio/mpeg".to_string(),
        data: Bytes::from(mpeg1_frames(frames)),
    }
}

/// Services over a temporary database and audio directory.
/// Keep the `TempDir` alive for the duration of the test.
pub async fn temp_services() -> (TrackService, PlaylistService, AudioStore, TempDir) {
    let dir = tempfile::tempdir().expect("Failed to create temp directory");
    let pool = crate::db::connect(dir.path().join("test.db"))
        .await
        .expect("Failed to initialize test database");
    let store = AudioStore::new(dir.path().join("audio"));

    let tracks = TrackService::new(Arc::new(SqliteTrackRepository::new(pool.clone())), store.clone());
    let playlists = PlaylistService::new(Arc::new(SqlitePlaylistRepository::new(pool)));

    (tracks, playlists, store, dir)
}

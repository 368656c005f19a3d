//! HTTP tests for the track and playlist endpoints.

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use common::{FRAME_SECONDS, Form, TestApp, mp3_frames};
use serde_json::json;

// =============================================================================
// Tracks
// =============================================================================

#[tokio::test]
async fn test_root_banner() {
    let app = TestApp::new().await;
    let reply = app.get("/").await;
    assert_eq!(reply.status, StatusCode::OK);
    assert!(String::from_utf8_lossy(&reply.body).starts_with("Music API"));
}

#[tokio::test]
async fn test_track_round_trip() {
    let app = TestApp::new().await;

    let created = app.create_track("Naima", 39).await;
    let id = created["id"].as_str().unwrap().to_string();
    assert_eq!(created["mp3_file"], "Naima.mp3");

    let reply = app.get(&format!("/v1/track/{}", id)).await;
    assert_eq!(reply.status, StatusCode::OK);
    let track = reply.json();
    assert_eq!(track["title"], "Naima");
    assert_eq!(track["artist"], "John Coltrane");
    assert_eq!(track["album"], "Giant Steps");
    assert_eq!(track["genre"], "jazz");
    assert_eq!(track["release_year"], 1960);
    assert_eq!(track, created);

    let reply = app.delete(&format!("/v1/track/{}", id)).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.json(), json!({"message": "track deleted", "id": id}));

    let reply = app.get(&format!("/v1/track/{}", id)).await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
    assert_eq!(reply.json()["code"], 404);
}

#[tokio::test]
async fn test_duration_of_one_second_stream() {
    let app = TestApp::new().await;
    let created = app.create_track("One Second", 39).await;

    let duration = created["duration"].as_f64().unwrap();
    assert!((duration - 1.0).abs() <= FRAME_SECONDS, "duration was {}", duration);
    assert!((duration - 39.0 * FRAME_SECONDS).abs() < 1e-6);
}

#[tokio::test]
async fn test_create_requires_title() {
    let app = TestApp::new().await;
    let form = Form::new().text("artist", "Nobody").mp3("a.mp3", 3);

    let reply = app.send_form("POST", "/v1/track", form).await;

    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.json(), json!({"code": 400, "message": "title is required"}));
}

#[tokio::test]
async fn test_create_requires_file() {
    let app = TestApp::new().await;

    let reply = app.send_form("POST", "/v1/track", Form::track("No File")).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.json()["message"], "mp3_file is required");

    // An empty file input counts as no file.
    let form = Form::track("No File").file("mp3_file", "", "application/octet-stream", b"");
    let reply = app.send_form("POST", "/v1/track", form).await;
    assert_eq!(reply.json()["message"], "mp3_file is required");
}

#[tokio::test]
async fn test_create_rejects_unsupported_content_type() {
    let app = TestApp::new().await;
    let form = Form::track("Text").file("mp3_file", "notes.txt", "text/plain", b"la la la");

    let reply = app.send_form("POST", "/v1/track", form).await;

    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        reply.json()["message"],
        "Invalid file format. Please upload an MP3 audio file."
    );
    let list = app.get("/v1/track").await.json();
    assert_eq!(list, json!([]));
    assert!(!app.store.root().exists());
}

#[tokio::test]
async fn test_create_checks_file_before_title() {
    let app = TestApp::new().await;

    let reply = app
        .send_form("POST", "/v1/track", Form::new().text("artist", "Nobody"))
        .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.json()["message"], "mp3_file is required");

    let form = Form::new().file("mp3_file", "notes.txt", "text/plain", b"la la la");
    let reply = app.send_form("POST", "/v1/track", form).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        reply.json()["message"],
        "Invalid file format. Please upload an MP3 audio file."
    );
}

#[tokio::test]
async fn test_whitespace_title_is_accepted() {
    let app = TestApp::new().await;
    let created = app.create_track("   ", 3).await;
    assert_eq!(created["title"], "   ");
}

#[tokio::test]
async fn test_undecodable_upload_is_unavailable() {
    let app = TestApp::new().await;
    let form = Form::track("Noise").file("mp3_file", "noise.mp3", "audio/mpeg", b"not audio at all");

    let reply = app.send_form("POST", "/v1/track", form).await;

    assert_eq!(reply.status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(reply.json()["code"], 503);
    assert_eq!(app.get("/v1/track").await.json(), json!([]));
}

#[tokio::test]
async fn test_non_multipart_body_is_rejected() {
    let app = TestApp::new().await;
    let reply = app
        .send_json("POST", "/v1/track", &json!({"title": "Json"}))
        .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.json()["code"], 400);
}

#[tokio::test]
async fn test_update_without_file_keeps_audio() {
    let app = TestApp::new().await;
    let created = app.create_track("Equinox", 20).await;
    let id = created["id"].as_str().unwrap();

    let form = Form::new()
        .text("title", "Equinox")
        .text("artist", "Coltrane")
        .text("release_year", "1961");
    let reply = app.send_form("PUT", &format!("/v1/track/{}", id), form).await;

    assert_eq!(reply.status, StatusCode::OK);
    let updated = reply.json();
    assert_eq!(updated["artist"], "Coltrane");
    assert_eq!(updated["album"], "");
    assert_eq!(updated["release_year"], 1961);
    assert_eq!(updated["duration"], created["duration"]);
    assert_eq!(updated["mp3_file"], created["mp3_file"]);
    assert_eq!(app.get(&format!("/v1/track/{}", id)).await.json(), updated);
}

#[tokio::test]
async fn test_update_with_file_replaces_audio() {
    let app = TestApp::new().await;
    let created = app.create_track("Before", 10).await;
    let id = created["id"].as_str().unwrap();

    let form = Form::track("After").mp3("after.mp3", 80);
    let reply = app.send_form("PUT", &format!("/v1/track/{}", id), form).await;

    assert_eq!(reply.status, StatusCode::OK);
    let updated = reply.json();
    assert_eq!(updated["mp3_file"], "After.mp3");
    assert!(updated["duration"].as_f64().unwrap() > created["duration"].as_f64().unwrap());
    assert!(app.store.path(id, "After.mp3").exists());
    assert!(!app.store.path(id, "Before.mp3").exists());
}

#[tokio::test]
async fn test_update_rejects_unsupported_content_type() {
    let app = TestApp::new().await;
    let created = app.create_track("Kept", 10).await;
    let id = created["id"].as_str().unwrap();

    let form = Form::track("Replaced").file("mp3_file", "notes.txt", "text/plain", b"la la la");
    let reply = app.send_form("PUT", &format!("/v1/track/{}", id), form).await;

    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        reply.json()["message"],
        "Invalid file format. Please upload an MP3 audio file."
    );
    assert_eq!(app.get(&format!("/v1/track/{}", id)).await.json(), created);
    let stored = std::fs::read(app.store.path(id, "Kept.mp3")).unwrap();
    assert_eq!(stored, mp3_frames(10));
    assert!(!app.store.path(id, "Replaced.txt").exists());
}

#[tokio::test]
async fn test_update_and_delete_missing_track() {
    let app = TestApp::new().await;

    let reply = app
        .send_form("PUT", "/v1/track/does-not-exist", Form::track("Ghost"))
        .await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);

    let reply = app.delete("/v1/track/does-not-exist").await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
    assert_eq!(reply.json()["code"], 404);
}

#[tokio::test]
async fn test_list_filters_and_pagination() {
    let app = TestApp::new().await;
    for (title, genre) in [("A", "jazz"), ("B", "rock"), ("C", "jazz"), ("D", "jazz")] {
        let form = Form::new()
            .text("title", title)
            .text("genre", genre)
            .mp3("x.mp3", 2);
        let reply = app.send_form("POST", "/v1/track", form).await;
        assert_eq!(reply.status, StatusCode::OK);
    }

    let titles = |reply: common::Reply| -> Vec<String> {
        reply
            .json()
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["title"].as_str().unwrap().to_string())
            .collect()
    };

    assert_eq!(titles(app.get("/v1/track").await), ["A", "B", "C", "D"]);
    assert_eq!(titles(app.get("/v1/track?genre=jazz").await), ["A", "C", "D"]);
    assert_eq!(titles(app.get("/v1/track?genre=jazz&title=C").await), ["C"]);
    assert_eq!(titles(app.get("/v1/track?genre=jazz&limit=2&offset=1").await), ["C", "D"]);
    assert_eq!(titles(app.get("/v1/track?limit=0&offset=3").await).len(), 4);
    assert_eq!(titles(app.get("/v1/track?limit=abc").await).len(), 4);
    assert!(titles(app.get("/v1/track?artist=Nobody").await).is_empty());
}

#[tokio::test]
async fn test_delete_removes_audio_directory() {
    let app = TestApp::new().await;
    let created = app.create_track("Temporary", 3).await;
    let id = created["id"].as_str().unwrap();
    assert!(app.store.track_dir(id).exists());

    app.delete(&format!("/v1/track/{}", id)).await;

    assert!(!app.store.track_dir(id).exists());
}

// =============================================================================
// Download
// =============================================================================

#[tokio::test]
async fn test_download_returns_uploaded_bytes() {
    let app = TestApp::new().await;
    let created = app.create_track("Alabama", 12).await;
    let id = created["id"].as_str().unwrap();

    let reply = app.get(&format!("/v1/track/{}/download", id)).await;

    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body.as_ref(), mp3_frames(12).as_slice());
    assert_eq!(reply.header(header::CONTENT_TYPE), "audio/mpeg");
    assert_eq!(reply.header(header::CONTENT_LENGTH), (12 * 417).to_string());
    assert_eq!(reply.header(header::ACCEPT_RANGES), "bytes");
    assert_eq!(reply.header(header::CACHE_CONTROL), "no-cache, must-revalidate");
    assert_eq!(
        reply.header(header::CONTENT_DISPOSITION),
        "attachment; filename=\"Alabama.mp3\""
    );
}

#[tokio::test]
async fn test_download_range() {
    let app = TestApp::new().await;
    let created = app.create_track("Ranged", 4).await;
    let id = created["id"].as_str().unwrap();
    let full = mp3_frames(4);

    let request = Request::get(format!("/v1/track/{}/download", id))
        .header(header::RANGE, "bytes=417-833")
        .body(Body::empty())
        .unwrap();
    let reply = app.send(request).await;

    assert_eq!(reply.status, StatusCode::PARTIAL_CONTENT);
    assert_eq!(reply.body.as_ref(), &full[417..834]);
    assert_eq!(reply.header(header::CONTENT_LENGTH), "417");
    assert_eq!(
        reply.header(header::CONTENT_RANGE),
        format!("bytes 417-833/{}", full.len())
    );

    // Unsatisfiable ranges fall back to the whole file.
    let request = Request::get(format!("/v1/track/{}/download", id))
        .header(header::RANGE, "bytes=99999-")
        .body(Body::empty())
        .unwrap();
    let reply = app.send(request).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body.len(), full.len());
}

#[tokio::test]
async fn test_download_missing_track() {
    let app = TestApp::new().await;
    let reply = app.get("/v1/track/nope/download").await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
}

// =============================================================================
// Playlists
// =============================================================================

#[tokio::test]
async fn test_playlist_defaults_to_priority() {
    let app = TestApp::new().await;

    let reply = app
        .send_json(
            "POST",
            "/v1/playlist",
            &json!({"name": "Morning", "track_ids": [{"track_id": "t1", "priority": 2}]}),
        )
        .await;

    assert_eq!(reply.status, StatusCode::OK);
    let playlist = reply.json();
    assert_eq!(playlist["playback_mode"], "priority");
    assert_eq!(playlist["track_ids"], json!([{"track_id": "t1", "priority": 2}]));

    let id = playlist["id"].as_str().unwrap();
    assert_eq!(app.get(&format!("/v1/playlist/{}", id)).await.json(), playlist);
}

#[tokio::test]
async fn test_playlist_keeps_random() {
    let app = TestApp::new().await;
    let reply = app
        .send_json(
            "POST",
            "/v1/playlist",
            &json!({"name": "Shuffle", "playback_mode": "random"}),
        )
        .await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.json()["playback_mode"], "random");
    assert_eq!(reply.json()["track_ids"], json!([]));
}

#[tokio::test]
async fn test_playlist_validation() {
    let app = TestApp::new().await;

    let reply = app
        .send_json("POST", "/v1/playlist", &json!({"track_ids": []}))
        .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.json()["message"], "name is required");

    let reply = app
        .send_json(
            "POST",
            "/v1/playlist",
            &json!({"name": "Loop", "playback_mode": "loop"}),
        )
        .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);

    let reply = app
        .send_raw_json("POST", "/v1/playlist", "{\"name\": ".to_string())
        .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.json()["code"], 400);
}

#[tokio::test]
async fn test_playlist_update_and_delete() {
    let app = TestApp::new().await;
    let created = app
        .send_json(
            "POST",
            "/v1/playlist",
            &json!({"name": "Road", "playback_mode": "random"}),
        )
        .await
        .json();
    let id = created["id"].as_str().unwrap();

    let reply = app
        .send_json(
            "PUT",
            &format!("/v1/playlist/{}", id),
            &json!({"name": "Road Trip", "track_ids": [{"track_id": "a"}, {"track_id": "b", "priority": 1}]}),
        )
        .await;
    assert_eq!(reply.status, StatusCode::OK);
    let updated = reply.json();
    assert_eq!(updated["id"], id);
    assert_eq!(updated["name"], "Road Trip");
    assert_eq!(updated["playback_mode"], "priority");
    assert_eq!(updated["track_ids"][0], json!({"track_id": "a", "priority": 0}));

    let reply = app.delete(&format!("/v1/playlist/{}", id)).await;
    assert_eq!(reply.json(), json!({"message": "playlist deleted", "id": id}));
    assert_eq!(
        app.get(&format!("/v1/playlist/{}", id)).await.status,
        StatusCode::NOT_FOUND
    );
}

#[tokio::test]
async fn test_playlist_missing_ids() {
    let app = TestApp::new().await;

    let reply = app
        .send_json("PUT", "/v1/playlist/ghost", &json!({"name": "Ghost"}))
        .await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);

    let reply = app.delete("/v1/playlist/ghost").await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_playlist_list_by_name() {
    let app = TestApp::new().await;
    for name in ["Gym", "Chill", "Gym"] {
        app.send_json("POST", "/v1/playlist", &json!({"name": name}))
            .await;
    }

    let all = app.get("/v1/playlist").await.json();
    assert_eq!(all.as_array().unwrap().len(), 3);

    let gym = app.get("/v1/playlist?name=Gym").await.json();
    assert_eq!(gym.as_array().unwrap().len(), 2);

    let page = app.get("/v1/playlist?limit=1&offset=1").await.json();
    assert_eq!(page[0]["name"], "Chill");
}

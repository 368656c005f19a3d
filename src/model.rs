use serde::{Deserialize, Serialize};

use crate::error::ServiceError;

/// A stored track record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub id: String,
    pub title: String,
    pub artist: String,
    pub album: String,
    pub genre: String,
    pub release_year: i32,
    /// Seconds, summed from the uploaded MPEG frames.
    pub duration: f64,
    /// Stored filename, `<title>.<ext>`.
    pub mp3_file: String,
}

/// Track fields supplied by a client on create/update.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackRequest {
    pub title: String,
    pub artist: String,
    pub album: String,
    pub genre: String,
    pub release_year: i32,
}

impl TrackRequest {
    pub fn validate(&self) -> Result<(), ServiceError> {
        if self.title.is_empty() {
            return Err(ServiceError::Validation("title is required".to_string()));
        }
        Ok(())
    }
}

/// Pagination window. A non-positive limit means unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Page {
    pub limit: i64,
    pub offset: i64,
}

impl Page {
    pub fn new(limit: i64, offset: i64) -> Self {
        Self { limit, offset }
    }

    /// `(limit, offset)` to apply, or `None` when the page is unbounded.
    /// The offset is ignored for unbounded pages.
    pub fn bounds(&self) -> Option<(i64, i64)> {
        if self.limit > 0 {
            Some((self.limit, self.offset.max(0)))
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackFilter {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub genre: Option<String>,
    pub page: Page,
}

/// Raw query string for `GET /v1/track`.
#[derive(Debug, Default, Deserialize)]
pub struct TrackQuery {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub genre: Option<String>,
    pub limit: Option<String>,
    pub offset: Option<String>,
}

impl From<TrackQuery> for TrackFilter {
    fn from(query: TrackQuery) -> Self {
        Self {
            title: non_empty(query.title),
            artist: non_empty(query.artist),
            album: non_empty(query.album),
            genre: non_empty(query.genre),
            page: Page::new(
                parse_int(query.limit.as_deref().unwrap_or_default()),
                parse_int(query.offset.as_deref().unwrap_or_default()),
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackMode {
    #[default]
    Priority,
    Random,
}

impl PlaybackMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlaybackMode::Priority => "priority",
            PlaybackMode::Random => "random",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "priority" => Some(PlaybackMode::Priority),
            "random" => Some(PlaybackMode::Random),
            _ => None,
        }
    }
}

/// A weighted reference from a playlist to a track.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackRef {
    pub track_id: String,
    #[serde(default)]
    pub priority: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Playlist {
    pub id: String,
    pub name: String,
    pub track_ids: Vec<TrackRef>,
    pub playback_mode: PlaybackMode,
}

/// JSON body for playlist create/update.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlaylistRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub track_ids: Option<Vec<TrackRef>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub playback_mode: Option<String>,
}

impl PlaylistRequest {
    pub fn validate(&self) -> Result<(), ServiceError> {
        if self.name.is_empty() {
            return Err(ServiceError::Validation("name is required".to_string()));
        }
        self.playback_mode().map(|_| ())
    }

    /// Requested playback mode, `priority` when absent or empty.
    pub fn playback_mode(&self) -> Result<PlaybackMode, ServiceError> {
        match self.playback_mode.as_deref().map(str::trim) {
            None | Some("") => Ok(PlaybackMode::default()),
            Some(name) => PlaybackMode::from_name(name).ok_or_else(|| {
                ServiceError::Validation(format!(
                    "playback_mode must be 'priority' or 'random', got '{}'",
                    name
                ))
            }),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaylistFilter {
    pub name: Option<String>,
    pub page: Page,
}

/// Raw query string for `GET /v1/playlist`.
#[derive(Debug, Default, Deserialize)]
pub struct PlaylistQuery {
    pub name: Option<String>,
    pub limit: Option<String>,
    pub offset: Option<String>,
}

impl From<PlaylistQuery> for PlaylistFilter {
    fn from(query: PlaylistQuery) -> Self {
        Self {
            name: non_empty(query.name),
            page: Page::new(
                parse_int(query.limit.as_deref().unwrap_or_default()),
                parse_int(query.offset.as_deref().unwrap_or_default()),
            ),
        }
    }
}

/// Body returned by the delete endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteConfirmation {
    pub message: String,
    pub id: String,
}

impl DeleteConfirmation {
    pub fn new(resource: &str, id: impl Into<String>) -> Self {
        Self {
            message: format!("{} deleted", resource),
            id: id.into(),
        }
    }
}

/// Lenient integer parsing for form and query values: anything that is not
/// an integer reads as 0.
pub fn parse_int(value: &str) -> i64 {
    value.replace('\n', "").trim().parse().unwrap_or(0)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

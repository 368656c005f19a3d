use axum::body::Bytes;
use std::path::PathBuf;
use std::sync::Arc;

use super::RecordCache;
use crate::audio;
use crate::cache::Cache;
use crate::error::{Result, ServiceError};
use crate::library::TrackRepository;
use crate::model::{Track, TrackFilter, TrackRequest};
use crate::storage::AudioStore;

/// An uploaded audio file as received from the client.
#[derive(Debug, Clone)]
pub struct AudioUpload {
    pub file_name: String,
    pub content_type: String,
    pub data: Bytes,
}

impl AudioUpload {
    pub fn validate(&self) -> Result<()> {
        if !audio::is_allowed_content_type(&self.content_type) {
            return Err(ServiceError::Validation(
                "Invalid file format. Please upload an MP3 audio file.".to_string(),
            ));
        }
        Ok(())
    }

    fn extension(&self) -> String {
        audio::file_extension(&self.file_name, &self.content_type)
    }
}

#[derive(Clone)]
pub struct TrackService {
    repo: Arc<dyn TrackRepository>,
    store: AudioStore,
    cache: RecordCache,
}

impl TrackService {
    pub fn new(repo: Arc<dyn TrackRepository>, store: AudioStore) -> Self {
        Self {
            repo,
            store,
            cache: RecordCache::disabled("track"),
        }
    }

    /// Serve `get` through the given cache.
    pub fn with_cache(mut self, cache: Arc<dyn Cache>) -> Self {
        self.cache.cache = Some(cache);
        self
    }

    pub async fn list(&self, filter: &TrackFilter) -> Result<Vec<Track>> {
        Ok(self.repo.find(filter).await?)
    }

    pub async fn get(&self, id: &str) -> Result<Track> {
        if let Some(track) = self.cache.get::<Track>(id).await {
            tracing::debug!("Cache hit for track {}", id);
            return Ok(track);
        }

        let track = self.fetch(id).await?;
        self.cache.put(id, &track).await;
        Ok(track)
    }

    async fn fetch(&self, id: &str) -> Result<Track> {
        self.repo
            .get(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("track {} not found", id)))
    }

    /// Validate, measure and store a new track.
    ///
    /// The record is inserted before the file is written; a failed write
    /// leaves the record in place.
    pub async fn create(&self, request: TrackRequest, upload: Option<AudioUpload>) -> Result<Track> {
        let upload =
            upload.ok_or_else(|| ServiceError::Validation("mp3_file is required".to_string()))?;
        upload.validate()?;
        request.validate()?;

        let duration = audio::extract_duration(upload.data.clone()).await?;

        let id = uuid::Uuid::new_v4().to_string();
        let mp3_file = audio::stored_file_name(&request.title, &upload.extension());
        let track = Track {
            id,
            title: request.title,
            artist: request.artist,
            album: request.album,
            genre: request.genre,
            release_year: request.release_year,
            duration,
            mp3_file,
        };

        self.repo.insert(&track).await?;
        self.store.save(&track.id, &track.mp3_file, &upload.data).await?;

        tracing::info!(
            "Created track {} '{}' ({:.2}s, {} bytes)",
            track.id,
            track.title,
            track.duration,
            upload.data.len()
        );
        Ok(track)
    }

    /// Replace a track's metadata, and its audio when a file is supplied.
    pub async fn update(
        &self,
        id: &str,
        request: TrackRequest,
        upload: Option<AudioUpload>,
    ) -> Result<Track> {
        if let Some(upload) = &upload {
            upload.validate()?;
        }
        request.validate()?;

        let existing = self.fetch(id).await?;

        let (duration, mp3_file) = match &upload {
            Some(upload) => (
                audio::extract_duration(upload.data.clone()).await?,
                audio::stored_file_name(&request.title, &upload.extension()),
            ),
            None => (existing.duration, existing.mp3_file.clone()),
        };

        let track = Track {
            id: existing.id.clone(),
            title: request.title,
            artist: request.artist,
            album: request.album,
            genre: request.genre,
            release_year: request.release_year,
            duration,
            mp3_file,
        };

        if !self.repo.update(&track).await? {
            return Err(ServiceError::NotFound(format!("track {} not found", id)));
        }
        self.cache.forget(id).await;

        if let Some(upload) = &upload {
            self.store.save(&track.id, &track.mp3_file, &upload.data).await?;
            if existing.mp3_file != track.mp3_file {
                if let Err(e) = self.store.remove(&track.id, &existing.mp3_file).await {
                    tracing::warn!("Failed to remove replaced audio for track {}: {:#}", id, e);
                }
            }
        }

        tracing::info!("Updated track {} '{}'", track.id, track.title);
        Ok(track)
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        if !self.repo.delete(id).await? {
            return Err(ServiceError::NotFound(format!("track {} not found", id)));
        }
        self.cache.forget(id).await;

        if let Err(e) = self.store.remove_all(id).await {
            tracing::warn!("Failed to remove audio for track {}: {:#}", id, e);
        }

        tracing::info!("Deleted track {}", id);
        Ok(())
    }

    /// The track and the path of its stored audio file.
    pub async fn open_audio(&self, id: &str) -> Result<(Track, PathBuf)> {
        let track = self.get(id).await?;
        let path = self.store.path(&track.id, &track.mp3_file);

        let exists = tokio::fs::try_exists(&path)
            .await
            .map_err(|e| ServiceError::Unavailable(format!("Failed to stat {}: {}", path.display(), e)))?;
        if !exists {
            return Err(ServiceError::NotFound(format!(
                "audio file for track {} not found",
                id
            )));
        }

        Ok((track, path))
    }
}

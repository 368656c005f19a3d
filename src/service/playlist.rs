use std::sync::Arc;

use super::RecordCache;
use crate::cache::Cache;
use crate::error::{Result, ServiceError};
use crate::model::{Playlist, PlaylistFilter, PlaylistRequest};
use crate::playlist::PlaylistRepository;

#[derive(Clone)]
pub struct PlaylistService {
    repo: Arc<dyn PlaylistRepository>,
    cache: RecordCache,
}

impl PlaylistService {
    pub fn new(repo: Arc<dyn PlaylistRepository>) -> Self {
        Self {
            repo,
            cache: RecordCache::disabled("playlist"),
        }
    }

    pub fn with_cache(mut self, cache: Arc<dyn Cache>) -> Self {
        self.cache.cache = Some(cache);
        self
    }

    pub async fn list(&self, filter: &PlaylistFilter) -> Result<Vec<Playlist>> {
        Ok(self.repo.find(filter).await?)
    }

    pub async fn get(&self, id: &str) -> Result<Playlist> {
        if let Some(playlist) = self.cache.get::<Playlist>(id).await {
            tracing::debug!("Cache hit for playlist {}", id);
            return Ok(playlist);
        }

        let playlist = self
            .repo
            .get(id)
            .await?
            .ok_or_else(|| not_found(id))?;
        self.cache.put(id, &playlist).await;
        Ok(playlist)
    }

    pub async fn create(&self, request: PlaylistRequest) -> Result<Playlist> {
        request.validate()?;

        let playlist = Playlist {
            id: uuid::Uuid::new_v4().to_string(),
            playback_mode: request.playback_mode()?,
            name: request.name,
            track_ids: request.track_ids.unwrap_or_default(),
        };
        self.repo.insert(&playlist).await?;

        tracing::info!(
            "Created playlist {} '{}' with {} tracks",
            playlist.id,
            playlist.name,
            playlist.track_ids.len()
        );
        Ok(playlist)
    }

    /// Replace every field of an existing playlist.
    pub async fn update(&self, id: &str, request: PlaylistRequest) -> Result<Playlist> {
        request.validate()?;

        let playlist = Playlist {
            id: id.to_string(),
            playback_mode: request.playback_mode()?,
            name: request.name,
            track_ids: request.track_ids.unwrap_or_default(),
        };
        if !self.repo.update(&playlist).await? {
            return Err(not_found(id));
        }
        self.cache.forget(id).await;

        tracing::info!("Updated playlist {} '{}'", playlist.id, playlist.name);
        Ok(playlist)
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        if !self.repo.delete(id).await? {
            return Err(not_found(id));
        }
        self.cache.forget(id).await;

        tracing::info!("Deleted playlist {}", id);
        Ok(())
    }
}

fn not_found(id: &str) -> ServiceError {
    ServiceError::NotFound(format!("playlist {} not found", id))
}

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use crate::db::{push_equality_filters, push_page};
use crate::model::{PlaybackMode, Playlist, PlaylistFilter, TrackRef};

/// Storage for playlists.
#[async_trait]
pub trait PlaylistRepository: Send + Sync {
    async fn find(&self, filter: &PlaylistFilter) -> Result<Vec<Playlist>>;

    async fn get(&self, id: &str) -> Result<Option<Playlist>>;

    async fn insert(&self, playlist: &Playlist) -> Result<()>;

    /// Replace every field except the id. Returns `false` when no playlist matched.
    async fn update(&self, playlist: &Playlist) -> Result<bool>;

    /// Returns `false` when no playlist matched.
    async fn delete(&self, id: &str) -> Result<bool>;
}

type PlaylistRow = (String, String, String);

/// Playlists in SQLite: one row per playlist plus its ordered track
/// references in `playlist_tracks`. Writes touching both tables run in a
/// single transaction.
#[derive(Clone)]
pub struct SqlitePlaylistRepository {
    pool: SqlitePool,
}

impl SqlitePlaylistRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Get the track references of a playlist in stored order
    async fn get_playlist_tracks(&self, playlist_id: &str) -> Result<Vec<TrackRef>> {
        let tracks = sqlx::query_as::<_, (String, i64)>(
            r#"
            SELECT track_id, priority
            FROM playlist_tracks
            WHERE playlist_id = ?
            ORDER BY position
            "#,
        )
        .bind(playlist_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch playlist tracks")?;

        Ok(tracks
            .into_iter()
            .map(|(track_id, priority)| TrackRef { track_id, priority })
            .collect())
    }

    async fn hydrate(&self, row: PlaylistRow) -> Result<Playlist> {
        let (id, name, mode) = row;
        let playback_mode = PlaybackMode::from_name(&mode)
            .ok_or_else(|| anyhow::anyhow!("Unknown playback mode '{}' on playlist {}", mode, id))?;
        let track_ids = self.get_playlist_tracks(&id).await?;
        Ok(Playlist {
            id,
            name,
            track_ids,
            playback_mode,
        })
    }
}

async fn insert_tracks(
    tx: &mut sqlx::Transaction<'_, Sqlite>,
    playlist_id: &str,
    tracks: &[TrackRef],
) -> Result<()> {
    for (position, track) in tracks.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO playlist_tracks (playlist_id, position, track_id, priority)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(playlist_id)
        .bind(position as i64)
        .bind(&track.track_id)
        .bind(track.priority)
        .execute(&mut **tx)
        .await
        .context("Failed to insert playlist track")?;
    }
    Ok(())
}

#[async_trait]
impl PlaylistRepository for SqlitePlaylistRepository {
    async fn find(&self, filter: &PlaylistFilter) -> Result<Vec<Playlist>> {
        let mut query = QueryBuilder::<Sqlite>::new("SELECT id, name, playback_mode FROM playlists");
        push_equality_filters(&mut query, &[("name", filter.name.as_deref())]);
        query.push(" ORDER BY rowid");
        push_page(&mut query, filter.page);

        let rows = query
            .build_query_as::<PlaylistRow>()
            .fetch_all(&self.pool)
            .await
            .context("Failed to fetch playlists")?;

        let mut playlists = Vec::with_capacity(rows.len());
        for row in rows {
            playlists.push(self.hydrate(row).await?);
        }
        Ok(playlists)
    }

    async fn get(&self, id: &str) -> Result<Option<Playlist>> {
        let row = sqlx::query_as::<_, PlaylistRow>(
            "SELECT id, name, playback_mode FROM playlists WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch playlist")?;

        match row {
            Some(row) => Ok(Some(self.hydrate(row).await?)),
            None => Ok(None),
        }
    }

    async fn insert(&self, playlist: &Playlist) -> Result<()> {
        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;

        sqlx::query("INSERT INTO playlists (id, name, playback_mode) VALUES (?, ?, ?)")
            .bind(&playlist.id)
            .bind(&playlist.name)
            .bind(playlist.playback_mode.as_str())
            .execute(&mut *tx)
            .await
            .context("Failed to insert playlist")?;

        insert_tracks(&mut tx, &playlist.id, &playlist.track_ids).await?;

        tx.commit().await.context("Failed to commit playlist")?;
        Ok(())
    }

    async fn update(&self, playlist: &Playlist) -> Result<bool> {
        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;

        let result = sqlx::query("UPDATE playlists SET name = ?, playback_mode = ? WHERE id = ?")
            .bind(&playlist.name)
            .bind(playlist.playback_mode.as_str())
            .bind(&playlist.id)
            .execute(&mut *tx)
            .await
            .context("Failed to update playlist")?;

        if result.rows_affected() == 0 {
            tx.rollback().await.context("Failed to roll back playlist update")?;
            return Ok(false);
        }

        sqlx::query("DELETE FROM playlist_tracks WHERE playlist_id = ?")
            .bind(&playlist.id)
            .execute(&mut *tx)
            .await
            .context("Failed to delete old playlist tracks")?;

        insert_tracks(&mut tx, &playlist.id, &playlist.track_ids).await?;

        tx.commit().await.context("Failed to commit playlist")?;
        Ok(true)
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;

        sqlx::query("DELETE FROM playlist_tracks WHERE playlist_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await
            .context("Failed to delete playlist tracks")?;

        let result = sqlx::query("DELETE FROM playlists WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await
            .context("Failed to delete playlist")?;

        tx.commit().await.context("Failed to commit playlist delete")?;
        Ok(result.rows_affected() > 0)
    }
}

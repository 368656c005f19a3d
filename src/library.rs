use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use crate::db::{push_equality_filters, push_page};
use crate::model::{Track, TrackFilter};

/// Storage for track records.
#[async_trait]
pub trait TrackRepository: Send + Sync {
    /// Tracks matching every set field of the filter, in insertion order.
    async fn find(&self, filter: &TrackFilter) -> Result<Vec<Track>>;

    async fn get(&self, id: &str) -> Result<Option<Track>>;

    async fn insert(&self, track: &Track) -> Result<()>;

    /// Replace every field except the id. Returns `false` when no record matched.
    async fn update(&self, track: &Track) -> Result<bool>;

    /// Returns `false` when no record matched.
    async fn delete(&self, id: &str) -> Result<bool>;
}

type TrackRow = (String, String, String, String, String, i32, f64, String);

const TRACK_COLUMNS: &str = "id, title, artist, album, genre, release_year, duration, mp3_file";

fn track_from_row(row: TrackRow) -> Track {
    let (id, title, artist, album, genre, release_year, duration, mp3_file) = row;
    Track {
        id,
        title,
        artist,
        album,
        genre,
        release_year,
        duration,
        mp3_file,
    }
}

#[derive(Clone)]
pub struct SqliteTrackRepository {
    pool: SqlitePool,
}

impl SqliteTrackRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TrackRepository for SqliteTrackRepository {
    async fn find(&self, filter: &TrackFilter) -> Result<Vec<Track>> {
        let mut query = QueryBuilder::<Sqlite>::new(format!("SELECT {} FROM tracks", TRACK_COLUMNS));
        push_equality_filters(
            &mut query,
            &[
                ("title", filter.title.as_deref()),
                ("artist", filter.artist.as_deref()),
                ("album", filter.album.as_deref()),
                ("genre", filter.genre.as_deref()),
            ],
        );
        query.push(" ORDER BY rowid");
        push_page(&mut query, filter.page);

        let rows = query
            .build_query_as::<TrackRow>()
            .fetch_all(&self.pool)
            .await
            .context("Failed to fetch tracks")?;

        Ok(rows.into_iter().map(track_from_row).collect())
    }

    async fn get(&self, id: &str) -> Result<Option<Track>> {
        let row = sqlx::query_as::<_, TrackRow>(&format!(
            "SELECT {} FROM tracks WHERE id = ?",
            TRACK_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch track")?;

        Ok(row.map(track_from_row))
    }

    async fn insert(&self, track: &Track) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO tracks (id, title, artist, album, genre, release_year, duration, mp3_file)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&track.id)
        .bind(&track.title)
        .bind(&track.artist)
        .bind(&track.album)
        .bind(&track.genre)
        .bind(track.release_year)
        .bind(track.duration)
        .bind(&track.mp3_file)
        .execute(&self.pool)
        .await
        .context("Failed to insert track")?;

        Ok(())
    }

    async fn update(&self, track: &Track) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE tracks
            SET title = ?, artist = ?, album = ?, genre = ?,
                release_year = ?, duration = ?, mp3_file = ?
            WHERE id = ?
            "#,
        )
        .bind(&track.title)
        .bind(&track.artist)
        .bind(&track.album)
        .bind(&track.genre)
        .bind(track.release_year)
        .bind(track.duration)
        .bind(&track.mp3_file)
        .bind(&track.id)
        .execute(&self.pool)
        .await
        .context("Failed to update track")?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM tracks WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to delete track")?;

        Ok(result.rows_affected() > 0)
    }
}

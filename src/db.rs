use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::{QueryBuilder, Sqlite};
use std::path::Path;
use std::str::FromStr;

use crate::model::Page;

/// Open (creating if missing) the SQLite database and make sure the schema exists.
pub async fn connect<P: AsRef<Path>>(db_path: P) -> Result<SqlitePool> {
    let db_path = db_path.as_ref();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
    }

    let connection_string = format!("sqlite:{}", db_path.display());
    tracing::debug!("Connecting to database: {}", connection_string);

    let options = SqliteConnectOptions::from_str(&connection_string)?
        .create_if_missing(true)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
        .with_context(|| format!("Failed to connect to database at: {}", db_path.display()))?;

    initialize(&pool).await?;

    tracing::info!("Database initialized: {}", db_path.display());
    Ok(pool)
}

async fn initialize(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS tracks (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            artist TEXT NOT NULL DEFAULT '',
            album TEXT NOT NULL DEFAULT '',
            genre TEXT NOT NULL DEFAULT '',
            release_year INTEGER NOT NULL DEFAULT 0,
            duration REAL NOT NULL DEFAULT 0,
            mp3_file TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await
    .context("Failed to create tracks table")?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS playlists (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            playback_mode TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await
    .context("Failed to create playlists table")?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS playlist_tracks (
            playlist_id TEXT NOT NULL,
            position INTEGER NOT NULL,
            track_id TEXT NOT NULL,
            priority INTEGER NOT NULL DEFAULT 0,
            PRIMARY KEY (playlist_id, position),
            FOREIGN KEY (playlist_id) REFERENCES playlists(id) ON DELETE CASCADE
        )
        "#,
    )
    .execute(pool)
    .await
    .context("Failed to create playlist_tracks table")?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_tracks_artist ON tracks(artist)")
        .execute(pool)
        .await
        .context("Failed to create index")?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_playlists_name ON playlists(name)")
        .execute(pool)
        .await
        .context("Failed to create index")?;

    Ok(())
}

/// Append `WHERE a = ? AND b = ?` for every predicate that has a value.
pub(crate) fn push_equality_filters<'a>(
    query: &mut QueryBuilder<'a, Sqlite>,
    predicates: &[(&str, Option<&str>)],
) {
    let mut first = true;
    for (column, value) in predicates {
        if let Some(value) = value {
            query.push(if first { " WHERE " } else { " AND " });
            query.push(*column).push(" = ").push_bind(value.to_string());
            first = false;
        }
    }
}

/// Append `LIMIT ? OFFSET ?` for bounded pages.
pub(crate) fn push_page<'a>(query: &mut QueryBuilder<'a, Sqlite>, page: Page) {
    if let Some((limit, offset)) = page.bounds() {
        query.push(" LIMIT ").push_bind(limit);
        query.push(" OFFSET ").push_bind(offset);
    }
}

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Uploaded audio files on disk, laid out as `<root>/<track-id>/<file-name>`.
#[derive(Debug, Clone)]
pub struct AudioStore {
    root: PathBuf,
}

impl AudioStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn track_dir(&self, track_id: &str) -> PathBuf {
        self.root.join(track_id)
    }

    pub fn path(&self, track_id: &str, file_name: &str) -> PathBuf {
        self.track_dir(track_id).join(file_name)
    }

    /// Write a track's audio file.
    ///
    /// Bytes go to a uniquely named temporary file in the track directory
    /// which is then renamed over the target, so readers and concurrent
    /// writers only ever see a complete file.
    pub async fn save(&self, track_id: &str, file_name: &str, data: &[u8]) -> Result<PathBuf> {
        let dir = self.track_dir(track_id);
        tokio::fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("Failed to create directory: {}", dir.display()))?;

        let target = dir.join(file_name);
        let tmp = dir.join(format!(".{}.part", uuid::Uuid::new_v4()));

        tokio::fs::write(&tmp, data)
            .await
            .with_context(|| format!("Failed to write audio file: {}", tmp.display()))?;

        if let Err(e) = tokio::fs::rename(&tmp, &target).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e)
                .with_context(|| format!("Failed to move audio file into place: {}", target.display()));
        }

        tracing::debug!("Stored {} bytes at {}", data.len(), target.display());
        Ok(target)
    }

    /// Remove one stored file. A file that is already gone is not an error.
    pub async fn remove(&self, track_id: &str, file_name: &str) -> Result<()> {
        let path = self.path(track_id, file_name);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("Failed to remove {}", path.display())),
        }
    }

    /// Remove a track's whole directory.
    pub async fn remove_all(&self, track_id: &str) -> Result<()> {
        let dir = self.track_dir(track_id);
        match tokio::fs::remove_dir_all(&dir).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("Failed to remove {}", dir.display())),
        }
    }
}

use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

/// Server configuration from command-line flags, falling back to
/// `MUSIC_API_*` environment variables.
#[derive(Parser, Debug, Clone)]
#[command(name = "music-api")]
#[command(about = "Music track and playlist API server", long_about = None)]
pub struct Config {
    /// Address to bind
    #[arg(long, env = "MUSIC_API_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, env = "MUSIC_API_PORT", default_value_t = 8000)]
    pub port: u16,

    /// SQLite database file, created on first start
    #[arg(long, env = "MUSIC_API_DATABASE", default_value = "data/music.db")]
    pub database: PathBuf,

    /// Directory uploaded audio is stored under
    #[arg(long, env = "MUSIC_API_AUDIO_DIR", default_value = "upload_file/audio")]
    pub audio_dir: PathBuf,

    /// Cache single-record reads in memory
    #[arg(long, env = "MUSIC_API_CACHE")]
    pub cache: bool,

    /// Seconds a cached record stays valid, at least 1
    #[arg(
        long,
        env = "MUSIC_API_CACHE_TTL_SECS",
        default_value_t = 10,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub cache_ttl_secs: u64,

    /// Largest accepted request body, in megabytes
    #[arg(long, env = "MUSIC_API_MAX_UPLOAD_MB", default_value_t = 50)]
    pub max_upload_mb: usize,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, env = "MUSIC_API_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Also append logs to this file
    #[arg(long, env = "MUSIC_API_LOG_FILE")]
    pub log_file: Option<PathBuf>,
}

impl Config {
    /// `host:port`, resolved when binding.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_mb.saturating_mul(1024 * 1024)
    }
}

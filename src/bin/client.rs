use anyhow::{Context, Result};
use clap::Parser;
use futures::StreamExt;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

use music_api::error::ErrorBody;
use music_api::model::{DeleteConfirmation, Playlist, PlaylistRequest, Track, TrackRef};

#[derive(Parser)]
#[command(name = "music-client")]
#[command(about = "Music API CLI Client", long_about = None)]
struct Cli {
    /// Server URL
    #[arg(short, long, default_value = "http://localhost:8000")]
    server: String,

    /// Command to execute
    #[command(subcommand)]
    command: Command,
}

#[derive(Parser)]
enum Command {
    /// Track commands
    #[command(subcommand)]
    Track(TrackCommand),
    /// Playlist commands
    #[command(subcommand)]
    Playlist(PlaylistCommand),
}

#[derive(clap::Args, Debug, Default)]
struct TrackFields {
    #[arg(long, default_value = "")]
    artist: String,
    #[arg(long, default_value = "")]
    album: String,
    #[arg(long, default_value = "")]
    genre: String,
    #[arg(long, default_value_t = 0)]
    year: i32,
}

#[derive(Parser)]
enum TrackCommand {
    /// List tracks, optionally filtered
    List {
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        artist: Option<String>,
        #[arg(long)]
        album: Option<String>,
        #[arg(long)]
        genre: Option<String>,
        #[arg(long)]
        limit: Option<i64>,
        #[arg(long)]
        offset: Option<i64>,
    },
    /// Show track details
    Info { id: String },
    /// Upload a new track
    Upload {
        /// Audio file to upload
        file: PathBuf,
        #[arg(short, long)]
        title: String,
        #[command(flatten)]
        fields: TrackFields,
    },
    /// Replace a track's metadata, and optionally its audio
    Update {
        id: String,
        #[arg(short, long)]
        title: String,
        /// New audio file
        #[arg(short, long)]
        file: Option<PathBuf>,
        #[command(flatten)]
        fields: TrackFields,
    },
    /// Delete a track
    Delete { id: String },
    /// Download a track's audio
    Download {
        id: String,
        /// Output path, defaults to the stored filename
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Parser)]
enum PlaylistCommand {
    /// List playlists
    List {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        limit: Option<i64>,
        #[arg(long)]
        offset: Option<i64>,
    },
    /// Show playlist details
    Info {
        /// Playlist ID
        id: String,
    },
    /// Create a new playlist
    Create {
        /// Playlist name
        name: String,
        /// Track as `<id>` or `<id>:<priority>`, repeatable
        #[arg(short, long = "track")]
        tracks: Vec<String>,
        /// priority or random
        #[arg(short, long)]
        mode: Option<String>,
    },
    /// Replace a playlist
    Update {
        /// Playlist ID
        id: String,
        #[arg(short, long)]
        name: String,
        #[arg(short, long = "track")]
        tracks: Vec<String>,
        #[arg(short, long)]
        mode: Option<String>,
    },
    /// Delete a playlist
    Delete {
        /// Playlist ID
        id: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let client = Client::new(cli.server);

    match cli.command {
        Command::Track(cmd) => handle_track_command(&client, cmd).await,
        Command::Playlist(cmd) => handle_playlist_command(&client, cmd).await,
    }
}

struct Client {
    http: reqwest::Client,
    server: String,
}

impl Client {
    fn new(server: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            server: server.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v1/{}", self.server, path)
    }
}

/// Turn an error envelope into an error, pass successes through.
async fn check(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    match serde_json::from_str::<ErrorBody>(&text) {
        Ok(body) => anyhow::bail!("{}: {}", body.code, body.message),
        Err(_) => anyhow::bail!("Server returned error: {} {}", status, text),
    }
}

async fn send_json<T: serde::de::DeserializeOwned>(request: reqwest::RequestBuilder) -> Result<T> {
    let response = request.send().await.context("Failed to connect to server")?;
    check(response)
        .await?
        .json()
        .await
        .context("Failed to parse response")
}

/// Parse `<id>` or `<id>:<priority>`.
fn parse_track_ref(value: &str) -> Result<TrackRef> {
    let (track_id, priority) = match value.rsplit_once(':') {
        Some((id, priority)) => (
            id,
            priority
                .parse()
                .with_context(|| format!("Invalid priority in '{}'", value))?,
        ),
        None => (value, 0),
    };
    if track_id.is_empty() {
        anyhow::bail!("Missing track id in '{}'", value);
    }
    Ok(TrackRef {
        track_id: track_id.to_string(),
        priority,
    })
}

fn paging(limit: Option<i64>, offset: Option<i64>) -> Vec<(&'static str, String)> {
    let mut query = Vec::new();
    if let Some(limit) = limit {
        query.push(("limit", limit.to_string()));
    }
    if let Some(offset) = offset {
        query.push(("offset", offset.to_string()));
    }
    query
}

fn format_duration(seconds: f64) -> String {
    let total = seconds.round() as u64;
    format!("{:02}:{:02}", total / 60, total % 60)
}

fn print_track(track: &Track) {
    println!("Title:    {}", track.title);
    println!("Artist:   {}", track.artist);
    println!("Album:    {}", track.album);
    println!("Genre:    {}", track.genre);
    println!("Year:     {}", track.release_year);
    println!("Duration: {} ({:.2}s)", format_duration(track.duration), track.duration);
    println!("File:     {}", track.mp3_file);
    println!("ID:       {}", track.id);
}

fn print_playlist(playlist: &Playlist) {
    println!("Playlist: {}", playlist.name);
    println!("ID:       {}", playlist.id);
    println!("Mode:     {}", playlist.playback_mode.as_str());
    println!("Tracks:   {}", playlist.track_ids.len());
    for (idx, track) in playlist.track_ids.iter().enumerate() {
        println!("  {}. {} (priority {})", idx + 1, track.track_id, track.priority);
    }
}

async fn track_form(
    title: String,
    fields: TrackFields,
    file: Option<&Path>,
) -> Result<reqwest::multipart::Form> {
    let mut form = reqwest::multipart::Form::new()
        .text("title", title)
        .text("artist", fields.artist)
        .text("album", fields.album)
        .text("genre", fields.genre)
        .text("release_year", fields.year.to_string());

    if let Some(path) = file {
        let data = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "audio.mp3".to_string());
        let mime = if file_name.to_ascii_lowercase().ends_with(".wav") {
            "audio/wav"
        } else {
            "audio/mpeg"
        };
        let part = reqwest::multipart::Part::bytes(data)
            .file_name(file_name)
            .mime_str(mime)?;
        form = form.part("mp3_file", part);
    }

    Ok(form)
}

async fn handle_track_command(client: &Client, cmd: TrackCommand) -> Result<()> {
    match cmd {
        TrackCommand::List {
            title,
            artist,
            album,
            genre,
            limit,
            offset,
        } => {
            let mut query = paging(limit, offset);
            for (key, value) in [("title", title), ("artist", artist), ("album", album), ("genre", genre)] {
                if let Some(value) = value {
                    query.push((key, value));
                }
            }

            let tracks: Vec<Track> =
                send_json(client.http.get(client.url("track")).query(&query)).await?;

            if tracks.is_empty() {
                println!("No tracks found.");
                return Ok(());
            }

            println!("Tracks ({}):", tracks.len());
            println!("{:-<80}", "");
            for (idx, track) in tracks.iter().enumerate() {
                println!("{}. {} - {}", idx + 1, track.artist, track.title);
                println!("   Album: {}", track.album);
                println!("   Duration: {}", format_duration(track.duration));
                println!("   ID: {}", track.id);
                println!();
            }
        }
        TrackCommand::Info { id } => {
            let track: Track = send_json(client.http.get(client.url(&format!("track/{}", id)))).await?;
            println!("Track Information:");
            println!("{:-<80}", "");
            print_track(&track);
        }
        TrackCommand::Upload {
            file,
            title,
            fields,
        } => {
            let form = track_form(title, fields, Some(&file)).await?;
            let track: Track =
                send_json(client.http.post(client.url("track")).multipart(form)).await?;
            println!("✓ Uploaded track");
            print_track(&track);
        }
        TrackCommand::Update {
            id,
            title,
            file,
            fields,
        } => {
            let form = track_form(title, fields, file.as_deref()).await?;
            let track: Track = send_json(
                client
                    .http
                    .put(client.url(&format!("track/{}", id)))
                    .multipart(form),
            )
            .await?;
            println!("✓ Updated track");
            print_track(&track);
        }
        TrackCommand::Delete { id } => {
            let deleted: DeleteConfirmation =
                send_json(client.http.delete(client.url(&format!("track/{}", id)))).await?;
            println!("✓ {}: {}", deleted.message, deleted.id);
        }
        TrackCommand::Download { id, output } => {
            download_track(client, &id, output).await?;
        }
    }

    Ok(())
}

async fn download_track(client: &Client, id: &str, output: Option<PathBuf>) -> Result<()> {
    let output = match output {
        Some(path) => path,
        None => {
            let track: Track =
                send_json(client.http.get(client.url(&format!("track/{}", id)))).await?;
            PathBuf::from(track.mp3_file)
        }
    };

    let response = client
        .http
        .get(client.url(&format!("track/{}/download", id)))
        .send()
        .await
        .context("Failed to connect to server")?;
    let response = check(response).await?;

    let mut file = tokio::fs::File::create(&output)
        .await
        .with_context(|| format!("Failed to create {}", output.display()))?;

    let mut written = 0usize;
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.context("Failed to download audio data")?;
        file.write_all(&chunk)
            .await
            .with_context(|| format!("Failed to write {}", output.display()))?;
        written += chunk.len();
    }
    file.flush().await?;

    println!("✓ Saved {} bytes to {}", written, output.display());
    Ok(())
}

async fn handle_playlist_command(client: &Client, cmd: PlaylistCommand) -> Result<()> {
    match cmd {
        PlaylistCommand::List {
            name,
            limit,
            offset,
        } => {
            let mut query = paging(limit, offset);
            if let Some(name) = name {
                query.push(("name", name));
            }

            let playlists: Vec<Playlist> =
                send_json(client.http.get(client.url("playlist")).query(&query)).await?;

            if playlists.is_empty() {
                println!("No playlists found.");
                return Ok(());
            }

            println!("Playlists ({}):", playlists.len());
            println!("{:-<80}", "");
            for playlist in &playlists {
                println!(
                    "{} - {} ({} tracks, {})",
                    playlist.id,
                    playlist.name,
                    playlist.track_ids.len(),
                    playlist.playback_mode.as_str()
                );
            }
        }
        PlaylistCommand::Info { id } => {
            let playlist: Playlist =
                send_json(client.http.get(client.url(&format!("playlist/{}", id)))).await?;
            print_playlist(&playlist);
        }
        PlaylistCommand::Create { name, tracks, mode } => {
            let request = PlaylistRequest {
                name,
                track_ids: Some(tracks.iter().map(|t| parse_track_ref(t)).collect::<Result<_>>()?),
                playback_mode: mode,
            };
            let playlist: Playlist =
                send_json(client.http.post(client.url("playlist")).json(&request)).await?;
            println!("✓ Created playlist");
            print_playlist(&playlist);
        }
        PlaylistCommand::Update {
            id,
            name,
            tracks,
            mode,
        } => {
            let request = PlaylistRequest {
                name,
                track_ids: Some(tracks.iter().map(|t| parse_track_ref(t)).collect::<Result<_>>()?),
                playback_mode: mode,
            };
            let playlist: Playlist = send_json(
                client
                    .http
                    .put(client.url(&format!("playlist/{}", id)))
                    .json(&request),
            )
            .await?;
            println!("✓ Updated playlist");
            print_playlist(&playlist);
        }
        PlaylistCommand::Delete { id } => {
            let deleted: DeleteConfirmation =
                send_json(client.http.delete(client.url(&format!("playlist/{}", id)))).await?;
            println!("✓ {}: {}", deleted.message, deleted.id);
        }
    }

    Ok(())
}

use std::io::Cursor;

use symphonia::core::codecs::{CODEC_TYPE_MP1, CODEC_TYPE_MP2, CODEC_TYPE_MP3};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::core::units::TimeBase;
use thiserror::Error;

/// Content types accepted for uploaded audio.
pub const ALLOWED_CONTENT_TYPES: [&str; 3] = ["audio/mp3", "audio/mpeg", "audio/wav"];

#[derive(Error, Debug)]
pub enum AudioError {
    #[error("Failed to probe audio stream: {0}")]
    Probe(#[source] SymphoniaError),

    #[error("Stream does not contain MPEG audio")]
    NotMpeg,

    #[error("Unknown sample rate")]
    UnknownTimeBase,

    #[error("Failed to read audio frame: {0}")]
    Frame(#[source] SymphoniaError),

    #[error("Duration task failed: {0}")]
    Task(String),
}

/// Whether an upload's declared content type is on the allow-list.
/// Parameters after `;` are ignored.
pub fn is_allowed_content_type(content_type: &str) -> bool {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    ALLOWED_CONTENT_TYPES.contains(&essence.as_str())
}

/// Extension of an uploaded file: the text after the last `.` of its name.
/// Names without a usable extension fall back to the one implied by the
/// content type.
pub fn file_extension(file_name: &str, content_type: &str) -> String {
    let ext = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext)
        .unwrap_or_default();

    if !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return ext.to_string();
    }

    if content_type.contains("wav") {
        "wav".to_string()
    } else {
        "mp3".to_string()
    }
}

/// Stored filename for a track, `<title>.<ext>`. Path separators and NUL are
/// replaced so the name always stays inside the track directory.
pub fn stored_file_name(title: &str, ext: &str) -> String {
    let safe_title: String = title
        .chars()
        .map(|c| match c {
            '/' | '\\' | '\0' => '_',
            c => c,
        })
        .collect();
    format!("{}.{}", safe_title, ext)
}

/// Guess a content type from the first bytes of a stored file.
pub fn sniff_content_type(head: &[u8]) -> &'static str {
    if head.starts_with(b"ID3") {
        "audio/mpeg"
    } else if head.len() >= 2 && head[0] == 0xFF && head[1] & 0xE0 == 0xE0 {
        "audio/mpeg"
    } else if head.len() >= 12 && &head[0..4] == b"RIFF" && &head[8..12] == b"WAVE" {
        "audio/wave"
    } else if head.starts_with(b"OggS") {
        "application/ogg"
    } else if head.starts_with(b"fLaC") {
        "audio/flac"
    } else {
        "application/octet-stream"
    }
}

/// Total playback time in seconds of an MPEG audio stream.
///
/// Frames are read one by one and each frame's duration (samples per frame
/// over sample rate) is added to the total. Running out of data ends the
/// stream; any other error discards the partial sum.
pub fn mp3_duration<T>(data: T) -> Result<f64, AudioError>
where
    T: AsRef<[u8]> + Send + Sync + 'static,
{
    let mss = MediaSourceStream::new(Box::new(Cursor::new(data)), Default::default());

    let mut hint = Hint::new();
    hint.with_extension("mp3").mime_type("audio/mpeg");

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(AudioError::Probe)?;

    let mut reader = probed.format;

    let mpeg_codecs = [CODEC_TYPE_MP1, CODEC_TYPE_MP2, CODEC_TYPE_MP3];
    let track = reader
        .tracks()
        .iter()
        .find(|t| mpeg_codecs.contains(&t.codec_params.codec))
        .ok_or(AudioError::NotMpeg)?;

    let track_id = track.id;
    let time_base = track
        .codec_params
        .time_base
        .or_else(|| track.codec_params.sample_rate.map(|rate| TimeBase::new(1, rate)))
        .ok_or(AudioError::UnknownTimeBase)?;

    let mut seconds = 0.0f64;
    let mut frames = 0u64;
    loop {
        let packet = match reader.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break;
            }
            Err(e) => return Err(AudioError::Frame(e)),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let time = time_base.calc_time(packet.dur());
        seconds += time.seconds as f64 + time.frac;
        frames += 1;
    }

    tracing::debug!("Read {} MPEG frames, duration {:.3}s", frames, seconds);
    Ok(seconds)
}

/// [`mp3_duration`] on the blocking thread pool.
pub async fn extract_duration<T>(data: T) -> Result<f64, AudioError>
where
    T: AsRef<[u8]> + Send + Sync + 'static,
{
    tokio::task::spawn_blocking(move || mp3_duration(data))
        .await
        .map_err(|e| AudioError::Task(e.to_string()))?
}

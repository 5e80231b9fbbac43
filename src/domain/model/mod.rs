// Domain models - Clip requests, results, engine state and runtime assets

use std::fmt;
use std::path::PathBuf;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::error::ClipError;

/// Media type of every produced clip (MP4 container, H.264 video, AAC audio)
pub const MP4_MIME_TYPE: &str = "video/mp4";

/// Time specification in seconds with fractional precision
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct TimeSpec {
    pub seconds: f64,
}

impl TimeSpec {
    /// Create a new TimeSpec from seconds
    pub fn from_seconds(seconds: f64) -> Self {
        Self { seconds }
    }

    /// Create a new TimeSpec from hours, minutes, seconds, milliseconds
    pub fn from_components(hours: u32, minutes: u32, seconds: u32, milliseconds: u32) -> Self {
        let total_seconds = hours as f64 * 3600.0
            + minutes as f64 * 60.0
            + seconds as f64
            + milliseconds as f64 / 1000.0;
        Self {
            seconds: total_seconds,
        }
    }

    pub fn as_seconds(&self) -> f64 {
        self.seconds
    }

    /// Parse `seconds`, `MM:SS.ms` or `HH:MM:SS.ms`
    pub fn parse(time_str: &str) -> Result<Self, DomainError> {
        let trimmed = time_str.trim();

        if let Ok(seconds) = trimmed.parse::<f64>() {
            if !seconds.is_finite() {
                return Err(DomainError::BadArgs("Time must be a finite number".to_string()));
            }
            if seconds < 0.0 {
                return Err(DomainError::BadArgs("Time cannot be negative".to_string()));
            }
            return Ok(Self::from_seconds(seconds));
        }

        let parts: Vec<&str> = trimmed.split(':').collect();
        match parts.as_slice() {
            [minutes, seconds] => {
                let minutes = parse_component(minutes, "minutes")?;
                let seconds = parse_seconds_component(seconds)?;
                Ok(Self::from_seconds(minutes as f64 * 60.0 + seconds))
            }
            [hours, minutes, seconds] => {
                let hours = parse_component(hours, "hours")?;
                let minutes = parse_component(minutes, "minutes")?;
                if minutes >= 60 {
                    return Err(DomainError::BadArgs("Minutes must be less than 60".to_string()));
                }
                let seconds = parse_seconds_component(seconds)?;
                Ok(Self::from_seconds(
                    hours as f64 * 3600.0 + minutes as f64 * 60.0 + seconds,
                ))
            }
            _ => Err(DomainError::BadArgs(
                "Invalid time format. Supported formats: seconds (e.g., 123.45), MM:SS.ms (e.g., 2:30.5), HH:MM:SS.ms (e.g., 1:02:30.5)".to_string(),
            )),
        }
    }

    /// Format as HH:MM:SS.mmm, or MM:SS.mmm below one hour
    pub fn format_hms(&self) -> String {
        let total_ms = (self.seconds * 1000.0).round() as u64;
        let hours = total_ms / 3_600_000;
        let minutes = (total_ms % 3_600_000) / 60_000;
        let seconds = (total_ms % 60_000) / 1000;
        let milliseconds = total_ms % 1000;

        if hours > 0 {
            format!("{:02}:{:02}:{:02}.{:03}", hours, minutes, seconds, milliseconds)
        } else {
            format!("{:02}:{:02}.{:03}", minutes, seconds, milliseconds)
        }
    }

    /// Filename-safe compact form, e.g. `01m30s500ms`
    pub fn format_compact(&self) -> String {
        let total_ms = (self.seconds * 1000.0).round() as u64;
        let hours = total_ms / 3_600_000;
        let minutes = (total_ms % 3_600_000) / 60_000;
        let seconds = (total_ms % 60_000) / 1000;
        let ms = total_ms % 1000;

        if hours > 0 {
            format!("{:02}h{:02}m{:02}s{:03}ms", hours, minutes, seconds, ms)
        } else if minutes > 0 {
            format!("{:02}m{:02}s{:03}ms", minutes, seconds, ms)
        } else {
            format!("{:02}s{:03}ms", seconds, ms)
        }
    }
}

fn parse_component(value: &str, name: &str) -> Result<u32, DomainError> {
    value
        .trim()
        .parse::<u32>()
        .map_err(|_| DomainError::BadArgs(format!("Invalid {} format", name)))
}

fn parse_seconds_component(value: &str) -> Result<f64, DomainError> {
    let seconds = value
        .trim()
        .parse::<f64>()
        .map_err(|_| DomainError::BadArgs("Invalid seconds format".to_string()))?;
    if !(0.0..60.0).contains(&seconds) {
        return Err(DomainError::BadArgs("Seconds must be less than 60".to_string()));
    }
    Ok(seconds)
}

impl fmt::Display for TimeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_hms())
    }
}

/// Lifecycle state of a clip extraction engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EngineState {
    /// Never loaded, or the last load attempt failed
    Unloaded,
    /// A load is in flight
    Loading,
    /// Runtime ready for cuts
    Loaded,
    /// Was loaded, then torn down
    Terminated,
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EngineState::Unloaded => "unloaded",
            EngineState::Loading => "loading",
            EngineState::Loaded => "loaded",
            EngineState::Terminated => "terminated",
        };
        f.write_str(name)
    }
}

/// An immutable request to cut `[start, end)` out of a source recording
#[derive(Debug, Clone)]
pub struct ClipRequest {
    source: Bytes,
    start: f64,
    end: f64,
}

impl ClipRequest {
    /// Create a clip request, rejecting degenerate ranges
    pub fn new(source: impl Into<Bytes>, start: f64, end: f64) -> Result<Self, ClipError> {
        Self::validate_range(start, end)?;
        // -0.0 + 0.0 == +0.0
        Ok(Self {
            source: source.into(),
            start: start + 0.0,
            end,
        })
    }

    /// Both bounds finite, `start >= 0` and `end > start`
    pub fn validate_range(start: f64, end: f64) -> Result<(), ClipError> {
        let valid = start.is_finite() && end.is_finite() && start >= 0.0 && end > start;
        if valid {
            Ok(())
        } else {
            Err(ClipError::InvalidRange { start, end })
        }
    }

    pub fn source(&self) -> &Bytes {
        &self.source
    }

    pub fn start(&self) -> f64 {
        self.start
    }

    pub fn end(&self) -> f64 {
        self.end
    }

    /// Length of the requested clip in seconds, always positive
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// Encoded clip bytes, always tagged `video/mp4`
#[derive(Debug, Clone, PartialEq)]
pub struct ClipResult {
    data: Bytes,
}

impl ClipResult {
    pub(crate) fn new(data: impl Into<Bytes>) -> Self {
        Self { data: data.into() }
    }

    pub fn mime_type(&self) -> &'static str {
        MP4_MIME_TYPE
    }

    pub fn bytes(&self) -> &Bytes {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn into_bytes(self) -> Bytes {
        self.data
    }
}

/// Names of the two virtual files staged for one cut
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VirtualFileNames {
    pub input: String,
    pub output: String,
}

impl VirtualFileNames {
    /// Fresh per-call names so concurrent cuts never collide
    pub fn unique(input_extension: &str) -> Self {
        let id = Uuid::new_v4().simple().to_string();
        let extension = input_extension.trim_start_matches('.');
        Self {
            input: format!("input-{}.{}", id, extension),
            output: format!("output-{}.mp4", id),
        }
    }
}

/// A virtual file name must be a bare, non-empty name
pub fn is_valid_virtual_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains('/')
        && !name.contains('\\')
        && !name.contains('\0')
}

/// Encoder settings for the produced clip
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscodeProfile {
    pub video_codec: String,
    /// x264 speed preset
    pub preset: String,
    /// Constant rate factor (0-51, lower is higher quality)
    pub crf: u8,
    pub audio_codec: String,
    pub audio_bitrate: String,
    /// Move the moov atom to the front for progressive playback
    pub faststart: bool,
}

impl Default for TranscodeProfile {
    fn default() -> Self {
        Self {
            video_codec: "libx264".to_string(),
            preset: "ultrafast".to_string(),
            crf: 23,
            audio_codec: "aac".to_string(),
            audio_bitrate: "128k".to_string(),
            faststart: true,
        }
    }
}

/// Pinned location of the media runtime distribution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeAssets {
    /// Transcoder binary, a bare name is resolved through PATH
    pub runtime_binary: PathBuf,
    /// Prober binary used by inspect/verify
    pub probe_binary: PathBuf,
    /// Version prefix the runtime must report, e.g. "6.1"
    pub expected_version: Option<String>,
    /// Encoder threads; `None` picks from the CPU count
    pub threads: Option<usize>,
}

impl Default for RuntimeAssets {
    fn default() -> Self {
        Self {
            runtime_binary: PathBuf::from("ffmpeg"),
            probe_binary: PathBuf::from("ffprobe"),
            expected_version: None,
            threads: None,
        }
    }
}

/// Summary of a probed media file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaSummary {
    pub path: String,
    pub format: String,
    pub duration: TimeSpec,
    pub file_size: u64,
    pub video_codec: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub audio_codec: Option<String>,
}

impl MediaSummary {
    pub fn has_video(&self) -> bool {
        self.video_codec.is_some()
    }

    pub fn has_audio(&self) -> bool {
        self.audio_codec.is_some()
    }
}

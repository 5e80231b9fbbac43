//! FFprobe adapter for media file probing
//!
//! Runs `ffprobe` with JSON output and maps the result onto [`MediaSummary`].

use std::io::ErrorKind;
use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;
use tracing::debug;

use crate::domain::errors::DomainError;
use crate::domain::model::{MediaSummary, TimeSpec};
use crate::ports::ProbePort;

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    format: Option<ProbeFormat>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
    codec_name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    format_name: Option<String>,
    duration: Option<String>,
    size: Option<String>,
}

/// Build a summary from ffprobe's `-print_format json` output
pub fn summary_from_json(path: &str, json: &str) -> Result<MediaSummary, DomainError> {
    let output: ProbeOutput = serde_json::from_str(json)
        .map_err(|e| DomainError::ProbeFail(format!("Unreadable ffprobe output: {}", e)))?;

    let format = output
        .format
        .ok_or_else(|| DomainError::ProbeFail(format!("No container information for {}", path)))?;

    let duration = format
        .duration
        .as_deref()
        .and_then(|d| d.parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d >= 0.0)
        .unwrap_or(0.0);

    let video = output
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"));
    let audio = output
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("audio"));

    Ok(MediaSummary {
        path: path.to_string(),
        format: format.format_name.unwrap_or_default(),
        duration: TimeSpec::from_seconds(duration),
        file_size: format
            .size
            .as_deref()
            .and_then(|s| s.parse().ok())
            .unwrap_or(0),
        video_codec: video.and_then(|s| s.codec_name.clone()),
        width: video.and_then(|s| s.width),
        height: video.and_then(|s| s.height),
        audio_codec: audio.and_then(|s| s.codec_name.clone()),
    })
}

/// FFprobe-based probe adapter
pub struct FFprobeAdapter {
    binary: PathBuf,
}

impl FFprobeAdapter {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

#[async_trait]
impl ProbePort for FFprobeAdapter {
    async fn probe_media(&self, file_path: &str) -> Result<MediaSummary, DomainError> {
        if !std::path::Path::new(file_path).exists() {
            return Err(DomainError::FileNotFound(file_path.to_string()));
        }

        debug!(file = file_path, "Probing media with ffprobe");
        let output = Command::new(&self.binary)
            .args([
                "-v",
                "error",
                "-print_format",
                "json",
                "-show_format",
                "-show_streams",
            ])
            .arg(file_path)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => DomainError::ProbeFail(format!(
                    "Probe tool not found: {}",
                    self.binary.display()
                )),
                _ => DomainError::ProbeFail(format!("Failed to run ffprobe: {}", e)),
            })?;

        if !output.status.success() {
            return Err(DomainError::ProbeFail(format!(
                "ffprobe rejected {}: {}",
                file_path,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        summary_from_json(file_path, &String::from_utf8_lossy(&output.stdout))
    }
}

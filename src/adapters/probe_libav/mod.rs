// Probe LibAV adapter - Media file analysis through the linked libav libraries

use std::path::Path;

use async_trait::async_trait;
use ffmpeg_next as ffmpeg;

use crate::domain::errors::DomainError;
use crate::domain::model::{MediaSummary, TimeSpec};
use crate::ports::ProbePort;

/// LibAV-based media probing adapter
#[derive(Debug, Default)]
pub struct ProbeLibavAdapter;

impl ProbeLibavAdapter {
    pub fn new() -> Result<Self, DomainError> {
        ffmpeg::init().map_err(|e| DomainError::ProbeFail(format!("Failed to initialize libav: {}", e)))?;
        Ok(Self)
    }

    fn probe_blocking(file_path: &str) -> Result<MediaSummary, DomainError> {
        let ictx = ffmpeg::format::input(&file_path)
            .map_err(|e| DomainError::ProbeFail(format!("Failed to open {}: {}", file_path, e)))?;

        let file_size = std::fs::metadata(file_path)
            .map_err(|e| DomainError::FsFail(format!("Failed to get file metadata: {}", e)))?
            .len();

        let duration = if ictx.duration() > 0 {
            ictx.duration() as f64 / ffmpeg::ffi::AV_TIME_BASE as f64
        } else {
            0.0
        };

        let mut summary = MediaSummary {
            path: file_path.to_string(),
            format: ictx.format().name().to_string(),
            duration: TimeSpec::from_seconds(duration),
            file_size,
            video_codec: None,
            width: None,
            height: None,
            audio_codec: None,
        };

        if let Some(stream) = ictx.streams().best(ffmpeg::media::Type::Video) {
            summary.video_codec = Some(stream.parameters().id().name().to_string());
            let video = ffmpeg::codec::context::Context::from_parameters(stream.parameters())
                .and_then(|ctx| ctx.decoder().video());
            if let Ok(video) = video {
                summary.width = Some(video.width());
                summary.height = Some(video.height());
            }
        }

        if let Some(stream) = ictx.streams().best(ffmpeg::media::Type::Audio) {
            summary.audio_codec = Some(stream.parameters().id().name().to_string());
        }

        Ok(summary)
    }
}

#[async_trait]
impl ProbePort for ProbeLibavAdapter {
    async fn probe_media(&self, file_path: &str) -> Result<MediaSummary, DomainError> {
        if !Path::new(file_path).exists() {
            return Err(DomainError::FileNotFound(file_path.to_string()));
        }

        let path = file_path.to_string();
        tokio::task::spawn_blocking(move || Self::probe_blocking(&path))
            .await
            .map_err(|e| DomainError::ProbeFail(format!("Probe task failed: {}", e)))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_file() {
        let probe = ProbeLibavAdapter::new().unwrap();
        let result = probe.probe_media("/no/such/recording.webm").await;
        assert!(matches!(result, Err(DomainError::FileNotFound(_))));
    }
}

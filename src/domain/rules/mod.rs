// Domain rules - Transcode command construction and clip acceptance policy

use crate::domain::errors::DomainError;
use crate::domain::model::*;

/// Highest CRF accepted by x264
pub const MAX_CRF: u8 = 51;

/// Default tolerance between requested and produced clip duration
pub const DEFAULT_DURATION_TOLERANCE: f64 = 0.2;

/// Encoder threads when none are configured: 75% of the cores, between 1 and 16
pub fn default_thread_count() -> usize {
    let optimal = (num_cpus::get() as f64 * 0.75).ceil() as usize;
    optimal.clamp(1, 16)
}

/// Render seconds as a decimal string without losing sub-second precision
pub fn format_seconds(seconds: f64) -> String {
    // f64 Display never switches to exponent notation; adding zero drops the sign of -0.0
    format!("{}", seconds + 0.0)
}

/// Builder for the runtime argument list of a single cut
#[derive(Debug, Clone)]
pub struct TranscodeCommand {
    input: String,
    output: String,
    start: f64,
    duration: f64,
    profile: TranscodeProfile,
    threads: Option<usize>,
}

impl TranscodeCommand {
    /// Command that cuts `request` from `files.input` into `files.output`
    pub fn for_clip(request: &ClipRequest, files: &VirtualFileNames, profile: &TranscodeProfile) -> Self {
        Self {
            input: files.input.clone(),
            output: files.output.clone(),
            start: request.start(),
            duration: request.duration(),
            profile: profile.clone(),
            threads: None,
        }
    }

    /// Limit encoder threads
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = Some(threads.max(1));
        self
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    /// Build the argument list (without the program name)
    pub fn build_args(&self) -> Vec<String> {
        let mut args = vec![
            "-i".to_string(),
            self.input.clone(),
            "-ss".to_string(),
            format_seconds(self.start),
            "-t".to_string(),
            format_seconds(self.duration),
            "-c:v".to_string(),
            self.profile.video_codec.clone(),
            "-preset".to_string(),
            self.profile.preset.clone(),
            "-crf".to_string(),
            self.profile.crf.to_string(),
            "-c:a".to_string(),
            self.profile.audio_codec.clone(),
            "-b:a".to_string(),
            self.profile.audio_bitrate.clone(),
        ];

        if let Some(threads) = self.threads {
            args.push("-threads".to_string());
            args.push(threads.to_string());
        }

        if self.profile.faststart {
            args.push("-movflags".to_string());
            args.push("+faststart".to_string());
        }

        args.push(self.output.clone());
        args
    }
}

/// Validate encoder settings before they reach the runtime
pub fn validate_profile(profile: &TranscodeProfile) -> Result<(), DomainError> {
    if profile.crf > MAX_CRF {
        return Err(DomainError::InvalidConfig(format!(
            "CRF value cannot exceed {}, got {}",
            MAX_CRF, profile.crf
        )));
    }
    if profile.preset.trim().is_empty() {
        return Err(DomainError::InvalidConfig("Encoding preset cannot be empty".to_string()));
    }
    if profile.video_codec.trim().is_empty() || profile.audio_codec.trim().is_empty() {
        return Err(DomainError::InvalidConfig("Codecs cannot be empty".to_string()));
    }
    Ok(())
}

/// Outcome of checking a produced clip against its request
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ClipCheck {
    pub name: String,
    pub passed: bool,
    pub details: String,
}

/// Acceptance checks for a produced clip
pub struct ClipAcceptance;

impl ClipAcceptance {
    /// Check duration, codecs and container of `summary` against the requested range
    pub fn evaluate(summary: &MediaSummary, expected_duration: f64, tolerance: f64) -> Vec<ClipCheck> {
        let actual = summary.duration.seconds;
        let delta = (actual - expected_duration).abs();

        let mut checks = vec![ClipCheck {
            name: "duration".to_string(),
            passed: delta <= tolerance,
            details: format!(
                "expected {:.3}s, got {:.3}s (tolerance {:.3}s)",
                expected_duration, actual, tolerance
            ),
        }];

        checks.push(ClipCheck {
            name: "container".to_string(),
            passed: summary.format.split(',').any(|f| f.trim() == "mp4"),
            details: format!("format {}", summary.format),
        });

        checks.push(ClipCheck {
            name: "video_codec".to_string(),
            passed: summary.video_codec.as_deref() == Some("h264"),
            details: format!("video codec {:?}", summary.video_codec),
        });

        // Recordings without a microphone track legitimately produce silent clips
        if let Some(audio) = summary.audio_codec.as_deref() {
            checks.push(ClipCheck {
                name: "audio_codec".to_string(),
                passed: audio == "aac",
                details: format!("audio codec {}", audio),
            });
        }

        checks
    }
}

#[cfg(test)]
mod tests;

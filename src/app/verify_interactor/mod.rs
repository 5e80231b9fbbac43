// Verify interactor - Checks a produced clip against the requested range

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use crate::domain::errors::DomainError;
use crate::domain::model::{MediaSummary, TimeSpec};
use crate::domain::rules::{ClipAcceptance, ClipCheck, DEFAULT_DURATION_TOLERANCE};
use crate::ports::ProbePort;

/// Request for clip verification
#[derive(Debug, Clone)]
pub struct VerifyRequest {
    pub clip_path: String,
    pub start: TimeSpec,
    pub end: TimeSpec,
    /// Allowed duration drift in seconds
    pub tolerance: f64,
}

impl VerifyRequest {
    pub fn new(clip_path: impl Into<String>, start: TimeSpec, end: TimeSpec) -> Self {
        Self {
            clip_path: clip_path.into(),
            start,
            end,
            tolerance: DEFAULT_DURATION_TOLERANCE,
        }
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }
}

/// Verification outcome
#[derive(Debug, Clone, Serialize)]
pub struct VerifyReport {
    pub clip_path: String,
    pub expected_duration: f64,
    pub passed: bool,
    pub checks: Vec<ClipCheck>,
    pub summary: MediaSummary,
}

/// Interactor for the clip verification use case
pub struct VerifyInteractor {
    probe_port: Arc<dyn ProbePort>,
}

impl VerifyInteractor {
    pub fn new(probe_port: Arc<dyn ProbePort>) -> Self {
        Self { probe_port }
    }

    pub async fn execute(&self, request: VerifyRequest) -> Result<VerifyReport, DomainError> {
        if request.end.seconds <= request.start.seconds {
            return Err(DomainError::BadArgs(format!(
                "End time ({}) must be after start time ({})",
                request.end, request.start
            )));
        }
        if !request.tolerance.is_finite() || request.tolerance < 0.0 {
            return Err(DomainError::BadArgs(format!(
                "Tolerance must be a non-negative number, got {}",
                request.tolerance
            )));
        }

        let summary = self.probe_port.probe_media(&request.clip_path).await?;
        let expected_duration = request.end.seconds - request.start.seconds;
        let checks = ClipAcceptance::evaluate(&summary, expected_duration, request.tolerance);
        let passed = checks.iter().all(|c| c.passed);

        if passed {
            info!(clip = %request.clip_path, "Clip verification passed");
        } else {
            for check in checks.iter().filter(|c| !c.passed) {
                warn!(clip = %request.clip_path, check = %check.name, details = %check.details, "Check failed");
            }
        }

        Ok(VerifyReport {
            clip_path: request.clip_path,
            expected_duration,
            passed,
            checks,
            summary,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct ClipProbe {
        duration: f64,
    }

    #[async_trait]
    impl ProbePort for ClipProbe {
        async fn probe_media(&self, file_path: &str) -> Result<MediaSummary, DomainError> {
            Ok(MediaSummary {
                path: file_path.to_string(),
                format: "mov,mp4,m4a,3gp,3g2,mj2".to_string(),
                duration: TimeSpec::from_seconds(self.duration),
                file_size: 2048,
                video_codec: Some("h264".to_string()),
                width: Some(1280),
                height: Some(720),
                audio_codec: Some("aac".to_string()),
            })
        }
    }

    fn request() -> VerifyRequest {
        VerifyRequest::new("clip.mp4", TimeSpec::from_seconds(30.5), TimeSpec::from_seconds(45.0))
    }

    #[tokio::test]
    async fn test_verify_passes_within_tolerance() {
        let interactor = VerifyInteractor::new(Arc::new(ClipProbe { duration: 14.53 }));
        let report = interactor.execute(request()).await.unwrap();
        assert!(report.passed);
        assert_eq!(report.expected_duration, 14.5);
    }

    #[tokio::test]
    async fn test_verify_reports_drift() {
        let interactor = VerifyInteractor::new(Arc::new(ClipProbe { duration: 15.0 }));
        let report = interactor.execute(request()).await.unwrap();
        assert!(!report.passed);

        let report = interactor
            .execute(request().with_tolerance(1.0))
            .await
            .unwrap();
        assert!(report.passed);
    }

    #[tokio::test]
    async fn test_verify_rejects_bad_request() {
        let interactor = VerifyInteractor::new(Arc::new(ClipProbe { duration: 1.0 }));
        let inverted = VerifyRequest::new("clip.mp4", TimeSpec::from_seconds(5.0), TimeSpec::from_seconds(5.0));
        assert!(matches!(interactor.execute(inverted).await, Err(DomainError::BadArgs(_))));
        assert!(interactor.execute(request().with_tolerance(-0.1)).await.is_err());
    }
}

// Clip interactor - Orchestrates the clip extraction use case

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::domain::errors::DomainError;
use crate::domain::model::TimeSpec;
use crate::engine::{ClipExtractionEngine, ProgressHandle};
use crate::error::ClipError;

/// Failure of a clip job, split the way a user-facing message needs it
#[derive(Error, Debug)]
pub enum ClipFailure {
    #[error("couldn't prepare the clipping tool: {0}")]
    Prepare(ClipError),

    #[error("couldn't cut this clip: {0}")]
    Cut(ClipError),

    #[error(transparent)]
    Input(#[from] DomainError),
}

impl ClipFailure {
    fn classify(err: ClipError) -> Self {
        if err.is_load_failure() {
            ClipFailure::Prepare(err)
        } else {
            ClipFailure::Cut(err)
        }
    }

    /// Underlying engine error, if any
    pub fn clip_error(&self) -> Option<&ClipError> {
        match self {
            ClipFailure::Prepare(err) | ClipFailure::Cut(err) => Some(err),
            ClipFailure::Input(_) => None,
        }
    }
}

/// One clip extraction from a recording on disk
#[derive(Clone)]
pub struct ClipJob {
    pub input: PathBuf,
    pub output: Option<PathBuf>,
    pub start: TimeSpec,
    pub end: TimeSpec,
    pub timeout: Option<Duration>,
    pub progress: Option<ProgressHandle>,
}

impl ClipJob {
    pub fn new(input: impl Into<PathBuf>, start: TimeSpec, end: TimeSpec) -> Self {
        Self {
            input: input.into(),
            output: None,
            start,
            end,
            timeout: None,
            progress: None,
        }
    }

    pub fn with_output(mut self, output: impl Into<PathBuf>) -> Self {
        self.output = Some(output.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_progress(mut self, progress: ProgressHandle) -> Self {
        self.progress = Some(progress);
        self
    }
}

/// Summary of a finished clip job
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClipReport {
    pub input: PathBuf,
    pub output: PathBuf,
    pub start: TimeSpec,
    pub end: TimeSpec,
    pub mime_type: String,
    pub output_bytes: usize,
    pub elapsed_ms: u64,
}

/// Default output path: `<stem>_clip_<start>_<end>.mp4` next to the input
pub fn generate_output_filename(input: &Path, start: TimeSpec, end: TimeSpec) -> Result<PathBuf, DomainError> {
    let stem = input
        .file_stem()
        .ok_or_else(|| DomainError::BadArgs(format!("Invalid input file path: {}", input.display())))?
        .to_string_lossy();

    let name = format!(
        "{}_clip_{}_{}.mp4",
        stem,
        start.format_compact(),
        end.format_compact()
    );
    Ok(input.with_file_name(name))
}

/// Interactor for the clip use case
pub struct ClipInteractor {
    engine: Arc<ClipExtractionEngine>,
}

impl ClipInteractor {
    pub fn new(engine: Arc<ClipExtractionEngine>) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &Arc<ClipExtractionEngine> {
        &self.engine
    }

    /// Read the recording, cut the clip and write it out
    pub async fn execute(&self, job: ClipJob) -> Result<ClipReport, ClipFailure> {
        let started = Instant::now();
        let output = match &job.output {
            Some(path) => path.clone(),
            None => generate_output_filename(&job.input, job.start, job.end)?,
        };
        if output == job.input {
            return Err(DomainError::BadArgs("Output file must differ from the input file".to_string()).into());
        }

        let source = tokio::fs::read(&job.input).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                DomainError::FileNotFound(job.input.display().to_string())
            } else {
                DomainError::FsFail(format!("Failed to read {}: {}", job.input.display(), e))
            }
        })?;

        info!(input = %job.input.display(), bytes = source.len(), "Preparing clipping engine");
        self.engine.load(None).await.map_err(ClipFailure::classify)?;

        let cut = self.engine.cut_video(
            source,
            job.start.as_seconds(),
            job.end.as_seconds(),
            job.progress.clone(),
        );
        let clip = match job.timeout {
            Some(limit) => match tokio::time::timeout(limit, cut).await {
                Ok(result) => result,
                Err(_) => {
                    warn!(seconds = limit.as_secs_f64(), "Clip operation timed out");
                    Err(ClipError::Timeout {
                        seconds: limit.as_secs_f64(),
                    })
                }
            },
            None => cut.await,
        }
        .map_err(ClipFailure::classify)?;

        tokio::fs::write(&output, clip.bytes())
            .await
            .map_err(|e| DomainError::FsFail(format!("Failed to write {}: {}", output.display(), e)))?;

        let report = ClipReport {
            input: job.input,
            output,
            start: job.start,
            end: job.end,
            mime_type: clip.mime_type().to_string(),
            output_bytes: clip.len(),
            elapsed_ms: started.elapsed().as_millis() as u64,
        };
        info!(output = %report.output.display(), bytes = report.output_bytes, "Clip written");
        Ok(report)
    }
}

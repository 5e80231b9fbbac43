// Ports - Interface definitions (contracts)

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use crate::domain::errors::DomainError;
use crate::domain::model::{MediaSummary, RuntimeAssets};
use crate::engine::progress::ProgressReporter;
use crate::error::RuntimeResult;

/// Receives diagnostic output lines produced by a runtime
pub type LogSink = Arc<dyn Fn(&str) + Send + Sync>;

/// One transcode invocation
#[derive(Debug, Clone, PartialEq)]
pub struct ExecJob {
    /// Arguments relative to the runtime's virtual filesystem
    pub args: Vec<String>,
    /// Output duration in seconds, used to turn timestamps into fractions
    pub expected_duration: Option<f64>,
}

/// A loaded media runtime owning a private virtual filesystem
#[async_trait]
pub trait MediaRuntime: Send + Sync {
    /// Create or replace a virtual file
    async fn write_file(&self, name: &str, data: Bytes) -> RuntimeResult<()>;

    /// Read a virtual file
    async fn read_file(&self, name: &str) -> RuntimeResult<Bytes>;

    /// Delete a virtual file
    async fn delete_file(&self, name: &str) -> RuntimeResult<()>;

    /// Names of all virtual files currently present
    async fn list_files(&self) -> RuntimeResult<Vec<String>>;

    /// Run a transcode command, reporting fractional progress
    async fn exec(&self, job: &ExecJob, progress: &ProgressReporter) -> RuntimeResult<()>;

    /// Tear the runtime down; later calls fail with `RuntimeError::Terminated`
    async fn terminate(&self);
}

/// Fetches and initializes a media runtime from its pinned assets
#[async_trait]
pub trait RuntimeLoader: Send + Sync {
    async fn load(
        &self,
        assets: &RuntimeAssets,
        log_sink: LogSink,
        progress: &ProgressReporter,
    ) -> RuntimeResult<Arc<dyn MediaRuntime>>;
}

/// Port for media file probing
#[async_trait]
pub trait ProbePort: Send + Sync {
    /// Probe a media file and summarize its container and primary streams
    async fn probe_media(&self, file_path: &str) -> Result<MediaSummary, DomainError>;
}

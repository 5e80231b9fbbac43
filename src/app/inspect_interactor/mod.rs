// Inspect interactor - Summarizes a recording or clip on disk

use std::sync::Arc;

use tracing::info;

use crate::domain::errors::DomainError;
use crate::domain::model::MediaSummary;
use crate::ports::ProbePort;

/// Interactor for the media inspection use case
pub struct InspectInteractor {
    probe_port: Arc<dyn ProbePort>,
}

impl InspectInteractor {
    pub fn new(probe_port: Arc<dyn ProbePort>) -> Self {
        Self { probe_port }
    }

    /// Probe `file_path` and return its summary
    pub async fn execute(&self, file_path: &str) -> Result<MediaSummary, DomainError> {
        if file_path.trim().is_empty() {
            return Err(DomainError::BadArgs("Input file cannot be empty".to_string()));
        }

        let summary = self.probe_port.probe_media(file_path).await?;
        info!(
            file = file_path,
            format = %summary.format,
            duration = %summary.duration,
            "Media inspected"
        );
        Ok(summary)
    }
}

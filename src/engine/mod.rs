//! Core clip extraction engine module

use serde::{Deserialize, Serialize};

use crate::domain::model::{RuntimeAssets, TranscodeProfile};

pub mod extractor;
pub mod progress;

pub use extractor::ClipExtractionEngine;
pub use progress::{ProgressCallback, ProgressHandle, ProgressReporter};

/// Clip extraction engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Pinned runtime distribution
    pub assets: RuntimeAssets,
    /// Encoder settings for produced clips
    pub profile: TranscodeProfile,
    /// Extension of the staged source file, matching the recorder's container
    pub input_extension: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            assets: RuntimeAssets::default(),
            profile: TranscodeProfile::default(),
            input_extension: "webm".to_string(),
        }
    }
}

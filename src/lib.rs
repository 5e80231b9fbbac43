//! ClipCut clip extraction library
//!
//! Cuts a time range out of a recording held in memory and re-encodes it as an
//! MP4 (H.264/AAC) clip through a pluggable media runtime. The production
//! runtime drives the FFmpeg executable; an in-memory runtime is provided for
//! embedding and tests.

pub mod adapters;
pub mod app;
pub mod cli;
pub mod config_initialization;
pub mod domain;
pub mod engine;
pub mod error;
pub mod ports;

// Re-export commonly used types
pub use domain::errors::DomainError;
pub use domain::model::{ClipRequest, ClipResult, EngineState, MediaSummary, TimeSpec};
pub use engine::{ClipExtractionEngine, EngineConfig, ProgressCallback, ProgressHandle};
pub use error::{ClipError, EngineResult, RuntimeError, RuntimeResult};

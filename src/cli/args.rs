//! Command-line argument definitions

use std::path::PathBuf;

use clap::{Args, ValueEnum};
use clap_num::number_range;

use crate::domain::rules::{DEFAULT_DURATION_TOLERANCE, MAX_CRF};

fn parse_crf(value: &str) -> Result<u8, String> {
    number_range(value, 0, MAX_CRF)
}

/// How progress is reported while cutting
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ProgressMode {
    /// Progress bar on stderr
    Console,
    /// JSON events on stdout
    Json,
    /// No progress output
    None,
}

/// Report format for inspect and verify
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
    Yaml,
}

/// Arguments for the cut command
#[derive(Args, Debug)]
pub struct CutArgs {
    /// Source recording
    #[arg(short, long)]
    pub input: PathBuf,

    /// Start time (HH:MM:SS.ms, MM:SS.ms, or seconds)
    #[arg(short, long)]
    pub start: String,

    /// End time (HH:MM:SS.ms, MM:SS.ms, or seconds)
    #[arg(short, long)]
    pub end: String,

    /// Output file path (default: <input>_clip_<start>_<end>.mp4)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Constant Rate Factor (0-51)
    #[arg(long, value_parser = parse_crf)]
    pub crf: Option<u8>,

    /// x264 encoding preset
    #[arg(long)]
    pub preset: Option<String>,

    /// Give up waiting after this many seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Progress reporting
    #[arg(long, value_enum, default_value_t = ProgressMode::Console)]
    pub progress: ProgressMode,
}

/// Arguments for the inspect command
#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Media file to inspect
    #[arg(short, long)]
    pub input: String,

    /// Report format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

/// Arguments for the verify command
#[derive(Args, Debug)]
pub struct VerifyArgs {
    /// Clip to verify
    #[arg(short, long)]
    pub input: String,

    /// Requested start time
    #[arg(short, long)]
    pub start: String,

    /// Requested end time
    #[arg(short, long)]
    pub end: String,

    /// Allowed duration drift in seconds
    #[arg(long, default_value_t = DEFAULT_DURATION_TOLERANCE)]
    pub tolerance: f64,

    /// Report format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

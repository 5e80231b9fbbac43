//! CLI module for ClipCut
//!
//! This module handles command-line argument parsing and command execution.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub mod args;
pub mod commands;

pub use args::{CutArgs, InspectArgs, OutputFormat, ProgressMode, VerifyArgs};

/// ClipCut clip extractor
///
/// Cuts a time range out of a screen recording and re-encodes it as an
/// MP4 (H.264/AAC) clip.
#[derive(Parser, Debug)]
#[command(name = "clipcut")]
#[command(about = "ClipCut - cut shareable MP4 clips out of recordings")]
#[command(version)]
pub struct Cli {
    /// Configuration file (default: ./clipcut.toml or ./config/clipcut.toml)
    #[arg(long, global = true, env = "CLIPCUT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Logging level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub json_logs: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Cut a clip out of a recording
    Cut(CutArgs),
    /// Inspect a media file
    Inspect(InspectArgs),
    /// Verify a produced clip against the requested range
    Verify(VerifyArgs),
}

impl Commands {
    pub fn name(&self) -> &'static str {
        match self {
            Commands::Cut(_) => "cut",
            Commands::Inspect(_) => "inspect",
            Commands::Verify(_) => "verify",
        }
    }
}

//! ClipCut clip extractor
//!
//! Cuts a time range out of a recording and re-encodes it as an MP4 clip.
//!
//! # Usage
//!
//! ```bash
//! clipcut cut --input recording.webm --start 00:30.5 --end 45
//! clipcut inspect --input recording_clip_30s500ms_45s000ms.mp4 --format json
//! clipcut verify --input recording_clip_30s500ms_45s000ms.mp4 --start 30.5 --end 45
//! ```

use anyhow::Result;
use clap::Parser;
use tracing::info;

use clipcut::adapters::tracing_log::init_logging;
use clipcut::app::DefaultAppContainer;
use clipcut::cli::{commands, Cli, Commands};
use clipcut::config_initialization::initialize_configuration_hierarchy;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let resolved = initialize_configuration_hierarchy(&cli)?;
    init_logging(resolved.config.logging.level, resolved.config.logging.json);
    resolved.log_summary();

    let container = DefaultAppContainer::new(&resolved.config)?;
    info!(command = cli.command.name(), "Starting ClipCut");

    match cli.command {
        Commands::Cut(args) => commands::cut(&container, args).await?,
        Commands::Inspect(args) => commands::inspect(&container, args).await?,
        Commands::Verify(args) => commands::verify(&container, args).await?,
    }

    info!("ClipCut completed successfully");
    Ok(())
}

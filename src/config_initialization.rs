//! Configuration initialization and hierarchy management

use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::info;

use crate::adapters::toml_config::ClipcutConfig;
use crate::adapters::tracing_log::LogLevel;
use crate::cli::{Cli, Commands};

/// Configuration resolved for one invocation, with where it came from
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub config: ClipcutConfig,
    pub source: Option<PathBuf>,
    pub env_overrides: usize,
    pub cli_overrides: usize,
}

impl ResolvedConfig {
    /// Log how the configuration was assembled; call once logging is up
    pub fn log_summary(&self) {
        match &self.source {
            Some(path) => info!(path = %path.display(), "Configuration file loaded"),
            None => info!("No configuration file, using defaults"),
        }
        info!(
            env_overrides = self.env_overrides,
            cli_overrides = self.cli_overrides,
            runtime = %self.config.runtime.runtime_binary.display(),
            "Configuration hierarchy initialized"
        );
    }
}

/// Resolve configuration following precedence: CLI > Env > File > Defaults
pub fn initialize_configuration_hierarchy(cli: &Cli) -> Result<ResolvedConfig> {
    resolve_with_env(cli, |key| std::env::var(key).ok())
}

/// Same as [`initialize_configuration_hierarchy`] with an explicit environment
pub fn resolve_with_env<F>(cli: &Cli, lookup: F) -> Result<ResolvedConfig>
where
    F: Fn(&str) -> Option<String>,
{
    // Step 1 and 2: defaults, then file
    let source = match &cli.config {
        Some(path) => Some(path.clone()),
        None => ClipcutConfig::find_default_file(),
    };
    let mut config = match &source {
        Some(path) => ClipcutConfig::load_file(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => ClipcutConfig::default(),
    };

    // Step 3: environment
    let env_overrides = config
        .apply_env_overrides(lookup)
        .context("Invalid environment override")?;

    // Step 4: command line
    let cli_overrides = apply_cli_configuration_overrides(&mut config, cli)?;

    config.validate().context("Invalid configuration")?;

    Ok(ResolvedConfig {
        config,
        source,
        env_overrides,
        cli_overrides,
    })
}

/// Apply CLI argument overrides to configuration
fn apply_cli_configuration_overrides(config: &mut ClipcutConfig, cli: &Cli) -> Result<usize> {
    let mut cli_overrides = 0;

    if let Some(level) = &cli.log_level {
        config.logging.level = LogLevel::parse(level).context("Invalid --log-level")?;
        cli_overrides += 1;
    }
    if cli.json_logs {
        config.logging.json = true;
        cli_overrides += 1;
    }

    if let Commands::Cut(args) = &cli.command {
        if let Some(crf) = args.crf {
            config.transcode.crf = crf;
            cli_overrides += 1;
        }
        if let Some(preset) = &args.preset {
            config.transcode.preset = preset.clone();
            cli_overrides += 1;
        }
    }

    Ok(cli_overrides)
}

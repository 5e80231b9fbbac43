// TOML config adapter - Configuration file, environment overrides and validation

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::adapters::tracing_log::LogLevel;
use crate::domain::errors::DomainError;
use crate::domain::model::{RuntimeAssets, TranscodeProfile};
use crate::domain::rules::validate_profile;
use crate::engine::EngineConfig;

/// Prefix for environment overrides
pub const ENV_PREFIX: &str = "CLIPCUT_";

/// Locations searched when no config file is given explicitly
pub const DEFAULT_CONFIG_PATHS: [&str; 2] = ["clipcut.toml", "config/clipcut.toml"];

/// Engine section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSection {
    /// Extension used for the staged source file
    pub input_extension: String,
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            input_extension: "webm".to_string(),
        }
    }
}

/// Logging section
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    pub level: LogLevel,
    pub json: bool,
}

/// Complete application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClipcutConfig {
    pub runtime: RuntimeAssets,
    pub transcode: TranscodeProfile,
    pub engine: EngineSection,
    pub logging: LoggingSection,
}

impl ClipcutConfig {
    /// Parse a TOML document; missing keys keep their defaults
    pub fn from_toml_str(content: &str) -> Result<Self, DomainError> {
        toml::from_str(content)
            .map_err(|e| DomainError::InvalidConfig(format!("Failed to parse TOML config: {}", e)))
    }

    /// Read and parse a config file
    pub fn load_file(path: &Path) -> Result<Self, DomainError> {
        if !path.exists() {
            return Err(DomainError::FileNotFound(path.display().to_string()));
        }
        let content = std::fs::read_to_string(path)
            .map_err(|e| DomainError::FsFail(format!("Failed to read config file: {}", e)))?;
        let config = Self::from_toml_str(&content)?;
        info!(path = %path.display(), "Loaded configuration file");
        Ok(config)
    }

    /// First default location that exists
    pub fn find_default_file() -> Option<PathBuf> {
        DEFAULT_CONFIG_PATHS
            .iter()
            .map(PathBuf::from)
            .find(|p| p.is_file())
    }

    /// Serialize back to TOML
    pub fn to_toml_string(&self) -> Result<String, DomainError> {
        toml::to_string_pretty(self)
            .map_err(|e| DomainError::InvalidConfig(format!("Failed to serialize config: {}", e)))
    }

    /// Apply `CLIPCUT_*` overrides; `lookup` abstracts the environment.
    ///
    /// Returns the number of overrides applied.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<usize, DomainError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(&format!("{}{}", ENV_PREFIX, key));
        let mut applied = 0;

        if let Some(value) = var("FFMPEG") {
            self.runtime.runtime_binary = PathBuf::from(value);
            applied += 1;
        }
        if let Some(value) = var("FFPROBE") {
            self.runtime.probe_binary = PathBuf::from(value);
            applied += 1;
        }
        if let Some(value) = var("FFMPEG_VERSION") {
            self.runtime.expected_version = Some(value);
            applied += 1;
        }
        if let Some(value) = var("THREADS") {
            let threads = value
                .parse::<usize>()
                .map_err(|e| DomainError::InvalidConfig(format!("Invalid CLIPCUT_THREADS: {}", e)))?;
            self.runtime.threads = Some(threads);
            applied += 1;
        }
        if let Some(value) = var("CRF") {
            self.transcode.crf = value
                .parse::<u8>()
                .map_err(|e| DomainError::InvalidConfig(format!("Invalid CLIPCUT_CRF: {}", e)))?;
            applied += 1;
        }
        if let Some(value) = var("PRESET") {
            self.transcode.preset = value;
            applied += 1;
        }
        if let Some(value) = var("INPUT_EXTENSION") {
            self.engine.input_extension = value;
            applied += 1;
        }
        if let Some(value) = var("LOG_LEVEL") {
            self.logging.level = LogLevel::parse(&value)?;
            applied += 1;
        }
        if let Some(value) = var("JSON_LOGS") {
            self.logging.json = value.parse::<bool>().map_err(|e| {
                DomainError::InvalidConfig(format!("Invalid CLIPCUT_JSON_LOGS: {}", e))
            })?;
            applied += 1;
        }

        if applied > 0 {
            debug!(count = applied, "Applied environment overrides");
        }
        Ok(applied)
    }

    /// Reject values the engine cannot work with
    pub fn validate(&self) -> Result<(), DomainError> {
        validate_profile(&self.transcode)?;

        let extension = self.engine.input_extension.trim();
        if extension.is_empty() || !extension.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(DomainError::InvalidConfig(format!(
                "Invalid input extension: {:?}",
                self.engine.input_extension
            )));
        }
        if self.runtime.runtime_binary.as_os_str().is_empty() {
            return Err(DomainError::InvalidConfig("Runtime binary cannot be empty".to_string()));
        }
        if self.runtime.threads == Some(0) {
            return Err(DomainError::InvalidConfig("Thread count must be at least 1".to_string()));
        }
        Ok(())
    }

    /// Engine settings derived from this configuration
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            assets: self.runtime.clone(),
            profile: self.transcode.clone(),
            input_extension: self.engine.input_extension.trim().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_from_empty_document() {
        let config = ClipcutConfig::from_toml_str("").unwrap();
        assert_eq!(config, ClipcutConfig::default());
        assert_eq!(config.transcode.preset, "ultrafast");
        assert_eq!(config.engine.input_extension, "webm");
        config.validate().unwrap();
    }

    #[test]
    fn test_partial_document() {
        let config = ClipcutConfig::from_toml_str(
            r#"
            [runtime]
            runtime_binary = "/opt/ffmpeg/bin/ffmpeg"
            expected_version = "6.1"

            [transcode]
            crf = 28

            [logging]
            level = "debug"
            "#,
        )
        .unwrap();

        assert_eq!(config.runtime.runtime_binary, PathBuf::from("/opt/ffmpeg/bin/ffmpeg"));
        assert_eq!(config.runtime.expected_version.as_deref(), Some("6.1"));
        assert_eq!(config.transcode.crf, 28);
        assert_eq!(config.transcode.audio_codec, "aac");
        assert_eq!(config.logging.level, LogLevel::Debug);
    }

    #[test]
    fn test_rejects_bad_toml() {
        assert!(matches!(
            ClipcutConfig::from_toml_str("[transcode\ncrf = "),
            Err(DomainError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_env_overrides_file() {
        let mut config = ClipcutConfig::from_toml_str("[transcode]\ncrf = 28").unwrap();
        let applied = config
            .apply_env_overrides(env(&[
                ("CLIPCUT_CRF", "20"),
                ("CLIPCUT_FFMPEG", "/usr/local/bin/ffmpeg"),
                ("CLIPCUT_LOG_LEVEL", "warn"),
                ("OTHER_CRF", "1"),
            ]))
            .unwrap();

        assert_eq!(applied, 3);
        assert_eq!(config.transcode.crf, 20);
        assert_eq!(config.runtime.runtime_binary, PathBuf::from("/usr/local/bin/ffmpeg"));
        assert_eq!(config.logging.level, LogLevel::Warn);
    }

    #[test]
    fn test_env_override_parse_errors() {
        let mut config = ClipcutConfig::default();
        assert!(config.apply_env_overrides(env(&[("CLIPCUT_CRF", "high")])).is_err());
        assert!(config.apply_env_overrides(env(&[("CLIPCUT_LOG_LEVEL", "loud")])).is_err());
    }

    #[test]
    fn test_validate() {
        let mut config = ClipcutConfig::default();
        config.transcode.crf = 60;
        assert!(config.validate().is_err());

        let mut config = ClipcutConfig::default();
        config.engine.input_extension = "we/bm".to_string();
        assert!(config.validate().is_err());

        let mut config = ClipcutConfig::default();
        config.runtime.threads = Some(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_file_and_serialize() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clipcut.toml");

        let mut original = ClipcutConfig::default();
        original.transcode.preset = "veryfast".to_string();
        std::fs::write(&path, original.to_toml_string().unwrap()).unwrap();

        let loaded = ClipcutConfig::load_file(&path).unwrap();
        assert_eq!(loaded.transcode.preset, "veryfast");
        assert!(matches!(
            ClipcutConfig::load_file(&dir.path().join("missing.toml")),
            Err(DomainError::FileNotFound(_))
        ));
    }

    #[test]
    fn test_engine_config() {
        let mut config = ClipcutConfig::default();
        config.engine.input_extension = " mkv ".to_string();
        let engine = config.engine_config();
        assert_eq!(engine.input_extension, "mkv");
        assert_eq!(engine.profile, config.transcode);
    }
}

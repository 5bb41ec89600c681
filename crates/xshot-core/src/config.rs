use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Read(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Defaults read from `config.toml`. Command-line flags override them.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub format: OutputFormat,
    /// 0 to 100, where 100 is lossless. Out-of-range values are clamped.
    #[serde(default = "default_quality")]
    pub quality: i64,
    /// Directory for generated filenames; the working directory if unset.
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
    #[serde(default)]
    pub freeze: bool,
    #[serde(default)]
    pub delay: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Png,
    Webp,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Png => write!(f, "png"),
            OutputFormat::Webp => write!(f, "webp"),
        }
    }
}

impl OutputFormat {
    pub fn extension(&self) -> &str {
        match self {
            OutputFormat::Png => "png",
            OutputFormat::Webp => "webp",
        }
    }
}

fn default_quality() -> i64 {
    100
}

impl Default for Config {
    fn default() -> Self {
        Self {
            format: OutputFormat::default(),
            quality: default_quality(),
            output_dir: None,
            freeze: false,
            delay: 0,
        }
    }
}

impl Config {
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join("xshot")
            .join("config.toml")
    }

    /// Load the user config, or the defaults if there is none.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        log::debug!("loaded config from {}", path.display());
        Ok(config)
    }
}

use serde::Deserialize;
use std::fs;
use std::io;
use std::path::Path;

use crate::error::ConvertError;

/// Name of the optional config file looked up in the working directory.
pub const CONFIG_FILE: &str = "convert-to-pdf.toml";

static DEFAULT_CONFIG: &str = include_str!("default_config.toml");

#[derive(Debug, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub renderer: RendererConfig,
    pub log: LogConfig,
}

/// Which rendering capability to resolve.
#[derive(Debug, Deserialize, Default, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum Backend {
    /// The in-process typst renderer when compiled in, otherwise md-to-pdf.
    #[default]
    Auto,
    Typst,
    MdToPdf,
}

#[derive(Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct RendererConfig {
    pub backend: Backend,
    pub program: String,
    pub system_fonts: bool,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            backend: Backend::Auto,
            program: "md-to-pdf".to_string(),
            system_fonts: true,
        }
    }
}

#[derive(Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}

impl LogConfig {
    /// Level filter for env_logger. Unknown names fall back to `warn`.
    pub fn level_filter(&self) -> log::LevelFilter {
        self.level.parse().unwrap_or(log::LevelFilter::Warn)
    }
}

impl Config {
    /// The defaults shipped in `default_config.toml`.
    pub fn compiled_default() -> Self {
        toml::from_str(DEFAULT_CONFIG).unwrap_or_default()
    }

    /// Load config from a TOML file, or return defaults if not found.
    ///
    /// A file that exists but cannot be read or parsed is an error so the
    /// caller can report it once logging is up.
    pub fn load(path: &Path) -> Result<Self, ConvertError> {
        match fs::read_to_string(path) {
            Ok(content) => Ok(toml::from_str(&content)?),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Self::compiled_default()),
            Err(e) => Err(e.into()),
        }
    }
}

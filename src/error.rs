use std::path::PathBuf;

use thiserror::Error;

/// All errors that a conversion can produce
#[derive(Error, Debug)]
pub enum ConvertError {
    /// The markdown source does not exist
    #[error("{} not found!", .0.display())]
    FileNotFound(PathBuf),

    /// The renderer ran and failed; the message is its own
    #[error("{0}")]
    Rendering(String),

    /// No renderer could be resolved
    #[error("{0}")]
    CapabilityUnavailable(String),

    /// The config file is not valid TOML or has unknown values
    #[error("invalid config: {0}")]
    Config(#[from] toml::de::Error),

    #[error(transparent)]
    /// An I/O error occurred
    Io(#[from] std::io::Error),
}

//! Rendering capabilities and how one is picked.
//!
//! | Backend | Engine | External Dependencies |
//! |---------|--------|-----------------------|
//! | `typst` | in-process `typst` compiler | None (cargo feature `typst`) |
//! | `md-to-pdf` | `md-to-pdf` command | `npm install -g md-to-pdf` |

pub mod command;
#[cfg(feature = "typst")]
pub mod typst_engine;

use std::fs;
use std::io::Write;
use std::path::Path;

use crate::config::{Backend, RendererConfig};
use crate::error::ConvertError;
use crate::request::ConversionRequest;

/// A markdown-to-PDF rendering capability.
pub trait Renderer {
    /// Short name used in log output.
    fn name(&self) -> &str;

    /// Render `request.source` into `request.dest`.
    ///
    /// Returns whether the destination file was written.
    fn render(&self, request: &ConversionRequest) -> Result<bool, ConvertError>;
}

/// Result of looking for a renderer, resolved before any conversion.
pub enum Capability {
    Available(Box<dyn Renderer>),
    /// Nothing is installed or compiled in.
    Unavailable,
    /// A renderer exists but could not be started.
    LoadError(String),
}

impl std::fmt::Debug for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Capability::Available(renderer) => write!(f, "Available({})", renderer.name()),
            Capability::Unavailable => write!(f, "Unavailable"),
            Capability::LoadError(e) => write!(f, "LoadError({e})"),
        }
    }
}

/// Pick the renderer named by `config`.
pub fn resolve(config: &RendererConfig) -> Capability {
    let capability = match config.backend {
        Backend::Auto => {
            let embedded = embedded(config);
            if matches!(embedded, Capability::Unavailable) {
                command::CommandRenderer::probe(&config.program)
            } else {
                embedded
            }
        }
        Backend::Typst => embedded(config),
        Backend::MdToPdf => command::CommandRenderer::probe(&config.program),
    };
    log::debug!("Resolved {:?} backend: {:?}", config.backend, capability);
    capability
}

#[cfg(feature = "typst")]
fn embedded(config: &RendererConfig) -> Capability {
    Capability::Available(Box::new(typst_engine::TypstRenderer::new(
        config.system_fonts,
    )))
}

#[cfg(not(feature = "typst"))]
fn embedded(_config: &RendererConfig) -> Capability {
    log::debug!("Built without the typst renderer");
    Capability::Unavailable
}

/// Write `bytes` to `dest` through a temp file in the same directory, so a
/// failure never leaves a partial file behind.
pub fn write_atomically(dest: &Path, bytes: &[u8]) -> Result<(), ConvertError> {
    let dir = match dest.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;
    let mut file = tempfile::NamedTempFile::new_in(dir)?;
    file.write_all(bytes)?;
    file.flush()?;
    file.persist(dest).map_err(|e| e.error)?;
    Ok(())
}

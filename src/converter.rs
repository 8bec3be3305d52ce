//! The conversion sequence: capability, source, render, report.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::backend::{Capability, Renderer};
use crate::error::ConvertError;
use crate::guidance;
use crate::request::{ConversionRequest, ConversionResult};

/// Markdown file converted on every invocation, relative to the working directory.
pub const SOURCE_FILE: &str = "SYSTEM_ARCHITECTURE.md";
/// PDF written on success, relative to the working directory.
pub const OUTPUT_FILE: &str = "SYSTEM_ARCHITECTURE.pdf";

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success {
        dest: PathBuf,
    },
    SourceMissing {
        source: PathBuf,
    },
    RenderError {
        message: String,
    },
    /// No renderer; nothing was attempted.
    CapabilityMissing {
        source: PathBuf,
        dest: PathBuf,
        /// Why a renderer that exists could not be loaded
        reason: Option<String>,
    },
}

impl Outcome {
    /// Process exit status for this outcome. 2 is left to clap's usage
    /// errors.
    pub fn exit_code(&self) -> u8 {
        match self {
            Outcome::Success { .. } => 0,
            Outcome::SourceMissing { .. } | Outcome::RenderError { .. } => 1,
            Outcome::CapabilityMissing { .. } => 3,
        }
    }

    /// Print the final message: confirmation and guidance to `stdout`, errors
    /// to `stderr`.
    pub fn report(&self, stdout: &mut dyn Write, stderr: &mut dyn Write) -> io::Result<()> {
        match self {
            Outcome::Success { dest } => {
                writeln!(stdout, "✅ Successfully created: {}", dest.display())
            }
            Outcome::SourceMissing { source } => {
                writeln!(stderr, "Error: {}", ConvertError::FileNotFound(source.clone()))
            }
            Outcome::RenderError { message } => {
                writeln!(stderr, "Error during conversion: {}", message)
            }
            Outcome::CapabilityMissing { source, dest, .. } => guidance::write(
                stdout,
                &source.display().to_string(),
                &dest.display().to_string(),
            ),
        }
    }
}

impl From<&Outcome> for ConversionResult {
    fn from(outcome: &Outcome) -> Self {
        let message = match outcome {
            Outcome::Success { .. } => None,
            Outcome::SourceMissing { source } => {
                Some(ConvertError::FileNotFound(source.clone()).to_string())
            }
            Outcome::RenderError { message } => Some(message.clone()),
            Outcome::CapabilityMissing { reason, .. } => Some(
                ConvertError::CapabilityUnavailable(
                    reason.clone().unwrap_or_else(|| "no PDF renderer available".to_string()),
                )
                .to_string(),
            ),
        };
        ConversionResult {
            success: matches!(outcome, Outcome::Success { .. }),
            message,
        }
    }
}

/// Run the whole sequence. The source is only looked at once a renderer is
/// available.
pub fn run(capability: Capability, source: &Path, dest: &Path, out: &mut dyn Write) -> Outcome {
    let renderer = match capability {
        Capability::Available(renderer) => renderer,
        Capability::Unavailable => {
            log::info!("No PDF renderer available");
            return Outcome::CapabilityMissing {
                source: source.to_path_buf(),
                dest: dest.to_path_buf(),
                reason: None,
            };
        }
        Capability::LoadError(reason) => {
            log::warn!("PDF renderer failed to load: {}", reason);
            return Outcome::CapabilityMissing {
                source: source.to_path_buf(),
                dest: dest.to_path_buf(),
                reason: Some(reason),
            };
        }
    };
    convert(renderer.as_ref(), source, dest, out)
}

/// Convert `source` to `dest` with the fixed layout and stylesheet.
pub fn convert(
    renderer: &dyn Renderer,
    source: &Path,
    dest: &Path,
    out: &mut dyn Write,
) -> Outcome {
    if !source.is_file() {
        return Outcome::SourceMissing {
            source: source.to_path_buf(),
        };
    }

    // Progress output is best effort; the outcome is what matters
    let _ = writeln!(out, "Converting {} to PDF...", source.display());

    let request = ConversionRequest::new(source, dest);
    log::debug!("Rendering with {}: {:?}", renderer.name(), request.pdf_options);

    match renderer.render(&request) {
        Ok(true) => {
            log::info!("Wrote {}", dest.display());
            Outcome::Success {
                dest: dest.to_path_buf(),
            }
        }
        Ok(false) => Outcome::RenderError {
            message: "PDF conversion failed".to_string(),
        },
        Err(e) => Outcome::RenderError {
            message: e.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::fs;

    use super::*;
    use crate::request::{PageFormat, STYLESHEET};

    /// Writes a small fake PDF and records every request.
    #[derive(Default)]
    struct RecordingRenderer {
        requests: RefCell<Vec<ConversionRequest>>,
    }

    impl Renderer for RecordingRenderer {
        fn name(&self) -> &str {
            "recording"
        }

        fn render(&self, request: &ConversionRequest) -> Result<bool, ConvertError> {
            let markdown = fs::read_to_string(&request.source)?;
            fs::write(&request.dest, format!("%PDF-1.7\n{}", markdown))?;
            self.requests.borrow_mut().push(request.clone());
            Ok(true)
        }
    }

    struct FailingRenderer;

    impl Renderer for FailingRenderer {
        fn name(&self) -> &str {
            "failing"
        }

        fn render(&self, _request: &ConversionRequest) -> Result<bool, ConvertError> {
            Err(ConvertError::Rendering(
                "Failed to launch the browser process!".to_string(),
            ))
        }
    }

    struct SilentRenderer;

    impl Renderer for SilentRenderer {
        fn name(&self) -> &str {
            "silent"
        }

        fn render(&self, _request: &ConversionRequest) -> Result<bool, ConvertError> {
            Ok(false)
        }
    }

    fn workspace(with_source: bool) -> (tempfile::TempDir, PathBuf, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join(SOURCE_FILE);
        let dest = dir.path().join(OUTPUT_FILE);
        if with_source {
            fs::write(&source, "# System Architecture\n").unwrap();
        }
        (dir, source, dest)
    }

    fn report(outcome: &Outcome) -> (String, String) {
        let mut stdout: Vec<u8> = Vec::new();
        let mut stderr: Vec<u8> = Vec::new();
        outcome.report(&mut stdout, &mut stderr).unwrap();
        (
            String::from_utf8(stdout).unwrap(),
            String::from_utf8(stderr).unwrap(),
        )
    }

    #[test]
    fn success_writes_destination() {
        let (_dir, source, dest) = workspace(true);
        let renderer = RecordingRenderer::default();
        let mut out: Vec<u8> = Vec::new();

        let outcome = convert(&renderer, &source, &dest, &mut out);

        assert_eq!(outcome, Outcome::Success { dest: dest.clone() });
        assert_eq!(outcome.exit_code(), 0);
        assert!(dest.is_file());
        let progress = String::from_utf8(out).unwrap();
        assert!(progress.starts_with("Converting "));
        assert!(progress.ends_with("SYSTEM_ARCHITECTURE.md to PDF...\n"));

        let (stdout, stderr) = report(&outcome);
        assert!(stdout.starts_with("✅ Successfully created: "));
        assert!(stdout.contains(OUTPUT_FILE));
        assert!(stderr.is_empty());
    }

    #[test]
    fn missing_source_is_reported_without_rendering() {
        let (_dir, source, dest) = workspace(false);
        let renderer = RecordingRenderer::default();
        let mut out: Vec<u8> = Vec::new();

        let outcome = convert(&renderer, &source, &dest, &mut out);

        assert_eq!(outcome, Outcome::SourceMissing { source: source.clone() });
        assert_eq!(outcome.exit_code(), 1);
        assert!(renderer.requests.borrow().is_empty());
        assert!(!dest.exists());
        assert!(out.is_empty());

        let (stdout, stderr) = report(&outcome);
        assert!(stdout.is_empty());
        assert!(stderr.starts_with("Error: "));
        assert!(stderr.ends_with("SYSTEM_ARCHITECTURE.md not found!\n"));
    }

    #[test]
    fn rendering_failure_message_is_verbatim() {
        let (_dir, source, dest) = workspace(true);
        let mut out: Vec<u8> = Vec::new();

        let outcome = convert(&FailingRenderer, &source, &dest, &mut out);

        assert_eq!(outcome.exit_code(), 1);
        assert!(!dest.exists());
        let (_, stderr) = report(&outcome);
        assert_eq!(
            stderr,
            "Error during conversion: Failed to launch the browser process!\n"
        );
    }

    #[test]
    fn renderer_that_writes_nothing_is_a_failure() {
        let (_dir, source, dest) = workspace(true);
        let outcome = convert(&SilentRenderer, &source, &dest, &mut io::sink());
        assert_eq!(
            outcome,
            Outcome::RenderError {
                message: "PDF conversion failed".to_string()
            }
        );
    }

    #[test]
    fn missing_capability_is_checked_before_source() {
        // No source file either: the capability check must win
        let (_dir, source, dest) = workspace(false);
        let mut out: Vec<u8> = Vec::new();

        let outcome = run(Capability::Unavailable, &source, &dest, &mut out);

        assert!(matches!(
            outcome,
            Outcome::CapabilityMissing { reason: None, .. }
        ));
        assert_eq!(outcome.exit_code(), 3);
        assert!(out.is_empty());

        let (stdout, stderr) = report(&outcome);
        assert!(stderr.is_empty());
        assert!(stdout.contains("npm install -g md-to-pdf"));
        assert!(stdout.contains("3. Pandoc (if installed):"));
    }

    #[test]
    fn load_error_keeps_its_reason() {
        let (_dir, source, dest) = workspace(true);
        let outcome = run(
            Capability::LoadError("md-to-pdf --version exited with 1".to_string()),
            &source,
            &dest,
            &mut io::sink(),
        );
        let result = ConversionResult::from(&outcome);
        assert!(!result.success);
        assert_eq!(
            result.message.as_deref(),
            Some("md-to-pdf --version exited with 1")
        );
        assert!(!dest.exists());
    }

    #[test]
    fn run_delegates_to_available_renderer() {
        let (_dir, source, dest) = workspace(true);
        let outcome = run(
            Capability::Available(Box::new(RecordingRenderer::default())),
            &source,
            &dest,
            &mut io::sink(),
        );
        let result = ConversionResult::from(&outcome);
        assert!(result.success);
        assert_eq!(result.message, None);
    }

    #[test]
    fn repeated_runs_overwrite_destination() {
        let (_dir, source, dest) = workspace(true);
        let renderer = RecordingRenderer::default();

        convert(&renderer, &source, &dest, &mut io::sink());
        fs::write(&source, "# Revised\n").unwrap();
        let outcome = convert(&renderer, &source, &dest, &mut io::sink());

        assert_eq!(outcome.exit_code(), 0);
        assert_eq!(fs::read_to_string(&dest).unwrap(), "%PDF-1.7\n# Revised\n");
    }

    #[test]
    fn every_request_carries_the_fixed_options() {
        let (_dir, source, dest) = workspace(true);
        let renderer = RecordingRenderer::default();

        convert(&renderer, &source, &dest, &mut io::sink());
        convert(&renderer, &source, &dest, &mut io::sink());

        let requests = renderer.requests.borrow();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0], requests[1]);
        let options = &requests[0].pdf_options;
        assert_eq!(options.format, PageFormat::A4);
        assert_eq!(
            (options.margin.top, options.margin.right, options.margin.bottom, options.margin.left),
            ("20mm", "15mm", "20mm", "15mm")
        );
        assert!(options.print_background);
        assert_eq!(requests[0].stylesheet, STYLESHEET);
    }
}

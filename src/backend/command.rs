//! Rendering through the external `md-to-pdf` program.
//!
//! The program is given the same page options and stylesheet as the
//! in-process renderer. It always writes next to its input, so the result is
//! moved to the requested destination afterwards.

use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use super::{Capability, Renderer};
use crate::error::ConvertError;
use crate::request::ConversionRequest;

pub struct CommandRenderer {
    program: String,
}

impl CommandRenderer {
    /// Check that `program` can be started.
    ///
    /// A program that is not on `PATH` is `Unavailable`; one that exists but
    /// fails to run `--version` is a `LoadError`.
    pub fn probe(program: &str) -> Capability {
        let status = Command::new(program)
            .arg("--version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();

        match status {
            Ok(status) if status.success() => Capability::Available(Box::new(Self {
                program: program.to_string(),
            })),
            Ok(status) => {
                log::warn!("{} --version failed: {}", program, status);
                Capability::LoadError(format!("{} --version exited with {}", program, status))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                log::info!("{} not found on PATH", program);
                Capability::Unavailable
            }
            Err(e) => {
                log::warn!("Could not start {}: {}", program, e);
                Capability::LoadError(format!("could not start {}: {}", program, e))
            }
        }
    }

    fn arguments(request: &ConversionRequest) -> Result<Vec<OsString>, ConvertError> {
        let pdf_options = serde_json::to_string(&request.pdf_options)
            .map_err(|e| ConvertError::Rendering(format!("Invalid PDF options: {}", e)))?;
        Ok(vec![
            "--pdf-options".into(),
            pdf_options.into(),
            "--css".into(),
            request.stylesheet.into(),
            request.source.clone().into_os_string(),
        ])
    }
}

/// Where md-to-pdf puts the PDF for `source`.
fn produced_path(source: &Path) -> PathBuf {
    source.with_extension("pdf")
}

fn move_file(from: &Path, to: &Path) -> io::Result<()> {
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        // Renames fail across file systems
        Err(_) => {
            fs::copy(from, to)?;
            fs::remove_file(from)
        }
    }
}

impl Renderer for CommandRenderer {
    fn name(&self) -> &str {
        "md-to-pdf"
    }

    fn render(&self, request: &ConversionRequest) -> Result<bool, ConvertError> {
        let args = Self::arguments(request)?;

        // A PDF left by an earlier run must not pass for this run's output
        let produced = produced_path(&request.source);
        match fs::remove_file(&produced) {
            Ok(()) => log::debug!("Removed stale {}", produced.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        log::debug!("Running {} on {}", self.program, request.source.display());

        let output = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .output()?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            log::warn!("{} failed: {}", self.program, stderr.trim());
            let message = if stderr.trim().is_empty() {
                format!("{} exited with {}", self.program, output.status)
            } else {
                stderr.trim().to_string()
            };
            return Err(ConvertError::Rendering(message));
        }

        if !produced.is_file() {
            log::warn!(
                "{} exited successfully without writing {}",
                self.program,
                produced.display()
            );
            return Ok(false);
        }
        if produced != request.dest {
            move_file(&produced, &request.dest)?;
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_program_is_unavailable() {
        let capability = CommandRenderer::probe("convert-to-pdf-test-no-such-program");
        assert!(matches!(capability, Capability::Unavailable));
    }

    #[cfg(unix)]
    #[test]
    fn failing_version_check_is_a_load_error() {
        let capability = CommandRenderer::probe("false");
        assert!(matches!(capability, Capability::LoadError(_)));
    }

    #[test]
    fn arguments_carry_fixed_options() {
        let request = ConversionRequest::new(Path::new("doc.md"), Path::new("doc.pdf"));
        let args = CommandRenderer::arguments(&request).unwrap();
        assert_eq!(args[0], "--pdf-options");
        assert_eq!(
            args[1],
            r#"{"format":"A4","margin":{"top":"20mm","right":"15mm","bottom":"20mm","left":"15mm"},"printBackground":true}"#
        );
        assert_eq!(args[2], "--css");
        assert_eq!(args[3], request.stylesheet);
        assert_eq!(args[4], "doc.md");
    }

    #[test]
    fn produced_path_swaps_extension() {
        assert_eq!(
            produced_path(Path::new("dir/SYSTEM_ARCHITECTURE.md")),
            PathBuf::from("dir/SYSTEM_ARCHITECTURE.pdf")
        );
    }

    #[cfg(unix)]
    fn fake_program(dir: &Path, body: &str) -> String {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join("fake-md-to-pdf");
        fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path.to_string_lossy().into_owned()
    }

    #[cfg(unix)]
    #[test]
    fn output_is_moved_to_destination() {
        let dir = tempfile::tempdir().unwrap();
        let program = fake_program(
            dir.path(),
            "for last; do :; done\nprintf '%%PDF-1.4' > \"${last%.md}.pdf\"",
        );
        let source = dir.path().join("notes.md");
        fs::write(&source, "# Notes\n").unwrap();
        let dest = dir.path().join("out").join("notes-final.pdf");
        fs::create_dir(dir.path().join("out")).unwrap();

        let renderer = CommandRenderer { program };
        let request = ConversionRequest::new(&source, &dest);
        assert!(renderer.render(&request).unwrap());
        assert_eq!(fs::read(&dest).unwrap(), b"%PDF-1.4");
        assert!(!dir.path().join("notes.pdf").exists());
    }

    #[cfg(unix)]
    #[test]
    fn stale_output_is_not_success() {
        let dir = tempfile::tempdir().unwrap();
        let program = fake_program(dir.path(), "exit 0");
        let source = dir.path().join("notes.md");
        fs::write(&source, "# Notes\n").unwrap();
        let dest = dir.path().join("notes.pdf");
        fs::write(&dest, "%PDF-1.4 from an earlier run").unwrap();

        let renderer = CommandRenderer { program };
        assert!(!renderer.render(&ConversionRequest::new(&source, &dest)).unwrap());
        assert!(!dest.exists());
    }

    #[cfg(unix)]
    #[test]
    fn stale_destination_elsewhere_is_left_alone() {
        let dir = tempfile::tempdir().unwrap();
        let program = fake_program(dir.path(), "exit 0");
        let source = dir.path().join("notes.md");
        fs::write(&source, "# Notes\n").unwrap();
        let dest = dir.path().join("final.pdf");
        fs::write(&dest, "old").unwrap();

        let renderer = CommandRenderer { program };
        assert!(!renderer.render(&ConversionRequest::new(&source, &dest)).unwrap());
        assert_eq!(fs::read(&dest).unwrap(), b"old");
    }

    #[cfg(unix)]
    #[test]
    fn failure_reports_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let program = fake_program(dir.path(), "echo 'browser crashed' >&2\nexit 3");
        let source = dir.path().join("notes.md");
        fs::write(&source, "# Notes\n").unwrap();
        let dest = dir.path().join("notes.pdf");

        let renderer = CommandRenderer { program };
        let err = renderer
            .render(&ConversionRequest::new(&source, &dest))
            .unwrap_err();
        assert_eq!(err.to_string(), "browser crashed");
        assert!(!dest.exists());
    }
}

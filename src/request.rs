//! The fixed rendering options handed to every backend.

use std::path::{Path, PathBuf};

use serde::Serialize;

/// Stylesheet embedded into every rendered document.
pub const STYLESHEET: &str = r#"
body {
  font-family: 'Segoe UI', Arial, sans-serif;
  line-height: 1.6;
  color: #333;
}
h1 {
  color: #0B2D5B;
  border-bottom: 3px solid #0B2D5B;
  padding-bottom: 10px;
}
h2 {
  color: #0B2D5B;
  margin-top: 30px;
  border-bottom: 2px solid #e0e0e0;
  padding-bottom: 5px;
}
h3 {
  color: #555;
  margin-top: 20px;
}
code {
  background-color: #f4f4f4;
  padding: 2px 6px;
  border-radius: 3px;
  font-family: 'Courier New', monospace;
}
pre {
  background-color: #f4f4f4;
  padding: 15px;
  border-radius: 5px;
  overflow-x: auto;
}
table {
  border-collapse: collapse;
  width: 100%;
  margin: 15px 0;
}
th, td {
  border: 1px solid #ddd;
  padding: 8px;
  text-align: left;
}
th {
  background-color: #0B2D5B;
  color: white;
}
"#;

/// Paper size, named the way md-to-pdf (puppeteer) names them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PageFormat {
    A3,
    A4,
    A5,
    Letter,
    Legal,
}

impl PageFormat {
    /// Paper name understood by typst's `page(paper: ..)`.
    pub fn typst_paper(self) -> &'static str {
        match self {
            PageFormat::A3 => "a3",
            PageFormat::A4 => "a4",
            PageFormat::A5 => "a5",
            PageFormat::Letter => "us-letter",
            PageFormat::Legal => "us-legal",
        }
    }
}

/// Page margins as CSS lengths.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Margins {
    pub top: &'static str,
    pub right: &'static str,
    pub bottom: &'static str,
    pub left: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PdfOptions {
    pub format: PageFormat,
    pub margin: Margins,
    pub print_background: bool,
}

impl Default for PdfOptions {
    fn default() -> Self {
        Self {
            format: PageFormat::A4,
            margin: Margins {
                top: "20mm",
                right: "15mm",
                bottom: "20mm",
                left: "15mm",
            },
            print_background: true,
        }
    }
}

/// Everything a renderer needs for one conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionRequest {
    pub source: PathBuf,
    pub dest: PathBuf,
    pub pdf_options: PdfOptions,
    pub stylesheet: &'static str,
}

impl ConversionRequest {
    /// Build a request with the fixed layout and stylesheet.
    pub fn new(source: &Path, dest: &Path) -> Self {
        Self {
            source: source.to_path_buf(),
            dest: dest.to_path_buf(),
            pdf_options: PdfOptions::default(),
            stylesheet: STYLESHEET,
        }
    }
}

/// Success flag plus an operator-facing message on failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionResult {
    pub success: bool,
    pub message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_layout_values() {
        let request = ConversionRequest::new(Path::new("in.md"), Path::new("out.pdf"));
        let options = &request.pdf_options;
        assert_eq!(options.format, PageFormat::A4);
        assert_eq!(options.margin.top, "20mm");
        assert_eq!(options.margin.bottom, "20mm");
        assert_eq!(options.margin.left, "15mm");
        assert_eq!(options.margin.right, "15mm");
        assert!(options.print_background);
        assert_eq!(request.stylesheet, STYLESHEET);
    }

    #[test]
    fn requests_are_identical_across_invocations() {
        let a = ConversionRequest::new(Path::new("a.md"), Path::new("a.pdf"));
        let b = ConversionRequest::new(Path::new("a.md"), Path::new("a.pdf"));
        assert_eq!(a, b);
    }

    #[test]
    fn pdf_options_serialize_for_md_to_pdf() {
        let json = serde_json::to_string(&PdfOptions::default()).unwrap();
        assert_eq!(
            json,
            r#"{"format":"A4","margin":{"top":"20mm","right":"15mm","bottom":"20mm","left":"15mm"},"printBackground":true}"#
        );
    }

    #[test]
    fn stylesheet_covers_headings_code_and_tables() {
        for selector in ["h1 {", "h2 {", "h3 {", "code {", "pre {", "table {", "th {"] {
            assert!(STYLESHEET.contains(selector), "missing {selector}");
        }
    }

    #[test]
    fn typst_paper_names() {
        assert_eq!(PageFormat::A4.typst_paper(), "a4");
        assert_eq!(PageFormat::Letter.typst_paper(), "us-letter");
    }
}

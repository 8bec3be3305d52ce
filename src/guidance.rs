//! What to tell the operator when no renderer can be resolved.

use std::io::{self, Write};

/// Commands that install the external renderer and re-run the conversion.
pub const INSTALL_COMMANDS: [&str; 2] = ["npm install -g md-to-pdf", "convert-to-pdf"];

/// A way to produce the PDF by hand.
#[derive(Debug, Clone, PartialEq)]
pub struct Alternative {
    pub name: &'static str,
    pub steps: Vec<String>,
}

/// The three manual alternatives, spelled out for `source` and `dest`.
pub fn alternatives(source: &str, dest: &str) -> [Alternative; 3] {
    [
        Alternative {
            name: "Online converter",
            steps: vec![
                "- Visit https://www.markdowntopdf.com/".to_string(),
                format!("- Upload {}", source),
                "- Download the PDF".to_string(),
            ],
        },
        Alternative {
            name: "VS Code extension",
            steps: vec![
                "- Install \"Markdown PDF\" extension".to_string(),
                format!("- Open {}", source),
                "- Right-click → \"Markdown PDF: Export (pdf)\"".to_string(),
            ],
        },
        Alternative {
            name: "Pandoc (if installed)",
            steps: vec![format!("pandoc {} -o {}", source, dest)],
        },
    ]
}

/// Print install commands and manual alternatives.
pub fn write(out: &mut dyn Write, source: &str, dest: &str) -> io::Result<()> {
    writeln!(out, "No PDF renderer is available.")?;
    writeln!(out, "\nPlease run the following commands:")?;
    for command in INSTALL_COMMANDS {
        writeln!(out, "  {}", command)?;
    }
    writeln!(out, "\nOr use one of these alternative methods:")?;
    for (n, alternative) in alternatives(source, dest).iter().enumerate() {
        writeln!(out, "\n{}. {}:", n + 1, alternative.name)?;
        for step in &alternative.steps {
            writeln!(out, "   {}", step)?;
        }
    }
    Ok(())
}

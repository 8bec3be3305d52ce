use std::fs;

use typst_as_lib::TypstEngine;
use typst_as_lib::typst_kit_options::TypstKitFontOptions;
use typst_library::layout::PagedDocument;
use typst_pdf::PdfOptions;

use super::{Renderer, write_atomically};
use crate::error::ConvertError;
use crate::request::ConversionRequest;

/// In-process renderer: markdown to Typst markup to PDF.
pub struct TypstRenderer {
    system_fonts: bool,
}

impl TypstRenderer {
    pub fn new(system_fonts: bool) -> Self {
        Self { system_fonts }
    }

    /// Compile markdown to PDF bytes with the request's layout and stylesheet.
    pub fn compile(
        &self,
        markdown: &str,
        request: &ConversionRequest,
    ) -> Result<Vec<u8>, ConvertError> {
        let doc = self.layout(markdown, request)?;
        typst_pdf::pdf(&doc, &PdfOptions::default())
            .map_err(|e| ConvertError::Rendering(format!("PDF generation failed: {:?}", e)))
    }

    /// Lay markdown out into pages.
    fn layout(
        &self,
        markdown: &str,
        request: &ConversionRequest,
    ) -> Result<PagedDocument, ConvertError> {
        let typst_content = crate::markdown_to_typst(markdown, request);

        let font_options = TypstKitFontOptions::new()
            .include_embedded_fonts(true)
            .include_system_fonts(self.system_fonts);

        let engine = TypstEngine::builder()
            .main_file(typst_content)
            .search_fonts_with(font_options)
            .build();

        let compiled = engine.compile();
        for warning in compiled.warnings.iter() {
            log::debug!("typst: {}", warning.message);
        }
        let doc: PagedDocument = compiled
            .output
            .map_err(|e| ConvertError::Rendering(format!("Typst compilation failed: {:?}", e)))?;
        log::info!("Laid out {} pages", doc.pages.len());
        Ok(doc)
    }
}

impl Renderer for TypstRenderer {
    fn name(&self) -> &str {
        "typst"
    }

    fn render(&self, request: &ConversionRequest) -> Result<bool, ConvertError> {
        let markdown = fs::read_to_string(&request.source)?;
        let pdf = self.compile(&markdown, request)?;
        write_atomically(&request.dest, &pdf)?;
        Ok(true)
    }
}

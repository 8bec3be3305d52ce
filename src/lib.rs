pub mod backend;
#[cfg(feature = "typst")]
mod block;
pub mod config;
pub mod converter;
pub mod error;
pub mod guidance;
#[cfg(feature = "typst")]
mod parser;
pub mod request;
#[cfg(feature = "typst")]
mod style;
#[cfg(feature = "typst")]
mod typst;

#[cfg(feature = "typst")]
pub use block::{Block, List, ListItem, Span};
pub use config::Config;
pub use converter::{OUTPUT_FILE, Outcome, SOURCE_FILE, convert, run};
pub use error::ConvertError;
pub use request::{ConversionRequest, ConversionResult, STYLESHEET};

/// Parse markdown text into a vector of blocks.
#[cfg(feature = "typst")]
pub fn parse(markdown: &str) -> Vec<Block> {
    parser::parse(markdown)
}

/// Convert markdown to a Typst document laid out and styled per `request`.
#[cfg(feature = "typst")]
pub fn markdown_to_typst(markdown: &str, request: &ConversionRequest) -> String {
    let blocks = parse(markdown);
    typst::blocks_to_typst(&blocks, request)
}

use pulldown_cmark::{CodeBlockKind, Event, HeadingLevel, Options, Parser, Tag, TagEnd};

use crate::block::{Block, List, ListItem, Span};

/// Paragraph text that forces a page break
const PAGEBREAK_MARKER: &str = "---pagebreak---";

/// Strip YAML frontmatter from the beginning of markdown content
fn strip_frontmatter(markdown: &str) -> &str {
    let Some(first_line) = markdown.lines().next() else {
        return markdown;
    };
    if first_line.trim_end() != "---" {
        return markdown;
    }
    // Find the closing ---
    if let Some(end) = markdown[3..].find("\n---") {
        // Skip past the closing --- and any trailing newline
        let after_frontmatter = &markdown[3 + end + 4..];
        after_frontmatter.trim_start_matches(['\r', '\n'])
    } else {
        markdown
    }
}

/// Parse markdown text into a list of blocks
pub fn parse(markdown: &str) -> Vec<Block> {
    let markdown = strip_frontmatter(markdown);
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_TASKLISTS);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    let parser = Parser::new_ext(markdown, options);
    let mut blocks = Vec::new();
    let mut state = ParseState::default();

    for event in parser {
        process_event(event, &mut state, &mut blocks);
    }

    blocks
}

#[derive(Default)]
struct ParseState {
    // Current inline content being built
    spans: Vec<Span>,
    // Nested span buffers for formatting
    span_stack: Vec<Vec<Span>>,

    // Current heading level (if in a heading)
    heading_level: Option<u8>,

    // Code block state
    in_code_block: bool,
    code_language: Option<String>,
    code_content: String,

    // Link state, innermost last
    link_urls: Vec<String>,

    // List state
    list_stack: Vec<ListBuilder>,

    // Open block quotes, innermost last
    quote_stack: Vec<QuoteBuilder>,

    // Table state
    table_headers: Vec<Vec<Span>>,
    table_rows: Vec<Vec<Vec<Span>>>,
    current_row: Vec<Vec<Span>>,
    in_table_head: bool,
}

struct ListBuilder {
    ordered: bool,
    start: u64,
    items: Vec<ListItem>,
    current_item_spans: Vec<Span>,
    current_item_checked: Option<bool>,
    current_item_nested: Option<Box<List>>,
}

struct QuoteBuilder {
    // Lists that were already open when the quote started
    list_depth: usize,
    blocks: Vec<Block>,
}

impl ListBuilder {
    fn append_to_item(&mut self, content: Vec<Span>) {
        if content.is_empty() {
            return;
        }
        // Loose list items hold several paragraphs
        if !self.current_item_spans.is_empty() {
            self.current_item_spans.push(Span::LineBreak);
        }
        self.current_item_spans.extend(content);
    }
}

/// Open a nested span buffer for bold/italic/strike/link/image content.
fn open_span(state: &mut ParseState) {
    state.span_stack.push(std::mem::take(&mut state.spans));
}

/// Close the innermost span buffer, wrapping its content with `wrap`.
fn close_span(state: &mut ParseState, wrap: impl FnOnce(Vec<Span>) -> Span) {
    let content = std::mem::take(&mut state.spans);
    if let Some(mut parent) = state.span_stack.pop() {
        parent.push(wrap(content));
        state.spans = parent;
    }
}

/// Whether inline content belongs to the innermost open list item rather than
/// to a quote opened inside it.
fn in_list_item(state: &ParseState) -> bool {
    let outer_lists = state.quote_stack.last().map_or(0, |quote| quote.list_depth);
    state.list_stack.len() > outer_lists
}

/// Add a finished block to the innermost open quote, or to the document.
fn emit(state: &mut ParseState, blocks: &mut Vec<Block>, block: Block) {
    match state.quote_stack.last_mut() {
        Some(quote) => quote.blocks.push(block),
        None => blocks.push(block),
    }
}

/// Move inline text of a tight list item into the item before a nested
/// block starts.
fn flush_item_text(state: &mut ParseState) {
    let pending = std::mem::take(&mut state.spans);
    if in_list_item(state) {
        if let Some(parent) = state.list_stack.last_mut() {
            parent.append_to_item(pending);
        }
    }
}

fn is_pagebreak(content: &[Span]) -> bool {
    matches!(content, [Span::Text(text)] if text.trim() == PAGEBREAK_MARKER)
}

fn process_event(event: Event, state: &mut ParseState, blocks: &mut Vec<Block>) {
    match event {
        // Headings
        Event::Start(Tag::Heading { level, .. }) => {
            state.heading_level = Some(heading_level_to_u8(level));
        }
        Event::End(TagEnd::Heading(_)) => {
            if let Some(level) = state.heading_level.take() {
                let content = std::mem::take(&mut state.spans);
                emit(state, blocks, Block::Heading { level, content });
            }
        }

        // Paragraphs
        Event::Start(Tag::Paragraph) => {}
        Event::End(TagEnd::Paragraph) => {
            let content = std::mem::take(&mut state.spans);
            if content.is_empty() {
                return;
            }
            if in_list_item(state) {
                if let Some(list) = state.list_stack.last_mut() {
                    list.append_to_item(content);
                }
            } else if state.quote_stack.is_empty() && is_pagebreak(&content) {
                // Page breaks are only honoured at the top level
                blocks.push(Block::PageBreak);
            } else {
                emit(state, blocks, Block::Paragraph { content });
            }
        }

        // Block quotes
        Event::Start(Tag::BlockQuote(_)) => {
            flush_item_text(state);
            state.quote_stack.push(QuoteBuilder {
                list_depth: state.list_stack.len(),
                blocks: Vec::new(),
            });
        }
        Event::End(TagEnd::BlockQuote(_)) => {
            if let Some(quote) = state.quote_stack.pop() {
                if !quote.blocks.is_empty() {
                    emit(state, blocks, Block::Quote { blocks: quote.blocks });
                }
            }
        }

        // Text content
        Event::Text(text) => {
            if state.in_code_block {
                state.code_content.push_str(&text);
            } else {
                state.spans.push(Span::Text(text.into_string()));
            }
        }

        // Inline code
        Event::Code(code) => {
            state.spans.push(Span::Code(code.into_string()));
        }

        // Bold
        Event::Start(Tag::Strong) => open_span(state),
        Event::End(TagEnd::Strong) => close_span(state, Span::Bold),

        // Italic
        Event::Start(Tag::Emphasis) => open_span(state),
        Event::End(TagEnd::Emphasis) => close_span(state, Span::Italic),

        // Strikethrough
        Event::Start(Tag::Strikethrough) => open_span(state),
        Event::End(TagEnd::Strikethrough) => close_span(state, Span::Strike),

        // Links
        Event::Start(Tag::Link { dest_url, .. }) => {
            state.link_urls.push(dest_url.into_string());
            open_span(state);
        }
        Event::End(TagEnd::Link) => {
            let url = state.link_urls.pop().unwrap_or_default();
            close_span(state, |content| Span::Link { url, content });
        }

        // Images have no file access here; keep the alt text
        Event::Start(Tag::Image { .. }) => open_span(state),
        Event::End(TagEnd::Image) => close_span(state, Span::Italic),

        // Code blocks
        Event::Start(Tag::CodeBlock(kind)) => {
            state.in_code_block = true;
            state.code_language = match kind {
                CodeBlockKind::Fenced(lang) => {
                    // Info strings may carry attributes after the language
                    let lang = lang.split_whitespace().next().unwrap_or("").to_string();
                    if lang.is_empty() { None } else { Some(lang) }
                }
                CodeBlockKind::Indented => None,
            };
            state.code_content.clear();
        }
        Event::End(TagEnd::CodeBlock) => {
            state.in_code_block = false;
            let content = std::mem::take(&mut state.code_content);
            let language = state.code_language.take();
            emit(state, blocks, Block::CodeBlock { language, content });
        }

        // Lists
        Event::Start(Tag::List(first_item)) => {
            // Text of a tight parent item arrives before its nested list
            flush_item_text(state);
            state.list_stack.push(ListBuilder {
                ordered: first_item.is_some(),
                start: first_item.unwrap_or(1),
                items: Vec::new(),
                current_item_spans: Vec::new(),
                current_item_checked: None,
                current_item_nested: None,
            });
        }
        Event::End(TagEnd::List(_)) => {
            if let Some(list_builder) = state.list_stack.pop() {
                let list = List {
                    ordered: list_builder.ordered,
                    start: list_builder.start,
                    items: list_builder.items,
                };
                // If there's a parent list, this is nested in its open item
                if in_list_item(state) {
                    if let Some(parent) = state.list_stack.last_mut() {
                        parent.current_item_nested = Some(Box::new(list));
                    }
                } else {
                    emit(state, blocks, Block::List(list));
                }
            }
        }

        Event::Start(Tag::Item) => {
            if let Some(list) = state.list_stack.last_mut() {
                list.current_item_spans.clear();
                list.current_item_checked = None;
                list.current_item_nested = None;
            }
        }
        Event::End(TagEnd::Item) => {
            // Collect any remaining spans
            let remaining = std::mem::take(&mut state.spans);

            if let Some(list) = state.list_stack.last_mut() {
                list.append_to_item(remaining);
                let content = std::mem::take(&mut list.current_item_spans);
                let checked = list.current_item_checked.take();
                let nested = list.current_item_nested.take();
                list.items.push(ListItem {
                    content,
                    nested,
                    checked,
                });
            }
        }

        // Task list checkboxes
        Event::TaskListMarker(checked) => {
            if let Some(list) = state.list_stack.last_mut() {
                list.current_item_checked = Some(checked);
            }
        }

        // Tables
        Event::Start(Tag::Table(_)) => {
            state.table_headers.clear();
            state.table_rows.clear();
        }
        Event::End(TagEnd::Table) => {
            let headers = std::mem::take(&mut state.table_headers);
            let rows = std::mem::take(&mut state.table_rows);
            emit(state, blocks, Block::Table { headers, rows });
        }

        Event::Start(Tag::TableHead) => {
            state.in_table_head = true;
            state.current_row.clear();
        }
        Event::End(TagEnd::TableHead) => {
            state.in_table_head = false;
            state.table_headers = std::mem::take(&mut state.current_row);
        }

        Event::Start(Tag::TableRow) => {
            state.current_row.clear();
        }
        Event::End(TagEnd::TableRow) => {
            if !state.in_table_head {
                let row = std::mem::take(&mut state.current_row);
                state.table_rows.push(row);
            }
        }

        Event::Start(Tag::TableCell) => {
            state.spans.clear();
        }
        Event::End(TagEnd::TableCell) => {
            let cell_content = std::mem::take(&mut state.spans);
            state.current_row.push(cell_content);
        }

        // Horizontal rule
        Event::Rule => {
            emit(state, blocks, Block::Rule);
        }

        // Soft/hard breaks
        Event::SoftBreak => {
            state.spans.push(Span::Text(" ".to_string()));
        }
        Event::HardBreak => {
            state.spans.push(Span::LineBreak);
        }

        // Raw HTML, footnotes and math are not rendered
        _ => {}
    }
}

fn heading_level_to_u8(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

use crate::block::{Block, List, Span};
use crate::request::ConversionRequest;
use crate::style::{self, Theme};

/// Convert blocks to a complete Typst document: page setup, stylesheet rules
/// and content.
pub fn blocks_to_typst(blocks: &[Block], request: &ConversionRequest) -> String {
    let options = &request.pdf_options;
    let theme = Theme::new(request.stylesheet, options.print_background);

    let mut out = String::new();
    let margin = &options.margin;
    let side = |value: &str| style::length(value).unwrap_or_else(|| "0pt".to_string());
    out.push_str(&format!(
        "#set page(paper: \"{}\", margin: (top: {}, right: {}, bottom: {}, left: {}))\n",
        options.format.typst_paper(),
        side(margin.top),
        side(margin.right),
        side(margin.bottom),
        side(margin.left),
    ));

    // Set up paragraph settings to prevent widows/orphans
    out.push_str("#set par(linebreaks: \"optimized\")\n");
    out.push_str(&theme.to_typst());
    out.push('\n');

    out.push_str(&body_to_typst(blocks, theme.full_width_tables()));
    out
}

/// Tables and code blocks up to this many rows or lines are kept on one page.
const KEEP_TOGETHER_LINES: usize = 20;

/// Lists up to this many items (nested included) are kept on one page.
const KEEP_TOGETHER_ITEMS: usize = 5;

/// Convert blocks to Typst content markup, without any set/show rules.
pub(crate) fn body_to_typst(blocks: &[Block], full_width_tables: bool) -> String {
    let mut out = String::new();
    for block in blocks {
        emit_block(block, full_width_tables, &mut out);
    }
    out
}

fn emit_heading(block: &Block, out: &mut String) {
    if let Block::Heading { level, content } = block {
        for _ in 0..*level {
            out.push('=');
        }
        out.push(' ');
        spans_to_typst(content, out);
        out.push('\n');
        out.push('\n');
    }
}

fn emit_block(block: &Block, full_width_tables: bool, out: &mut String) {
    match block {
        Block::Heading { .. } => {
            // A sticky block stays on the page of the content that follows it
            out.push_str("#block(sticky: true)[\n");
            emit_heading(block, out);
            out.push_str("]\n\n");
        }
        Block::Paragraph { content } => {
            spans_to_typst(content, out);
            out.push('\n');
            out.push('\n');
        }
        Block::Quote { blocks } => {
            out.push_str("#quote(block: true)[\n");
            out.push_str(&body_to_typst(blocks, full_width_tables));
            out.push_str("]\n\n");
        }
        Block::CodeBlock { language, content } => {
            let fence = "`".repeat(longest_backtick_run(content).max(2) + 1);
            // Keep short code blocks together, let long ones flow across pages
            let keep_together = content.lines().count() <= KEEP_TOGETHER_LINES;
            if keep_together {
                out.push_str("#block(breakable: false)[\n");
            }
            out.push_str(&fence);
            if let Some(lang) = language {
                out.push_str(lang);
            }
            out.push('\n');
            out.push_str(content);
            if !content.ends_with('\n') {
                out.push('\n');
            }
            out.push_str(&fence);
            if keep_together {
                out.push_str("\n]");
            }
            out.push_str("\n\n");
        }
        Block::List(list) => {
            // Wrap list to keep together when small, allow breaks when large
            let item_count = count_list_items(list);
            if item_count <= KEEP_TOGETHER_ITEMS {
                out.push_str("#block(breakable: false)[\n");
                list_to_typst(list, 0, out);
                out.push_str("]\n\n");
            } else {
                list_to_typst(list, 0, out);
                out.push('\n');
            }
        }
        Block::Table { headers, rows } => {
            if rows.len() <= KEEP_TOGETHER_LINES {
                out.push_str("#block(breakable: false)[\n");
                table_to_typst(headers, rows, full_width_tables, out);
                out.push_str("]\n\n");
            } else {
                table_to_typst(headers, rows, full_width_tables, out);
                out.push('\n');
            }
        }
        Block::Rule => {
            out.push_str("#line(length: 100%)\n\n");
        }
        Block::PageBreak => {
            out.push_str("#pagebreak()\n\n");
        }
    }
}

fn longest_backtick_run(text: &str) -> usize {
    text.split(|c| c != '`').map(str::len).max().unwrap_or(0)
}

fn count_list_items(list: &List) -> usize {
    let mut count = list.items.len();
    for item in &list.items {
        if let Some(ref nested) = item.nested {
            count += count_list_items(nested);
        }
    }
    count
}

fn spans_to_typst(spans: &[Span], out: &mut String) {
    for span in spans {
        span_to_typst(span, out);
    }
}

/// Markup state at the end of `out`: whether the next character starts a
/// line (where `=`, `-`, `+` are structural) and whether the line so far is
/// only digits (where a following `.` makes an enumeration).
fn line_state(out: &str) -> (bool, bool) {
    let line = out.rsplit('\n').next().unwrap_or("");
    let line = line.trim_start_matches(|c: char| c == '=' || c.is_whitespace());
    let segment = line.rsplit('[').next().unwrap_or("");
    let line_start = segment.is_empty();
    let digits_only = !line_start && segment.chars().all(|c| c.is_ascii_digit());
    (line_start, digits_only)
}

fn escape_text(text: &str, out: &mut String) {
    let (mut line_start, mut digits_only) = line_state(out);
    let mut chars = text.chars().peekable();
    let mut prev = out.chars().last();

    while let Some(ch) = chars.next() {
        let structural = match ch {
            '#' | '*' | '_' | '@' | '$' | '\\' | '`' | '<' | '>' | '[' | ']' | '~' | '/' => true,
            // Dashes turn into en/em dashes when repeated
            '-' => line_start || prev == Some('-') || chars.peek() == Some(&'-'),
            '=' | '+' => line_start,
            '.' => digits_only,
            _ => false,
        };
        if structural {
            out.push('\\');
        }
        out.push(ch);
        digits_only = ch.is_ascii_digit() && (line_start || digits_only);
        line_start = false;
        prev = Some(ch);
    }
}

fn span_to_typst(span: &Span, out: &mut String) {
    match span {
        Span::Text(text) => escape_text(text, out),
        // Function calls rather than `*`/`_` delimiters, which do not work
        // inside words
        Span::Bold(inner) => call_with_content("#strong[", inner, out),
        Span::Italic(inner) => call_with_content("#emph[", inner, out),
        Span::Strike(inner) => call_with_content("#strike[", inner, out),
        Span::Code(text) => {
            if text.contains('`') {
                // Single-backtick raw cannot hold a backtick
                out.push_str("#raw(");
                out.push_str(&string_literal(text));
                out.push_str(");");
            } else {
                out.push('`');
                out.push_str(text);
                out.push('`');
            }
        }
        Span::Link { url, content } => {
            out.push_str("#link(");
            out.push_str(&string_literal(url));
            call_with_content(")[", content, out);
        }
        Span::LineBreak => {
            out.push_str(" \\\n");
        }
    }
}

/// Finish an embedded call with a content argument. The closing `;` keeps
/// following text such as `(` or `.` from continuing the expression.
fn call_with_content(open: &str, content: &[Span], out: &mut String) {
    out.push_str(open);
    spans_to_typst(content, out);
    out.push_str("];");
}

/// Quote `text` as a Typst string literal.
fn string_literal(text: &str) -> String {
    let mut lit = String::with_capacity(text.len() + 2);
    lit.push('"');
    for ch in text.chars() {
        match ch {
            '"' | '\\' => {
                lit.push('\\');
                lit.push(ch);
            }
            '\n' => lit.push_str("\\n"),
            _ => lit.push(ch),
        }
    }
    lit.push('"');
    lit
}

fn list_to_typst(list: &List, indent: usize, out: &mut String) {
    let indent_str: String = "  ".repeat(indent);

    for (n, item) in list.items.iter().enumerate() {
        out.push_str(&indent_str);
        if !list.ordered {
            out.push('-');
        } else if n == 0 && list.start != 1 {
            out.push_str(&format!("{}.", list.start));
        } else {
            out.push('+');
        }
        out.push(' ');
        match item.checked {
            Some(true) => out.push_str("☒ "),
            Some(false) => out.push_str("☐ "),
            None => {}
        }
        spans_to_typst(&item.content, out);
        out.push('\n');

        if let Some(ref nested) = item.nested {
            list_to_typst(nested, indent + 1, out);
        }
    }
}

fn table_to_typst(
    headers: &[Vec<Span>],
    rows: &[Vec<Vec<Span>>],
    full_width: bool,
    out: &mut String,
) {
    let col_count = headers.len();
    if col_count == 0 {
        return;
    }

    out.push_str("#table(\n");
    if full_width {
        out.push_str(&format!("  columns: (1fr,) * {},\n", col_count));
    } else {
        out.push_str(&format!("  columns: {},\n", col_count));
    }

    // Header cells (bold)
    for cell in headers {
        out.push_str("  [*");
        spans_to_typst(cell, out);
        out.push_str("*],\n");
    }

    // Data rows, padded or cut to the header width
    for row in rows {
        for i in 0..col_count {
            out.push_str("  [");
            if let Some(cell) = row.get(i) {
                spans_to_typst(cell, out);
            }
            out.push_str("],\n");
        }
    }

    out.push_str(")\n");
}

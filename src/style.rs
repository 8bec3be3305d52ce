//! Applies the embedded CSS stylesheet to Typst output.
//!
//! Only the handful of selectors and properties the stylesheet uses are
//! understood: `body`, `h1`-`h6`, `code`, `pre`, `table`, `th`, `td`, with
//! colors, font families, borders, paddings, radii and line height.

/// One `selectors { declarations }` rule.
#[derive(Debug, Clone, PartialEq)]
struct Rule {
    selectors: Vec<String>,
    declarations: Vec<(String, String)>,
}

fn parse_rules(css: &str) -> Vec<Rule> {
    let css = strip_comments(css);
    let mut rules = Vec::new();
    let mut rest = css.as_str();

    while let Some(open) = rest.find('{') {
        let Some(close) = rest[open..].find('}') else {
            break;
        };
        let selectors = rest[..open]
            .split(',')
            .map(|s| s.trim().to_ascii_lowercase())
            .filter(|s| !s.is_empty())
            .collect();
        let declarations = rest[open + 1..open + close]
            .split(';')
            .filter_map(|decl| {
                let (property, value) = decl.split_once(':')?;
                let property = property.trim().to_ascii_lowercase();
                let value = value.trim().to_string();
                if property.is_empty() || value.is_empty() {
                    None
                } else {
                    Some((property, value))
                }
            })
            .collect();
        rules.push(Rule {
            selectors,
            declarations,
        });
        rest = &rest[open + close + 1..];
    }

    rules
}

fn strip_comments(css: &str) -> String {
    let mut out = String::with_capacity(css.len());
    let mut rest = css;
    while let Some(start) = rest.find("/*") {
        out.push_str(&rest[..start]);
        match rest[start + 2..].find("*/") {
            Some(end) => rest = &rest[start + 2 + end + 2..],
            None => return out,
        }
    }
    out.push_str(rest);
    out
}

/// Convert a CSS length to a Typst length. Pixels are converted at 96 dpi.
pub(crate) fn length(value: &str) -> Option<String> {
    let value = value.trim();
    if value == "0" {
        return Some("0pt".to_string());
    }
    if let Some(px) = value.strip_suffix("px") {
        let px: f64 = px.trim().parse().ok()?;
        return Some(format!("{}pt", px * 0.75));
    }
    for unit in ["pt", "mm", "cm", "in", "em"] {
        if let Some(number) = value.strip_suffix(unit) {
            number.trim().parse::<f64>().ok()?;
            return Some(value.to_string());
        }
    }
    None
}

/// Convert a CSS color to a Typst color expression.
fn color(value: &str) -> Option<String> {
    let value = value.trim();
    if let Some(hex) = value.strip_prefix('#') {
        let valid = matches!(hex.len(), 3 | 4 | 6 | 8) && hex.chars().all(|c| c.is_ascii_hexdigit());
        return valid.then(|| format!("rgb(\"#{}\")", hex));
    }
    let hex = match value.to_ascii_lowercase().as_str() {
        "white" => "ffffff",
        "black" => "000000",
        "gray" | "grey" => "808080",
        "silver" => "c0c0c0",
        "red" => "ff0000",
        "maroon" => "800000",
        "green" => "008000",
        "lime" => "00ff00",
        "blue" => "0000ff",
        "navy" => "000080",
        "teal" => "008080",
        "purple" => "800080",
        "orange" => "ffa500",
        "yellow" => "ffff00",
        _ => return None,
    };
    Some(format!("rgb(\"#{}\")", hex))
}

/// Typst font list for a CSS `font-family` value. Generic families map to
/// the fonts embedded in the renderer.
fn font_list(value: &str) -> Option<String> {
    let fonts: Vec<String> = value
        .split(',')
        .map(|f| f.trim().trim_matches(|c| c == '\'' || c == '"'))
        .filter_map(|f| match f {
            "" | "sans-serif" | "system-ui" | "cursive" | "fantasy" => None,
            "monospace" => Some("DejaVu Sans Mono".to_string()),
            "serif" => Some("Libertinus Serif".to_string()),
            other => Some(other.to_string()),
        })
        .map(|f| format!("\"{}\"", f.replace('"', "")))
        .collect();
    match fonts.len() {
        0 => None,
        // A one-element Typst array needs the trailing comma
        1 => Some(format!("({},)", fonts[0])),
        _ => Some(format!("({})", fonts.join(", "))),
    }
}

/// Width and color of a `border`/`border-bottom` shorthand.
fn border(value: &str) -> Option<(String, String)> {
    let mut width = None;
    let mut paint = None;
    for token in value.split_whitespace() {
        if width.is_none() {
            if let Some(w) = length(token) {
                width = Some(w);
                continue;
            }
        }
        if paint.is_none() {
            paint = color(token);
        }
    }
    if value.split_whitespace().any(|t| t == "none") {
        return None;
    }
    Some((width.unwrap_or_else(|| "0.75pt".to_string()), paint?))
}

/// Expand a `padding` shorthand to (top, right, bottom, left).
fn box_sides(value: &str) -> Option<[String; 4]> {
    let parts: Vec<String> = value
        .split_whitespace()
        .map(length)
        .collect::<Option<_>>()?;
    let sides = match parts.as_slice() {
        [all] => [all.clone(), all.clone(), all.clone(), all.clone()],
        [y, x] => [y.clone(), x.clone(), y.clone(), x.clone()],
        [top, x, bottom] => [top.clone(), x.clone(), bottom.clone(), x.clone()],
        [top, right, bottom, left] => [top.clone(), right.clone(), bottom.clone(), left.clone()],
        _ => return None,
    };
    Some(sides)
}

fn inset(sides: &[String; 4]) -> String {
    let [top, right, bottom, left] = sides;
    if top == right && right == bottom && bottom == left {
        top.clone()
    } else {
        format!("(top: {top}, right: {right}, bottom: {bottom}, left: {left})")
    }
}

/// A parsed stylesheet, ready to emit Typst rules.
#[derive(Debug, Clone)]
pub struct Theme {
    rules: Vec<Rule>,
    print_background: bool,
}

impl Theme {
    pub fn new(stylesheet: &str, print_background: bool) -> Self {
        Self {
            rules: parse_rules(stylesheet),
            print_background,
        }
    }

    /// Last declared value of `property` for `selector`, as in the cascade.
    fn get(&self, selector: &str, property: &str) -> Option<&str> {
        self.rules
            .iter()
            .filter(|rule| rule.selectors.iter().any(|s| s == selector))
            .flat_map(|rule| rule.declarations.iter())
            .filter(|(p, _)| p == property)
            .map(|(_, v)| v.as_str())
            .last()
    }

    /// Background color for `selector`, dropped when backgrounds are off.
    fn fill(&self, selector: &str) -> Option<String> {
        if !self.print_background {
            return None;
        }
        self.get(selector, "background-color")
            .or_else(|| self.get(selector, "background"))
            .and_then(color)
    }

    /// Whether tables should span the full text width.
    pub fn full_width_tables(&self) -> bool {
        self.get("table", "width") == Some("100%")
    }

    /// Typst set/show rules for the whole stylesheet.
    pub fn to_typst(&self) -> String {
        let mut out = String::new();
        self.emit_body(&mut out);
        for level in 1..=6 {
            self.emit_heading(level, &mut out);
        }
        self.emit_code(&mut out);
        self.emit_table(&mut out);
        out
    }

    fn emit_body(&self, out: &mut String) {
        let mut args = Vec::new();
        if let Some(fonts) = self.get("body", "font-family").and_then(font_list) {
            args.push(format!("font: {fonts}"));
        }
        if let Some(fill) = self.get("body", "color").and_then(color) {
            args.push(format!("fill: {fill}"));
        }
        if !args.is_empty() {
            out.push_str(&format!("#set text({})\n", args.join(", ")));
        }
        if let Some(leading) = self
            .get("body", "line-height")
            .and_then(|v| v.parse::<f64>().ok())
            .filter(|v| *v >= 1.0)
        {
            // Typst leading is the gap between lines, not the line box
            out.push_str(&format!("#set par(leading: {:.2}em)\n", leading - 1.0));
        }
    }

    fn emit_heading(&self, level: u8, out: &mut String) {
        let selector = format!("h{level}");
        let target = format!("heading.where(level: {level})");

        if let Some(fill) = self.get(&selector, "color").and_then(color) {
            out.push_str(&format!("#show {target}: set text(fill: {fill})\n"));
        }
        if let Some(above) = self.get(&selector, "margin-top").and_then(length) {
            out.push_str(&format!("#show {target}: set block(above: {above})\n"));
        }
        if let Some((width, paint)) = self.get(&selector, "border-bottom").and_then(border) {
            let padding = self
                .get(&selector, "padding-bottom")
                .and_then(length)
                .unwrap_or_else(|| "0pt".to_string());
            out.push_str(&format!(
                "#show {target}: it => block(width: 100%, inset: (bottom: {padding}), stroke: (bottom: {width} + {paint}), it)\n"
            ));
        }
    }

    fn emit_code(&self, out: &mut String) {
        if let Some(fonts) = self.get("code", "font-family").and_then(font_list) {
            out.push_str(&format!("#show raw: set text(font: {fonts})\n"));
        }

        if let Some(fill) = self.fill("code") {
            let mut args = vec![format!("fill: {fill}")];
            if let Some([_, right, _, left]) = self.get("code", "padding").and_then(box_sides) {
                args.push(format!("inset: (left: {left}, right: {right})"));
                args.push("outset: (y: 3pt)".to_string());
            }
            if let Some(radius) = self.get("code", "border-radius").and_then(length) {
                args.push(format!("radius: {radius}"));
            }
            out.push_str(&format!(
                "#show raw.where(block: false): box.with({})\n",
                args.join(", ")
            ));
        }

        let mut args = Vec::new();
        if let Some(fill) = self.fill("pre") {
            args.push(format!("fill: {fill}"));
        }
        if let Some(sides) = self.get("pre", "padding").and_then(box_sides) {
            args.push(format!("inset: {}", inset(&sides)));
        }
        if let Some(radius) = self.get("pre", "border-radius").and_then(length) {
            args.push(format!("radius: {radius}"));
        }
        if !args.is_empty() {
            args.push("width: 100%".to_string());
            out.push_str(&format!(
                "#show raw.where(block: true): block.with({})\n",
                args.join(", ")
            ));
        }
    }

    fn emit_table(&self, out: &mut String) {
        let mut args = Vec::new();
        let cell_border = self.get("td", "border").or_else(|| self.get("th", "border"));
        if let Some((width, paint)) = cell_border.and_then(border) {
            args.push(format!("stroke: {width} + {paint}"));
        }
        let cell_padding = self.get("td", "padding").or_else(|| self.get("th", "padding"));
        if let Some(sides) = cell_padding.and_then(box_sides) {
            args.push(format!("inset: {}", inset(&sides)));
        }
        if let Some(align) = self.get("td", "text-align") {
            if matches!(align, "left" | "center" | "right") {
                args.push(format!("align: {align}"));
            }
        }
        let header_fill = self.fill("th");
        if let Some(fill) = &header_fill {
            args.push(format!("fill: (_, y) => if y == 0 {{ {fill} }}"));
        }
        if !args.is_empty() {
            out.push_str(&format!("#set table({})\n", args.join(", ")));
        }

        // Header text color only makes sense on top of its fill
        if header_fill.is_some() {
            if let Some(paint) = self.get("th", "color").and_then(color) {
                out.push_str(&format!(
                    "#show table.cell.where(y: 0): set text(fill: {paint})\n"
                ));
            }
        }
        if let Some(margin) = self.get("table", "margin").and_then(box_sides) {
            let [top, _, bottom, _] = margin;
            out.push_str(&format!(
                "#show table: set block(above: {top}, below: {bottom})\n"
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::STYLESHEET;

    #[test]
    fn parses_grouped_selectors() {
        let rules = parse_rules("th, td { border: 1px solid #ddd; padding: 8px }");
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].selectors, vec!["th", "td"]);
        assert_eq!(
            rules[0].declarations,
            vec![
                ("border".to_string(), "1px solid #ddd".to_string()),
                ("padding".to_string(), "8px".to_string()),
            ]
        );
    }

    #[test]
    fn comments_are_ignored() {
        let rules = parse_rules("/* heading */ h1 { color: red; /* inline */ }");
        assert_eq!(rules[0].selectors, vec!["h1"]);
        assert_eq!(rules[0].declarations.len(), 1);
    }

    #[test]
    fn later_declarations_win() {
        let theme = Theme::new("th { color: red } th { color: white }", true);
        assert_eq!(theme.get("th", "color"), Some("white"));
    }

    #[test]
    fn lengths_convert_pixels() {
        assert_eq!(length("3px").as_deref(), Some("2.25pt"));
        assert_eq!(length("8px").as_deref(), Some("6pt"));
        assert_eq!(length("20mm").as_deref(), Some("20mm"));
        assert_eq!(length("0").as_deref(), Some("0pt"));
        assert_eq!(length("auto"), None);
    }

    #[test]
    fn colors_convert() {
        assert_eq!(color("#333").as_deref(), Some("rgb(\"#333\")"));
        assert_eq!(color("white").as_deref(), Some("rgb(\"#ffffff\")"));
        assert_eq!(color("#zzz"), None);
        assert_eq!(color("currentColor"), None);
    }

    #[test]
    fn font_lists_drop_unknown_generics() {
        assert_eq!(
            font_list("'Segoe UI', Arial, sans-serif").as_deref(),
            Some("(\"Segoe UI\", \"Arial\")")
        );
        assert_eq!(
            font_list("monospace").as_deref(),
            Some("(\"DejaVu Sans Mono\",)")
        );
    }

    #[test]
    fn padding_shorthand_expands() {
        let sides = box_sides("2px 6px").unwrap();
        assert_eq!(sides, ["1.5pt", "4.5pt", "1.5pt", "4.5pt"].map(String::from));
        assert_eq!(inset(&box_sides("15px").unwrap()), "11.25pt");
    }

    #[test]
    fn embedded_stylesheet_rules() {
        let typst = Theme::new(STYLESHEET, true).to_typst();
        assert!(typst.contains("#set text(font: (\"Segoe UI\", \"Arial\"), fill: rgb(\"#333\"))\n"));
        assert!(typst.contains("#set par(leading: 0.60em)\n"));
        assert!(typst.contains("#show heading.where(level: 1): set text(fill: rgb(\"#0B2D5B\"))\n"));
        assert!(typst.contains(
            "#show heading.where(level: 1): it => block(width: 100%, inset: (bottom: 7.5pt), stroke: (bottom: 2.25pt + rgb(\"#0B2D5B\")), it)\n"
        ));
        assert!(typst.contains("#show heading.where(level: 2): set block(above: 22.5pt)\n"));
        assert!(typst.contains("#show heading.where(level: 3): set text(fill: rgb(\"#555\"))\n"));
        assert!(typst.contains(
            "#show raw.where(block: true): block.with(fill: rgb(\"#f4f4f4\"), inset: 11.25pt, radius: 3.75pt, width: 100%)\n"
        ));
        assert!(typst.contains(
            "#set table(stroke: 0.75pt + rgb(\"#ddd\"), inset: 6pt, align: left, fill: (_, y) => if y == 0 { rgb(\"#0B2D5B\") })\n"
        ));
        assert!(typst.contains("#show table.cell.where(y: 0): set text(fill: rgb(\"#ffffff\"))\n"));
        assert!(Theme::new(STYLESHEET, true).full_width_tables());
    }

    #[test]
    fn backgrounds_are_dropped_when_not_printed() {
        let typst = Theme::new(STYLESHEET, false).to_typst();
        assert!(!typst.contains("fill: rgb(\"#f4f4f4\")"));
        assert!(!typst.contains("if y == 0"));
        assert!(!typst.contains("table.cell.where(y: 0)"));
        // Foreground colors stay
        assert!(typst.contains("set text(fill: rgb(\"#0B2D5B\"))"));
    }
}

//! Inline style engine.
//!
//! Converts one line of author text into styled spans:
//!
//! - `*bold*` and `_italic_` (contents are styled recursively)
//! - `` `code` `` (contents are literal)
//! - `[[url]]` and `[[url][label]]` links
//! - backslash escapes for `\ * _ ` [ ]`
//!
//! An opening `*` or `_` only counts when it starts the text or follows a
//! non-alphanumeric character, so `snake_case_names` and `2*3*4` stay
//! literal. Unterminated markup never fails: the delimiter is kept as text
//! and a [`StyleWarning`] is reported.
//!
//! Styling is not idempotent. Apply it exactly once to each raw string.

use std::fmt::Write as _;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Span {
    Text(String),
    Bold(Vec<Span>),
    Italic(Vec<Span>),
    Code(String),
    Link { url: String, content: Vec<Span> },
}

/// The styled form of one raw string.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Styled {
    pub spans: Vec<Span>,
}

/// Unrecognized or unterminated inline markup, kept as literal text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("column {column}: unterminated `{sequence}` kept as literal text")]
pub struct StyleWarning {
    /// 1-based character column of the offending delimiter.
    pub column: usize,
    pub sequence: String,
}

/// Style `input`, discarding warnings.
pub fn style(input: &str) -> Styled {
    style_with_warnings(input).0
}

pub fn style_with_warnings(input: &str) -> (Styled, Vec<StyleWarning>) {
    let chars: Vec<char> = input.chars().collect();
    let mut warnings = Vec::new();
    let spans = parse_spans(&chars, 0, &mut warnings);
    (Styled { spans }, warnings)
}

impl Styled {
    /// Unstyled text; never passes through the style engine.
    pub fn plain(text: impl Into<String>) -> Self {
        let text = text.into();
        if text.is_empty() {
            Styled::default()
        } else {
            Styled {
                spans: vec![Span::Text(text)],
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    /// Text content with all markup removed.
    pub fn plain_text(&self) -> String {
        let mut out = String::new();
        push_plain(&self.spans, &mut out);
        out
    }

    /// HTML for the spans, with all text escaped.
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        push_html(&self.spans, &mut out);
        out
    }
}

/// Escape text for use in HTML content and double-quoted attributes.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

fn parse_spans(chars: &[char], base: usize, warnings: &mut Vec<StyleWarning>) -> Vec<Span> {
    let mut spans = Vec::new();
    let mut text = String::new();
    let mut i = 0;

    while i < chars.len() {
        let ch = chars[i];
        match ch {
            '\\' if chars.get(i + 1).is_some_and(|&c| is_escapable(c)) => {
                text.push(chars[i + 1]);
                i += 2;
            }
            '`' => match find_char(chars, i + 1, '`') {
                Some(end) => {
                    flush(&mut text, &mut spans);
                    spans.push(Span::Code(chars[i + 1..end].iter().collect()));
                    i = end + 1;
                }
                None => {
                    warn(warnings, base + i, "`");
                    text.push(ch);
                    i += 1;
                }
            },
            '*' | '_' if opens_emphasis(chars, i) => match find_emphasis_close(chars, i) {
                Some(end) => {
                    flush(&mut text, &mut spans);
                    let inner = parse_spans(&chars[i + 1..end], base + i + 1, warnings);
                    spans.push(if ch == '*' {
                        Span::Bold(inner)
                    } else {
                        Span::Italic(inner)
                    });
                    i = end + 1;
                }
                None => {
                    warn(warnings, base + i, &ch.to_string());
                    text.push(ch);
                    i += 1;
                }
            },
            '[' if chars.get(i + 1) == Some(&'[') => match parse_link(chars, i, base, warnings) {
                Some((link, next)) => {
                    flush(&mut text, &mut spans);
                    spans.push(link);
                    i = next;
                }
                None => {
                    warn(warnings, base + i, "[[");
                    text.push_str("[[");
                    i += 2;
                }
            },
            _ => {
                text.push(ch);
                i += 1;
            }
        }
    }

    flush(&mut text, &mut spans);
    spans
}

/// Parse `[[url]]` or `[[url][label]]` starting at `start`. Returns the link
/// span and the index just past it.
fn parse_link(
    chars: &[char],
    start: usize,
    base: usize,
    warnings: &mut Vec<StyleWarning>,
) -> Option<(Span, usize)> {
    let url_start = start + 2;
    let url_end = find_char(chars, url_start, ']')?;
    if url_end == url_start {
        return None;
    }
    let url: String = chars[url_start..url_end].iter().collect();

    match chars.get(url_end + 1) {
        Some(']') => {
            let content = vec![Span::Text(url.clone())];
            Some((Span::Link { url, content }, url_end + 2))
        }
        Some('[') => {
            let label_start = url_end + 2;
            let label_end = (label_start..chars.len().saturating_sub(1))
                .find(|&j| chars[j] == ']' && chars[j + 1] == ']')?;
            let content = parse_spans(&chars[label_start..label_end], base + label_start, warnings);
            Some((Span::Link { url, content }, label_end + 2))
        }
        _ => None,
    }
}

fn is_escapable(ch: char) -> bool {
    matches!(ch, '\\' | '*' | '_' | '`' | '[' | ']')
}

fn opens_emphasis(chars: &[char], i: usize) -> bool {
    let after_boundary = i == 0 || !chars[i - 1].is_alphanumeric();
    let before_content = chars.get(i + 1).is_some_and(|c| !c.is_whitespace());
    after_boundary && before_content
}

fn find_emphasis_close(chars: &[char], open: usize) -> Option<usize> {
    let delim = chars[open];
    let mut j = open + 1;
    while j < chars.len() {
        if chars[j] == '\\' && chars.get(j + 1).is_some_and(|&c| is_escapable(c)) {
            j += 2;
            continue;
        }
        if chars[j] == delim
            && j > open + 1
            && !chars[j - 1].is_whitespace()
            && chars.get(j + 1).is_none_or(|c| !c.is_alphanumeric())
        {
            return Some(j);
        }
        j += 1;
    }
    None
}

fn find_char(chars: &[char], from: usize, target: char) -> Option<usize> {
    (from..chars.len()).find(|&j| chars[j] == target)
}

fn flush(text: &mut String, spans: &mut Vec<Span>) {
    if !text.is_empty() {
        spans.push(Span::Text(std::mem::take(text)));
    }
}

fn warn(warnings: &mut Vec<StyleWarning>, index: usize, sequence: &str) {
    warnings.push(StyleWarning {
        column: index + 1,
        sequence: sequence.to_string(),
    });
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

fn push_plain(spans: &[Span], out: &mut String) {
    for span in spans {
        match span {
            Span::Text(text) | Span::Code(text) => out.push_str(text),
            Span::Bold(inner) | Span::Italic(inner) => push_plain(inner, out),
            Span::Link { content, .. } => push_plain(content, out),
        }
    }
}

fn push_html(spans: &[Span], out: &mut String) {
    for span in spans {
        match span {
            Span::Text(text) => out.push_str(&escape_html(text)),
            Span::Bold(inner) => {
                out.push_str("<b>");
                push_html(inner, out);
                out.push_str("</b>");
            }
            Span::Italic(inner) => {
                out.push_str("<i>");
                push_html(inner, out);
                out.push_str("</i>");
            }
            Span::Code(text) => {
                let _ = write!(out, "<code>{}</code>", escape_html(text));
            }
            Span::Link { url, content } => {
                let _ = write!(out, "<a href=\"{}\" target=\"_blank\">", escape_html(url));
                push_html(content, out);
                out.push_str("</a>");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> Span {
        Span::Text(s.to_string())
    }

    #[test]
    fn plain_text_is_identity() {
        let styled = style("Hello, world.");
        assert_eq!(styled.spans, vec![text("Hello, world.")]);
        assert!(style("").is_empty());
    }

    #[test]
    fn bold_italic_and_code() {
        let styled = style("a *b* _c_ `d*e`");
        assert_eq!(
            styled.spans,
            vec![
                text("a "),
                Span::Bold(vec![text("b")]),
                text(" "),
                Span::Italic(vec![text("c")]),
                text(" "),
                Span::Code("d*e".into()),
            ]
        );
    }

    #[test]
    fn nested_emphasis() {
        let styled = style("*very _nice_ day*");
        assert_eq!(
            styled.spans,
            vec![Span::Bold(vec![
                text("very "),
                Span::Italic(vec![text("nice")]),
                text(" day"),
            ])]
        );
    }

    #[test]
    fn intraword_delimiters_stay_literal() {
        let (styled, warnings) = style_with_warnings("snake_case_name and 2*3*4");
        assert_eq!(styled.spans, vec![text("snake_case_name and 2*3*4")]);
        assert!(warnings.is_empty());
    }

    #[test]
    fn links() {
        assert_eq!(
            style("see [[https://go.dev]]").spans,
            vec![
                text("see "),
                Span::Link {
                    url: "https://go.dev".into(),
                    content: vec![text("https://go.dev")],
                },
            ]
        );
        assert_eq!(
            style("[[https://go.dev][the *Go* site]]").spans,
            vec![Span::Link {
                url: "https://go.dev".into(),
                content: vec![text("the "), Span::Bold(vec![text("Go")]), text(" site")],
            }]
        );
    }

    #[test]
    fn escapes_produce_literal_delimiters() {
        let (styled, warnings) = style_with_warnings(r"\*not bold\* and \[\[x\]\]");
        assert_eq!(styled.spans, vec![text("*not bold* and [[x]]")]);
        assert!(warnings.is_empty());
    }

    #[test]
    fn escaped_backslash_before_closing_delimiter() {
        let (styled, warnings) = style_with_warnings(r"*a\\* and _b\*_");
        assert_eq!(
            styled.spans,
            vec![
                Span::Bold(vec![text(r"a\")]),
                text(" and "),
                Span::Italic(vec![text("b*")]),
            ]
        );
        assert!(warnings.is_empty());

        let (styled, warnings) = style_with_warnings(r"*a\*");
        assert_eq!(styled.plain_text(), "*a*");
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn unterminated_markup_warns_and_stays_literal() {
        let (styled, warnings) = style_with_warnings("a *open and `tick");
        assert_eq!(styled.plain_text(), "a *open and `tick");
        assert_eq!(
            warnings,
            vec![
                StyleWarning {
                    column: 3,
                    sequence: "*".into()
                },
                StyleWarning {
                    column: 13,
                    sequence: "`".into()
                },
            ]
        );
    }

    #[test]
    fn unterminated_link_warns() {
        let (styled, warnings) = style_with_warnings("[[http://x");
        assert_eq!(styled.plain_text(), "[[http://x");
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].sequence, "[[");
    }

    #[test]
    fn html_output_escapes_text() {
        let styled = style("*a<b* & [[http://x?a=1&b=2][go]]");
        assert_eq!(
            styled.to_html(),
            "<b>a&lt;b</b> &amp; <a href=\"http://x?a=1&amp;b=2\" target=\"_blank\">go</a>"
        );
    }
}

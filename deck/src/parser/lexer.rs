//! Line classifier.
//!
//! Splits source text into lines and tags each one with a [`LineKind`].
//! Classification is context-free except in two places: inside a code fence
//! only the matching close marker is recognized, and a blank line sitting
//! between two preformatted lines is kept as part of that block (one line of
//! lookahead).

use std::fmt;
use std::ops::Range;

/// A classified source line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    /// 1-based line number.
    pub number: usize,
    /// Byte span in the source, excluding the line terminator.
    pub span: Range<usize>,
    /// The line text without its terminator.
    pub raw: String,
    pub kind: LineKind,
}

impl Line {
    /// 1-based character column where the payload of the line starts: the
    /// title of a header, the text of a bullet or the arguments of a
    /// directive. Every other kind starts at column 1.
    pub fn text_column(&self) -> usize {
        let raw = self.raw.as_str();
        let start = match &self.kind {
            LineKind::Header { depth, .. } => skip_whitespace(raw, *depth),
            LineKind::Bullet { .. } => {
                let indent = raw.len() - raw.trim_start().len();
                skip_whitespace(raw, indent + "- ".len())
            }
            LineKind::Directive { kind, .. } => {
                let keyword_end = kind.keyword().len() + 1;
                let after = raw.get(keyword_end..).unwrap_or("");
                keyword_end + payload_offset(*kind, after)
            }
            _ => 0,
        };
        raw.get(..start).map_or(1, |prefix| prefix.chars().count() + 1)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineKind {
    Blank,
    /// `//` at column 0. Dropped by the parser.
    Comment,
    Header {
        depth: usize,
        title: String,
    },
    Bullet {
        /// Leading whitespace width in columns.
        indent: usize,
        text: String,
    },
    FenceOpen(FenceInfo),
    FenceClose,
    /// A verbatim line inside a code fence.
    Raw,
    Directive {
        kind: DirectiveKind,
        args: String,
    },
    /// An indented line that is neither a bullet nor a fence.
    Pre,
    Prose(String),
}

/// The opening marker and info string of a code fence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FenceInfo {
    pub marker: char,
    pub len: usize,
    pub language: Option<String>,
    pub edit: bool,
    pub numbers: bool,
    pub play: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DirectiveKind {
    Image,
    Video,
    Background,
    Iframe,
    Link,
    Html,
    Caption,
}

impl DirectiveKind {
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "image" => Some(DirectiveKind::Image),
            "video" => Some(DirectiveKind::Video),
            "background" => Some(DirectiveKind::Background),
            "iframe" => Some(DirectiveKind::Iframe),
            "link" => Some(DirectiveKind::Link),
            "html" => Some(DirectiveKind::Html),
            "caption" => Some(DirectiveKind::Caption),
            _ => None,
        }
    }

    pub fn keyword(self) -> &'static str {
        match self {
            DirectiveKind::Image => "image",
            DirectiveKind::Video => "video",
            DirectiveKind::Background => "background",
            DirectiveKind::Iframe => "iframe",
            DirectiveKind::Link => "link",
            DirectiveKind::Html => "html",
            DirectiveKind::Caption => "caption",
        }
    }
}

impl fmt::Display for DirectiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// Streaming classifier over the lines of a source text.
pub struct Lexer<'a> {
    lines: Vec<(Range<usize>, &'a str)>,
    pos: usize,
    tab_width: usize,
    /// Marker char and length of the open fence, if any.
    fence: Option<(char, usize)>,
    prev_pre: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str, tab_width: usize) -> Self {
        Lexer {
            lines: split_lines(source),
            pos: 0,
            tab_width: tab_width.max(1),
            fence: None,
            prev_pre: false,
        }
    }

    fn classify_next(&mut self, text: &str) -> LineKind {
        if let Some((marker, len)) = self.fence {
            if is_fence_close(text, marker, len) {
                self.fence = None;
                return LineKind::FenceClose;
            }
            return LineKind::Raw;
        }

        let kind = classify(text, self.tab_width);
        match &kind {
            LineKind::FenceOpen(info) => self.fence = Some((info.marker, info.len)),
            LineKind::Blank if self.prev_pre && self.next_is_pre() => return LineKind::Pre,
            _ => {}
        }
        kind
    }

    fn next_is_pre(&self) -> bool {
        self.lines
            .get(self.pos)
            .is_some_and(|(_, next)| classify(next, self.tab_width) == LineKind::Pre)
    }
}

impl Iterator for Lexer<'_> {
    type Item = Line;

    fn next(&mut self) -> Option<Line> {
        let (span, text) = self.lines.get(self.pos).cloned()?;
        self.pos += 1;
        let kind = self.classify_next(text);
        self.prev_pre = kind == LineKind::Pre;
        tracing::trace!(line = self.pos, ?kind, "classified");
        Some(Line {
            number: self.pos,
            span,
            raw: text.to_string(),
            kind,
        })
    }
}

/// Classify one line outside of any fence.
pub fn classify(line: &str, tab_width: usize) -> LineKind {
    if line.trim().is_empty() {
        return LineKind::Blank;
    }
    if line.starts_with("//") {
        return LineKind::Comment;
    }
    if let Some(header) = header(line) {
        return header;
    }

    let body = line.trim_start();
    let indent = indent_width(line, tab_width);

    if let Some(info) = fence_open(body) {
        return LineKind::FenceOpen(info);
    }
    if let Some(text) = body.strip_prefix("- ") {
        let text = text.trim();
        if !text.is_empty() {
            return LineKind::Bullet {
                indent,
                text: text.to_string(),
            };
        }
    }
    if indent == 0 {
        if let Some(directive) = directive(line) {
            return directive;
        }
        return LineKind::Prose(line.trim_end().to_string());
    }
    LineKind::Pre
}

/// Width of the leading whitespace in columns, with tabs advancing to the
/// next multiple of `tab_width`.
pub fn indent_width(line: &str, tab_width: usize) -> usize {
    let mut width = 0;
    for ch in line.chars() {
        match ch {
            ' ' => width += 1,
            '\t' => width += tab_width - width % tab_width,
            c if c.is_whitespace() => width += 1,
            _ => break,
        }
    }
    width
}

fn header(line: &str) -> Option<LineKind> {
    let marker = line.chars().next().filter(|c| matches!(c, '#' | '*'))?;
    let depth = line.chars().take_while(|&c| c == marker).count();
    let rest = &line[depth..];
    if !rest.starts_with(' ') || rest.trim().is_empty() {
        return None;
    }
    Some(LineKind::Header {
        depth,
        title: rest.trim().to_string(),
    })
}

fn fence_open(body: &str) -> Option<FenceInfo> {
    let marker = body.chars().next().filter(|c| matches!(c, '`' | '~'))?;
    let len = body.chars().take_while(|&c| c == marker).count();
    if len < 3 {
        return None;
    }
    let info = &body[len..];
    if marker == '`' && info.contains('`') {
        return None;
    }

    let mut fence = FenceInfo {
        marker,
        len,
        language: None,
        edit: false,
        numbers: false,
        play: false,
    };
    for word in info.split_whitespace() {
        match word {
            "-edit" => fence.edit = true,
            "-numbers" => fence.numbers = true,
            "-play" => fence.play = true,
            flag if flag.starts_with('-') => {
                tracing::debug!(flag, "ignoring unknown code fence flag");
            }
            lang if fence.language.is_none() => fence.language = Some(lang.to_string()),
            _ => {}
        }
    }
    Some(fence)
}

fn is_fence_close(line: &str, marker: char, len: usize) -> bool {
    let body = line.trim();
    body.chars().count() >= len && body.chars().all(|c| c == marker)
}

fn directive(line: &str) -> Option<LineKind> {
    let rest = line.strip_prefix('.')?;
    let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
    let kind = DirectiveKind::from_keyword(&rest[..end])?;
    let after = &rest[end..];
    let payload = &after[payload_offset(kind, after)..];
    let args = match kind {
        DirectiveKind::Html => payload,
        _ => payload.trim_end(),
    };
    Some(LineKind::Directive {
        kind,
        args: args.to_string(),
    })
}

/// Byte offset of the arguments in the text following a directive keyword.
/// Raw payloads lose only the separating whitespace character.
fn payload_offset(kind: DirectiveKind, after: &str) -> usize {
    match kind {
        DirectiveKind::Html => after.chars().next().map_or(0, char::len_utf8),
        _ => after.len() - after.trim_start().len(),
    }
}

/// Byte index of the first non-whitespace character at or after `from`.
fn skip_whitespace(raw: &str, from: usize) -> usize {
    let rest = raw.get(from..).unwrap_or("");
    raw.len() - rest.trim_start().len()
}

fn split_lines(source: &str) -> Vec<(Range<usize>, &str)> {
    let mut lines = Vec::new();
    let mut start = 0;
    for segment in source.split_inclusive('\n') {
        let end = start + segment.len();
        let text = segment.strip_suffix('\n').unwrap_or(segment);
        let text = text.strip_suffix('\r').unwrap_or(text);
        lines.push((start..start + text.len(), text));
        start = end;
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn kinds(source: &str) -> Vec<LineKind> {
        Lexer::new(source, 4).map(|line| line.kind).collect()
    }

    #[rstest]
    #[case("", LineKind::Blank)]
    #[case("   \t", LineKind::Blank)]
    #[case("// speaker note", LineKind::Comment)]
    #[case("# Title", LineKind::Header { depth: 1, title: "Title".into() })]
    #[case("### Deep  ", LineKind::Header { depth: 3, title: "Deep".into() })]
    #[case("** Legacy", LineKind::Header { depth: 2, title: "Legacy".into() })]
    #[case("#nospace", LineKind::Prose("#nospace".into()))]
    #[case("*bold* start", LineKind::Prose("*bold* start".into()))]
    #[case("- item", LineKind::Bullet { indent: 0, text: "item".into() })]
    #[case("    - nested", LineKind::Bullet { indent: 4, text: "nested".into() })]
    #[case("\t- tabbed", LineKind::Bullet { indent: 4, text: "tabbed".into() })]
    #[case(".image a.png 100 _", LineKind::Directive { kind: DirectiveKind::Image, args: "a.png 100 _".into() })]
    #[case(".caption", LineKind::Directive { kind: DirectiveKind::Caption, args: String::new() })]
    #[case(".caption  spaced out  ", LineKind::Directive { kind: DirectiveKind::Caption, args: "spaced out".into() })]
    #[case(".html   <b> x  ", LineKind::Directive { kind: DirectiveKind::Html, args: "  <b> x  ".into() })]
    #[case(".html\t<br>", LineKind::Directive { kind: DirectiveKind::Html, args: "<br>".into() })]
    #[case(".unknown thing", LineKind::Prose(".unknown thing".into()))]
    #[case("  indented", LineKind::Pre)]
    #[case("plain words", LineKind::Prose("plain words".into()))]
    fn classifies_single_lines(#[case] line: &str, #[case] expected: LineKind) {
        assert_eq!(classify(line, 4), expected);
    }

    #[test]
    fn fence_info_string() {
        let LineKind::FenceOpen(info) = classify("```go -edit -numbers -play", 4) else {
            panic!("expected fence");
        };
        assert_eq!(info.marker, '`');
        assert_eq!(info.len, 3);
        assert_eq!(info.language.as_deref(), Some("go"));
        assert!(info.edit && info.numbers && info.play);
    }

    #[test]
    fn fence_context_suspends_classification() {
        let got = kinds("```\n# not a header\n- not a bullet\n.image x\n```\n# Header");
        assert!(matches!(got[0], LineKind::FenceOpen(_)));
        assert_eq!(got[1..4], [LineKind::Raw, LineKind::Raw, LineKind::Raw]);
        assert_eq!(got[4], LineKind::FenceClose);
        assert!(matches!(got[5], LineKind::Header { depth: 1, .. }));
    }

    #[test]
    fn shorter_marker_does_not_close_fence() {
        let got = kinds("~~~~\n~~~\n~~~~~");
        assert_eq!(got[1], LineKind::Raw);
        assert_eq!(got[2], LineKind::FenceClose);
    }

    #[test]
    fn blank_between_pre_lines_stays_pre() {
        let got = kinds("  a\n\n  b\n\nprose");
        assert_eq!(
            got,
            vec![
                LineKind::Pre,
                LineKind::Pre,
                LineKind::Pre,
                LineKind::Blank,
                LineKind::Prose("prose".into()),
            ]
        );
    }

    #[rstest]
    #[case("# Title", 3)]
    #[case("###   Deep", 7)]
    #[case("- item", 3)]
    #[case("\t-   tabbed", 6)]
    #[case("  - - dash", 5)]
    #[case(".caption  words", 11)]
    #[case(".link url label", 7)]
    #[case(".html  <br>", 7)]
    #[case("plain words", 1)]
    #[case("  indented", 1)]
    fn payload_columns(#[case] raw: &str, #[case] column: usize) {
        let line = Lexer::new(raw, 4).next().unwrap();
        assert_eq!(line.text_column(), column);
    }

    #[test]
    fn payload_column_counts_characters() {
        let line = Lexer::new("\u{3000}- x", 4).next().unwrap();
        assert_eq!(line.kind, LineKind::Bullet { indent: 1, text: "x".into() });
        assert_eq!(line.text_column(), 4);
    }

    #[test]
    fn line_numbers_and_spans() {
        let lines: Vec<Line> = Lexer::new("# A\r\n\nxyz", 4).collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0].span, 0..3);
        assert_eq!(lines[0].raw, "# A");
        assert_eq!(lines[2].number, 3);
        assert_eq!(lines[2].span, 6..9);
    }
}

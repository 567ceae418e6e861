use std::fmt;
use std::num::NonZeroU32;

/// One typed content unit inside a section.
///
/// Every variant is owned by exactly one [`Section`](crate::Section); the
/// order of elements inside a section is the order they render in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Element {
    List(List),
    Text(Text),
    Code(Code),
    Image(Media),
    Video(Video),
    Background(Media),
    Iframe(Media),
    Link(Link),
    /// Raw markup passed through to the output untouched.
    ///
    /// This is the one place content escaping is bypassed: the payload is
    /// neither style-processed nor escaped. Callers that render untrusted
    /// decks must sanitize these payloads before rendering.
    Html(String),
    /// Styled caption text. Associated with the preceding media element by
    /// position only.
    Caption(Caption),
}

impl Element {
    pub fn kind(&self) -> ElementKind {
        match self {
            Element::List(_) => ElementKind::List,
            Element::Text(_) => ElementKind::Text,
            Element::Code(_) => ElementKind::Code,
            Element::Image(_) => ElementKind::Image,
            Element::Video(_) => ElementKind::Video,
            Element::Background(_) => ElementKind::Background,
            Element::Iframe(_) => ElementKind::Iframe,
            Element::Link(_) => ElementKind::Link,
            Element::Html(_) => ElementKind::Html,
            Element::Caption(_) => ElementKind::Caption,
        }
    }
}

/// Tag of an [`Element`] variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ElementKind {
    List,
    Text,
    Code,
    Image,
    Video,
    Background,
    Iframe,
    Link,
    Html,
    Caption,
}

impl ElementKind {
    pub const ALL: [ElementKind; 10] = [
        ElementKind::List,
        ElementKind::Text,
        ElementKind::Code,
        ElementKind::Image,
        ElementKind::Video,
        ElementKind::Background,
        ElementKind::Iframe,
        ElementKind::Link,
        ElementKind::Html,
        ElementKind::Caption,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ElementKind::List => "list",
            ElementKind::Text => "text",
            ElementKind::Code => "code",
            ElementKind::Image => "image",
            ElementKind::Video => "video",
            ElementKind::Background => "background",
            ElementKind::Iframe => "iframe",
            ElementKind::Link => "link",
            ElementKind::Html => "html",
            ElementKind::Caption => "caption",
        }
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Where a raw string starts in the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Origin {
    /// 1-based line number.
    pub line: usize,
    /// 1-based character column of the first character of the string.
    pub column: usize,
}

impl Origin {
    pub fn new(line: usize, column: usize) -> Self {
        Origin { line, column }
    }

    /// The position `offset` characters into the string, where `offset` is
    /// itself a 1-based column relative to the string start.
    pub fn advance(self, offset: usize) -> Origin {
        Origin {
            line: self.line,
            column: self.column + offset.saturating_sub(1),
        }
    }
}

/// Consecutive bullets sharing one indentation width.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct List {
    /// Leading whitespace width of the bullets, in columns.
    pub indent: usize,
    /// Raw bullet text; styled at render time.
    pub bullets: Vec<String>,
    /// Start of each bullet's text, parallel to `bullets`.
    pub origins: Vec<Origin>,
}

/// A block of prose or preformatted text.
///
/// When `pre` is set the lines are rendered verbatim. Otherwise each line is
/// style-processed on its own and lines are separated by an explicit break.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Text {
    pub pre: bool,
    pub lines: Vec<String>,
    /// Start of each line, parallel to `lines`.
    pub origins: Vec<Origin>,
}

/// A fenced code snippet.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Code {
    pub text: String,
    /// Language hint from the fence info string.
    pub language: Option<String>,
    /// The rendered block should be editable (`-edit`).
    pub edit: bool,
    /// Line numbers were requested (`-numbers`).
    pub numbers: bool,
    /// The author asked for the snippet to be runnable (`-play`). Whether it
    /// actually is playable is decided by the caller's playground.
    pub play: bool,
}

/// Location and optional dimensions shared by image, background and iframe
/// embeds. Absent dimensions mean "omit the attribute".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Media {
    pub url: String,
    pub height: Option<NonZeroU32>,
    pub width: Option<NonZeroU32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Video {
    pub media: Media,
    /// MIME type of the source, e.g. `video/mp4`.
    pub source_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    pub url: String,
    /// Raw label text. May be empty, in which case renderers show the URL.
    pub label: String,
    pub label_origin: Origin,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caption {
    /// Raw caption text; styled at render time.
    pub text: String,
    pub origin: Origin,
}

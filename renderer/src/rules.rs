//! Render rules: one pure function per node kind.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use deck::{Code, ElementKind, Media, Styled, Video};

use crate::error::ConfigError;

/// Every node kind a rule can be registered for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Kind {
    Section,
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

impl Kind {
    pub const ALL: [Kind; 11] = [
        Kind::Section,
        Kind::List,
        Kind::Text,
        Kind::Code,
        Kind::Image,
        Kind::Video,
        Kind::Background,
        Kind::Iframe,
        Kind::Link,
        Kind::Html,
        Kind::Caption,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Kind::Section => "section",
            Kind::List => "list",
            Kind::Text => "text",
            Kind::Code => "code",
            Kind::Image => "image",
            Kind::Video => "video",
            Kind::Background => "background",
            Kind::Iframe => "iframe",
            Kind::Link => "link",
            Kind::Html => "html",
            Kind::Caption => "caption",
        }
    }
}

impl From<ElementKind> for Kind {
    fn from(kind: ElementKind) -> Self {
        match kind {
            ElementKind::List => Kind::List,
            ElementKind::Text => Kind::Text,
            ElementKind::Code => Kind::Code,
            ElementKind::Image => Kind::Image,
            ElementKind::Video => Kind::Video,
            ElementKind::Background => Kind::Background,
            ElementKind::Iframe => Kind::Iframe,
            ElementKind::Link => Kind::Link,
            ElementKind::Html => Kind::Html,
            ElementKind::Caption => Kind::Caption,
        }
    }
}

impl FromStr for Kind {
    type Err = ConfigError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        Kind::ALL
            .into_iter()
            .find(|k| k.name() == name)
            .ok_or_else(|| ConfigError::UnknownKind(name.to_string()))
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The fields a rule receives for one node. Text-bearing fields have already
/// been through the style engine exactly once.
#[derive(Debug, Clone)]
pub enum View<'a> {
    Section(SectionView<'a>),
    List(ListView),
    Text(TextBody<'a>),
    Code(CodeView<'a>),
    Image(&'a Media),
    Video(&'a Video),
    Background(&'a Media),
    Iframe(&'a Media),
    Link(LinkView<'a>),
    /// Raw, unescaped markup. See [`deck::Element::Html`].
    Html(&'a str),
    Caption(Styled),
}

impl View<'_> {
    pub fn kind(&self) -> Kind {
        match self {
            View::Section(_) => Kind::Section,
            View::List(_) => Kind::List,
            View::Text(_) => Kind::Text,
            View::Code(_) => Kind::Code,
            View::Image(_) => Kind::Image,
            View::Video(_) => Kind::Video,
            View::Background(_) => Kind::Background,
            View::Iframe(_) => Kind::Iframe,
            View::Link(_) => Kind::Link,
            View::Html(_) => Kind::Html,
            View::Caption(_) => Kind::Caption,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SectionView<'a> {
    pub number: &'a [usize],
    /// Dot-joined number, e.g. `"2.1"`.
    pub formatted_number: String,
    /// Length of `number`; the natural heading level.
    pub depth: usize,
    pub title: Styled,
    /// Rendered output of the section's elements and subsections, in order.
    pub body: String,
}

#[derive(Debug, Clone)]
pub struct ListView {
    pub indent: usize,
    pub items: Vec<Styled>,
}

#[derive(Debug, Clone)]
pub enum TextBody<'a> {
    /// Verbatim lines, never styled.
    Pre(&'a [String]),
    /// One styled entry per source line; rules separate them with a break.
    Prose(Vec<Styled>),
}

#[derive(Debug, Clone)]
pub struct CodeView<'a> {
    pub code: &'a Code,
    /// Answer from the caller's [`Playground`](crate::Playground).
    pub playable: bool,
}

#[derive(Debug, Clone)]
pub struct LinkView<'a> {
    pub url: &'a str,
    /// Styled label, or the plain URL when the label is empty.
    pub label: Styled,
    /// Set when `label` is the URL fallback.
    pub fallback: bool,
}

pub type Rule = Arc<dyn Fn(&View<'_>) -> String + Send + Sync>;

/// Registry mapping each node kind to its rule.
#[derive(Clone, Default)]
pub struct Rules {
    rules: HashMap<Kind, Rule>,
}

impl Rules {
    pub fn new() -> Self {
        Rules::default()
    }

    /// The built-in HTML rule set, covering every kind.
    pub fn html() -> Self {
        crate::html::rules()
    }

    /// Register (or replace) the rule for `kind`.
    pub fn on<F>(mut self, kind: Kind, rule: F) -> Self
    where
        F: Fn(&View<'_>) -> String + Send + Sync + 'static,
    {
        self.insert(kind, rule);
        self
    }

    pub fn insert<F>(&mut self, kind: Kind, rule: F)
    where
        F: Fn(&View<'_>) -> String + Send + Sync + 'static,
    {
        self.rules.insert(kind, Arc::new(rule));
    }

    /// Register by kind name, e.g. `"image"`.
    pub fn insert_named<F>(&mut self, name: &str, rule: F) -> Result<(), ConfigError>
    where
        F: Fn(&View<'_>) -> String + Send + Sync + 'static,
    {
        let kind = name.parse()?;
        self.insert(kind, rule);
        Ok(())
    }

    pub fn remove(&mut self, kind: Kind) -> Option<Rule> {
        self.rules.remove(&kind)
    }

    pub fn get(&self, kind: Kind) -> Option<&Rule> {
        self.rules.get(&kind)
    }

    pub fn contains(&self, kind: Kind) -> bool {
        self.rules.contains_key(&kind)
    }

    /// Kinds in `needed` with no registered rule, in declaration order.
    pub fn missing(&self, needed: &BTreeSet<Kind>) -> Vec<Kind> {
        needed
            .iter()
            .copied()
            .filter(|k| !self.contains(*k))
            .collect()
    }
}

impl fmt::Debug for Rules {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds: Vec<&Kind> = self.rules.keys().collect();
        kinds.sort();
        f.debug_struct("Rules").field("kinds", &kinds).finish()
    }
}

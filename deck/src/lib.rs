pub mod document;
pub mod element;
pub mod parser;
pub mod style;

pub use document::{Document, Section};
pub use element::{Caption, Code, Element, ElementKind, Link, List, Media, Origin, Text, Video};
pub use parser::{HeaderPolicy, ParseError, ParseErrorKind, ParseOptions, Parser};
pub use style::{Span, StyleWarning, Styled};

/// Parse a slide deck with default options.
pub fn parse(source: &str) -> Result<Document, ParseError> {
    Parser::new(source.to_string(), 0).parse()
}

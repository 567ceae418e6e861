mod directive;
pub mod error;
pub mod lexer;
pub mod machine;

pub use error::{ParseError, ParseErrorKind};

use serde::Deserialize;

use crate::document::Document;
use crate::parser::lexer::Lexer;
use crate::parser::machine::Machine;

/// What to do with a header that is nested more than one level below the
/// deepest open section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeaderPolicy {
    /// Nest it one level below its nearest shallower open section.
    #[default]
    Forgiving,
    /// Abort with [`ParseErrorKind::SkippedHeaderLevel`].
    Strict,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ParseOptions {
    pub header_policy: HeaderPolicy,
    /// Columns a tab advances to when measuring bullet indentation.
    pub tab_width: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        ParseOptions {
            header_policy: HeaderPolicy::Forgiving,
            tab_width: 4,
        }
    }
}

/// Parser entry point.
pub struct Parser {
    source: String,
    file_id: usize,
    options: ParseOptions,
}

impl Parser {
    pub fn new(source: String, file_id: usize) -> Self {
        Parser {
            source,
            file_id,
            options: ParseOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ParseOptions) -> Self {
        self.options = options;
        self
    }

    /// Parse the source into a document tree. The first structural error
    /// aborts the parse.
    pub fn parse(&self) -> Result<Document, ParseError> {
        let mut machine = Machine::new(self.options.header_policy, self.file_id);
        for line in Lexer::new(&self.source, self.options.tab_width) {
            machine.feed(line)?;
        }
        let document = machine.finish()?;
        tracing::debug!(
            sections = document.section_count(),
            elements = document.element_count(),
            "parsed document"
        );
        Ok(document)
    }
}

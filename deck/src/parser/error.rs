use std::ops::Range;

use codespan_reporting::diagnostic::{Diagnostic, Label};

use crate::parser::lexer::{DirectiveKind, Line};

/// Why a parse was aborted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseErrorKind {
    #[error("`.{directive}` directive is missing its {field}")]
    MissingArgument {
        directive: DirectiveKind,
        field: &'static str,
    },
    #[error("`.{directive}` directive has invalid {field} `{value}`, expected a positive integer or `_`")]
    InvalidDimension {
        directive: DirectiveKind,
        field: &'static str,
        value: String,
    },
    #[error("`.{directive}` directive has an unterminated quoted argument")]
    UnterminatedQuote { directive: DirectiveKind },
    #[error("code fence is never closed")]
    UnterminatedFence,
    #[error("header at depth {found} skips past the next valid depth {expected}")]
    SkippedHeaderLevel { found: usize, expected: usize },
    #[error("content appears before the first section header")]
    ContentOutsideSection,
}

/// A fatal structural parse error with its source location.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("line {line}: {kind}")]
pub struct ParseError {
    pub kind: ParseErrorKind,
    /// 1-based line number.
    pub line: usize,
    /// Byte span of the offending line.
    pub span: Range<usize>,
    pub file_id: usize,
    pub notes: Vec<String>,
}

impl ParseError {
    pub fn new(kind: ParseErrorKind, line: &Line, file_id: usize) -> Self {
        ParseError {
            kind,
            line: line.number,
            span: line.span.clone(),
            file_id,
            notes: Vec::new(),
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    /// Convert to a codespan-reporting Diagnostic for display.
    pub fn to_diagnostic(&self) -> Diagnostic<usize> {
        Diagnostic::error()
            .with_message(self.kind.to_string())
            .with_labels(vec![Label::primary(self.file_id, self.span.clone())])
            .with_notes(self.notes.clone())
    }
}

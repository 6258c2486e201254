use std::ops::Range;

use codespan_reporting::diagnostic::{Diagnostic, Label, Severity};
use thiserror::Error;

/// What went wrong structurally with a quiz block.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseErrorKind {
    #[error("quiz block is not terminated by a metadata line")]
    MissingMetadata,

    #[error("duplicate quiz id `{id}`")]
    DuplicateId { id: String },

    #[error("answer `{answer}` of `{id}` does not index one of its {option_count} option(s)")]
    AnswerOutOfRange {
        id: String,
        answer: String,
        option_count: usize,
    },

    #[error("quiz metadata is missing `{attribute}`")]
    MissingAttribute { attribute: &'static str },

    #[error("malformed quiz metadata: {reason}")]
    MalformedMetadata { reason: String },
}

impl ParseErrorKind {
    /// Stable reason code, suitable for matching in tests and tooling.
    pub fn code(&self) -> &'static str {
        match self {
            ParseErrorKind::MissingMetadata => "missing-metadata",
            ParseErrorKind::DuplicateId { .. } => "duplicate-id",
            ParseErrorKind::AnswerOutOfRange { .. } => "answer-out-of-range",
            ParseErrorKind::MissingAttribute { .. } => "missing-attribute",
            ParseErrorKind::MalformedMetadata { .. } => "malformed-metadata",
        }
    }
}

/// Parse errors with source location information.
#[derive(Debug, Clone)]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub span: Range<usize>,
    pub file_id: usize,
    pub severity: Severity,
    pub notes: Vec<String>,
}

impl ParseError {
    pub fn error(kind: ParseErrorKind, span: Range<usize>, file_id: usize) -> Self {
        ParseError {
            kind,
            span,
            file_id,
            severity: Severity::Error,
            notes: Vec::new(),
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    pub fn message(&self) -> String {
        self.kind.to_string()
    }

    /// Convert to a codespan-reporting Diagnostic for display.
    pub fn to_diagnostic(&self) -> Diagnostic<usize> {
        Diagnostic::new(self.severity)
            .with_message(self.message())
            .with_code(self.code())
            .with_labels(vec![Label::primary(self.file_id, self.span.clone())])
            .with_notes(self.notes.clone())
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.kind)
    }
}

impl std::error::Error for ParseError {}

use std::ops::Range;

use codespan_reporting::diagnostic::{Diagnostic, Label, Severity};
use thiserror::Error;

/// A well-formed block whose metadata does not make sense.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationErrorKind {
    #[error("duplicate quiz id `{id}`")]
    DuplicateId { id: String },

    #[error("points `{points}` of `{id}` is not a non-negative integer")]
    InvalidPoints { id: String, points: String },

    #[error("`{id}` has {option_count} option(s), at least {minimum} required")]
    TooFewOptions {
        id: String,
        option_count: usize,
        minimum: usize,
    },

    #[error("answer `{answer}` of `{id}` does not index one of its {option_count} option(s)")]
    AnswerOutOfRange {
        id: String,
        answer: String,
        option_count: usize,
    },

    #[error("answer `{answer}` of `{id}` must be `any` or a number")]
    InvalidAnswer { id: String, answer: String },

    #[error("free-text block `{id}` has {option_count} option(s)")]
    UnexpectedOptions { id: String, option_count: usize },

    #[error("`{field}` of quiz block `{id}` is empty")]
    EmptyField { id: String, field: &'static str },

    #[error("`{id}` has no prompt")]
    MissingPrompt { id: String },
}

impl ValidationErrorKind {
    /// Stable reason code, suitable for matching in tests and tooling.
    pub fn code(&self) -> &'static str {
        match self {
            ValidationErrorKind::DuplicateId { .. } => "duplicate-id",
            ValidationErrorKind::InvalidPoints { .. } => "invalid-points",
            ValidationErrorKind::TooFewOptions { .. } => "too-few-options",
            ValidationErrorKind::AnswerOutOfRange { .. } => "answer-out-of-range",
            ValidationErrorKind::InvalidAnswer { .. } => "invalid-answer",
            ValidationErrorKind::UnexpectedOptions { .. } => "unexpected-options",
            ValidationErrorKind::EmptyField { .. } => "empty-field",
            ValidationErrorKind::MissingPrompt { .. } => "missing-prompt",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub kind: ValidationErrorKind,
    /// Span of the offending block; empty for blocks not parsed from source.
    pub span: Range<usize>,
}

impl ValidationError {
    pub fn new(kind: ValidationErrorKind, span: Range<usize>) -> Self {
        ValidationError { kind, span }
    }

    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    pub fn to_diagnostic(&self, file_id: usize) -> Diagnostic<usize> {
        let diagnostic = Diagnostic::new(Severity::Error)
            .with_message(self.kind.to_string())
            .with_code(self.code());
        if self.span.is_empty() {
            diagnostic
        } else {
            diagnostic.with_labels(vec![Label::primary(file_id, self.span.clone())])
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.kind)
    }
}

impl std::error::Error for ValidationError {}

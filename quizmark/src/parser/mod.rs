pub mod error;
mod lines;
mod metadata;
mod structural;

pub use error::{ParseError, ParseErrorKind};
pub use structural::Blocks;

use crate::Quiz;

/// Parser entry point.
pub struct Parser {
    source: String,
    file_id: usize,
}

impl Parser {
    pub fn new(source: String, file_id: usize) -> Self {
        Parser { source, file_id }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Lazily yield blocks and defects in document order.
    pub fn blocks(&self) -> Blocks<'_> {
        Blocks::new(&self.source, self.file_id)
    }

    /// Parse every quiz block, failing with all defects found in one pass.
    pub fn parse(&self) -> Result<Quiz, Vec<ParseError>> {
        let (quiz, errors) = self.parse_with_errors();
        if errors.is_empty() {
            Ok(quiz)
        } else {
            Err(errors)
        }
    }

    /// Parse every quiz block, keeping the well-formed ones alongside the
    /// defects of the rest.
    pub fn parse_with_errors(&self) -> (Quiz, Vec<ParseError>) {
        let mut blocks = Vec::new();
        let mut errors = Vec::new();
        for item in self.blocks() {
            match item {
                Ok(block) => blocks.push(block),
                Err(error) => errors.push(error),
            }
        }
        tracing::debug!(
            blocks = blocks.len(),
            errors = errors.len(),
            "parsed quiz document"
        );
        (
            Quiz {
                blocks,
                source_id: self.file_id,
            },
            errors,
        )
    }
}

/// Parse a standalone document (file id 0).
pub fn parse(source: &str) -> Result<Quiz, Vec<ParseError>> {
    Parser::new(source.to_string(), 0).parse()
}

/// Convert a byte offset in `source` to a 1-based line number.
pub fn line_of(source: &str, offset: usize) -> usize {
    source.as_bytes()[..offset.min(source.len())]
        .iter()
        .filter(|&&b| b == b'\n')
        .count()
        + 1
}

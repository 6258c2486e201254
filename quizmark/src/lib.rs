//! Extraction and validation of quiz blocks embedded in lesson Markdown.
//!
//! A quiz block is list-shaped prompt/option/feedback text opened by an
//! empty HTML comment and closed by a kramdown attribute line:
//!
//! ```markdown
//! <!--  -->
//!
//! -
//!   How many spaces should nested HTML be indented?
//!
//! - Four
//!   Too deep for markup.
//! - Two
//!   Right.
//! {: .choose_best #html_indentation title="HTML Indentation" points="1" answer="2" }
//! ```

pub mod block;
pub mod parser;
pub mod validate;

pub use block::{QuizBlock, QuizKind, QuizOption, SEPARATOR};
pub use parser::{ParseError, ParseErrorKind, Parser};
pub use validate::{ValidateOptions, ValidationError, ValidationErrorKind, validate};

/// All quiz blocks of one document.
#[derive(Debug, Clone, PartialEq)]
pub struct Quiz {
    /// Blocks in document order.
    pub blocks: Vec<QuizBlock>,
    /// The source file ID (for error reporting with codespan-reporting).
    pub source_id: usize,
}

impl Quiz {
    pub fn get(&self, id: &str) -> Option<&QuizBlock> {
        self.blocks.iter().find(|b| b.id == id)
    }

    /// Sum of every block's points, skipping unparseable values.
    pub fn total_points(&self) -> u64 {
        self.blocks
            .iter()
            .filter_map(QuizBlock::points_value)
            .map(u64::from)
            .sum()
    }

    /// Validate every block with default options.
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        validate(&self.blocks)
    }
}

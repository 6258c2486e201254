mod display;
pub mod kind;

use std::collections::BTreeMap;
use std::ops::Range;

use serde::{Deserialize, Serialize};

pub use display::SEPARATOR;
pub use kind::QuizKind;

/// A single interactive question embedded in a lesson document.
///
/// Metadata values are kept exactly as written so that validation can
/// report on them and re-serialization is lossless. Use [`points_value`]
/// and [`correct_index`] for the interpreted forms.
///
/// [`points_value`]: QuizBlock::points_value
/// [`correct_index`]: QuizBlock::correct_index
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizBlock {
    /// Stable anchor from the `#id` token.
    pub id: String,
    pub kind: QuizKind,
    pub title: String,
    /// Score weight, as written in `points="..."`.
    pub points: String,
    /// 1-based option index for `choose_best`; `any` or a number for
    /// `free_text_number`.
    pub answer: String,
    /// Prompt text. Informational only, empty when the block has none.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub prompt: String,
    /// Options in source order. `answer` refers to them positionally.
    #[serde(default)]
    pub options: Vec<QuizOption>,
    /// Classes on the metadata line other than the quiz kind, without dots.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub classes: Vec<String>,
    /// Any other `key="value"` pairs from the metadata line.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
    /// Byte span in source for error reporting.
    #[serde(skip)]
    pub span: Range<usize>,
}

/// One selectable answer and the feedback shown when it is picked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizOption {
    pub text: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub feedback: String,
}

impl QuizOption {
    pub fn new(text: impl Into<String>, feedback: impl Into<String>) -> Self {
        QuizOption {
            text: text.into(),
            feedback: feedback.into(),
        }
    }
}

impl QuizBlock {
    /// The parsed score weight, if `points` is a non-negative integer.
    pub fn points_value(&self) -> Option<u32> {
        self.points.trim().parse().ok()
    }

    /// 0-based index of the correct option.
    ///
    /// Only `choose_best` blocks have one, and only when `answer` is an
    /// integer in `1..=options.len()`.
    pub fn correct_index(&self) -> Option<usize> {
        if self.kind != QuizKind::ChooseBest {
            return None;
        }
        match self.answer.trim().parse::<usize>() {
            Ok(n) if n >= 1 && n <= self.options.len() => Some(n - 1),
            _ => None,
        }
    }

    pub fn is_correct(&self, index: usize) -> bool {
        self.correct_index() == Some(index)
    }

    pub fn correct_option(&self) -> Option<&QuizOption> {
        self.correct_index().map(|i| &self.options[i])
    }

    /// True when a `free_text_number` block accepts every response.
    pub fn accepts_any(&self) -> bool {
        self.kind == QuizKind::FreeTextNumber && self.answer.trim() == ANY_SENTINEL
    }
}

/// The only answer sentinel `free_text_number` blocks support.
pub const ANY_SENTINEL: &str = "any";

// Equality ignores `span`: the same record parsed from two places is equal.
impl PartialEq for QuizBlock {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.kind == other.kind
            && self.title == other.title
            && self.points == other.points
            && self.answer == other.answer
            && self.prompt == other.prompt
            && self.options == other.options
            && self.classes == other.classes
            && self.attributes == other.attributes
    }
}

impl Eq for QuizBlock {}

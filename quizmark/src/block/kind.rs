use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The interaction a quiz block asks the renderer to present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuizKind {
    /// Single-best-answer multiple choice. `answer` is a 1-based option index.
    ChooseBest,
    /// Numeric free response. `answer` is `any` or a numeric literal.
    FreeTextNumber,
}

impl QuizKind {
    pub const ALL: [QuizKind; 2] = [QuizKind::ChooseBest, QuizKind::FreeTextNumber];

    /// Name as written in an attribute list class, without the leading dot.
    pub fn as_str(&self) -> &'static str {
        match self {
            QuizKind::ChooseBest => "choose_best",
            QuizKind::FreeTextNumber => "free_text_number",
        }
    }

    /// Recognize a `.class` token from an attribute list.
    pub fn from_class(token: &str) -> Option<QuizKind> {
        token.strip_prefix('.').and_then(|name| name.parse().ok())
    }

    pub fn has_options(&self) -> bool {
        matches!(self, QuizKind::ChooseBest)
    }
}

impl fmt::Display for QuizKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown quiz kind: {0}")]
pub struct UnknownKind(pub String);

impl FromStr for QuizKind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        QuizKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| UnknownKind(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn class_tokens() {
        assert_eq!(QuizKind::from_class(".choose_best"), Some(QuizKind::ChooseBest));
        assert_eq!(
            QuizKind::from_class(".free_text_number"),
            Some(QuizKind::FreeTextNumber)
        );
        assert_eq!(QuizKind::from_class("choose_best"), None);
        assert_eq!(QuizKind::from_class(".note"), None);
    }

    #[test]
    fn unknown_kind_names_the_class() {
        let err = "multiple_choice".parse::<QuizKind>().unwrap_err();
        assert_eq!(err.to_string(), "unknown quiz kind: multiple_choice");
    }

    #[test]
    fn display_matches_class_name() {
        for kind in QuizKind::ALL {
            assert_eq!(kind.to_string().parse::<QuizKind>(), Ok(kind));
        }
    }
}

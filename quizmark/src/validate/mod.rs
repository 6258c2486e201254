mod error;

use std::collections::HashSet;

use serde::Deserialize;

pub use error::{ValidationError, ValidationErrorKind};

use crate::block::{ANY_SENTINEL, QuizBlock, QuizKind};

/// Knobs for [`validate_with`]. Deserializable from a `[validate]` table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ValidateOptions {
    /// Fewest options a `choose_best` block may offer.
    pub min_options: usize,
    /// Reject blocks without prompt text.
    pub require_prompt: bool,
}

impl Default for ValidateOptions {
    fn default() -> Self {
        ValidateOptions {
            min_options: 2,
            require_prompt: false,
        }
    }
}

/// Validate blocks with default options.
pub fn validate(blocks: &[QuizBlock]) -> Result<(), Vec<ValidationError>> {
    validate_with(blocks, &ValidateOptions::default())
}

/// Check every block and return all defects found.
pub fn validate_with(
    blocks: &[QuizBlock],
    options: &ValidateOptions,
) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let mut seen: HashSet<&str> = HashSet::new();

    for block in blocks {
        let mut report = |kind| errors.push(ValidationError::new(kind, block.span.clone()));

        if block.id.trim().is_empty() {
            report(ValidationErrorKind::EmptyField {
                id: block.id.clone(),
                field: "id",
            });
        } else if !seen.insert(block.id.as_str()) {
            report(ValidationErrorKind::DuplicateId {
                id: block.id.clone(),
            });
        }

        if block.title.trim().is_empty() {
            report(ValidationErrorKind::EmptyField {
                id: block.id.clone(),
                field: "title",
            });
        }

        if block.points_value().is_none() {
            report(ValidationErrorKind::InvalidPoints {
                id: block.id.clone(),
                points: block.points.clone(),
            });
        }

        if options.require_prompt && block.prompt.trim().is_empty() {
            report(ValidationErrorKind::MissingPrompt {
                id: block.id.clone(),
            });
        }

        match block.kind {
            QuizKind::ChooseBest => {
                if block.options.len() < options.min_options {
                    report(ValidationErrorKind::TooFewOptions {
                        id: block.id.clone(),
                        option_count: block.options.len(),
                        minimum: options.min_options,
                    });
                }
                if block.correct_index().is_none() {
                    report(ValidationErrorKind::AnswerOutOfRange {
                        id: block.id.clone(),
                        answer: block.answer.clone(),
                        option_count: block.options.len(),
                    });
                }
            }
            QuizKind::FreeTextNumber => {
                if !is_free_text_answer(&block.answer) {
                    report(ValidationErrorKind::InvalidAnswer {
                        id: block.id.clone(),
                        answer: block.answer.clone(),
                    });
                }
                if !block.options.is_empty() {
                    report(ValidationErrorKind::UnexpectedOptions {
                        id: block.id.clone(),
                        option_count: block.options.len(),
                    });
                }
            }
        }
    }

    tracing::debug!(
        blocks = blocks.len(),
        errors = errors.len(),
        "validated quiz blocks"
    );

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn is_free_text_answer(answer: &str) -> bool {
    let answer = answer.trim();
    answer == ANY_SENTINEL || answer.parse::<f64>().is_ok_and(f64::is_finite)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::block::QuizOption;

    fn block(id: &str, kind: QuizKind, answer: &str, options: usize) -> QuizBlock {
        QuizBlock {
            id: id.into(),
            kind,
            title: "Title".into(),
            points: "1".into(),
            answer: answer.into(),
            prompt: "Prompt".into(),
            options: (0..options)
                .map(|i| QuizOption::new(format!("option {}", i + 1), "feedback"))
                .collect(),
            classes: Vec::new(),
            attributes: BTreeMap::new(),
            span: 0..0,
        }
    }

    fn codes(result: Result<(), Vec<ValidationError>>) -> Vec<&'static str> {
        result
            .err()
            .unwrap_or_default()
            .iter()
            .map(ValidationError::code)
            .collect()
    }

    #[test]
    fn well_formed_blocks_pass() {
        let blocks = vec![
            block("a", QuizKind::ChooseBest, "2", 3),
            block("b", QuizKind::FreeTextNumber, "any", 0),
            block("c", QuizKind::FreeTextNumber, "42.5", 0),
        ];
        assert_eq!(validate(&blocks), Ok(()));
    }

    #[test]
    fn duplicate_ids_reported_once_per_repeat() {
        let blocks = vec![
            block("a", QuizKind::ChooseBest, "1", 2),
            block("a", QuizKind::ChooseBest, "1", 2),
        ];
        let errors = validate(&blocks).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(
            errors[0].kind,
            ValidationErrorKind::DuplicateId { id: "a".into() }
        );
    }

    #[test]
    fn points_must_be_non_negative_integer() {
        for points in ["-1", "1.5", "one", ""] {
            let mut b = block("a", QuizKind::ChooseBest, "1", 2);
            b.points = points.into();
            assert_eq!(codes(validate(&[b])), vec!["invalid-points"], "points {:?}", points);
        }
        let mut zero = block("a", QuizKind::FreeTextNumber, "any", 0);
        zero.points = "0".into();
        assert_eq!(validate(&[zero]), Ok(()));
    }

    #[test]
    fn choose_best_needs_two_options_and_valid_answer() {
        assert_eq!(
            codes(validate(&[block("a", QuizKind::ChooseBest, "1", 1)])),
            vec!["too-few-options"]
        );
        let errors = validate(&[block("a", QuizKind::ChooseBest, "5", 3)]).unwrap_err();
        assert_eq!(
            errors[0].kind,
            ValidationErrorKind::AnswerOutOfRange {
                id: "a".into(),
                answer: "5".into(),
                option_count: 3,
            }
        );
        assert_eq!(
            codes(validate(&[block("a", QuizKind::ChooseBest, "1,2", 3)])),
            vec!["answer-out-of-range"]
        );
    }

    #[test]
    fn free_text_answer_is_sentinel_or_number() {
        assert_eq!(
            codes(validate(&[block("a", QuizKind::FreeTextNumber, "anything", 0)])),
            vec!["invalid-answer"]
        );
        assert_eq!(
            codes(validate(&[block("a", QuizKind::FreeTextNumber, "NaN", 0)])),
            vec!["invalid-answer"]
        );
        assert_eq!(
            codes(validate(&[block("a", QuizKind::FreeTextNumber, "any", 2)])),
            vec!["unexpected-options"]
        );
    }

    #[test]
    fn empty_fields_and_prompt_requirement() {
        let mut b = block("", QuizKind::ChooseBest, "1", 2);
        b.title = " ".into();
        b.prompt.clear();
        assert_eq!(codes(validate(&[b.clone()])), vec!["empty-field", "empty-field"]);

        let strict = ValidateOptions {
            require_prompt: true,
            ..ValidateOptions::default()
        };
        b.id = "a".into();
        b.title = "A".into();
        assert_eq!(codes(validate_with(&[b], &strict)), vec!["missing-prompt"]);
    }

    #[test]
    fn collects_every_defect() {
        let mut b = block("a", QuizKind::ChooseBest, "9", 1);
        b.points = "x".into();
        assert_eq!(
            codes(validate(&[b])),
            vec!["invalid-points", "too-few-options", "answer-out-of-range"]
        );
    }
}

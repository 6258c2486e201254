use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use quizmark::{Quiz, QuizBlock};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Json,
    Toml,
    /// The quiz micro-format itself.
    Markdown,
}

#[derive(Serialize)]
struct Export<'a> {
    blocks: &'a [QuizBlock],
}

/// Serialize the blocks of `quiz` for hand-off to a renderer.
pub fn render(quiz: &Quiz, format: OutputFormat, pretty: bool) -> Result<String> {
    let export = Export {
        blocks: &quiz.blocks,
    };
    match format {
        OutputFormat::Json if pretty => {
            serde_json::to_string_pretty(&export).context("cannot encode JSON")
        }
        OutputFormat::Json => serde_json::to_string(&export).context("cannot encode JSON"),
        OutputFormat::Toml => toml::to_string(&export).context("cannot encode TOML"),
        OutputFormat::Markdown => Ok(quiz.to_string()),
    }
}

/// One line per block for `list`.
pub fn summary_line(block: &QuizBlock) -> String {
    format!(
        "{:<24} {:<16} {:>3}  {} ({} option(s))",
        block.id,
        block.kind,
        block.points,
        block.title,
        block.options.len()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCE: &str = "\
<!--  -->

- Four spaces
  Too deep.
- Two spaces
  Right.
{: .choose_best #html_indentation title=\"HTML Indentation\" points=\"1\" answer=\"2\" }
";

    fn quiz() -> Quiz {
        quizmark::parser::parse(SOURCE).unwrap()
    }

    #[test]
    fn json_round_trips_records() {
        let quiz = quiz();
        let json = render(&quiz, OutputFormat::Json, false).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["blocks"][0]["id"], "html_indentation");
        assert_eq!(value["blocks"][0]["kind"], "choose_best");
        assert_eq!(value["blocks"][0]["options"][1]["feedback"], "Right.");

        let blocks: Vec<QuizBlock> = serde_json::from_value(value["blocks"].clone()).unwrap();
        assert_eq!(blocks, quiz.blocks);
    }

    #[test]
    fn toml_uses_block_tables() {
        let toml = render(&quiz(), OutputFormat::Toml, false).unwrap();
        assert!(toml.contains("[[blocks]]"));
        assert!(toml.contains("id = \"html_indentation\""));
    }

    #[test]
    fn markdown_reparses_to_same_records() {
        let quiz = quiz();
        let markdown = render(&quiz, OutputFormat::Markdown, false).unwrap();
        assert_eq!(quizmark::parser::parse(&markdown).unwrap().blocks, quiz.blocks);
    }

    #[test]
    fn summary_mentions_option_count() {
        let line = summary_line(&quiz().blocks[0]);
        assert!(line.starts_with("html_indentation"));
        assert!(line.ends_with("HTML Indentation (2 option(s))"));
    }
}

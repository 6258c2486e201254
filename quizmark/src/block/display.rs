use std::fmt;

use crate::Quiz;
use crate::block::{QuizBlock, QuizKind};

/// The comment line that opens every written block.
pub const SEPARATOR: &str = "<!--  -->";

/// Writes the block back in the micro-format it was parsed from.
impl fmt::Display for QuizBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", SEPARATOR)?;
        writeln!(f)?;

        // Without the dash, a leading empty option would read back as the
        // prompt, and a lone free-text option would become the prompt.
        let needs_prompt_dash = self.options.first().is_some_and(|o| o.text.is_empty())
            || (self.kind == QuizKind::FreeTextNumber && self.options.len() == 1);
        if !self.prompt.is_empty() || needs_prompt_dash {
            writeln!(f, "-")?;
            write_indented(f, &self.prompt)?;
            writeln!(f)?;
        }

        for option in &self.options {
            if option.text.is_empty() {
                writeln!(f, "-")?;
            } else {
                writeln!(f, "- {}", option.text)?;
            }
            write_indented(f, &option.feedback)?;
        }

        write!(f, "{{: .{}", self.kind)?;
        for class in &self.classes {
            write!(f, " .{}", class)?;
        }
        write!(f, " #{}", self.id)?;
        write_attribute(f, "title", &self.title)?;
        write_attribute(f, "points", &self.points)?;
        write_attribute(f, "answer", &self.answer)?;
        for (key, value) in &self.attributes {
            write_attribute(f, key, value)?;
        }
        writeln!(f, " }}")
    }
}

impl fmt::Display for Quiz {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, block) in self.blocks.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", block)?;
        }
        Ok(())
    }
}

fn write_indented(f: &mut fmt::Formatter<'_>, text: &str) -> fmt::Result {
    for line in text.lines() {
        if line.is_empty() {
            writeln!(f)?;
        } else {
            writeln!(f, "  {}", line)?;
        }
    }
    Ok(())
}

fn write_attribute(f: &mut fmt::Formatter<'_>, key: &str, value: &str) -> fmt::Result {
    write!(f, " {}=\"", key)?;
    for c in value.chars() {
        match c {
            '"' | '\\' => write!(f, "\\{}", c)?,
            _ => write!(f, "{}", c)?,
        }
    }
    write!(f, "\"")
}

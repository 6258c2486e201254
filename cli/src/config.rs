use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use quizmark::ValidateOptions;

use crate::output::OutputFormat;

pub const CONFIG_FILE_NAME: &str = "quizmark.toml";

/// Contents of `quizmark.toml`.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub validate: ValidateOptions,
    pub output: OutputConfig,
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    /// Format used by `export` when `--format` is not given.
    pub format: OutputFormat,
    /// Pretty-print JSON output.
    pub pretty: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        OutputConfig {
            format: OutputFormat::Json,
            pretty: true,
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read config '{}'", path.display()))?;
        toml::from_str(&text).with_context(|| format!("invalid config '{}'", path.display()))
    }

    /// Use `explicit` if given, else `quizmark.toml` in `base_dir` if it
    /// exists, else defaults.
    pub fn discover(explicit: Option<&Path>, base_dir: &Path) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        let candidate = base_dir.join(CONFIG_FILE_NAME);
        if candidate.is_file() {
            tracing::debug!(path = %candidate.display(), "using discovered config");
            Self::load(&candidate)
        } else {
            Ok(Self::default())
        }
    }
}

/// Directory a config file is looked up in for `input`.
pub fn base_dir_for(input: &Path) -> PathBuf {
    if input.is_dir() {
        return input.to_path_buf();
    }
    match input.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_without_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::discover(None, dir.path()).unwrap();
        assert_eq!(config.validate, ValidateOptions::default());
        assert_eq!(config.output.format, OutputFormat::Json);
        assert!(config.output.pretty);
    }

    #[test]
    fn discovers_file_next_to_input() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            "[validate]\nmin_options = 3\n\n[output]\nformat = \"toml\"\n",
        )
        .unwrap();
        let input = dir.path().join("lesson.md");
        std::fs::write(&input, "").unwrap();

        let config = Config::discover(None, &base_dir_for(&input)).unwrap();
        assert_eq!(config.validate.min_options, 3);
        assert!(!config.validate.require_prompt);
        assert_eq!(config.output.format, OutputFormat::Toml);
    }

    #[test]
    fn explicit_path_wins() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(&path, "[validate]\nrequire_prompt = true\n").unwrap();
        let config = Config::discover(Some(path.as_path()), Path::new("/nonexistent")).unwrap();
        assert!(config.validate.require_prompt);
    }

    #[test]
    fn rejects_unknown_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "[validate]\nmin_option = 3\n").unwrap();
        assert!(Config::load(&path).is_err());
    }

    #[test]
    fn relative_file_uses_current_dir() {
        assert_eq!(base_dir_for(Path::new("lesson.md")), PathBuf::from("."));
    }
}

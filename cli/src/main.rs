mod config;
mod output;
mod test_runner;

use std::path::{Path, PathBuf};
use std::process;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use codespan_reporting::diagnostic::Diagnostic;
use codespan_reporting::files::SimpleFiles;
use codespan_reporting::term;
use codespan_reporting::term::termcolor::{ColorChoice, StandardStream};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use quizmark::validate::validate_with;
use quizmark::{ParseError, ValidationError};

use crate::config::{Config, base_dir_for};
use crate::output::OutputFormat;

const SUBCOMMANDS: &[&str] = &["check", "list", "export", "test", "help"];

#[derive(Parser)]
#[command(name = "quizmark", version, about = "Quiz block checker for lesson Markdown")]
struct Cli {
    /// Disable colored error output
    #[arg(long, global = true)]
    no_color: bool,

    /// More log output (-v debug, -vv trace). RUST_LOG overrides.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Config file (default: quizmark.toml next to the input)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Parse and validate quiz blocks, reporting every defect
    Check(FileArgs),

    /// List quiz blocks, one per line
    List(FileArgs),

    /// Write quiz blocks as JSON, TOML or Markdown
    Export(ExportArgs),

    /// Run .test.md fixture files
    Test(TestArgs),
}

#[derive(clap::Args)]
struct FileArgs {
    /// Markdown document containing quiz blocks
    file: PathBuf,
}

#[derive(clap::Args)]
struct ExportArgs {
    /// Markdown document containing quiz blocks
    file: PathBuf,

    /// Output format (default from config, else json)
    #[arg(short, long, value_enum)]
    format: Option<OutputFormat>,
}

#[derive(clap::Args)]
struct TestArgs {
    /// Path to a .test.md file or directory containing them
    path: PathBuf,

    /// Run only tests in these categories (subfolder names). Repeatable.
    #[arg(short, long)]
    category: Vec<String>,

    /// List available categories and exit
    #[arg(long)]
    list_categories: bool,
}

fn main() {
    let args = with_default_subcommand(std::env::args().collect());
    let cli = Cli::parse_from(&args);
    init_logging(cli.verbose);

    let color = if cli.no_color {
        ColorChoice::Never
    } else {
        ColorChoice::Auto
    };

    let result = match cli.command {
        Command::Check(args) => do_check(&args.file, cli.config.as_deref(), color),
        Command::List(args) => do_list(&args.file, color),
        Command::Export(args) => do_export(args, cli.config.as_deref(), color),
        Command::Test(args) => {
            if args.list_categories {
                test_runner::list_categories(&args.path);
                Ok(0)
            } else {
                Ok(test_runner::run_tests(&args.path, cli.no_color, &args.category))
            }
        }
    };

    match result {
        Ok(code) => process::exit(code),
        Err(err) => {
            eprintln!("error: {:#}", err);
            process::exit(1);
        }
    }
}

/// `quizmark lesson.md` means `quizmark check lesson.md`.
fn with_default_subcommand(mut args: Vec<String>) -> Vec<String> {
    let mut i = 1;
    while i < args.len() {
        let arg = args[i].as_str();
        if arg == "--config" {
            i += 2;
            continue;
        }
        if arg.starts_with('-') {
            i += 1;
            continue;
        }
        if !SUBCOMMANDS.contains(&arg) {
            args.insert(i, "check".to_string());
        }
        break;
    }
    args
}

fn init_logging(verbose: u8) {
    let default_directive = match verbose {
        0 => "warn",
        1 => "quizmark=debug",
        _ => "quizmark=trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .init();
}

/// A parsed document together with its codespan file database.
struct Loaded {
    files: SimpleFiles<String, String>,
    parser: quizmark::Parser,
}

fn load(path: &Path) -> Result<Loaded> {
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read '{}'", path.display()))?;
    let mut files = SimpleFiles::new();
    let file_id = files.add(path.display().to_string(), source.clone());
    Ok(Loaded {
        files,
        parser: quizmark::Parser::new(source, file_id),
    })
}

fn do_check(path: &Path, config_path: Option<&Path>, color: ColorChoice) -> Result<i32> {
    let config = Config::discover(config_path, &base_dir_for(path))?;
    let loaded = load(path)?;
    let (quiz, parse_errors) = loaded.parser.parse_with_errors();
    let validation_errors = validate_with(&quiz.blocks, &config.validate)
        .err()
        .unwrap_or_default();

    let mut diagnostics: Vec<Diagnostic<usize>> =
        parse_errors.iter().map(ParseError::to_diagnostic).collect();
    diagnostics.extend(
        validation_errors
            .iter()
            .map(|e: &ValidationError| e.to_diagnostic(quiz.source_id)),
    );
    diagnostics.sort_by_key(|d| d.labels.first().map(|l| l.range.start).unwrap_or(0));
    emit_diagnostics(&loaded.files, &diagnostics, color);

    if diagnostics.is_empty() {
        eprintln!(
            "ok: {} has {} quiz block(s)",
            path.display(),
            quiz.blocks.len()
        );
        Ok(0)
    } else {
        eprintln!(
            "error: {} defect(s) in {}",
            diagnostics.len(),
            path.display()
        );
        Ok(1)
    }
}

fn do_list(path: &Path, color: ColorChoice) -> Result<i32> {
    let loaded = load(path)?;
    let (quiz, errors) = loaded.parser.parse_with_errors();
    for block in &quiz.blocks {
        println!("{}", output::summary_line(block));
    }
    emit_parse_errors(&loaded.files, &errors, color);
    Ok(if errors.is_empty() { 0 } else { 1 })
}

fn do_export(args: ExportArgs, config_path: Option<&Path>, color: ColorChoice) -> Result<i32> {
    let config = Config::discover(config_path, &base_dir_for(&args.file))?;
    let loaded = load(&args.file)?;
    let quiz = match loaded.parser.parse() {
        Ok(quiz) => quiz,
        Err(errors) => {
            emit_parse_errors(&loaded.files, &errors, color);
            return Ok(1);
        }
    };
    let format = args.format.unwrap_or(config.output.format);
    let rendered = output::render(&quiz, format, config.output.pretty)?;
    if rendered.ends_with('\n') {
        print!("{}", rendered);
    } else {
        println!("{}", rendered);
    }
    Ok(0)
}

fn emit_parse_errors(files: &SimpleFiles<String, String>, errors: &[ParseError], color: ColorChoice) {
    let diagnostics: Vec<Diagnostic<usize>> = errors.iter().map(ParseError::to_diagnostic).collect();
    emit_diagnostics(files, &diagnostics, color);
}

fn emit_diagnostics(
    files: &SimpleFiles<String, String>,
    diagnostics: &[Diagnostic<usize>],
    color: ColorChoice,
) {
    let writer = StandardStream::stderr(color);
    let config = term::Config::default();
    for diagnostic in diagnostics {
        let _ = term::emit_to_write_style(&mut writer.lock(), &config, files, diagnostic);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn bare_file_becomes_check() {
        assert_eq!(
            with_default_subcommand(args(&["quizmark", "lesson.md"])),
            args(&["quizmark", "check", "lesson.md"])
        );
        assert_eq!(
            with_default_subcommand(args(&["quizmark", "--no-color", "lesson.md"])),
            args(&["quizmark", "--no-color", "check", "lesson.md"])
        );
    }

    #[test]
    fn config_value_is_not_a_file() {
        assert_eq!(
            with_default_subcommand(args(&["quizmark", "--config", "q.toml", "lesson.md"])),
            args(&["quizmark", "--config", "q.toml", "check", "lesson.md"])
        );
    }

    #[test]
    fn explicit_subcommands_untouched() {
        let list = args(&["quizmark", "export", "lesson.md", "-f", "toml"]);
        assert_eq!(with_default_subcommand(list.clone()), list);
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use quizmark::parser::line_of;
use quizmark::validate::validate_with;
use quizmark::{Parser, ValidateOptions};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExpectedError {
    /// Reason code, e.g. `missing-metadata` or `invalid-points`.
    pub code: String,

    /// Substring that must appear in the error message.
    #[serde(default)]
    pub contains: Option<String>,

    /// If set, the error's span must start on this 1-based source line.
    #[serde(default)]
    pub line: Option<usize>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TestConfig {
    /// Human-readable test description.
    #[serde(default)]
    pub description: Option<String>,

    /// Expected number of well-formed blocks.
    #[serde(default)]
    pub expect_blocks: Option<usize>,

    /// Expected ids of the well-formed blocks, in order.
    #[serde(default)]
    pub expect_ids: Option<Vec<String>>,

    /// Expected defects, parse and validation alike, in source order.
    /// Absent means none are expected.
    #[serde(default)]
    pub expect_errors: Vec<ExpectedError>,

    /// Validation options for this fixture.
    #[serde(default)]
    pub validate: ValidateOptions,
}

/// Parse a `.test.md` file into its TOML config and Markdown source.
fn parse_test_file(content: &str) -> Result<(TestConfig, &str), String> {
    let content = content.trim_start_matches('\u{feff}');

    let after_open = content
        .strip_prefix("---")
        .ok_or("missing opening --- frontmatter delimiter")?;
    let after_open = after_open
        .strip_prefix('\n')
        .or_else(|| after_open.strip_prefix("\r\n"))
        .unwrap_or(after_open);

    let close_pos = after_open
        .find("\n---")
        .ok_or("missing closing --- frontmatter delimiter")?;

    let toml_str = after_open[..close_pos].trim_end_matches('\r');
    let rest = &after_open[close_pos + "\n---".len()..];
    let source = rest
        .strip_prefix("\r\n")
        .or_else(|| rest.strip_prefix('\n'))
        .unwrap_or(rest);

    let config: TestConfig =
        toml::from_str(toml_str).map_err(|e| format!("TOML parse error: {}", e))?;

    Ok((config, source))
}

/// A parse or validation defect reduced to what fixtures can check.
#[derive(Debug)]
struct Defect {
    code: &'static str,
    message: String,
    line: Option<usize>,
}

impl std::fmt::Display for Defect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.line {
            Some(line) => write!(f, "[{}] line {}: {}", self.code, line, self.message),
            None => write!(f, "[{}] {}", self.code, self.message),
        }
    }
}

pub enum TestOutcome {
    Pass,
    Fail(String),
}

pub struct TestResult {
    pub path: PathBuf,
    pub description: Option<String>,
    pub outcome: TestOutcome,
}

impl TestResult {
    fn label(&self) -> &str {
        self.description.as_deref().unwrap_or_else(|| {
            self.path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("?")
        })
    }
}

fn run_single_test(path: &Path) -> TestResult {
    let fail = |description: Option<String>, reason: String| TestResult {
        path: path.to_path_buf(),
        description,
        outcome: TestOutcome::Fail(reason),
    };

    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => return fail(None, format!("cannot read file: {}", e)),
    };

    let (config, source) = match parse_test_file(&content) {
        Ok(pair) => pair,
        Err(e) => return fail(None, format!("frontmatter error: {}", e)),
    };

    let (quiz, parse_errors) = Parser::new(source.to_string(), 0).parse_with_errors();
    let validation_errors = validate_with(&quiz.blocks, &config.validate)
        .err()
        .unwrap_or_default();

    let mut defects: Vec<(usize, Defect)> = parse_errors
        .iter()
        .map(|e| {
            (
                e.span.start,
                Defect {
                    code: e.code(),
                    message: e.message(),
                    line: Some(line_of(source, e.span.start)),
                },
            )
        })
        .chain(validation_errors.iter().map(|e| {
            (
                e.span.start,
                Defect {
                    code: e.code(),
                    message: e.kind.to_string(),
                    line: (!e.span.is_empty()).then(|| line_of(source, e.span.start)),
                },
            )
        }))
        .collect();
    defects.sort_by_key(|(start, _)| *start);
    let defects: Vec<Defect> = defects.into_iter().map(|(_, d)| d).collect();

    let ids: Vec<&str> = quiz.blocks.iter().map(|b| b.id.as_str()).collect();
    let reason = check_defects(&defects, &config.expect_errors)
        .or_else(|| check_blocks(&ids, &config));

    TestResult {
        path: path.to_path_buf(),
        description: config.description.clone(),
        outcome: match reason {
            Some(reason) => TestOutcome::Fail(reason),
            None => TestOutcome::Pass,
        },
    }
}

/// Check that actual defects match expectations. Returns `Some(reason)` on mismatch.
fn check_defects(actual: &[Defect], expected: &[ExpectedError]) -> Option<String> {
    if actual.len() != expected.len() {
        let listed: Vec<String> = actual.iter().map(|d| format!("  - {}", d)).collect();
        return Some(format!(
            "expected {} error(s), got {}\n  actual errors:\n{}",
            expected.len(),
            actual.len(),
            if listed.is_empty() {
                "    (none)".to_string()
            } else {
                listed.join("\n")
            }
        ));
    }

    for (i, (actual, expected)) in actual.iter().zip(expected).enumerate() {
        if actual.code != expected.code {
            return Some(format!(
                "error[{}]: expected code `{}`, got {}",
                i, expected.code, actual
            ));
        }
        if let Some(needle) = &expected.contains {
            if !actual.message.contains(needle.as_str()) {
                return Some(format!(
                    "error[{}]: expected message containing \"{}\", got: {}",
                    i, needle, actual.message
                ));
            }
        }
        if let Some(expected_line) = expected.line {
            if actual.line != Some(expected_line) {
                return Some(format!(
                    "error[{}]: expected on line {}, got {}",
                    i, expected_line, actual
                ));
            }
        }
    }

    None
}

fn check_blocks(ids: &[&str], config: &TestConfig) -> Option<String> {
    if let Some(expected) = config.expect_blocks {
        if ids.len() != expected {
            return Some(format!(
                "expected {} block(s), got {}: [{}]",
                expected,
                ids.len(),
                ids.join(", ")
            ));
        }
    }
    if let Some(expected) = &config.expect_ids {
        if ids != expected.as_slice() {
            return Some(format!(
                "block ids mismatch\n  expected: [{}]\n  actual:   [{}]",
                expected.join(", "),
                ids.join(", ")
            ));
        }
    }
    None
}

/// Discover `.test.md` files grouped by category (subfolder relative to root).
/// Files directly in `root` get category "" (uncategorized).
fn discover_categorized(root: &Path) -> BTreeMap<String, Vec<PathBuf>> {
    let mut categories: BTreeMap<String, Vec<PathBuf>> = BTreeMap::new();
    collect_tests(root, root, &mut categories);
    for files in categories.values_mut() {
        files.sort();
    }
    categories
}

fn collect_tests(dir: &Path, root: &Path, out: &mut BTreeMap<String, Vec<PathBuf>>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_tests(&path, root, out);
        } else if path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|name| name.ends_with(".test.md"))
        {
            let category = path
                .parent()
                .and_then(|p| p.strip_prefix(root).ok())
                .map(|p| p.to_string_lossy().replace('\\', "/"))
                .unwrap_or_default();
            out.entry(category).or_default().push(path);
        }
    }
}

fn category_label(category: &str) -> &str {
    if category.is_empty() { "(root)" } else { category }
}

/// List available categories for the given test path.
pub fn list_categories(path: &Path) {
    if path.is_file() {
        eprintln!("(single file, no categories)");
        return;
    }

    let categories = discover_categorized(path);
    if categories.is_empty() {
        eprintln!("no .test.md files found in {}", path.display());
        return;
    }

    eprintln!("available categories:");
    for (cat, files) in &categories {
        eprintln!("  {} ({} tests)", category_label(cat), files.len());
    }
}

/// Keep the requested categories (and their subcategories). Warns about
/// requests that match nothing.
fn select_categories(
    all: BTreeMap<String, Vec<PathBuf>>,
    requested: &[String],
) -> BTreeMap<String, Vec<PathBuf>> {
    if requested.is_empty() {
        return all;
    }
    for req in requested {
        let req = req.trim_matches('/');
        if !all.keys().any(|cat| in_category(cat, req)) {
            eprintln!(
                "warning: category '{}' not found (available: {})",
                req,
                all.keys()
                    .map(|k| category_label(k))
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }
    }
    all.into_iter()
        .filter(|(cat, _)| {
            requested
                .iter()
                .any(|req| in_category(cat, req.trim_matches('/')))
        })
        .collect()
}

fn in_category(category: &str, requested: &str) -> bool {
    category == requested || category.starts_with(&format!("{}/", requested))
}

struct Palette {
    no_color: bool,
}

impl Palette {
    fn paint(&self, code: &str, s: &str) -> String {
        if self.no_color {
            s.to_string()
        } else {
            format!("\x1b[{}m{}\x1b[0m", code, s)
        }
    }

    fn pass(&self) -> String {
        self.paint("32", "PASS")
    }

    fn fail(&self) -> String {
        self.paint("31", "FAIL")
    }

    fn bold(&self, s: &str) -> String {
        self.paint("1", s)
    }
}

/// Run all `.test.md` files under `path` (or a single file).
/// If `categories` is non-empty, only run tests in those categories.
/// Returns exit code: 0 = all pass, 1 = any failure.
pub fn run_tests(path: &Path, no_color: bool, categories: &[String]) -> i32 {
    let palette = Palette { no_color };

    let groups: BTreeMap<String, Vec<PathBuf>> = if path.is_file() {
        BTreeMap::from([(String::new(), vec![path.to_path_buf()])])
    } else {
        let all = discover_categorized(path);
        if all.is_empty() {
            eprintln!("no .test.md files found in {}", path.display());
            return 1;
        }
        let selected = select_categories(all, categories);
        if selected.is_empty() {
            eprintln!("no matching categories found");
            return 1;
        }
        selected
    };
    let show_headers = !path.is_file();

    let mut passed = 0usize;
    let mut failures: Vec<TestResult> = Vec::new();

    for (cat, files) in &groups {
        if show_headers {
            eprintln!();
            eprintln!("{}", palette.bold(category_label(cat)));
        }
        for file in files {
            let result = run_single_test(file);
            match &result.outcome {
                TestOutcome::Pass => {
                    passed += 1;
                    eprintln!("  {}  {}", palette.pass(), result.label());
                }
                TestOutcome::Fail(_) => {
                    eprintln!("  {}  {}", palette.fail(), result.label());
                    failures.push(result);
                }
            }
        }
    }

    if !failures.is_empty() {
        eprintln!();
        eprintln!("failures:");
        for f in &failures {
            eprintln!();
            eprintln!("  --- {} ---", f.path.display());
            if let TestOutcome::Fail(reason) = &f.outcome {
                for line in reason.lines() {
                    eprintln!("  {}", line);
                }
            }
        }
    }

    eprintln!();
    if failures.is_empty() {
        eprintln!(
            "test result: {}. {} passed, 0 failed",
            palette.paint("32", "ok"),
            passed
        );
        0
    } else {
        eprintln!(
            "test result: {}. {} passed, {} failed (of {})",
            palette.paint("31", "FAILED"),
            passed,
            failures.len(),
            passed + failures.len()
        );
        1
    }
}

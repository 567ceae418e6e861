use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use deck::{HeaderPolicy, ParseOptions};
use deck_renderer::{Renderer, Rules};

const EXTENSION: &str = ".test.slide";

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TestConfig {
    /// Human-readable test description.
    #[serde(default)]
    pub description: Option<String>,

    /// Overrides the configured header policy for this fixture.
    #[serde(default)]
    pub header_policy: Option<HeaderPolicy>,

    /// Substrings that must all appear in the rendered HTML.
    #[serde(default)]
    pub expect_output_contains: Vec<String>,

    /// If true, the test expects parsing to fail.
    #[serde(default)]
    pub expect_parse_error: bool,

    /// The parse error must be reported on this 1-based source line.
    #[serde(default)]
    pub expect_error_line: Option<usize>,

    /// The parse error message must contain this substring.
    #[serde(default)]
    pub expect_error: Option<String>,

    /// Exact number of inline style warnings produced while rendering.
    #[serde(default)]
    pub expect_warnings: Option<usize>,
}

/// Split a `.test.slide` file into its TOML config and deck source.
fn parse_test_file(content: &str) -> Result<(TestConfig, &str), String> {
    let content = content.trim_start_matches('\u{feff}'); // strip BOM

    if !content.starts_with("---") {
        return Err("missing opening --- frontmatter delimiter".into());
    }

    let after_open = &content[3..];
    let after_open = after_open
        .strip_prefix('\n')
        .or_else(|| after_open.strip_prefix("\r\n"))
        .unwrap_or(after_open);

    let close_pos = if after_open.starts_with("---") {
        0
    } else {
        after_open
            .find("\n---")
            .map(|pos| pos + 1)
            .ok_or("missing closing --- frontmatter delimiter")?
    };

    let toml_str = after_open[..close_pos].trim_end_matches(['\r', '\n']);
    let rest = &after_open[close_pos + 3..];
    let source = rest
        .strip_prefix("\r\n")
        .or_else(|| rest.strip_prefix('\n'))
        .unwrap_or(rest);

    let config: TestConfig =
        toml::from_str(toml_str).map_err(|e| format!("TOML parse error: {}", e))?;

    Ok((config, source))
}

#[derive(Debug, PartialEq, Eq)]
pub enum TestOutcome {
    Pass,
    Fail(String),
}

pub struct TestResult {
    pub path: PathBuf,
    pub description: Option<String>,
    pub outcome: TestOutcome,
}

fn run_single_test(path: &Path, options: &ParseOptions) -> TestResult {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            return TestResult {
                path: path.to_path_buf(),
                description: None,
                outcome: TestOutcome::Fail(format!("cannot read file: {}", e)),
            };
        }
    };

    let (config, source) = match parse_test_file(&content) {
        Ok(pair) => pair,
        Err(e) => {
            return TestResult {
                path: path.to_path_buf(),
                description: None,
                outcome: TestOutcome::Fail(format!("frontmatter error: {}", e)),
            };
        }
    };

    tracing::debug!(path = %path.display(), "running fixture");
    TestResult {
        path: path.to_path_buf(),
        description: config.description.clone(),
        outcome: match check_fixture(&config, source, options) {
            Some(reason) => TestOutcome::Fail(reason),
            None => TestOutcome::Pass,
        },
    }
}

/// Parse and render `source`, comparing against `config`. Returns
/// `Some(reason)` on mismatch.
fn check_fixture(config: &TestConfig, source: &str, options: &ParseOptions) -> Option<String> {
    let mut options = *options;
    if let Some(policy) = config.header_policy {
        options.header_policy = policy;
    }
    let parse_result = deck::Parser::new(source.to_string(), 0)
        .with_options(options)
        .parse();

    let expects_error = config.expect_parse_error
        || config.expect_error_line.is_some()
        || config.expect_error.is_some();

    let doc = match (parse_result, expects_error) {
        (Err(err), true) => return check_parse_error(config, &err),
        (Ok(_), true) => return Some("expected parse error, but parsing succeeded".into()),
        (Err(err), false) => return Some(format!("unexpected parse error: {}", err)),
        (Ok(doc), false) => doc,
    };

    let rendered = match Renderer::new(Rules::html()).render(&doc) {
        Ok(r) => r,
        Err(e) => return Some(format!("render error: {}", e)),
    };

    for expected in &config.expect_output_contains {
        if !rendered.output.contains(expected.as_str()) {
            return Some(format!(
                "output does not contain \"{}\"\n  actual:\n{}",
                expected,
                indent(&rendered.output)
            ));
        }
    }

    if let Some(expected) = config.expect_warnings {
        if rendered.warnings.len() != expected {
            let actual: Vec<String> = rendered
                .warnings
                .iter()
                .map(|w| format!("  - section {}: {}", w.section, w.warning))
                .collect();
            return Some(format!(
                "expected {} warning(s), got {}\n  actual warnings:\n{}",
                expected,
                rendered.warnings.len(),
                if actual.is_empty() {
                    "    (none)".to_string()
                } else {
                    actual.join("\n")
                }
            ));
        }
    }

    None
}

fn check_parse_error(config: &TestConfig, err: &deck::ParseError) -> Option<String> {
    if let Some(line) = config.expect_error_line {
        if err.line != line {
            return Some(format!(
                "expected parse error on line {}, got line {}: {}",
                line, err.line, err.kind
            ));
        }
    }
    if let Some(expected) = &config.expect_error {
        let msg = err.to_string();
        if !msg.contains(expected.as_str()) {
            return Some(format!(
                "expected error containing \"{}\", got: {}",
                expected, msg
            ));
        }
    }
    None
}

fn indent(text: &str) -> String {
    text.lines()
        .map(|l| format!("    {}", l))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Discover `.test.slide` files grouped by category (subfolder relative to
/// root). Files directly in `root` get category "" (uncategorized).
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
        } else if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            if name.ends_with(EXTENSION) {
                let category = path
                    .parent()
                    .and_then(|p| p.strip_prefix(root).ok())
                    .map(|p| p.to_string_lossy().replace('\\', "/"))
                    .unwrap_or_default();
                out.entry(category).or_default().push(path);
            }
        }
    }
}

/// List available categories for the given test path.
pub fn list_categories(path: &Path) {
    if path.is_file() {
        eprintln!("(single file, no categories)");
        return;
    }

    let categories = discover_categorized(path);
    if categories.is_empty() {
        eprintln!("no {} files found in {}", EXTENSION, path.display());
        return;
    }

    eprintln!("available categories:");
    for (cat, files) in &categories {
        let label = if cat.is_empty() { "(root)" } else { cat.as_str() };
        eprintln!("  {} ({} tests)", label, files.len());
    }
}

fn pass_label(no_color: bool) -> &'static str {
    if no_color { "PASS" } else { "\x1b[32mPASS\x1b[0m" }
}

fn fail_label(no_color: bool) -> &'static str {
    if no_color { "FAIL" } else { "\x1b[31mFAIL\x1b[0m" }
}

fn bold(s: &str, no_color: bool) -> String {
    if no_color {
        s.to_string()
    } else {
        format!("\x1b[1m{}\x1b[0m", s)
    }
}

fn label(result: &TestResult) -> &str {
    result.description.as_deref().unwrap_or_else(|| {
        result
            .path
            .file_name()
            .and_then(|s| s.to_str())
            .and_then(|s| s.strip_suffix(EXTENSION))
            .unwrap_or("?")
    })
}

/// Run all `.test.slide` files under `path` (or a single file).
/// If `categories` is non-empty, only run tests in those categories.
/// Returns exit code: 0 = all pass, 1 = any failure.
pub fn run_tests(path: &Path, no_color: bool, categories: &[String], options: &ParseOptions) -> i32 {
    let run_categories: BTreeMap<String, Vec<PathBuf>> = if path.is_file() {
        BTreeMap::from([(String::new(), vec![path.to_path_buf()])])
    } else {
        let all_categories = discover_categorized(path);
        if all_categories.is_empty() {
            eprintln!("no {} files found in {}", EXTENSION, path.display());
            return 1;
        }
        filter_categories(all_categories, categories)
    };

    if run_categories.is_empty() {
        eprintln!("no matching categories found");
        return 1;
    }

    let mut passed = 0usize;
    let mut failures: Vec<TestResult> = Vec::new();

    for (cat, files) in &run_categories {
        if !path.is_file() {
            let header = if cat.is_empty() { "(root)" } else { cat.as_str() };
            eprintln!();
            eprintln!("{}", bold(header, no_color));
        }

        for file in files {
            let result = run_single_test(file, options);
            match &result.outcome {
                TestOutcome::Pass => {
                    passed += 1;
                    eprintln!("  {}  {}", pass_label(no_color), label(&result));
                }
                TestOutcome::Fail(_) => {
                    eprintln!("  {}  {}", fail_label(no_color), label(&result));
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
    let failed = failures.len();
    if failed == 0 {
        let ok = if no_color { "ok" } else { "\x1b[32mok\x1b[0m" };
        eprintln!("test result: {}. {} passed, 0 failed", ok, passed);
        0
    } else {
        let status = if no_color { "FAILED" } else { "\x1b[31mFAILED\x1b[0m" };
        eprintln!(
            "test result: {}. {} passed, {} failed (of {})",
            status,
            passed,
            failed,
            passed + failed
        );
        1
    }
}

fn filter_categories(
    all: BTreeMap<String, Vec<PathBuf>>,
    requested: &[String],
) -> BTreeMap<String, Vec<PathBuf>> {
    if requested.is_empty() {
        return all;
    }
    let mut filtered = BTreeMap::new();
    for req in requested {
        let req = req.trim_matches('/');
        let mut found = false;
        for (cat, files) in &all {
            if cat == req || cat.starts_with(&format!("{}/", req)) {
                filtered.insert(cat.clone(), files.clone());
                found = true;
            }
        }
        if !found {
            eprintln!(
                "warning: category '{}' not found (available: {})",
                req,
                all.keys()
                    .map(|k| if k.is_empty() { "(root)" } else { k.as_str() })
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }
    }
    filtered
}

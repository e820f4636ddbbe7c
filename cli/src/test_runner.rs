use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use lint::{Config, ValidationError};

#[derive(Debug, Deserialize)]
pub struct ExpectedError {
    /// Error code, e.g. `ambiguous-heading-id`.
    pub code: String,

    /// If set, the error must start on this 1-based line of the document.
    #[serde(default)]
    pub line: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TestConfig {
    #[serde(default)]
    pub description: Option<String>,

    /// Errors the document must produce, in source order. Empty means clean.
    #[serde(default)]
    pub expect_errors: Vec<ExpectedError>,
}

/// Split a `.test.md` file into its TOML header and the document under test.
fn parse_test_file(content: &str) -> Result<(TestConfig, &str), String> {
    let content = content.trim_start_matches('\u{feff}');

    let Some(after_open) = content.strip_prefix("---") else {
        return Err("missing opening --- frontmatter delimiter".into());
    };
    let after_open = after_open
        .strip_prefix("\r\n")
        .or_else(|| after_open.strip_prefix('\n'))
        .unwrap_or(after_open);

    let close = after_open
        .find("\n---")
        .ok_or("missing closing --- frontmatter delimiter")?;

    let header = after_open[..close].trim_end_matches('\r');
    let rest = &after_open[close + 4..];
    let document = rest
        .strip_prefix("\r\n")
        .or_else(|| rest.strip_prefix('\n'))
        .unwrap_or(rest);

    let config: TestConfig =
        toml::from_str(header).map_err(|e| format!("TOML parse error: {}", e))?;
    Ok((config, document))
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
    fn failed(path: &Path, description: Option<String>, reason: String) -> Self {
        TestResult {
            path: path.to_path_buf(),
            description,
            outcome: TestOutcome::Fail(reason),
        }
    }

    /// Description if given, otherwise the file stem.
    fn label(&self) -> &str {
        self.description.as_deref().unwrap_or_else(|| {
            self.path
                .file_name()
                .and_then(|s| s.to_str())
                .map(|s| s.trim_end_matches(".test.md"))
                .unwrap_or("?")
        })
    }
}

fn run_single_test(path: &Path, config: &Config) -> TestResult {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => return TestResult::failed(path, None, format!("cannot read file: {}", e)),
    };

    let (test, document) = match parse_test_file(&content) {
        Ok(pair) => pair,
        Err(e) => return TestResult::failed(path, None, format!("frontmatter error: {}", e)),
    };

    let errors = lint::check_source(document, 0, config);
    tracing::debug!(path = %path.display(), errors = errors.len(), "ran test");

    match check_errors(document, &errors, &test.expect_errors) {
        Some(reason) => TestResult::failed(path, test.description, reason),
        None => TestResult {
            path: path.to_path_buf(),
            description: test.description,
            outcome: TestOutcome::Pass,
        },
    }
}

/// Compare produced errors with expectations. Returns `Some(reason)` on mismatch.
fn check_errors(
    source: &str,
    actual: &[ValidationError],
    expected: &[ExpectedError],
) -> Option<String> {
    if actual.len() != expected.len() {
        let listed: Vec<String> = actual
            .iter()
            .map(|e| format!("  - line {}: [{}] {}", e.location.line(source), e.code, e))
            .collect();
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
        if actual.code.as_str() != expected.code {
            return Some(format!(
                "error[{}]: expected code {}, got {} ({})",
                i, expected.code, actual.code, actual
            ));
        }
        let line = actual.location.line(source);
        if let Some(expected_line) = expected.line {
            if line != expected_line {
                return Some(format!(
                    "error[{}]: expected {} on line {}, but it is on line {}",
                    i, expected.code, expected_line, line
                ));
            }
        }
    }

    None
}

/// `.test.md` files under `root`, keyed by the subfolder they live in.
/// Files directly in `root` get the empty category.
fn discover_categorized(root: &Path) -> BTreeMap<String, Vec<PathBuf>> {
    let mut categories: BTreeMap<String, Vec<PathBuf>> = BTreeMap::new();
    let mut pending = vec![root.to_path_buf()];

    while let Some(dir) = pending.pop() {
        let Ok(entries) = std::fs::read_dir(&dir) else {
            continue;
        };
        for path in entries.flatten().map(|entry| entry.path()) {
            if path.is_dir() {
                pending.push(path);
                continue;
            }
            let is_test = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.ends_with(".test.md"));
            if is_test {
                let category = dir
                    .strip_prefix(root)
                    .map(|p| p.to_string_lossy().replace('\\', "/"))
                    .unwrap_or_default();
                categories.entry(category).or_default().push(path);
            }
        }
    }

    for files in categories.values_mut() {
        files.sort();
    }
    categories
}

fn category_label(category: &str) -> &str {
    if category.is_empty() { "(root)" } else { category }
}

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
    for (category, files) in &categories {
        eprintln!("  {} ({} tests)", category_label(category), files.len());
    }
}

/// Requested categories and everything nested below them.
fn select<'a>(
    all: &'a BTreeMap<String, Vec<PathBuf>>,
    requested: &[String],
) -> BTreeMap<&'a str, &'a [PathBuf]> {
    if requested.is_empty() {
        return all.iter().map(|(k, v)| (k.as_str(), v.as_slice())).collect();
    }

    let mut selected = BTreeMap::new();
    for request in requested {
        let request = request.trim_matches('/');
        let prefix = format!("{}/", request);
        let before = selected.len();
        for (category, files) in all {
            if category == request || category.starts_with(&prefix) {
                selected.insert(category.as_str(), files.as_slice());
            }
        }
        if selected.len() == before {
            let available: Vec<&str> = all.keys().map(|k| category_label(k)).collect();
            eprintln!(
                "warning: category '{}' not found (available: {})",
                request,
                available.join(", ")
            );
        }
    }
    selected
}

/// Terminal styling for test output.
struct Style {
    no_color: bool,
}

impl Style {
    fn paint(&self, code: &str, text: &str) -> String {
        if self.no_color {
            text.to_string()
        } else {
            format!("\x1b[{}m{}\x1b[0m", code, text)
        }
    }

    fn pass(&self) -> String {
        self.paint("32", "PASS")
    }

    fn fail(&self) -> String {
        self.paint("31", "FAIL")
    }

    fn bold(&self, text: &str) -> String {
        self.paint("1", text)
    }
}

/// Run every `.test.md` under `path` (or the single file it names),
/// optionally restricted to `categories`. Returns the process exit code.
pub fn run_tests(path: &Path, no_color: bool, categories: &[String], config: &Config) -> i32 {
    let style = Style { no_color };

    let groups: BTreeMap<String, Vec<PathBuf>> = if path.is_file() {
        BTreeMap::from([(String::new(), vec![path.to_path_buf()])])
    } else {
        discover_categorized(path)
    };

    if groups.is_empty() {
        eprintln!("no .test.md files found in {}", path.display());
        return 1;
    }

    let selected = if path.is_file() {
        select(&groups, &[])
    } else {
        select(&groups, categories)
    };
    if selected.is_empty() {
        eprintln!("no matching categories found");
        return 1;
    }

    let mut passed = 0usize;
    let mut failures: Vec<TestResult> = Vec::new();

    for (category, files) in &selected {
        if !path.is_file() {
            eprintln!();
            eprintln!("{}", style.bold(category_label(category)));
        }

        for file in *files {
            let result = run_single_test(file, config);
            match result.outcome {
                TestOutcome::Pass => {
                    passed += 1;
                    eprintln!("  {}  {}", style.pass(), result.label());
                }
                TestOutcome::Fail(_) => {
                    eprintln!("  {}  {}", style.fail(), result.label());
                    failures.push(result);
                }
            }
        }
    }

    if !failures.is_empty() {
        eprintln!();
        eprintln!("failures:");
        for failure in &failures {
            eprintln!();
            eprintln!("  --- {} ---", failure.path.display());
            if let TestOutcome::Fail(reason) = &failure.outcome {
                for line in reason.lines() {
                    eprintln!("  {}", line);
                }
            }
        }
    }

    eprintln!();
    if failures.is_empty() {
        eprintln!("test result: {}. {} passed, 0 failed", style.paint("32", "ok"), passed);
        0
    } else {
        eprintln!(
            "test result: {}. {} passed, {} failed (of {})",
            style.paint("31", "FAILED"),
            passed,
            failures.len(),
            passed + failures.len()
        );
        1
    }
}

#[cfg(test)]
mod tests {
    use lint::ErrorCode;
    use pretty_assertions::assert_eq;

    use super::*;

    fn fixtures() -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("../fixtures")
    }

    #[test]
    fn parses_header_and_document() {
        let content = "---\ndescription = \"dup\"\nexpect_errors = [{ code = \"no-h1\", line = 1 }]\n---\n# Title\n";
        let (config, document) = parse_test_file(content).expect("valid test file");
        assert_eq!(config.description.as_deref(), Some("dup"));
        assert_eq!(config.expect_errors.len(), 1);
        assert_eq!(config.expect_errors[0].code, "no-h1");
        assert_eq!(config.expect_errors[0].line, Some(1));
        assert_eq!(document, "# Title\n");
    }

    #[test]
    fn empty_header_expects_clean_document() {
        let (config, document) = parse_test_file("---\n---\n## Ok\n").expect("valid test file");
        assert!(config.description.is_none());
        assert!(config.expect_errors.is_empty());
        assert_eq!(document, "## Ok\n");
    }

    #[test]
    fn rejects_missing_delimiters() {
        assert!(parse_test_file("## No header\n").is_err());
        assert!(parse_test_file("---\ndescription = \"x\"\n").is_err());
        assert!(parse_test_file("---\nexpect_errors = 3\n---\n").is_err());
    }

    #[test]
    fn check_errors_matches_codes_and_lines() {
        let source = "# Title\n\n## Body\n";
        let errors = lint::check_source(source, 0, &Config::docs());
        assert_eq!(errors[0].code, ErrorCode::DisallowedTopLevelHeading);

        let expected = vec![ExpectedError {
            code: "no-h1".to_string(),
            line: Some(1),
        }];
        assert!(check_errors(source, &errors, &expected).is_none());

        let wrong_line = vec![ExpectedError {
            code: "no-h1".to_string(),
            line: Some(3),
        }];
        let reason = check_errors(source, &errors, &wrong_line).expect("line mismatch");
        assert!(reason.contains("line 3"));

        let wrong_code = vec![ExpectedError {
            code: "empty-id".to_string(),
            line: None,
        }];
        let reason = check_errors(source, &errors, &wrong_code).expect("code mismatch");
        assert!(reason.contains("expected code empty-id"));

        let reason = check_errors(source, &errors, &[]).expect("count mismatch");
        assert!(reason.starts_with("expected 0 error(s), got 1"));
    }

    #[test]
    fn discovers_fixture_categories() {
        let categories = discover_categorized(&fixtures());
        let names: Vec<&str> = categories.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["headings", "tags"]);
        assert!(categories.values().all(|files| !files.is_empty()));
    }

    #[test]
    fn category_selection_includes_nested() {
        let mut all = BTreeMap::new();
        all.insert("tags".to_string(), vec![PathBuf::from("a.test.md")]);
        all.insert("tags/hint".to_string(), vec![PathBuf::from("b.test.md")]);
        all.insert("headings".to_string(), vec![PathBuf::from("c.test.md")]);

        let selected = select(&all, &["tags/".to_string()]);
        let names: Vec<&str> = selected.keys().copied().collect();
        assert_eq!(names, vec!["tags", "tags/hint"]);
        assert_eq!(select(&all, &[]).len(), 3);
        assert!(select(&all, &["missing".to_string()]).is_empty());
    }

    #[test]
    fn fixtures_pass() {
        assert_eq!(run_tests(&fixtures(), true, &[], &Config::docs()), 0);
    }
}

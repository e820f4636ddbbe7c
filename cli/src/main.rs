mod test_runner;

use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use codespan_reporting::diagnostic::Diagnostic;
use codespan_reporting::files::SimpleFiles;
use codespan_reporting::term;
use codespan_reporting::term::termcolor::{ColorChoice, StandardStream, WriteColor};

use doctree::Document;
use lint::Config;

const SUBCOMMANDS: &[&str] = &["check", "test", "help"];

#[derive(Parser)]
#[command(name = "doclint", version, about = "Documentation markup linter")]
struct Cli {
    /// Disable colored error output
    #[arg(long, global = true)]
    no_color: bool,

    /// Show debug logs (DOCLINT_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Validate Markdown files
    Check(CheckArgs),

    /// Run .test.md fixture files
    Test(TestArgs),
}

#[derive(clap::Args)]
struct CheckArgs {
    /// Markdown files to validate
    #[arg(required = true)]
    files: Vec<String>,

    /// TOML file with additional tag and node definitions
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print every heading with its resolved id instead of validating
    #[arg(long)]
    list_headings: bool,

    /// Dump the parsed document tree
    #[arg(long)]
    ast: bool,
}

#[derive(clap::Args)]
struct TestArgs {
    /// Path to a .test.md file or directory containing them
    path: String,

    /// Run only tests in these categories (subfolder names). Repeatable.
    #[arg(short, long)]
    category: Vec<String>,

    /// List available categories and exit
    #[arg(long)]
    list_categories: bool,

    /// TOML file with additional tag and node definitions
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() {
    // `doclint file.md` is shorthand for `doclint check file.md`.
    let mut args: Vec<String> = std::env::args().collect();
    if let Some(pos) = args
        .iter()
        .skip(1)
        .position(|a| !a.starts_with('-'))
        .map(|p| p + 1)
    {
        if !SUBCOMMANDS.contains(&args[pos].as_str()) {
            args.insert(pos, "check".to_string());
        }
    }

    let cli = Cli::parse_from(&args);
    init_tracing(cli.quiet, cli.verbose);

    let exit_code = match cli.command {
        Command::Check(check_args) => do_check(check_args, cli.no_color),
        Command::Test(test_args) => do_test(test_args, cli.no_color),
    };
    process::exit(exit_code);
}

fn init_tracing(quiet: bool, verbose: bool) {
    let level = if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        "warn"
    };

    let filter = tracing_subscriber::EnvFilter::try_from_env("DOCLINT_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    // Already initialized is fine.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// The built-in docs table, extended by the file at `path` if given.
fn load_config(path: Option<&Path>) -> lint::Result<Config> {
    let mut config = Config::docs();
    if let Some(path) = path {
        config.extend(Config::load(path)?);
    }
    Ok(config)
}

fn do_test(args: TestArgs, no_color: bool) -> i32 {
    let path = Path::new(&args.path);
    if args.list_categories {
        test_runner::list_categories(path);
        return 0;
    }
    let config = match load_config(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {}", e);
            return 1;
        }
    };
    test_runner::run_tests(path, no_color, &args.category, &config)
}

fn do_check(args: CheckArgs, no_color: bool) -> i32 {
    let color_choice = if no_color {
        ColorChoice::Never
    } else {
        ColorChoice::Auto
    };

    let config = match load_config(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {}", e);
            return 1;
        }
    };

    let writer = StandardStream::stderr(color_choice);
    let term_config = term::Config::default();
    let mut files = SimpleFiles::new();
    let mut errors = 0usize;
    let mut warnings = 0usize;

    for path in &args.files {
        let source = match std::fs::read_to_string(path) {
            Ok(s) => s,
            Err(source) => {
                let error = lint::Error::Io {
                    path: PathBuf::from(path),
                    source,
                };
                eprintln!("error: {}", error);
                errors += 1;
                continue;
            }
        };

        let file_id = files.add(path.clone(), source.clone());

        let parsed = doctree::parser::Parser::new(source, file_id).parse_recovering();
        for error in &parsed.errors {
            emit(&mut writer.lock(), &term_config, &files, &error.to_diagnostic());
        }
        errors += parsed.errors.len();
        let document = parsed.document;

        if args.ast {
            println!("{:#?}", document);
            continue;
        }

        if args.list_headings {
            print_headings(&document, &config);
            continue;
        }

        let results = lint::validate(&document, &config);
        for result in &results {
            emit(&mut writer.lock(), &term_config, &files, &result.to_diagnostic());
            if result.is_error() {
                errors += 1;
            } else {
                warnings += 1;
            }
        }
        tracing::info!(file = %path, problems = results.len(), "checked");
    }

    if args.ast || args.list_headings {
        return if errors == 0 { 0 } else { 1 };
    }

    if errors == 0 {
        eprintln!(
            "ok: {} file(s) checked, {} warning(s)",
            args.files.len(),
            warnings
        );
        0
    } else {
        eprintln!(
            "error: {} error(s), {} warning(s) in {} file(s)",
            errors,
            warnings,
            args.files.len()
        );
        1
    }
}

/// Write one diagnostic. Returns false if the writer failed.
fn emit(
    writer: &mut dyn WriteColor,
    config: &term::Config,
    files: &SimpleFiles<String, String>,
    diagnostic: &Diagnostic<usize>,
) -> bool {
    match term::emit_to_write_style(writer, config, files, diagnostic) {
        Ok(()) => true,
        Err(error) => {
            tracing::warn!(%error, "failed to write diagnostic");
            false
        }
    }
}

/// One line per heading: indentation by level, then the anchor it renders with.
fn print_headings(document: &Document, config: &Config) {
    for heading in document.headings() {
        let level = heading.heading_level().unwrap_or(1) as usize;
        let attributes = lint::render::heading_attributes(heading, config);
        let id = attributes
            .get("id")
            .and_then(|value| value.as_str())
            .unwrap_or("");
        let pad = "  ".repeat(level.saturating_sub(1));
        let marker = if id.is_empty() { "(empty id)" } else { "" };
        println!("{}{} #{} {}", pad, "#".repeat(level), id, marker);
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use codespan_reporting::term::termcolor::{Buffer, NoColor};

    use super::*;

    struct BrokenPipe;

    impl io::Write for BrokenPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::from(io::ErrorKind::BrokenPipe))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn diagnostic(files: &mut SimpleFiles<String, String>) -> Diagnostic<usize> {
        let file_id = files.add("doc.md".to_string(), "# Title\n".to_string());
        lint::check_source("# Title\n", file_id, &Config::docs())[0].to_diagnostic()
    }

    #[test]
    fn emit_writes_the_code() {
        let mut files = SimpleFiles::new();
        let diagnostic = diagnostic(&mut files);
        let mut buffer = Buffer::no_color();
        assert!(emit(&mut buffer, &term::Config::default(), &files, &diagnostic));
        let output = String::from_utf8_lossy(buffer.as_slice()).into_owned();
        assert!(output.contains("no-h1"));
    }

    #[test]
    fn emit_reports_write_failures() {
        let mut files = SimpleFiles::new();
        let diagnostic = diagnostic(&mut files);
        let mut writer = NoColor::new(BrokenPipe);
        assert!(!emit(&mut writer, &term::Config::default(), &files, &diagnostic));
    }
}

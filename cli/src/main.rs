use std::{
    env,
    ffi::{OsStr, OsString},
    fs,
    path::{Path, PathBuf},
};

use anyhow::Context;
use clap::{ArgAction, Parser, ValueEnum};
use console::style;
use globset::{Glob, GlobSet, GlobSetBuilder};
use walkdir::WalkDir;
use wlens_core::{render_html, AnalysisReport, AnalyzeError, Analyzer, Config, Severity};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Json,
    Html,
}

/// widgetlens CLI entry point.
#[derive(Debug, Parser)]
#[command(
    name = "wlens",
    about = "Static analysis for PySide6/PyQt6 GUI source files."
)]
struct Args {
    /// Path to config file (YAML). Defaults to wlens.yml if present.
    #[arg(long, default_value = "wlens.yml")]
    config: PathBuf,

    /// Report format written to the output.
    #[arg(long, value_enum, default_value_t = Format::Json)]
    format: Format,

    /// Write the report to this file instead of stdout.
    #[arg(long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Suppress per-file progress on stderr.
    #[arg(long, action = ArgAction::SetTrue)]
    quiet: bool,

    /// Python files, directories, or glob patterns to analyze.
    #[arg(value_name = "PATH", num_args = 1..)]
    paths: Vec<String>,
}

fn main() -> anyhow::Result<()> {
    // `wlens analyze <paths>` and `wlens <paths>` are the same command.
    let argv: Vec<OsString> = env::args_os().collect();
    let args = if argv.len() > 1 && argv[1].as_os_str() == OsStr::new("analyze") {
        let mut forwarded = Vec::with_capacity(argv.len() - 1);
        forwarded.push(argv[0].clone());
        forwarded.extend_from_slice(&argv[2..]);
        Args::parse_from(forwarded)
    } else {
        Args::parse()
    };
    run_analyze(args)
}

fn run_analyze(args: Args) -> anyhow::Result<()> {
    let cfg = load_config(&args.config)?;
    let analyzer = Analyzer::new(cfg)?;

    let ignore = build_ignore_set(&analyzer.config().ignore_globs)?;
    let files = collect_files(&args.paths, ignore.as_ref())?;
    if files.is_empty() {
        eprintln!(
            "{}",
            style("No Python files matched the given paths.").red()
        );
        std::process::exit(1);
    }

    let mut reports = Vec::new();
    let mut analyzed = 0usize;
    for path in &files {
        match analyzer.analyze_file(path) {
            Ok(report) => {
                if !args.quiet {
                    print_summary(path, &report);
                }
                reports.push(report);
                analyzed += 1;
            }
            Err(AnalyzeError::Parse { path, line }) => {
                eprintln!(
                    "{}: syntax error near line {line}",
                    style(path.display()).red()
                );
                reports.push(AnalysisReport::parse_failure(
                    &path.display().to_string(),
                    line,
                ));
            }
            Err(err @ AnalyzeError::Io { .. }) => {
                eprintln!("{}", style(err).red());
            }
        }
    }

    let artifact = match args.format {
        // A single path produces a single report object, not a one-element array.
        Format::Json if reports.len() == 1 => serde_json::to_string_pretty(&reports[0])?,
        Format::Json => serde_json::to_string_pretty(&reports)?,
        Format::Html => render_html(&reports),
    };

    match &args.output {
        Some(path) => fs::write(path, &artifact)
            .with_context(|| format!("Failed to write report to {}", path.display()))?,
        None => println!("{artifact}"),
    }

    if analyzed == 0 {
        std::process::exit(1);
    }
    Ok(())
}

fn load_config(path: &Path) -> anyhow::Result<Config> {
    if path.exists() {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let cfg: Config = serde_yaml::from_str(&text)
            .with_context(|| format!("Invalid config structure in {}", path.display()))?;
        Ok(cfg)
    } else {
        Ok(Config::default())
    }
}

fn build_ignore_set(patterns: &[String]) -> anyhow::Result<Option<GlobSet>> {
    if patterns.is_empty() {
        return Ok(None);
    }
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(Some(builder.build()?))
}

fn collect_files(inputs: &[String], ignore: Option<&GlobSet>) -> anyhow::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for input in inputs {
        let path = Path::new(input);
        if path.is_file() {
            if is_python(path) && !is_ignored(path, ignore) {
                files.push(path.to_path_buf());
            }
        } else if path.is_dir() {
            collect_dir(path, ignore, &mut files)?;
        } else {
            collect_glob(input, ignore, &mut files)?;
        }
    }
    files.sort();
    files.dedup();
    Ok(files)
}

fn collect_dir(
    root: &Path,
    ignore: Option<&GlobSet>,
    files: &mut Vec<PathBuf>,
) -> anyhow::Result<()> {
    let mut walker = WalkDir::new(root).into_iter();
    while let Some(entry) = walker.next() {
        let entry = entry?;
        if is_ignored(entry.path(), ignore) {
            if entry.file_type().is_dir() {
                walker.skip_current_dir();
            }
            continue;
        }
        if entry.file_type().is_file() && is_python(entry.path()) {
            files.push(entry.path().to_path_buf());
        }
    }
    Ok(())
}

/// An argument that is neither a file nor a directory is matched as a glob
/// against the working tree.
fn collect_glob(
    pattern: &str,
    ignore: Option<&GlobSet>,
    files: &mut Vec<PathBuf>,
) -> anyhow::Result<()> {
    let matcher = Glob::new(pattern)
        .with_context(|| format!("`{pattern}` is neither a path nor a valid glob"))?
        .compile_matcher();
    let cwd = env::current_dir()?;
    let mut matched = false;
    for entry in WalkDir::new(&cwd) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let rel = entry.path().strip_prefix(&cwd).unwrap_or(entry.path());
        if matcher.is_match(rel) && is_python(rel) && !is_ignored(rel, ignore) {
            files.push(rel.to_path_buf());
            matched = true;
        }
    }
    if !matched {
        eprintln!("{} matched no files", style(pattern).yellow());
    }
    Ok(())
}

fn is_python(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("py"))
        .unwrap_or(false)
}

fn is_ignored(path: &Path, ignore: Option<&GlobSet>) -> bool {
    ignore.map(|set| set.is_match(path)).unwrap_or(false)
}

fn print_summary(path: &Path, report: &AnalysisReport) {
    let count = |severity: Severity| {
        report
            .stats
            .by_severity
            .get(&severity)
            .copied()
            .unwrap_or(0)
    };
    let rel = env::current_dir()
        .ok()
        .and_then(|cwd| pathdiff::diff_paths(path, cwd))
        .unwrap_or_else(|| path.to_path_buf());
    eprintln!(
        "{} ({} widgets: {} errors, {} warnings, {} info)",
        style(rel.to_string_lossy()).bold(),
        report.stats.total_widgets,
        style(count(Severity::Error)).red(),
        style(count(Severity::Warning)).yellow(),
        style(count(Severity::Info)).cyan(),
    );
}

use phpdoc_fmt::formatter::{
    self, Diagnostic, FileReport, Formatter, Severity, config::FormatOptions, is_php_file,
};
use serde::Serialize;
use serde_json::to_writer_pretty;
use std::collections::HashSet;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::mpsc::channel;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow, bail};
use clap::{Args, Parser, Subcommand, ValueEnum};
use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};

#[derive(ValueEnum, Clone, Copy)]
enum OutputFormat {
    Text,
    Json,
}

/// Entry point for the PHPDoc formatter CLI.
#[derive(Parser)]
#[command(author, version, about = "Formats PHPDoc comments in PHP sources.")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Format the doc comments of a PHP file, directory or glob.
    Format {
        /// Path to a PHP file or directory containing PHP files.
        path: PathBuf,
        /// Report files that would change and exit non-zero if any would.
        #[arg(long)]
        check: bool,
        /// Print the formatted output without modifying files.
        #[arg(long, conflicts_with = "check")]
        dry_run: bool,
        /// Choose the CLI output format.
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
        #[command(flatten)]
        overrides: OptionOverrides,
    },
    /// Format once, then keep formatting PHP files as they change.
    Watch {
        /// Path to a PHP file or directory containing PHP files.
        path: PathBuf,
        #[command(flatten)]
        overrides: OptionOverrides,
    },
}

/// Command line values that win over the config file.
#[derive(Args, Clone, Default)]
struct OptionOverrides {
    #[arg(long)]
    print_width: Option<usize>,
    #[arg(long)]
    tab_width: Option<usize>,
    #[arg(long)]
    use_tabs: bool,
    #[arg(long)]
    wrap_text: bool,
    #[arg(long)]
    expand_null: bool,
}

impl OptionOverrides {
    fn apply(&self, options: &mut FormatOptions) {
        if let Some(print_width) = self.print_width {
            options.print_width = print_width;
        }
        if let Some(tab_width) = self.tab_width {
            options.tab_width = tab_width;
        }
        options.use_tabs |= self.use_tabs;
        options.wrap_text |= self.wrap_text;
        options.expand_null |= self.expand_null;
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum WriteMode {
    Write,
    Check,
    DryRun,
}

struct FormatTargets {
    canonical_targets: Vec<PathBuf>,
    format_root: PathBuf,
    options: FormatOptions,
}

impl FormatTargets {
    fn new(path: &Path, config_path: Option<PathBuf>, overrides: &OptionOverrides) -> Result<Self> {
        let requested_targets = resolve_targets(path)?;
        let canonical_targets = canonicalize_paths(requested_targets)?;
        let format_root = derive_format_root(&canonical_targets);

        let mut options = match FormatOptions::find_config(config_path, &format_root) {
            Some(path) => FormatOptions::load(path)?,
            None => FormatOptions::default(),
        };
        overrides.apply(&mut options);

        Ok(Self {
            canonical_targets,
            format_root,
            options,
        })
    }

    fn canonical_targets(&self) -> &[PathBuf] {
        &self.canonical_targets
    }

    fn format_root(&self) -> &Path {
        &self.format_root
    }

    fn collect_php_files(&self) -> Result<Vec<PathBuf>> {
        formatter::collect_php_files_from_roots(&self.canonical_targets)
    }
}

struct RunSummary {
    reports: Vec<FileReport>,
    diagnostics: Vec<Diagnostic>,
    duration: Duration,
}

impl RunSummary {
    fn changed(&self) -> impl Iterator<Item = &FileReport> {
        self.reports.iter().filter(|report| report.changed())
    }
}

fn main() -> Result<ExitCode> {
    init_tracing();
    let Cli { command, config } = Cli::parse();

    match command {
        Commands::Format {
            path,
            check,
            dry_run,
            format,
            overrides,
        } => {
            let mode = if check {
                WriteMode::Check
            } else if dry_run {
                WriteMode::DryRun
            } else {
                WriteMode::Write
            };
            let targets = FormatTargets::new(&path, config, &overrides)?;
            let summary = run_format(&targets, mode, format)?;
            if mode == WriteMode::Check && summary.changed().next().is_some() {
                return Ok(ExitCode::FAILURE);
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Watch { path, overrides } => {
            let targets = FormatTargets::new(&path, config, &overrides)?;
            run_format(&targets, WriteMode::Write, OutputFormat::Text)?;
            watch_changes(&targets)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Log to stderr, only when `RUST_LOG` asks for it.
fn init_tracing() {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    if std::env::var("RUST_LOG").is_ok() {
        let filter = EnvFilter::from_default_env();
        tracing_subscriber::registry()
            .with(fmt::layer().with_writer(io::stderr).with_target(true))
            .with(filter)
            .init();
    }
}

fn run_format(
    targets: &FormatTargets,
    mode: WriteMode,
    output_format: OutputFormat,
) -> Result<RunSummary> {
    let php_files = targets.collect_php_files()?;
    let text_output = matches!(output_format, OutputFormat::Text);

    if php_files.is_empty() {
        if text_output {
            println!(
                "No PHP files found under {}",
                targets.format_root().display()
            );
        }
        return Ok(RunSummary {
            reports: Vec::new(),
            diagnostics: Vec::new(),
            duration: Duration::ZERO,
        });
    }

    if text_output && mode != WriteMode::DryRun {
        println!("Formatting {} file(s)...", php_files.len());
    }

    let summary = format_paths(
        &Formatter::new(targets.options.clone()),
        &php_files,
        text_output && mode != WriteMode::DryRun,
    )?;
    apply_reports(&summary, mode, text_output)?;
    emit_output(&summary, mode, output_format)?;
    Ok(summary)
}

fn format_paths(
    formatter: &Formatter,
    paths: &[PathBuf],
    show_progress: bool,
) -> Result<RunSummary> {
    let progress = if show_progress {
        let pb = ProgressBar::new(paths.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{msg} [{bar:40.cyan/blue}] {pos}/{len} ({percent}%)")
                .context("invalid progress bar template")?
                .progress_chars("#>-"),
        );
        Some(pb)
    } else {
        None
    };

    let start = Instant::now();
    let (reports, failures) = formatter.format_files(paths, progress.as_ref());
    if let Some(pb) = &progress {
        pb.finish_and_clear();
    }

    let mut diagnostics = failures;
    diagnostics.extend(
        reports
            .iter()
            .flat_map(|report| report.diagnostics.iter().cloned()),
    );

    Ok(RunSummary {
        reports,
        diagnostics,
        duration: start.elapsed(),
    })
}

fn apply_reports(summary: &RunSummary, mode: WriteMode, text_output: bool) -> Result<()> {
    for report in summary.changed() {
        match mode {
            WriteMode::Write => {
                formatter::write_report(report)?;
                if text_output {
                    println!("Formatted {}", report.path.display());
                }
            }
            WriteMode::Check => {
                if text_output {
                    println!("Would reformat {}", report.path.display());
                }
            }
            WriteMode::DryRun => {
                if text_output {
                    println!("--- {} ---", report.path.display());
                    print!("{}", report.formatted);
                    if !report.formatted.ends_with('\n') {
                        println!();
                    }
                }
            }
        }
    }
    Ok(())
}

fn emit_output(summary: &RunSummary, mode: WriteMode, output_format: OutputFormat) -> Result<()> {
    let error_count = summary
        .diagnostics
        .iter()
        .filter(|d| d.severity == Severity::Error)
        .count();
    let warning_count = summary
        .diagnostics
        .iter()
        .filter(|d| d.severity == Severity::Warning)
        .count();
    let changed: Vec<&FileReport> = summary.changed().collect();

    match output_format {
        OutputFormat::Text => {
            for diag in &summary.diagnostics {
                eprintln!("{diag}");
            }
            if mode == WriteMode::DryRun {
                return Ok(());
            }

            let verb = match mode {
                WriteMode::Check => "would change",
                _ => "changed",
            };
            println!(
                "Stats ▸ {} file(s) | {} {} | {} error(s), {} warning(s) | {:.2}s",
                summary.reports.len(),
                changed.len(),
                verb,
                error_count,
                warning_count,
                summary.duration.as_secs_f64(),
            );
        }
        OutputFormat::Json => {
            let output = JsonOutput {
                files: summary
                    .reports
                    .iter()
                    .map(|report| report.path.display().to_string())
                    .collect(),
                changed: changed
                    .iter()
                    .map(|report| JsonChange {
                        file: report.path.display().to_string(),
                        edits: report.edits.len(),
                        formatted: (mode == WriteMode::DryRun).then(|| report.formatted.clone()),
                    })
                    .collect(),
                diagnostics: summary.diagnostics.iter().map(Diagnostic::to_json).collect(),
                stats: JsonStats {
                    files: summary.reports.len(),
                    changed: changed.len(),
                    errors: error_count,
                    warnings: warning_count,
                    duration_seconds: summary.duration.as_secs_f64(),
                },
            };

            let stdout = io::stdout();
            let mut handle = stdout.lock();
            to_writer_pretty(&mut handle, &output)?;
            handle.write_all(b"\n")?;
        }
    }

    Ok(())
}

fn watch_changes(targets: &FormatTargets) -> Result<()> {
    let (tx, rx) = channel::<notify::Result<Event>>();
    let mut watcher = RecommendedWatcher::new(
        move |res| {
            let _ = tx.send(res);
        },
        Config::default(),
    )
    .with_context(|| "failed to initialize file watcher")?;

    for target in targets.canonical_targets() {
        let mode = if target.is_dir() {
            RecursiveMode::Recursive
        } else {
            RecursiveMode::NonRecursive
        };
        watcher
            .watch(target, mode)
            .with_context(|| format!("failed to watch {}", target.display()))?;
    }

    println!("Watching for changes (Ctrl+C to exit)...");

    let formatter = Formatter::new(targets.options.clone());
    loop {
        match rx.recv() {
            Ok(Ok(event)) => handle_watch_event(event, &formatter)?,
            Ok(Err(err)) => eprintln!("watch error: {err}"),
            Err(err) => return Err(anyhow!("file watch channel closed: {err}")),
        }
    }
}

fn handle_watch_event(event: Event, formatter: &Formatter) -> Result<()> {
    let mut changed_files = HashSet::new();

    for path in event.paths {
        if !is_php_file(&path) {
            continue;
        }
        if let Ok(canonical) = path.canonicalize() {
            if canonical.is_file() {
                changed_files.insert(canonical);
            }
        }
    }

    if changed_files.is_empty() {
        return Ok(());
    }

    let mut changed_vec: Vec<PathBuf> = changed_files.into_iter().collect();
    changed_vec.sort();

    let summary = format_paths(formatter, &changed_vec, false)?;
    // Our own writes come back as events; only report real changes.
    if summary.changed().next().is_none() && summary.diagnostics.is_empty() {
        return Ok(());
    }

    apply_reports(&summary, WriteMode::Write, true)?;
    emit_output(&summary, WriteMode::Write, OutputFormat::Text)
}

fn resolve_targets(path: &Path) -> Result<Vec<PathBuf>> {
    if path_contains_glob(path) {
        let pattern = path.as_os_str().to_string_lossy().into_owned();
        let matches = glob(&pattern)
            .with_context(|| format!("invalid glob pattern \"{pattern}\""))?
            .collect::<Result<Vec<_>, _>>()
            .with_context(|| format!("failed to read entries for pattern \"{pattern}\""))?;

        if matches.is_empty() {
            bail!("no files matched \"{pattern}\"");
        }

        Ok(matches)
    } else {
        Ok(vec![path.to_path_buf()])
    }
}

fn canonicalize_paths(paths: Vec<PathBuf>) -> Result<Vec<PathBuf>> {
    let mut canonical_paths = Vec::new();
    for path in paths {
        let canonical_path = path
            .canonicalize()
            .with_context(|| format!("failed to access {}", path.display()))?;
        canonical_paths.push(canonical_path);
    }
    canonical_paths.sort();
    canonical_paths.dedup();
    Ok(canonical_paths)
}

fn derive_format_root(targets: &[PathBuf]) -> PathBuf {
    let directories: Vec<PathBuf> = targets
        .iter()
        .map(|target| {
            if target.is_file() {
                target
                    .parent()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| target.clone())
            } else {
                target.clone()
            }
        })
        .collect();

    longest_common_directory(&directories)
        .or_else(|| directories.first().cloned())
        .unwrap_or_default()
}

fn longest_common_directory(paths: &[PathBuf]) -> Option<PathBuf> {
    let (first, rest) = paths.split_first()?;

    let mut common = ancestors_from_root(first);
    for path in rest {
        let next = ancestors_from_root(path);
        let shared = common
            .iter()
            .zip(&next)
            .take_while(|(a, b)| a == b)
            .count();
        common.truncate(shared);
        if common.is_empty() {
            break;
        }
    }

    common.last().cloned()
}

fn ancestors_from_root(path: &Path) -> Vec<PathBuf> {
    let mut ancestors: Vec<PathBuf> = path.ancestors().map(PathBuf::from).collect();
    ancestors.reverse();
    ancestors
}

fn path_contains_glob(path: &Path) -> bool {
    path.as_os_str()
        .to_string_lossy()
        .chars()
        .any(|c| matches!(c, '*' | '?' | '[' | ']' | '{' | '}'))
}

#[derive(Serialize)]
struct JsonChange {
    file: String,
    edits: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    formatted: Option<String>,
}

#[derive(Serialize)]
struct JsonStats {
    files: usize,
    changed: usize,
    errors: usize,
    warnings: usize,
    duration_seconds: f64,
}

#[derive(Serialize)]
struct JsonOutput {
    files: Vec<String>,
    changed: Vec<JsonChange>,
    diagnostics: Vec<formatter::DiagnosticJson>,
    stats: JsonStats,
}

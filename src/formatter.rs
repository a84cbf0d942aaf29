pub mod config;
pub mod edit;
pub mod ignore;
pub mod parser;
pub mod phpdoc;
pub mod source;
pub mod test_config;

use std::{
    fmt, fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{Context, Result, anyhow};
use indicatif::ProgressBar;
use rayon::prelude::*;
use serde::Serialize;
use tracing::debug;
use tree_sitter::Point;
use walkdir::WalkDir;

use config::FormatOptions;
use edit::{TextEdit, apply_text_edits};
use ignore::IgnoreState;
use parser::{ParsedSource, PhpParser, TreeSitterPhpParser};
use source::{collect_doc_comments, format_doc_comment};

/// Represents the severity of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Span {
    pub start: Point,
}

/// Something the formatter wants the user to know about a file.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub file: PathBuf,
    pub severity: Severity,
    pub message: String,
    pub span: Option<Span>,
    pub snippet_line: Option<String>,
}

impl Diagnostic {
    pub fn new(file: PathBuf, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            file,
            severity,
            message: message.into(),
            span: None,
            snippet_line: None,
        }
    }

    pub fn with_span(
        file: PathBuf,
        severity: Severity,
        message: impl Into<String>,
        span: Span,
        snippet_line: Option<String>,
    ) -> Self {
        Self {
            file,
            severity,
            message: message.into(),
            span: Some(span),
            snippet_line,
        }
    }

    pub fn to_json(&self) -> DiagnosticJson {
        DiagnosticJson {
            file: self.file.display().to_string(),
            severity: self.severity.to_string(),
            message: self.message.clone(),
            line: self.span.as_ref().map(|span| span.start.row + 1),
            column: self.span.as_ref().map(|span| span.start.column + 1),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const RESET: &str = "\x1b[0m";
        const BOLD_RED: &str = "\x1b[1;31m";
        const BOLD_YELLOW: &str = "\x1b[1;33m";
        const BLUE: &str = "\x1b[34m";

        let severity_color = match self.severity {
            Severity::Warning => BOLD_YELLOW,
            Severity::Error => BOLD_RED,
        };
        writeln!(
            f,
            "{}{}{}: {}",
            severity_color, self.severity, RESET, self.message
        )?;

        match &self.span {
            Some(span) => {
                writeln!(
                    f,
                    " --> {}:{}:{}",
                    self.file.display(),
                    span.start.row + 1,
                    span.start.column + 1
                )?;
                if let Some(line) = &self.snippet_line {
                    writeln!(f, "{BLUE}    |{RESET}")?;
                    writeln!(f, "{BLUE}{:>3} |{RESET} {}", span.start.row + 1, line)?;
                    writeln!(
                        f,
                        "{BLUE}    |{RESET} {}{}^{}",
                        " ".repeat(span.start.column),
                        severity_color,
                        RESET
                    )?;
                }
            }
            None => writeln!(f, " --> {}", self.file.display())?,
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DiagnosticJson {
    pub file: String,
    pub severity: String,
    pub message: String,
    pub line: Option<usize>,
    pub column: Option<usize>,
}

/// Outcome of formatting one file.
#[derive(Debug, Clone)]
pub struct FileReport {
    pub path: PathBuf,
    pub original: Arc<String>,
    pub formatted: String,
    pub edits: Vec<TextEdit>,
    pub diagnostics: Vec<Diagnostic>,
}

impl FileReport {
    pub fn changed(&self) -> bool {
        self.formatted != *self.original
    }
}

/// Rewrites the doc comments of PHP files.
pub struct Formatter {
    options: FormatOptions,
}

impl Formatter {
    pub fn new(options: FormatOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &FormatOptions {
        &self.options
    }

    pub fn format_source(
        &self,
        parser: &mut dyn PhpParser,
        path: &Path,
        source: String,
    ) -> Result<FileReport> {
        let parsed = parser.parse_source(path, source)?;
        Ok(self.format_parsed(&parsed))
    }

    pub fn format_file(&self, parser: &mut dyn PhpParser, path: &Path) -> Result<FileReport> {
        let parsed = parser.parse_file(path)?;
        Ok(self.format_parsed(&parsed))
    }

    /// Format every file in parallel, one parser per worker thread.
    ///
    /// Files that cannot be read or parsed are reported as error diagnostics
    /// instead of aborting the batch.
    pub fn format_files(
        &self,
        paths: &[PathBuf],
        progress: Option<&ProgressBar>,
    ) -> (Vec<FileReport>, Vec<Diagnostic>) {
        let results: Vec<(PathBuf, Result<FileReport>)> = paths
            .par_iter()
            .map_init(TreeSitterPhpParser::new, |parser, path| {
                let result = match parser {
                    Ok(parser) => self.format_file(parser, path),
                    Err(err) => Err(anyhow!("{err:#}")),
                };
                if let Some(pb) = progress {
                    pb.inc(1);
                }
                (path.clone(), result)
            })
            .collect();

        let mut reports = Vec::with_capacity(results.len());
        let mut failures = Vec::new();
        for (path, result) in results {
            match result {
                Ok(report) => reports.push(report),
                Err(err) => failures.push(Diagnostic::new(path, Severity::Error, format!("{err:#}"))),
            }
        }
        (reports, failures)
    }

    fn format_parsed(&self, parsed: &ParsedSource) -> FileReport {
        let source = parsed.source.as_str();
        let ignore = IgnoreState::from_source(source);
        let mut edits = Vec::new();
        let mut diagnostics = Vec::new();

        if ignore.ignores_everything() {
            debug!(path = %parsed.path.display(), "skipping file with ignore directive");
        } else {
            for comment in collect_doc_comments(parsed) {
                if ignore.ignores_comment(comment.text) {
                    continue;
                }
                let Some(formatted) = format_doc_comment(&comment, &self.options) else {
                    continue;
                };

                for (tag, err) in &formatted.type_errors {
                    diagnostics.push(Diagnostic::with_span(
                        parsed.path.clone(),
                        Severity::Warning,
                        format!("type of {tag} left unformatted: {err}"),
                        Span {
                            start: comment.start,
                        },
                        source.lines().nth(comment.start.row).map(str::to_string),
                    ));
                }

                let edit = TextEdit::new(comment.start_byte, comment.end_byte, formatted.text);
                if !edit.is_noop(source) {
                    edits.push(edit);
                }
            }
        }

        let formatted = apply_text_edits(source, &edits);
        debug!(
            path = %parsed.path.display(),
            edits = edits.len(),
            warnings = diagnostics.len(),
            "formatted file"
        );

        FileReport {
            path: parsed.path.clone(),
            original: Arc::clone(&parsed.source),
            formatted,
            edits,
            diagnostics,
        }
    }
}

/// Write a report's formatted text back to its file.
pub fn write_report(report: &FileReport) -> Result<()> {
    fs::write(&report.path, &report.formatted)
        .with_context(|| format!("failed to write {}", report.path.display()))
}

pub fn collect_php_files(root: &Path) -> Result<Vec<PathBuf>> {
    if root.is_file() {
        return Ok(if is_php_file(root) {
            vec![root.to_path_buf()]
        } else {
            vec![]
        });
    }

    let mut php_files = Vec::new();

    for entry in WalkDir::new(root) {
        let entry = entry.with_context(|| format!("failed to walk {}", root.display()))?;
        let path = entry.path();
        if entry.file_type().is_file() && is_php_file(path) {
            php_files.push(path.to_path_buf());
        }
    }

    php_files.sort();
    Ok(php_files)
}

pub fn collect_php_files_from_roots(roots: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut php_files = Vec::new();
    for root in roots {
        php_files.extend(collect_php_files(root)?);
    }
    php_files.sort();
    php_files.dedup();
    Ok(php_files)
}

pub fn is_php_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("php"))
}

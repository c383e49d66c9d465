//! Output formatters for analysis results

mod json;
mod text;

pub use json::JsonFormatter;
pub use text::TextFormatter;

use crate::analyzer::Report;
use crate::diagnostic::Diagnostic;
use std::time::Duration;

/// Report of one analyzed file
#[derive(Debug, Clone)]
pub struct FileReport {
    /// Display path, `-` for stdin
    pub path: String,
    /// Analyzed text, used for source context
    pub source: String,
    pub report: Report,
}

impl FileReport {
    pub fn new(path: &str, source: &str, report: Report) -> Self {
        Self {
            path: path.to_string(),
            source: source.to_string(),
            report,
        }
    }

    /// Source text of a 1-based line
    pub fn source_line(&self, line: usize) -> Option<&str> {
        let text = self.source.split('\n').nth(line.checked_sub(1)?)?;
        Some(text.strip_suffix('\r').unwrap_or(text))
    }
}

/// Results of one run over several files
#[derive(Debug, Clone, Default)]
pub struct LintRun {
    pub files: Vec<FileReport>,
    pub duration: Duration,
}

impl LintRun {
    pub fn error_count(&self) -> usize {
        self.files.iter().map(|f| f.report.errors.len()).sum()
    }

    pub fn warning_count(&self) -> usize {
        self.files.iter().map(|f| f.report.warnings.len()).sum()
    }

    pub fn security_count(&self) -> usize {
        self.files.iter().map(|f| f.report.security_issues.len()).sum()
    }

    pub fn suggestion_count(&self) -> usize {
        self.files.iter().map(|f| f.report.suggestions.len()).sum()
    }

    /// Worst exit code over all files
    pub fn exit_code(&self) -> i32 {
        self.files
            .iter()
            .map(|f| f.report.exit_code())
            .max()
            .unwrap_or(0)
    }
}

/// Output formatter trait
pub trait OutputFormatter: Send + Sync {
    /// Format the entire run
    fn format(&self, run: &LintRun) -> String;

    /// Format a single diagnostic of `file`
    fn format_diagnostic(&self, file: &FileReport, diagnostic: &Diagnostic) -> String;
}

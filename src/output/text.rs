//! Human-readable text output formatter

use super::{FileReport, LintRun, OutputFormatter};
use crate::diagnostic::{Diagnostic, RuleCategory, Severity};
use crate::score::QualityRating;
use colored::*;

/// Text formatter with optional color support
pub struct TextFormatter {
    /// Enable colored output
    pub colored: bool,

    /// Show the offending source line
    pub show_source: bool,

    /// Show suggestions
    pub show_help: bool,

    /// Show quick fixes
    pub show_fixes: bool,

    /// Show the summary line
    pub show_stats: bool,
}

impl Default for TextFormatter {
    fn default() -> Self {
        Self {
            colored: true,
            show_source: true,
            show_help: true,
            show_fixes: true,
            show_stats: true,
        }
    }
}

impl TextFormatter {
    /// Create a new text formatter
    pub fn new() -> Self {
        Self::default()
    }

    /// Disable colors
    pub fn without_color(mut self) -> Self {
        self.colored = false;
        self
    }

    /// Only the diagnostic lines, no source context
    pub fn compact(mut self) -> Self {
        self.show_source = false;
        self.show_help = false;
        self.show_fixes = false;
        self
    }

    fn paint(&self, text: &str, style: fn(ColoredString) -> ColoredString) -> String {
        if self.colored {
            style(text.normal()).to_string()
        } else {
            text.to_string()
        }
    }

    fn severity_str(&self, diag: &Diagnostic) -> String {
        let label = if diag.category == RuleCategory::Security && diag.severity == Severity::Warning {
            "security".to_string()
        } else {
            diag.severity.to_string()
        };
        if !self.colored {
            return label;
        }
        match (diag.severity, diag.category) {
            (Severity::Error, _) => label.red().bold().to_string(),
            (Severity::Warning, RuleCategory::Security) => label.magenta().bold().to_string(),
            (Severity::Warning, _) => label.yellow().bold().to_string(),
            (Severity::Info, _) => label.blue().to_string(),
        }
    }

    fn count(&self, n: usize, singular: &str, plural: &str, style: fn(ColoredString) -> ColoredString) -> Option<String> {
        if n == 0 {
            return None;
        }
        let text = format!("{} {}", n, if n == 1 { singular } else { plural });
        Some(self.paint(&text, style))
    }
}

impl OutputFormatter for TextFormatter {
    fn format(&self, run: &LintRun) -> String {
        let mut output = String::new();

        for file in &run.files {
            let report = &file.report;
            if report.total() > 0 {
                output.push_str(&format!("{}\n", self.paint(&file.path, |s| s.underline())));
                for diag in report.diagnostics() {
                    output.push_str(&self.format_diagnostic(file, diag));
                }
            }

            let rating = QualityRating::from_score(report.performance_score);
            let score = format!("{} ({})", report.performance_score, rating);
            let score = match rating {
                QualityRating::Excellent | QualityRating::Good => self.paint(&score, |s| s.green()),
                QualityRating::Fair => self.paint(&score, |s| s.yellow()),
                QualityRating::Poor => self.paint(&score, |s| s.red()),
            };
            let version = report
                .detected_version
                .map_or_else(|| "none".to_string(), |v| v.to_string());
            output.push_str(&format!(
                "{}: {}, version {}, performance score {}\n",
                file.path,
                if report.is_valid() {
                    self.paint("valid", |s| s.green())
                } else {
                    self.paint("invalid", |s| s.red().bold())
                },
                version,
                score
            ));
            if report.total() > 0 {
                output.push('\n');
            }
        }

        if self.show_stats {
            output.push_str(&format!(
                "\n{} {} analyzed",
                run.files.len(),
                if run.files.len() == 1 { "file" } else { "files" }
            ));

            let counts: Vec<String> = [
                self.count(run.error_count(), "error", "errors", |s| s.red()),
                self.count(run.warning_count(), "warning", "warnings", |s| s.yellow()),
                self.count(run.security_count(), "security issue", "security issues", |s| s.magenta()),
                self.count(run.suggestion_count(), "suggestion", "suggestions", |s| s.blue()),
            ]
            .into_iter()
            .flatten()
            .collect();

            if !counts.is_empty() {
                output.push_str(&format!(": {}", counts.join(", ")));
            }
            output.push('\n');
            output.push_str(&format!("Finished in {:.2}s\n", run.duration.as_secs_f64()));
        }

        output
    }

    fn format_diagnostic(&self, file: &FileReport, diag: &Diagnostic) -> String {
        let mut output = String::new();
        let bar = self.paint("|", |s| s.blue());

        output.push_str(&format!(
            "{}:{}:{}: {}[{}]: {}\n",
            file.path,
            diag.line,
            diag.column,
            self.severity_str(diag),
            self.paint(&diag.code, |s| s.cyan()),
            diag.message
        ));

        if self.show_source {
            if let Some(source) = file.source_line(diag.line) {
                let number = self.paint(&format!("{:>4}", diag.line), |s| s.blue());
                output.push_str(&format!("{} {} {}\n", number, bar, source));

                let width = diag
                    .quick_fix
                    .as_ref()
                    .filter(|f| f.range.start_line == f.range.end_line && f.range.start_column == diag.column)
                    .map_or(1, |f| f.range.end_column.saturating_sub(f.range.start_column).max(1));
                let padding = " ".repeat(diag.column.saturating_sub(1));
                output.push_str(&format!(
                    "     {} {}{}\n",
                    bar,
                    padding,
                    self.paint(&"^".repeat(width), |s| s.red())
                ));
            }
        }

        if self.show_help {
            if let Some(help) = &diag.suggestion {
                output.push_str(&format!("     {} help: {}\n", self.paint("=", |s| s.blue()), help));
            }
        }

        if self.show_fixes {
            if let Some(fix) = &diag.quick_fix {
                output.push_str(&format!(
                    "     {} fix: {}\n",
                    self.paint("=", |s| s.green()),
                    fix.description
                ));
            }
        }

        output
    }
}

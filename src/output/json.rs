//! JSON output formatter

use super::{FileReport, LintRun, OutputFormatter};
use crate::analyzer::Report;
use crate::diagnostic::Diagnostic;
use serde::Serialize;

/// JSON formatter for machine-readable output
#[derive(Default)]
pub struct JsonFormatter {
    /// Pretty print with indentation
    pub pretty: bool,
}

impl JsonFormatter {
    /// Create a new JSON formatter
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable pretty printing
    pub fn pretty(mut self) -> Self {
        self.pretty = true;
        self
    }

    fn render<T: Serialize>(&self, value: &T) -> String {
        let rendered = if self.pretty {
            serde_json::to_string_pretty(value)
        } else {
            serde_json::to_string(value)
        };
        rendered.unwrap_or_default()
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonOutput<'a> {
    files: Vec<JsonFile<'a>>,
    summary: JsonSummary,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonFile<'a> {
    path: &'a str,
    #[serde(flatten)]
    report: &'a Report,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonSummary {
    files_analyzed: usize,
    error_count: usize,
    warning_count: usize,
    security_issue_count: usize,
    suggestion_count: usize,
    duration_ms: u128,
}

#[derive(Serialize)]
struct JsonDiagnostic<'a> {
    file: &'a str,
    #[serde(flatten)]
    diagnostic: &'a Diagnostic,
}

impl OutputFormatter for JsonFormatter {
    fn format(&self, run: &LintRun) -> String {
        let output = JsonOutput {
            files: run
                .files
                .iter()
                .map(|f| JsonFile {
                    path: &f.path,
                    report: &f.report,
                })
                .collect(),
            summary: JsonSummary {
                files_analyzed: run.files.len(),
                error_count: run.error_count(),
                warning_count: run.warning_count(),
                security_issue_count: run.security_count(),
                suggestion_count: run.suggestion_count(),
                duration_ms: run.duration.as_millis(),
            },
        };
        self.render(&output)
    }

    fn format_diagnostic(&self, file: &FileReport, diagnostic: &Diagnostic) -> String {
        self.render(&JsonDiagnostic {
            file: &file.path,
            diagnostic,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::Analyzer;
    use std::time::Duration;

    fn run_for(source: &str) -> LintRun {
        let report = Analyzer::with_defaults().unwrap().validate(source);
        LintRun {
            files: vec![FileReport::new("a.pine", source, report)],
            duration: Duration::from_millis(4),
        }
    }

    #[test]
    fn test_json_format_run() {
        let output = JsonFormatter::new().format(&run_for("plot(close)"));
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();

        assert_eq!(value["files"][0]["path"], "a.pine");
        assert_eq!(value["files"][0]["isValid"], false);
        assert_eq!(value["files"][0]["errors"][0]["code"], "MISSING_VERSION");
        assert_eq!(value["summary"]["filesAnalyzed"], 1);
        assert_eq!(value["summary"]["errorCount"], 2);
        assert_eq!(value["summary"]["durationMs"], 4);
    }

    #[test]
    fn test_json_format_diagnostic() {
        let run = run_for("plot(close)");
        let file = &run.files[0];
        let output = JsonFormatter::new().format_diagnostic(file, &file.report.errors[0]);
        assert!(output.contains("\"file\":\"a.pine\""));
        assert!(output.contains("\"severity\":\"error\""));
        assert!(output.contains("\"line\":1"));
    }

    #[test]
    fn test_json_pretty() {
        let output = JsonFormatter::new().pretty().format(&run_for(""));
        assert!(output.contains('\n'));
    }
}

//! Diagnostic types for analysis results

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable diagnostic codes
pub mod codes {
    pub const MISSING_VERSION: &str = "MISSING_VERSION";
    pub const OUTDATED_VERSION: &str = "OUTDATED_VERSION";
    pub const MISSING_DECLARATION: &str = "MISSING_DECLARATION";
    pub const UNMATCHED_BRACKET: &str = "UNMATCHED_BRACKET";
    pub const UNCLOSED_BRACKET: &str = "UNCLOSED_BRACKET";
    pub const UNCLOSED_STRING: &str = "UNCLOSED_STRING";
    pub const DEPRECATED_FUNCTION: &str = "DEPRECATED_FUNCTION";
    pub const INVALID_OPERATOR: &str = "INVALID_OPERATOR";
    pub const ASSIGNMENT_IN_CONDITION: &str = "ASSIGNMENT_IN_CONDITION";
    pub const UNDEFINED_VARIABLE: &str = "UNDEFINED_VARIABLE";
    pub const NA_COMPARISON: &str = "NA_COMPARISON";
    pub const LOOKAHEAD_BIAS: &str = "LOOKAHEAD_BIAS";
    pub const LARGE_HISTORY_REFERENCE: &str = "LARGE_HISTORY_REFERENCE";
    pub const LARGE_LOOP: &str = "LARGE_LOOP";
    pub const REQUEST_CALL: &str = "REQUEST_CALL";
    pub const HARDCODED_SECRET: &str = "HARDCODED_SECRET";
    pub const EXTERNAL_URL: &str = "EXTERNAL_URL";
    pub const TAB_INDENTATION: &str = "TAB_INDENTATION";
    pub const TRAILING_WHITESPACE: &str = "TRAILING_WHITESPACE";
    pub const LINE_TOO_LONG: &str = "LINE_TOO_LONG";
    pub const DIVISION_BY_ZERO: &str = "division_by_zero";
    pub const UNREACHABLE_CODE: &str = "unreachable_code";
}

/// Severity level for diagnostics
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational suggestion
    Info,
    /// Warning - potential issue
    #[default]
    Warning,
    /// Error - the script will not compile or is definitely wrong
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "info" | "hint" | "note" => Ok(Severity::Info),
            "warning" | "warn" => Ok(Severity::Warning),
            "error" | "err" => Ok(Severity::Error),
            _ => Err(format!("Unknown severity: {}", s)),
        }
    }
}

/// Category of a finding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleCategory {
    /// The script is malformed
    Syntax,
    /// The script compiles but is likely wrong
    Logic,
    /// The script is slow or heavy on the charting runtime
    Performance,
    /// The script leaks data or talks to the outside world
    Security,
    /// Formatting and readability
    #[default]
    Style,
}

impl fmt::Display for RuleCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleCategory::Syntax => write!(f, "syntax"),
            RuleCategory::Logic => write!(f, "logic"),
            RuleCategory::Performance => write!(f, "performance"),
            RuleCategory::Security => write!(f, "security"),
            RuleCategory::Style => write!(f, "style"),
        }
    }
}

impl std::str::FromStr for RuleCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "syntax" => Ok(RuleCategory::Syntax),
            "logic" | "correctness" => Ok(RuleCategory::Logic),
            "performance" | "perf" => Ok(RuleCategory::Performance),
            "security" => Ok(RuleCategory::Security),
            "style" => Ok(RuleCategory::Style),
            _ => Err(format!("Unknown category: {}", s)),
        }
    }
}

/// A span of source text, 1-based lines and columns, end column exclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Range {
    pub start_line: usize,
    pub start_column: usize,
    pub end_line: usize,
    pub end_column: usize,
}

impl Range {
    /// Span on a single line
    pub fn on_line(line: usize, start_column: usize, end_column: usize) -> Self {
        Self {
            start_line: line,
            start_column,
            end_line: line,
            end_column,
        }
    }

    /// Empty span used for insertions
    pub fn point(line: usize, column: usize) -> Self {
        Self::on_line(line, column, column)
    }

    /// Check if the span is empty
    pub fn is_empty(&self) -> bool {
        self.start_line == self.end_line && self.start_column == self.end_column
    }
}

/// A machine-generated replacement that resolves a diagnostic
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuickFix {
    /// Short action label
    pub title: String,
    /// What the fix does
    pub description: String,
    /// Text that replaces `range`
    pub replacement_text: String,
    /// The exact span to replace
    pub range: Range,
}

impl QuickFix {
    pub fn new(title: &str, description: &str, replacement: &str, range: Range) -> Self {
        Self {
            title: title.to_string(),
            description: description.to_string(),
            replacement_text: replacement.to_string(),
            range,
        }
    }
}

/// One reported issue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    /// Line number (1-based)
    pub line: usize,
    /// Column number (1-based)
    pub column: usize,
    /// Human-readable message
    pub message: String,
    /// Severity level
    pub severity: Severity,
    /// Stable diagnostic code callers switch on
    pub code: String,
    /// Finding category
    pub category: RuleCategory,
    /// How to resolve the issue
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    /// Text replacement resolving the issue
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quick_fix: Option<QuickFix>,
}

impl Diagnostic {
    /// Create a new diagnostic
    pub fn new(
        code: &str,
        severity: Severity,
        category: RuleCategory,
        message: &str,
        line: usize,
        column: usize,
    ) -> Self {
        Self {
            line,
            column,
            message: message.to_string(),
            severity,
            code: code.to_string(),
            category,
            suggestion: None,
            quick_fix: None,
        }
    }

    /// Add a suggestion
    pub fn with_suggestion(mut self, suggestion: &str) -> Self {
        self.suggestion = Some(suggestion.to_string());
        self
    }

    /// Add a quick fix
    pub fn with_quick_fix(mut self, fix: QuickFix) -> Self {
        self.quick_fix = Some(fix);
        self
    }

    /// Check if this is an error
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    /// Check if this is a warning
    pub fn is_warning(&self) -> bool {
        self.severity == Severity::Warning
    }

    /// Check if this diagnostic has a quick fix
    pub fn has_fix(&self) -> bool {
        self.quick_fix.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Error > Severity::Warning);
        assert!(Severity::Warning > Severity::Info);
    }

    #[test]
    fn test_severity_from_str() {
        assert_eq!("error".parse::<Severity>(), Ok(Severity::Error));
        assert_eq!("WARN".parse::<Severity>(), Ok(Severity::Warning));
        assert_eq!("hint".parse::<Severity>(), Ok(Severity::Info));
        assert!("fatal".parse::<Severity>().is_err());
    }

    #[test]
    fn test_category_round_trip_names() {
        for cat in [
            RuleCategory::Syntax,
            RuleCategory::Logic,
            RuleCategory::Performance,
            RuleCategory::Security,
            RuleCategory::Style,
        ] {
            assert_eq!(cat.to_string().parse::<RuleCategory>(), Ok(cat));
        }
        assert_eq!("perf".parse::<RuleCategory>(), Ok(RuleCategory::Performance));
    }

    #[test]
    fn test_diagnostic_builder() {
        let fix = QuickFix::new("Rename", "Use ta.sma", "ta.sma", Range::on_line(3, 5, 8));
        let diag = Diagnostic::new(
            "DEPRECATED_FUNCTION",
            Severity::Warning,
            RuleCategory::Syntax,
            "sma() is deprecated",
            3,
            5,
        )
        .with_suggestion("Use ta.sma() instead")
        .with_quick_fix(fix);

        assert!(diag.is_warning());
        assert!(!diag.is_error());
        assert!(diag.has_fix());
        assert_eq!(diag.suggestion.as_deref(), Some("Use ta.sma() instead"));
    }

    #[test]
    fn test_serializes_camel_case() {
        let diag = Diagnostic::new("X", Severity::Info, RuleCategory::Style, "m", 1, 1)
            .with_quick_fix(QuickFix::new("t", "d", "r", Range::point(1, 1)));
        let json = serde_json::to_value(&diag).unwrap();

        assert_eq!(json["severity"], "info");
        assert_eq!(json["category"], "style");
        assert_eq!(json["quickFix"]["replacementText"], "r");
        assert_eq!(json["quickFix"]["range"]["startColumn"], 1);
        assert!(json.get("suggestion").is_none());
    }

    #[test]
    fn test_range_point_is_empty() {
        assert!(Range::point(1, 1).is_empty());
        assert!(!Range::on_line(1, 1, 2).is_empty());
    }
}

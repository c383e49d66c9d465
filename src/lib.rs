//! pine-lint - static analysis for Pine-style charting scripts
//!
//! Inspects a script and reports syntax, logic, performance, security and
//! style findings, computes a heuristic performance score, and rewrites the
//! source for the findings that have an automatic fix.
//!
//! # Architecture
//!
//! ```text
//! source -> scanner -> {header, structure, rule engine, logic} -> score -> Report
//!                           |
//!                      symbol table
//! ```
//!
//! Rules are data. The built-in set lives in [`builtin`]; more rules can be
//! supplied through the configuration file:
//!
//! ```yaml
//! rules:
//!   custom:
//!     - id: no-barcolor
//!       code: NO_BARCOLOR
//!       severity: info
//!       pattern: '\bbarcolor\s*\('
//!       message: "barcolor() is discouraged"
//! ```
//!
//! # Example
//!
//! ```
//! let report = pine_lint::validate("//@version=5\nindicator(\"x\")\nplot(close)");
//! assert!(report.is_valid());
//!
//! let fixed = pine_lint::auto_fix("indicator(\"x\")", &["MISSING_VERSION"]);
//! assert_eq!(fixed, "//@version=5\nindicator(\"x\")");
//! ```

pub mod analyzer;
pub mod builtin;
pub mod config;
pub mod diagnostic;
pub mod engine;
pub mod fixer;
pub mod header;
pub mod logic;
pub mod output;
pub mod references;
pub mod rule;
pub mod scanner;
pub mod score;
pub mod structure;
pub mod symbols;
pub mod vocabulary;

// Re-export main types
pub use analyzer::{Analyzer, AnalyzerError, Report};
pub use config::{Config, ConfigError};
pub use diagnostic::{codes, Diagnostic, QuickFix, Range, RuleCategory, Severity};
pub use engine::{Bucket, RuleEngine};
pub use fixer::{FixResult, Fixer};
pub use output::{FileReport, JsonFormatter, LintRun, OutputFormatter, TextFormatter};
pub use rule::{Rule, RuleCheck, RuleError};
pub use score::{QualityRating, ScoreBreakdown};

use once_cell::sync::Lazy;

static DEFAULT_ANALYZER: Lazy<Analyzer> =
    Lazy::new(|| Analyzer::with_defaults().expect("built-in rules compile"));

/// Validate `source` with the default analyzer
pub fn validate(source: &str) -> Report {
    DEFAULT_ANALYZER.validate(source)
}

/// Apply automatic fixes for `codes` with the default analyzer
pub fn auto_fix(source: &str, codes: &[&str]) -> String {
    DEFAULT_ANALYZER.auto_fix(source, codes)
}

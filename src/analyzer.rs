//! Analysis entry points
//!
//! [`Analyzer`] owns the compiled rule set and vocabulary behind `Arc`s, so it
//! is cheap to clone and safe to share across threads. Every call to
//! [`Analyzer::validate`] builds its own symbol table and report.

use crate::builtin::builtin_rules;
use crate::config::{Config, ConfigError, ScoringConfig};
use crate::diagnostic::{Diagnostic, RuleCategory, Severity};
use crate::engine::{Bucket, RuleEngine};
use crate::fixer::{FixResult, Fixer};
use crate::rule::{Rule, RuleError};
use crate::scanner::split_lines;
use crate::score::{ScoreBreakdown, Scorer};
use crate::symbols::SymbolTable;
use crate::vocabulary::Vocabulary;
use crate::{header, logic, structure};
use serde::ser::{Serialize, SerializeStruct, Serializer};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Analyzer construction error
#[derive(Debug, Error)]
pub enum AnalyzerError {
    #[error(transparent)]
    Rule(#[from] RuleError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Result of validating one script
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Report {
    pub errors: Vec<Diagnostic>,
    pub warnings: Vec<Diagnostic>,
    pub suggestions: Vec<Diagnostic>,
    /// Version of the first `//@version=` marker
    pub detected_version: Option<u32>,
    /// 0-100, higher is better
    pub performance_score: u8,
    /// Security warnings, kept apart from `warnings`
    pub security_issues: Vec<Diagnostic>,
}

impl Report {
    /// A script is valid when nothing blocks it
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Route a diagnostic into its bucket
    pub fn push(&mut self, diagnostic: Diagnostic) {
        let bucket = Bucket::route(diagnostic.severity, diagnostic.category);
        self.bucket_mut(bucket).push(diagnostic);
    }

    /// Diagnostics of one bucket
    pub fn bucket(&self, bucket: Bucket) -> &[Diagnostic] {
        match bucket {
            Bucket::Errors => &self.errors,
            Bucket::Warnings => &self.warnings,
            Bucket::Suggestions => &self.suggestions,
            Bucket::SecurityIssues => &self.security_issues,
        }
    }

    fn bucket_mut(&mut self, bucket: Bucket) -> &mut Vec<Diagnostic> {
        match bucket {
            Bucket::Errors => &mut self.errors,
            Bucket::Warnings => &mut self.warnings,
            Bucket::Suggestions => &mut self.suggestions,
            Bucket::SecurityIssues => &mut self.security_issues,
        }
    }

    /// All diagnostics, bucket by bucket
    pub fn diagnostics(&self) -> impl Iterator<Item = &Diagnostic> {
        self.errors
            .iter()
            .chain(&self.warnings)
            .chain(&self.security_issues)
            .chain(&self.suggestions)
    }

    /// Total number of diagnostics
    pub fn total(&self) -> usize {
        self.errors.len() + self.warnings.len() + self.suggestions.len() + self.security_issues.len()
    }

    /// Diagnostic counts per code
    pub fn count_by_code(&self) -> HashMap<&str, usize> {
        let mut counts = HashMap::new();
        for diag in self.diagnostics() {
            *counts.entry(diag.code.as_str()).or_insert(0) += 1;
        }
        counts
    }

    /// Codes that have an automatic fix
    pub fn fixable_codes(&self) -> Vec<&str> {
        let mut found: Vec<&str> = self
            .diagnostics()
            .map(|d| d.code.as_str())
            .filter(|c| Fixer::supports(c))
            .collect();
        found.sort_unstable();
        found.dedup();
        found
    }

    /// Process exit code: 0 valid, 1 advisory findings only, 2 errors
    pub fn exit_code(&self) -> i32 {
        if !self.errors.is_empty() {
            2
        } else if !self.warnings.is_empty() || !self.security_issues.is_empty() {
            1
        } else {
            0
        }
    }

    fn sort(&mut self) {
        for bucket in [
            &mut self.errors,
            &mut self.warnings,
            &mut self.suggestions,
            &mut self.security_issues,
        ] {
            bucket.sort_by_key(|d| (d.line, d.column));
        }
    }
}

impl Serialize for Report {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Report", 7)?;
        state.serialize_field("isValid", &self.is_valid())?;
        state.serialize_field("errors", &self.errors)?;
        state.serialize_field("warnings", &self.warnings)?;
        state.serialize_field("suggestions", &self.suggestions)?;
        state.serialize_field("detectedVersion", &self.detected_version)?;
        state.serialize_field("performanceScore", &self.performance_score)?;
        state.serialize_field("securityIssues", &self.security_issues)?;
        state.end()
    }
}

/// The static analysis engine
#[derive(Debug, Clone)]
pub struct Analyzer {
    engine: Arc<RuleEngine>,
    vocabulary: Arc<Vocabulary>,
    config: Arc<Config>,
    scorer: Scorer,
    fixer: Fixer,
}

impl Analyzer {
    /// Build an analyzer from configuration
    ///
    /// Fails when the configuration is invalid or a rule does not compile.
    pub fn new(config: Config) -> Result<Self, AnalyzerError> {
        config.validate()?;

        let rules: Vec<Rule> = builtin_rules(config.style.max_line_length, config.style.indent_width)
            .into_iter()
            .chain(config.rules.custom.iter().cloned())
            .filter(|r| config.is_rule_enabled(&r.id, &r.code))
            .map(|mut r| {
                if let Some(severity) = config.get_severity_override(&r.id, &r.code) {
                    r.severity = severity;
                }
                r
            })
            .collect();
        let engine = RuleEngine::new(rules)?;

        let vocabulary = Vocabulary::builtin().with_extra(
            &config.vocabulary.extra_functions,
            &config.vocabulary.extra_variables,
        );

        log::debug!(
            "analyzer ready: {} rules, target version {}",
            engine.rule_count(),
            config.target_version()
        );

        Ok(Self {
            engine: Arc::new(engine),
            vocabulary: Arc::new(vocabulary),
            scorer: Scorer::new(config.scoring.clone()),
            fixer: Fixer::new(config.target_version(), config.style.indent_width),
            config: Arc::new(config),
        })
    }

    /// Analyzer with the built-in rules and default settings
    pub fn with_defaults() -> Result<Self, AnalyzerError> {
        Self::new(Config::default())
    }

    /// Active rules in evaluation order
    pub fn rules(&self) -> impl Iterator<Item = &Rule> {
        self.engine.rules()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Analyze a script
    pub fn validate(&self, source: &str) -> Report {
        self.validate_with_score(source).0
    }

    /// Analyze a script and keep the score components
    pub fn validate_with_score(&self, source: &str) -> (Report, ScoreBreakdown) {
        let lines = split_lines(source);
        let symbols = SymbolTable::build(&lines, &self.vocabulary);

        // Rule severities were resolved when the engine was built; only
        // the procedural checks take code-keyed overrides here.
        let mut syntax = header::check(&lines, self.config.target_version());
        syntax.extend(structure::check(&lines));
        let mut flow = logic::check(&lines);
        for diag in syntax.iter_mut().chain(flow.iter_mut()) {
            if let Some(severity) = self.severity_override(&diag.code) {
                diag.severity = severity;
            }
        }
        let matched = self.engine.evaluate(&lines, &symbols);

        let mut report = Report {
            detected_version: header::detect_version(&lines),
            ..Report::default()
        };
        for diag in syntax.into_iter().chain(matched).chain(flow) {
            if self.config.is_code_enabled(&diag.code) {
                report.push(diag);
            }
        }
        report.sort();

        let performance_warnings = report
            .warnings
            .iter()
            .filter(|d| d.category == RuleCategory::Performance)
            .count();
        let breakdown = self.scorer.score(&lines, performance_warnings);
        report.performance_score = breakdown.score;

        log::debug!(
            "validated {} lines: {} errors, {} warnings, {} security issues, score {}",
            lines.len(),
            report.errors.len(),
            report.warnings.len(),
            report.security_issues.len(),
            report.performance_score
        );

        (report, breakdown)
    }

    /// Apply automatic fixes for `codes`
    pub fn auto_fix(&self, source: &str, codes: &[&str]) -> String {
        self.fixer.fix(source, codes).content
    }

    /// Apply automatic fixes and report which ones changed the text
    pub fn fix(&self, source: &str, codes: &[&str]) -> FixResult {
        self.fixer.fix(source, codes)
    }

    /// Score weights in use
    pub fn scoring(&self) -> &ScoringConfig {
        &self.config.scoring
    }

    /// Code-keyed severity override for diagnostics no rule produced
    pub fn severity_override(&self, code: &str) -> Option<Severity> {
        self.config.rules.severity.get(code).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostic::codes;
    use pretty_assertions::assert_eq;

    const CLEAN: &str = "//@version=5\nindicator(\"Clean\", overlay=true)\nfast = ta.ema(close, 9)\nplot(fast)";

    fn analyzer() -> Analyzer {
        Analyzer::with_defaults().unwrap()
    }

    #[test]
    fn test_clean_script_is_valid() {
        let report = analyzer().validate(CLEAN);
        assert!(report.is_valid());
        assert_eq!(report.total(), 0);
        assert_eq!(report.detected_version, Some(5));
        assert_eq!(report.exit_code(), 0);
    }

    #[test]
    fn test_analyzer_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Analyzer>();
    }

    #[test]
    fn test_security_warnings_routed_separately() {
        let source = format!("{}\nkey = \"api\"\napi_key = \"sk-123456\"", CLEAN);
        let report = analyzer().validate(&source);
        assert_eq!(report.security_issues.len(), 1);
        assert_eq!(report.security_issues[0].code, codes::HARDCODED_SECRET);
        assert!(report.warnings.iter().all(|d| d.category != RuleCategory::Security));
        assert_eq!(report.exit_code(), 1);
    }

    #[test]
    fn test_buckets_sorted_by_position() {
        let report = analyzer().validate("x = a / 0\ny = (1");
        let positions: Vec<(usize, usize)> = report.errors.iter().map(|d| (d.line, d.column)).collect();
        let mut sorted = positions.clone();
        sorted.sort();
        assert_eq!(positions, sorted);
    }

    #[test]
    fn test_disabled_codes_and_rules() {
        let mut config = Config::default();
        config.rules.disabled = vec![
            codes::MISSING_DECLARATION.to_string(),
            "line-too-long".to_string(),
        ];
        let analyzer = Analyzer::new(config).unwrap();
        assert!(analyzer.rules().all(|r| r.id != "line-too-long"));

        let report = analyzer.validate(&format!("//@version=5\nx = \"{}\"", "a".repeat(200)));
        assert!(report.is_valid());
        assert!(report.suggestions.iter().all(|d| d.code != codes::LINE_TOO_LONG));
    }

    #[test]
    fn test_severity_override_moves_bucket() {
        let mut config = Config::default();
        config.rules.severity.insert("UNDEFINED_VARIABLE".to_string(), Severity::Error);
        config.rules.severity.insert(codes::MISSING_DECLARATION.to_string(), Severity::Info);
        let report = Analyzer::new(config).unwrap().validate("//@version=5\nplot(ghost)");

        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].code, codes::UNDEFINED_VARIABLE);
        assert_eq!(report.suggestions[0].code, codes::MISSING_DECLARATION);
    }

    #[test]
    fn test_rule_id_severity_beats_code_severity() {
        let mut config = Config::default();
        config.rules.severity.insert("deprecated-study".to_string(), Severity::Error);
        config.rules.severity.insert(codes::DEPRECATED_FUNCTION.to_string(), Severity::Info);
        let report = Analyzer::new(config)
            .unwrap()
            .validate("//@version=5\nstudy(\"x\")\nplot(sma(close, 3))");

        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].code, codes::DEPRECATED_FUNCTION);
        assert_eq!(report.errors[0].line, 2);
        let deprecated: Vec<_> = report
            .suggestions
            .iter()
            .filter(|d| d.code == codes::DEPRECATED_FUNCTION)
            .map(|d| d.line)
            .collect();
        assert_eq!(deprecated, vec![3]);
    }

    #[test]
    fn test_custom_rule() {
        let mut config = Config::default();
        config.rules.custom.push(
            Rule::new("no-barcolor", "NO_BARCOLOR", r"\bbarcolor\s*\(", "barcolor() is discouraged")
                .with_severity(Severity::Info),
        );
        let report = Analyzer::new(config)
            .unwrap()
            .validate(&format!("{}\nbarcolor(color.red)", CLEAN));
        assert_eq!(report.suggestions.len(), 1);
        assert_eq!(report.suggestions[0].code, "NO_BARCOLOR");
        assert_eq!(report.suggestions[0].line, 5);
    }

    #[test]
    fn test_invalid_custom_rule_fails_construction() {
        let mut config = Config::default();
        config.rules.custom.push(Rule::new("broken", "X", "(", "m"));
        assert!(matches!(Analyzer::new(config), Err(AnalyzerError::Rule(_))));

        let mut config = Config::default();
        config.rules.custom.push(Rule::new("deprecated-study", "X", "x", "m"));
        assert!(matches!(
            Analyzer::new(config),
            Err(AnalyzerError::Rule(RuleError::DuplicateId(_)))
        ));
    }

    #[test]
    fn test_invalid_config_fails_construction() {
        let mut config = Config::default();
        config.target_version = Some(0);
        assert!(matches!(Analyzer::new(config), Err(AnalyzerError::Config(_))));
    }

    #[test]
    fn test_report_serializes_is_valid() {
        let report = analyzer().validate("plot(close)");
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["isValid"], false);
        assert_eq!(json["detectedVersion"], serde_json::Value::Null);
        assert!(json["performanceScore"].is_u64());
        assert!(json["securityIssues"].is_array());
    }

    #[test]
    fn test_score_breakdown_matches_report() {
        let source = format!("{}\nx = close[5000]", CLEAN);
        let (report, breakdown) = analyzer().validate_with_score(&source);
        assert_eq!(breakdown.performance_warnings, 1);
        assert_eq!(report.performance_score, breakdown.score);
    }

    #[test]
    fn test_fixable_codes() {
        let report = analyzer().validate("study(\"x\")\nplot(sma(close, 3))");
        assert_eq!(
            report.fixable_codes(),
            vec![codes::DEPRECATED_FUNCTION, codes::MISSING_VERSION]
        );
    }
}

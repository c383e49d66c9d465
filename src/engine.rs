//! Rule engine
//!
//! Evaluates every compiled rule against every line. Lines are the outer
//! loop and rules the inner loop, in construction order, so output order is
//! deterministic. Matches are never deduplicated.

use crate::diagnostic::{Diagnostic, RuleCategory, Severity};
use crate::references::ReferenceChecker;
use crate::rule::{compile_all, CompiledRule, MatchTarget, Rule, RuleCheck, RuleError, RuleMatch};
use crate::scanner::{column_at, SourceLine, Token, TokenKind};
use crate::symbols::{declarations_in, Declaration, SymbolTable};

/// Report section a diagnostic lands in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bucket {
    Errors,
    Warnings,
    Suggestions,
    SecurityIssues,
}

impl Bucket {
    /// Severity decides the bucket, except security warnings which get their own
    pub fn route(severity: Severity, category: RuleCategory) -> Self {
        match (severity, category) {
            (Severity::Error, _) => Bucket::Errors,
            (Severity::Warning, RuleCategory::Security) => Bucket::SecurityIssues,
            (Severity::Warning, _) => Bucket::Warnings,
            (Severity::Info, _) => Bucket::Suggestions,
        }
    }
}

/// Ordered, immutable rule set
#[derive(Debug, Clone)]
pub struct RuleEngine {
    rules: Vec<CompiledRule>,
}

impl RuleEngine {
    /// Compile the rule set; fails on the first invalid rule
    pub fn new(rules: Vec<Rule>) -> Result<Self, RuleError> {
        Ok(Self {
            rules: compile_all(rules)?,
        })
    }

    /// Rules in evaluation order
    pub fn rules(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter().map(|r| &r.rule)
    }

    /// Get count of loaded rules
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Evaluate all rules against all lines
    pub fn evaluate(&self, lines: &[SourceLine], symbols: &SymbolTable<'_>) -> Vec<Diagnostic> {
        let checker = ReferenceChecker::new(symbols);
        let mut diagnostics = Vec::new();

        for line in lines {
            let code = line.code();
            let is_code = line.is_code();
            let mut tokens: Option<Vec<Token<'_>>> = None;
            let mut declarations: Option<Vec<Declaration>> = None;

            for compiled in &self.rules {
                let rule = &compiled.rule;
                match rule.check {
                    RuleCheck::Match => {
                        let text = match rule.target {
                            MatchTarget::Code if !is_code => continue,
                            MatchTarget::Code => code.as_str(),
                            MatchTarget::Line => line.text.as_str(),
                        };
                        for m in compiled.find_matches(text) {
                            diagnostics.push(self.diagnostic(rule, line, &m));
                        }
                    }
                    RuleCheck::Reference => {
                        if !is_code {
                            continue;
                        }
                        let tokens = tokens.get_or_insert_with(|| line.tokens());
                        let declarations =
                            declarations.get_or_insert_with(|| declarations_in(&code));

                        for token in tokens.iter().filter(|t| {
                            t.kind == TokenKind::Identifier && compiled.is_match(t.text)
                        }) {
                            if checker.is_valid(&line.text, token, declarations) {
                                continue;
                            }
                            let m = RuleMatch {
                                text: token.text,
                                target: token.text,
                                offset: token.offset,
                            };
                            diagnostics.push(self.diagnostic(rule, line, &m));
                        }
                    }
                }
            }
        }

        diagnostics
    }

    fn diagnostic(&self, rule: &Rule, line: &SourceLine, m: &RuleMatch<'_>) -> Diagnostic {
        let column = column_at(&line.text, m.offset);
        let message = Rule::render(&rule.message, m, line.number);
        let mut diag = Diagnostic::new(
            &rule.code,
            rule.severity,
            rule.category,
            &message,
            line.number,
            column,
        );

        if let Some(suggestion) = &rule.suggestion {
            diag = diag.with_suggestion(&Rule::render(suggestion, m, line.number));
        }
        if let Some(fix) = &rule.fix {
            diag = diag.with_quick_fix(fix.generate(m.target, line.number, column));
        }

        diag
    }
}

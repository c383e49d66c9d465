//! Rule definition and compilation
//!
//! A [`Rule`] is plain data: a pattern, where to match it, what to report and
//! how to fix it. Rules are compiled once when the analyzer is built; a rule
//! that does not compile aborts construction with a [`RuleError`].

use crate::diagnostic::{QuickFix, Range, RuleCategory, Severity};
use crate::scanner::column_at;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

/// Rule construction error
#[derive(Debug, Error)]
pub enum RuleError {
    #[error("Rule '{0}' has an empty pattern")]
    EmptyPattern(String),

    #[error("Rule '{id}' has an invalid pattern: {source}")]
    InvalidPattern {
        id: String,
        #[source]
        source: regex::Error,
    },

    #[error("Rule '{0}' is defined more than once")]
    DuplicateId(String),

    #[error("Rule '{id}' is missing {field}")]
    MissingField { id: String, field: &'static str },
}

/// Which text of a line a rule is matched against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatchTarget {
    /// Code with strings and comments blanked; blank and comment lines skipped
    #[default]
    Code,
    /// The raw line, every line included
    Line,
}

/// How a match turns into a diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RuleCheck {
    /// Every match is reported
    #[default]
    Match,
    /// Matches are identifier tokens, reported only when undeclared
    Reference,
}

/// Fix actions a rule can generate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "kebab-case")]
pub enum FixAction {
    /// Replace the matched text
    ReplaceMatch { with: String },
    /// Expand tabs in the matched text to spaces
    ExpandTabs { width: usize },
    /// Remove the matched text
    Delete,
}

/// Quick-fix generator attached to a rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixTemplate {
    /// Action label shown to the user
    pub title: String,
    #[serde(flatten)]
    pub action: FixAction,
}

impl FixTemplate {
    pub fn new(title: &str, action: FixAction) -> Self {
        Self {
            title: title.to_string(),
            action,
        }
    }

    /// Generate the quick fix for `matched` found at `line`:`column`
    pub fn generate(&self, matched: &str, line: usize, column: usize) -> QuickFix {
        let range = Range::on_line(line, column, column + matched.chars().count());
        match &self.action {
            FixAction::ReplaceMatch { with } => QuickFix::new(
                &self.title,
                &format!("Replace '{}' with '{}'", matched, with),
                with,
                range,
            ),
            FixAction::ExpandTabs { width } => {
                let expanded: String = matched
                    .chars()
                    .map(|c| {
                        if c == '\t' {
                            " ".repeat(*width)
                        } else {
                            c.to_string()
                        }
                    })
                    .collect();
                QuickFix::new(
                    &self.title,
                    &format!("Indent with {} spaces per tab", width),
                    &expanded,
                    range,
                )
            }
            FixAction::Delete => {
                QuickFix::new(&self.title, &format!("Remove '{}'", matched), "", range)
            }
        }
    }
}

/// A declarative analysis rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    /// Unique rule identifier (e.g., "deprecated-study")
    pub id: String,

    /// Human-readable name
    #[serde(default)]
    pub name: String,

    /// Diagnostic code reported for matches
    pub code: String,

    #[serde(default)]
    pub category: RuleCategory,

    #[serde(default)]
    pub severity: Severity,

    /// Regular expression; a `target` group narrows the reported span
    pub pattern: String,

    #[serde(default)]
    pub target: MatchTarget,

    #[serde(default)]
    pub check: RuleCheck,

    /// Ignore matches whose target follows a `.` (member access)
    #[serde(default)]
    pub unqualified: bool,

    /// Message template; `{match}`, `{target}` and `{line}` are substituted
    pub message: String,

    /// Suggestion template, same placeholders as the message
    #[serde(default)]
    pub suggestion: Option<String>,

    #[serde(default)]
    pub fix: Option<FixTemplate>,
}

impl Rule {
    /// Create a new rule with minimal required fields
    pub fn new(id: &str, code: &str, pattern: &str, message: &str) -> Self {
        Self {
            id: id.to_string(),
            name: String::new(),
            code: code.to_string(),
            category: RuleCategory::default(),
            severity: Severity::default(),
            pattern: pattern.to_string(),
            target: MatchTarget::default(),
            check: RuleCheck::default(),
            unqualified: false,
            message: message.to_string(),
            suggestion: None,
            fix: None,
        }
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn with_category(mut self, category: RuleCategory) -> Self {
        self.category = category;
        self
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn with_suggestion(mut self, suggestion: &str) -> Self {
        self.suggestion = Some(suggestion.to_string());
        self
    }

    pub fn with_fix(mut self, fix: FixTemplate) -> Self {
        self.fix = Some(fix);
        self
    }

    /// Match against the raw line instead of masked code
    pub fn on_raw_line(mut self) -> Self {
        self.target = MatchTarget::Line;
        self
    }

    /// Skip matches preceded by member access
    pub fn unqualified(mut self) -> Self {
        self.unqualified = true;
        self
    }

    /// Report only undeclared identifiers among the matches
    pub fn reference_check(mut self) -> Self {
        self.check = RuleCheck::Reference;
        self
    }

    /// Render a template for one match
    pub fn render(template: &str, m: &RuleMatch<'_>, line: usize) -> String {
        template
            .replace("{match}", m.text)
            .replace("{target}", m.target)
            .replace("{line}", &line.to_string())
    }

    /// Validate and compile the pattern
    pub fn compile(self) -> Result<CompiledRule, RuleError> {
        if self.id.trim().is_empty() {
            return Err(RuleError::MissingField {
                id: self.id,
                field: "an id",
            });
        }
        if self.code.trim().is_empty() {
            return Err(RuleError::MissingField {
                id: self.id,
                field: "a code",
            });
        }
        if self.message.trim().is_empty() {
            return Err(RuleError::MissingField {
                id: self.id,
                field: "a message",
            });
        }
        if self.pattern.is_empty() {
            return Err(RuleError::EmptyPattern(self.id));
        }

        let regex = Regex::new(&self.pattern).map_err(|source| RuleError::InvalidPattern {
            id: self.id.clone(),
            source,
        })?;

        Ok(CompiledRule { rule: self, regex })
    }
}

/// Compile a rule list, rejecting duplicate ids
pub fn compile_all(rules: Vec<Rule>) -> Result<Vec<CompiledRule>, RuleError> {
    let mut seen = HashSet::new();
    let mut compiled = Vec::with_capacity(rules.len());

    for rule in rules {
        if !seen.insert(rule.id.clone()) {
            return Err(RuleError::DuplicateId(rule.id));
        }
        compiled.push(rule.compile()?);
    }

    log::debug!("compiled {} rules", compiled.len());
    Ok(compiled)
}

/// One pattern match within a line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuleMatch<'a> {
    /// Whole matched text
    pub text: &'a str,
    /// Text of the `target` group, or the whole match
    pub target: &'a str,
    /// Byte offset of the target
    pub offset: usize,
}

/// A rule with its compiled pattern
#[derive(Debug, Clone)]
pub struct CompiledRule {
    pub rule: Rule,
    regex: Regex,
}

impl CompiledRule {
    /// All matches in `text`, one per regex match
    pub fn find_matches<'a>(&self, text: &'a str) -> Vec<RuleMatch<'a>> {
        self.regex
            .captures_iter(text)
            .filter_map(|caps| {
                let whole = caps.get(0)?;
                let target = caps.name("target").unwrap_or(whole);
                if self.rule.unqualified && text[..target.start()].ends_with('.') {
                    return None;
                }
                Some(RuleMatch {
                    text: whole.as_str(),
                    target: target.as_str(),
                    offset: target.start(),
                })
            })
            .collect()
    }

    /// Whole-text test used for identifier tokens
    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }

    /// Column of a match within `text`
    pub fn column_of(text: &str, m: &RuleMatch<'_>) -> usize {
        column_at(text, m.offset)
    }
}

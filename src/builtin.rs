//! Built-in analysis rules
//!
//! Rules are listed in evaluation order. Deprecated-call rules come first,
//! then syntax, logic, performance, security and style rules.

use crate::diagnostic::{codes, RuleCategory, Severity};
use crate::rule::{FixAction, FixTemplate, Rule};
use crate::vocabulary::DEPRECATED_CALLS;

/// Get all built-in rules
///
/// `max_line_length` and `indent_width` come from the style configuration.
pub fn builtin_rules(max_line_length: usize, indent_width: usize) -> Vec<Rule> {
    let mut rules: Vec<Rule> = DEPRECATED_CALLS
        .iter()
        .map(|&(name, replacement)| deprecated_call(name, replacement))
        .collect();

    rules.extend(vec![
        Rule::new(
            "logical-and-operator",
            codes::INVALID_OPERATOR,
            r"&&",
            "'&&' is not an operator in this language",
        )
        .with_name("Logical and")
        .with_category(RuleCategory::Syntax)
        .with_severity(Severity::Error)
        .with_suggestion("Use the 'and' keyword")
        .with_fix(FixTemplate::new(
            "Replace with 'and'",
            FixAction::ReplaceMatch {
                with: "and".to_string(),
            },
        )),
        Rule::new(
            "logical-or-operator",
            codes::INVALID_OPERATOR,
            r"\|\|",
            "'||' is not an operator in this language",
        )
        .with_name("Logical or")
        .with_category(RuleCategory::Syntax)
        .with_severity(Severity::Error)
        .with_suggestion("Use the 'or' keyword")
        .with_fix(FixTemplate::new(
            "Replace with 'or'",
            FixAction::ReplaceMatch {
                with: "or".to_string(),
            },
        )),
        Rule::new(
            "assignment-in-condition",
            codes::ASSIGNMENT_IN_CONDITION,
            r"^\s*(?:else\s+)?(?:if|while)\b[^=]*?[^=!<>:](?P<target>=)(?:[^=>]|$)",
            "Assignment '=' used inside a condition",
        )
        .with_name("Assignment in condition")
        .with_category(RuleCategory::Syntax)
        .with_severity(Severity::Error)
        .with_suggestion("Use '==' to compare values")
        .with_fix(FixTemplate::new(
            "Replace with '=='",
            FixAction::ReplaceMatch {
                with: "==".to_string(),
            },
        )),
        Rule::new(
            "identifier-use",
            codes::UNDEFINED_VARIABLE,
            r"^[A-Za-z_]\w*$",
            "'{match}' is used before declaration",
        )
        .with_name("Undeclared identifier")
        .with_category(RuleCategory::Logic)
        .with_severity(Severity::Warning)
        .with_suggestion("Declare '{match}' or check the spelling")
        .reference_check(),
        Rule::new(
            "na-comparison",
            codes::NA_COMPARISON,
            r"[=!]=\s*na\b|\bna\s*[=!]=",
            "Comparison with na is always false",
        )
        .with_name("na comparison")
        .with_category(RuleCategory::Logic)
        .with_severity(Severity::Warning)
        .with_suggestion("Use na(value) to test for missing values"),
        Rule::new(
            "lookahead-bias",
            codes::LOOKAHEAD_BIAS,
            r"\blookahead\s*=\s*barmerge\.lookahead_on\b",
            "lookahead_on leaks future values into historical bars",
        )
        .with_name("Lookahead bias")
        .with_category(RuleCategory::Logic)
        .with_severity(Severity::Warning)
        .with_suggestion("Use barmerge.lookahead_off or offset the requested series with [1]"),
        Rule::new(
            "large-history-reference",
            codes::LARGE_HISTORY_REFERENCE,
            r"\[\s*(?P<target>\d{4,})\s*\]",
            "History reference [{target}] reaches far back",
        )
        .with_name("Large history reference")
        .with_category(RuleCategory::Performance)
        .with_severity(Severity::Warning)
        .with_suggestion("Keep history references below 1000 bars or call max_bars_back()"),
        Rule::new(
            "large-loop-bound",
            codes::LARGE_LOOP,
            r"^\s*for\s+\w+\s*=\s*.+?\s+to\s+(?P<target>\d{4,})\b",
            "Loop runs up to {target} iterations on every bar",
        )
        .with_name("Large loop")
        .with_category(RuleCategory::Performance)
        .with_severity(Severity::Warning)
        .with_suggestion("Reduce the loop bound or use a built-in ta.* function"),
        Rule::new(
            "request-call",
            codes::REQUEST_CALL,
            r"\brequest\.(?P<target>security_lower_tf|security|financial|quandl|dividends|earnings|splits|economic|seed)\s*\(",
            "request.{target}() loads additional data",
        )
        .with_name("Data request")
        .with_category(RuleCategory::Performance)
        .with_severity(Severity::Info)
        .with_suggestion("Each request.*() call counts against the script's request limit"),
        Rule::new(
            "hardcoded-secret",
            codes::HARDCODED_SECRET,
            r#"(?i)\b(?P<target>api[_-]?key|secret|password|passwd|token|webhook[_-]?secret)\b\s*[=:]\s*["'][^"']{4,}"#,
            "Possible hardcoded credential '{target}'",
        )
        .with_name("Hardcoded secret")
        .with_category(RuleCategory::Security)
        .with_severity(Severity::Warning)
        .with_suggestion("Read credentials with input.string() instead of embedding them")
        .on_raw_line(),
        Rule::new(
            "external-url",
            codes::EXTERNAL_URL,
            r#"(?i)\bhttps?://[^\s"')]+"#,
            "External URL '{match}'",
        )
        .with_name("External URL")
        .with_category(RuleCategory::Security)
        .with_severity(Severity::Warning)
        .with_suggestion("Scripts cannot reach external services; remove the URL")
        .on_raw_line(),
        Rule::new(
            "tab-indentation",
            codes::TAB_INDENTATION,
            r"^(?P<target>[ \t]*\t[ \t]*)",
            "Indentation uses tabs",
        )
        .with_name("Tab indentation")
        .with_category(RuleCategory::Style)
        .with_severity(Severity::Info)
        .with_suggestion(&format!("Indent with {} spaces", indent_width))
        .with_fix(FixTemplate::new(
            "Convert tabs to spaces",
            FixAction::ExpandTabs {
                width: indent_width,
            },
        ))
        .on_raw_line(),
        Rule::new(
            "trailing-whitespace",
            codes::TRAILING_WHITESPACE,
            r"(?P<target>[ \t]+)$",
            "Trailing whitespace",
        )
        .with_name("Trailing whitespace")
        .with_category(RuleCategory::Style)
        .with_severity(Severity::Info)
        .with_fix(FixTemplate::new("Remove trailing whitespace", FixAction::Delete))
        .on_raw_line(),
        Rule::new(
            "line-too-long",
            codes::LINE_TOO_LONG,
            &format!(r"^.{{{}}}(?P<target>.+)$", max_line_length),
            &format!("Line exceeds {} characters", max_line_length),
        )
        .with_name("Line too long")
        .with_category(RuleCategory::Style)
        .with_severity(Severity::Info)
        .with_suggestion("Split the expression over several lines")
        .on_raw_line(),
    ]);

    rules
}

fn deprecated_call(name: &str, replacement: Option<&str>) -> Rule {
    let rule = Rule::new(
        &format!("deprecated-{}", name),
        codes::DEPRECATED_FUNCTION,
        &format!(r"\b(?P<target>{})\s*\(", name),
        "'{target}()' is deprecated",
    )
    .with_name(&format!("Deprecated {}()", name))
    .with_category(RuleCategory::Syntax)
    .with_severity(Severity::Warning)
    .unqualified();

    match replacement {
        Some(new) => rule
            .with_suggestion(&format!("Use {}() instead", new))
            .with_fix(FixTemplate::new(
                &format!("Replace with {}()", new),
                FixAction::ReplaceMatch {
                    with: new.to_string(),
                },
            )),
        None => rule.with_suggestion("Use the ternary operator 'condition ? a : b' instead"),
    }
}

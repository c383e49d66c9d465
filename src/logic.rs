//! Logic checks that look beyond a single pattern match

use crate::diagnostic::{codes, Diagnostic, QuickFix, Range, RuleCategory, Severity};
use crate::scanner::{column_at, SourceLine};
use crate::vocabulary::EXIT_KEYWORDS;
use once_cell::sync::Lazy;
use regex::Regex;

static DIVISION_BY_ZERO: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/\s*0+(?:\.0*)?").expect("Invalid regex"));

/// Run all logic checks
pub fn check(lines: &[SourceLine]) -> Vec<Diagnostic> {
    let mut diagnostics = division_by_zero(lines);
    diagnostics.extend(unreachable_code(lines));
    diagnostics
}

/// `/` followed by a literal zero in code
pub fn division_by_zero(lines: &[SourceLine]) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();

    for line in lines.iter().filter(|l| l.is_code()) {
        let code = line.code();
        for m in DIVISION_BY_ZERO.find_iter(&code) {
            // 0.5, 0x and 05 are not zero
            let next = code[m.end()..].chars().next();
            if next.is_some_and(|c| c.is_alphanumeric() || c == '_' || c == '.') {
                continue;
            }
            diagnostics.push(
                Diagnostic::new(
                    codes::DIVISION_BY_ZERO,
                    Severity::Error,
                    RuleCategory::Logic,
                    "Division by zero",
                    line.number,
                    column_at(&line.text, m.start()),
                )
                .with_suggestion("Guard the divisor, e.g. x / (d == 0 ? na : d)"),
            );
        }
    }

    diagnostics
}

/// Lines that follow an unconditional exit inside the same block
pub fn unreachable_code(lines: &[SourceLine]) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();

    for pair in lines.windows(2) {
        let (exit, next) = (&pair[0], &pair[1]);
        if !exit.is_code() || !next.is_code() {
            continue;
        }
        let Some(keyword) = exit_keyword(exit) else {
            continue;
        };
        // a dedent closes the block the exit lives in
        if next.indent_width() < exit.indent_width() {
            continue;
        }

        let indent = next.text.len() - next.text.trim_start().len();
        let column = column_at(&next.text, indent);
        diagnostics.push(
            Diagnostic::new(
                codes::UNREACHABLE_CODE,
                Severity::Warning,
                RuleCategory::Logic,
                &format!("Unreachable code after '{}'", keyword),
                next.number,
                column,
            )
            .with_suggestion(&format!(
                "Remove this line or move it before the '{}' on line {}",
                keyword, exit.number
            ))
            .with_quick_fix(QuickFix::new(
                "Remove unreachable line",
                "Delete the unreachable statement",
                "",
                Range::on_line(next.number, column, next.text.chars().count() + 1),
            )),
        );
    }

    diagnostics
}

fn exit_keyword(line: &SourceLine) -> Option<&'static str> {
    let code = line.code();
    let trimmed = code.trim_start();
    EXIT_KEYWORDS.iter().copied().find(|kw| {
        trimmed.starts_with(kw)
            && !trimmed[kw.len()..]
                .chars()
                .next()
                .is_some_and(|c| c.is_alphanumeric() || c == '_' || c == '.')
    })
}

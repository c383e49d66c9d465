//! Structural checks: delimiter balance and string termination
//!
//! Balance is tracked per physical line. A bracket opened on one line and
//! closed on the next is reported on both lines.

use crate::diagnostic::{codes, Diagnostic, QuickFix, Range, RuleCategory, Severity};
use crate::scanner::{Delimiter, SourceLine, TokenKind};

/// Check every line of a file
pub fn check(lines: &[SourceLine]) -> Vec<Diagnostic> {
    lines.iter().flat_map(check_line).collect()
}

/// Check one line
pub fn check_line(line: &SourceLine) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    let mut stack: Vec<(Delimiter, usize)> = Vec::new();
    let mut open_string: Option<(char, usize)> = None;

    for token in line.tokens() {
        match token.kind {
            TokenKind::Open(delim) => stack.push((delim, token.column)),
            TokenKind::Close(delim) => match stack.last() {
                Some(&(top, _)) if top == delim => {
                    stack.pop();
                }
                Some(&(top, column)) => {
                    diagnostics.push(unmatched(line.number, token.column, delim).with_suggestion(
                        &format!(
                            "'{}' at column {} is closed by '{}'; close it with '{}'",
                            top.open_char(),
                            column,
                            delim.close_char(),
                            top.close_char()
                        ),
                    ));
                }
                None => diagnostics.push(unmatched(line.number, token.column, delim)),
            },
            TokenKind::StringStart(quote) => open_string = Some((quote, token.column)),
            TokenKind::StringEnd(_) => open_string = None,
            TokenKind::Identifier | TokenKind::CommentStart => {}
        }
    }

    let end_column = line.text.chars().count() + 1;

    if let Some((quote, column)) = open_string {
        diagnostics.push(
            Diagnostic::new(
                codes::UNCLOSED_STRING,
                Severity::Error,
                RuleCategory::Syntax,
                &format!("Unterminated string literal starting with {}", quote),
                line.number,
                column,
            )
            .with_suggestion(&format!("Close the string with {}", quote))
            .with_quick_fix(QuickFix::new(
                "Close string",
                &format!("Append {} at the end of the line", quote),
                &quote.to_string(),
                Range::point(line.number, end_column),
            )),
        );
    }

    if let Some(&(delim, column)) = stack.last() {
        let closers: String = stack.iter().rev().map(|(d, _)| d.close_char()).collect();
        let message = if stack.len() == 1 {
            format!("Unclosed {} '{}'", delim.name(), delim.open_char())
        } else {
            format!(
                "Unclosed {} '{}' ({} delimiters left open on this line)",
                delim.name(),
                delim.open_char(),
                stack.len()
            )
        };
        diagnostics.push(
            Diagnostic::new(
                codes::UNCLOSED_BRACKET,
                Severity::Error,
                RuleCategory::Syntax,
                &message,
                line.number,
                column,
            )
            .with_suggestion(&format!("Add '{}' before the end of the line", closers))
            .with_quick_fix(QuickFix::new(
                "Close delimiters",
                &format!("Append '{}' at the end of the line", closers),
                &closers,
                Range::point(line.number, end_column),
            )),
        );
    }

    diagnostics
}

fn unmatched(line: usize, column: usize, delim: Delimiter) -> Diagnostic {
    Diagnostic::new(
        codes::UNMATCHED_BRACKET,
        Severity::Error,
        RuleCategory::Syntax,
        &format!("Unmatched closing {} '{}'", delim.name(), delim.close_char()),
        line,
        column,
    )
    .with_quick_fix(QuickFix::new(
        "Remove delimiter",
        &format!("Delete the stray '{}'", delim.close_char()),
        "",
        Range::on_line(line, column, column + 1),
    ))
}

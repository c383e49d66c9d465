//! Auto-fix system
//!
//! Fixes are selected by diagnostic code and applied as pure text rewrites.
//! Each fix is idempotent, touches code spans only (never string contents or
//! comments) and keeps the original line break style.

use crate::diagnostic::codes;
use crate::header::marker_version;
use crate::scanner::{join_lines, line_break, mask_code, split_lines, SourceLine};
use crate::vocabulary::DEPRECATED_CALLS;
use once_cell::sync::Lazy;
use regex::Regex;

/// Codes with an automatic fix, in the order fixes are applied
pub const FIXABLE_CODES: &[&str] = &[
    codes::MISSING_VERSION,
    codes::OUTDATED_VERSION,
    codes::DEPRECATED_FUNCTION,
    codes::INVALID_OPERATOR,
    codes::TAB_INDENTATION,
    codes::TRAILING_WHITESPACE,
];

static DEPRECATED_PATTERNS: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    DEPRECATED_CALLS
        .iter()
        .filter_map(|&(name, replacement)| {
            let pattern = format!(r"\b({})\s*\(", name);
            Some((Regex::new(&pattern).expect("Invalid regex"), replacement?))
        })
        .collect()
});

static LOGICAL_OPERATOR: Lazy<Regex> = Lazy::new(|| Regex::new(r"&&|\|\|").expect("Invalid regex"));

/// Result of applying fixes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FixResult {
    /// The rewritten source
    pub content: String,
    /// Codes whose fix changed the text
    pub applied: Vec<String>,
    /// Requested codes with no automatic fix
    pub ignored: Vec<String>,
}

impl FixResult {
    /// Check if any fix changed the text
    pub fn changed(&self) -> bool {
        !self.applied.is_empty()
    }
}

/// A byte-range replacement within one line
struct Edit {
    start: usize,
    end: usize,
    replacement: String,
}

/// Code-driven auto-fixer
#[derive(Debug, Clone)]
pub struct Fixer {
    target_version: u32,
    indent_width: usize,
}

impl Fixer {
    pub fn new(target_version: u32, indent_width: usize) -> Self {
        Self {
            target_version,
            indent_width,
        }
    }

    /// Check if `code` has an automatic fix
    pub fn supports(code: &str) -> bool {
        FIXABLE_CODES.contains(&code)
    }

    /// Apply the fixes for `requested` codes to `source`
    pub fn fix(&self, source: &str, requested: &[&str]) -> FixResult {
        let mut result = FixResult::default();

        for code in requested {
            if !Self::supports(code) && !result.ignored.iter().any(|c| c == code) {
                log::debug!("no automatic fix for {}", code);
                result.ignored.push(code.to_string());
            }
        }

        let newline = line_break(source);
        let (mut lines, mut endings): (Vec<String>, Vec<&'static str>) = split_lines(source)
            .into_iter()
            .map(|l| (l.text, l.ending))
            .unzip();

        for &code in FIXABLE_CODES.iter().filter(|c| requested.contains(c)) {
            let before = lines.clone();
            match code {
                codes::MISSING_VERSION => self.add_version(&mut lines, &mut endings, newline),
                codes::OUTDATED_VERSION => self.upgrade_version(&mut lines),
                codes::DEPRECATED_FUNCTION => edit_code(&mut lines, deprecated_edits),
                codes::INVALID_OPERATOR => edit_code(&mut lines, operator_edits),
                codes::TAB_INDENTATION => self.expand_tabs(&mut lines),
                codes::TRAILING_WHITESPACE => trim_trailing(&mut lines),
                _ => {}
            }
            if lines != before {
                result.applied.push(code.to_string());
            }
        }

        let fixed: Vec<SourceLine> = lines
            .iter()
            .zip(endings)
            .enumerate()
            .map(|(idx, (text, ending))| SourceLine::new(idx + 1, text).with_ending(ending))
            .collect();
        result.content = join_lines(&fixed);
        result
    }

    /// Put a version marker on line 1, moving a misplaced one
    fn add_version(&self, lines: &mut Vec<String>, endings: &mut Vec<&'static str>, newline: &'static str) {
        if lines.first().is_some_and(|l| marker_version(l).is_some()) {
            return;
        }
        let version = match lines.iter().position(|l| marker_version(l).is_some()) {
            Some(idx) => {
                let version = marker_version(&lines.remove(idx)).unwrap_or(self.target_version);
                let ending = endings.remove(idx);
                if idx == endings.len() {
                    if let Some(last) = endings.last_mut() {
                        *last = ending;
                    }
                }
                version
            }
            None => self.target_version,
        };
        lines.insert(0, format!("//@version={}", version));
        endings.insert(0, newline);
    }

    fn upgrade_version(&self, lines: &mut [String]) {
        if let Some(line) = lines.iter_mut().find(|l| marker_version(l).is_some()) {
            if marker_version(line).is_some_and(|v| v < self.target_version) {
                *line = format!("//@version={}", self.target_version);
            }
        }
    }

    fn expand_tabs(&self, lines: &mut [String]) {
        let spaces = " ".repeat(self.indent_width);
        for line in lines.iter_mut() {
            let indent_len = line.len() - line.trim_start_matches([' ', '\t']).len();
            if line[..indent_len].contains('\t') {
                let indent = line[..indent_len].replace('\t', &spaces);
                *line = format!("{}{}", indent, &line[indent_len..]);
            }
        }
    }
}

/// Apply edits computed on the masked form of each code line
fn edit_code(lines: &mut [String], edits_for: fn(&str, &str) -> Vec<Edit>) {
    for line in lines.iter_mut() {
        let code = mask_code(line);
        if code.trim().is_empty() {
            continue;
        }
        let mut edits = edits_for(line, &code);
        if edits.is_empty() {
            continue;
        }
        edits.sort_by_key(|e| e.start);

        let mut rewritten = String::with_capacity(line.len() + 16);
        let mut cursor = 0;
        for edit in edits {
            if edit.start < cursor {
                continue;
            }
            rewritten.push_str(&line[cursor..edit.start]);
            rewritten.push_str(&edit.replacement);
            cursor = edit.end;
        }
        rewritten.push_str(&line[cursor..]);
        *line = rewritten;
    }
}

fn deprecated_edits(_line: &str, code: &str) -> Vec<Edit> {
    DEPRECATED_PATTERNS
        .iter()
        .flat_map(|(regex, replacement)| {
            regex.captures_iter(code).filter_map(move |caps| {
                let name = caps.get(1)?;
                if code[..name.start()].ends_with('.') {
                    return None;
                }
                Some(Edit {
                    start: name.start(),
                    end: name.end(),
                    replacement: replacement.to_string(),
                })
            })
        })
        .collect()
}

fn operator_edits(line: &str, code: &str) -> Vec<Edit> {
    LOGICAL_OPERATOR
        .find_iter(code)
        .map(|m| {
            let word = if m.as_str() == "&&" { "and" } else { "or" };
            let before = if line[..m.start()].ends_with(char::is_whitespace) || m.start() == 0 {
                ""
            } else {
                " "
            };
            let after = if line[m.end()..].starts_with(char::is_whitespace) || m.end() == line.len() {
                ""
            } else {
                " "
            };
            Edit {
                start: m.start(),
                end: m.end(),
                replacement: format!("{}{}{}", before, word, after),
            }
        })
        .collect()
}

fn trim_trailing(lines: &mut [String]) {
    for line in lines.iter_mut() {
        let trimmed = line.trim_end_matches([' ', '\t']).len();
        line.truncate(trimmed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn fix(source: &str, requested: &[&str]) -> String {
        Fixer::new(5, 4).fix(source, requested).content
    }

    #[test]
    fn test_missing_version_prepended() {
        assert_eq!(
            fix("indicator(\"x\")\nplot(close)", &[codes::MISSING_VERSION]),
            "//@version=5\nindicator(\"x\")\nplot(close)"
        );
    }

    #[test]
    fn test_misplaced_version_moved() {
        assert_eq!(
            fix("indicator(\"x\")\n//@version=4\nplot(close)", &[codes::MISSING_VERSION]),
            "//@version=4\nindicator(\"x\")\nplot(close)"
        );
    }

    #[test]
    fn test_outdated_version_upgraded() {
        assert_eq!(
            fix("//@version=3\nstudy(\"x\")", &[codes::OUTDATED_VERSION]),
            "//@version=5\nstudy(\"x\")"
        );
        assert_eq!(
            fix("//@version=6\nindicator(\"x\")", &[codes::OUTDATED_VERSION]),
            "//@version=6\nindicator(\"x\")"
        );
    }

    #[test]
    fn test_deprecated_calls_rewritten_in_code_only() {
        let source = "study(\"sma(x)\")\nx = sma(close, 3) + ta.ema(close, 2) // ema(\ny = security(syminfo.tickerid, \"D\", close)";
        let expected = "indicator(\"sma(x)\")\nx = ta.sma(close, 3) + ta.ema(close, 2) // ema(\ny = request.security(syminfo.tickerid, \"D\", close)";
        assert_eq!(fix(source, &[codes::DEPRECATED_FUNCTION]), expected);
    }

    #[test]
    fn test_iff_left_alone() {
        let source = "x = iff(c, 1, 2)";
        assert_eq!(fix(source, &[codes::DEPRECATED_FUNCTION]), source);
    }

    #[test]
    fn test_logical_operators() {
        assert_eq!(
            fix("c = a && b || d\ne = a&&b\ns = \"&&\"", &[codes::INVALID_OPERATOR]),
            "c = a and b or d\ne = a and b\ns = \"&&\""
        );
    }

    #[test]
    fn test_tabs_and_trailing_whitespace() {
        assert_eq!(
            fix("if c\n\tx := 1  \n\t\ty := \"\t\"", &[codes::TAB_INDENTATION, codes::TRAILING_WHITESPACE]),
            "if c\n    x := 1\n        y := \"\t\""
        );
    }

    #[test]
    fn test_crlf_preserved() {
        assert_eq!(
            fix("indicator(\"x\")\r\nplot(close)\r\n", &[codes::MISSING_VERSION]),
            "//@version=5\r\nindicator(\"x\")\r\nplot(close)\r\n"
        );
    }

    #[test]
    fn test_mixed_line_endings_kept_per_line() {
        assert_eq!(
            fix("x\r\ny\n//@version=4", &[codes::MISSING_VERSION]),
            "//@version=4\r\nx\r\ny"
        );
        assert_eq!(
            fix("x\ny\r\n//@version=4\r\nz\n", &[codes::MISSING_VERSION, codes::OUTDATED_VERSION]),
            "//@version=5\nx\ny\r\nz\n"
        );
    }

    #[test]
    fn test_fixes_are_idempotent() {
        let source = "study(\"x\")\n\tx = sma(close, 3) && y  \n//@version=4";
        let all: Vec<&str> = FIXABLE_CODES.to_vec();
        let once = fix(source, &all);
        assert_eq!(fix(&once, &all), once);
    }

    #[test]
    fn test_unknown_codes_ignored() {
        let result = Fixer::new(5, 4).fix("x = 1", &["NOT_A_CODE", codes::UNCLOSED_BRACKET]);
        assert_eq!(result.content, "x = 1");
        assert!(!result.changed());
        assert_eq!(result.ignored, vec!["NOT_A_CODE", codes::UNCLOSED_BRACKET]);
    }

    #[test]
    fn test_applied_lists_changing_fixes() {
        let result = Fixer::new(5, 4).fix(
            "//@version=5\nx = 1  ",
            &[codes::MISSING_VERSION, codes::TRAILING_WHITESPACE],
        );
        assert_eq!(result.applied, vec![codes::TRAILING_WHITESPACE]);
    }
}

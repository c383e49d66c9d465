//! File-level header checks: version marker and script declaration

use crate::diagnostic::{codes, Diagnostic, QuickFix, Range, RuleCategory, Severity};
use crate::scanner::SourceLine;
use once_cell::sync::Lazy;
use regex::Regex;

/// `//@version=N`
pub static VERSION_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*//\s*@version\s*=\s*(?P<version>\d+)").expect("Invalid regex"));

static DECLARATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(?:indicator|strategy|library|study)\s*\(").expect("Invalid regex")
});

/// Version number of a marker line
pub fn marker_version(text: &str) -> Option<u32> {
    VERSION_MARKER
        .captures(text)
        .and_then(|caps| caps.name("version")?.as_str().parse().ok())
}

/// Line number and version of the first marker in the file
pub fn find_marker(lines: &[SourceLine]) -> Option<(usize, u32)> {
    lines
        .iter()
        .find_map(|l| marker_version(&l.text).map(|v| (l.number, v)))
}

/// Version of the first marker found anywhere in the file
pub fn detect_version(lines: &[SourceLine]) -> Option<u32> {
    find_marker(lines).map(|(_, v)| v)
}

/// Run the header checks against `target_version`
pub fn check(lines: &[SourceLine], target_version: u32) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    let marker = find_marker(lines);

    let on_first_line = lines
        .first()
        .is_some_and(|l| marker_version(&l.text).is_some());

    if !on_first_line {
        let (message, version) = match marker {
            Some((line, version)) => (
                format!("Version marker must be on line 1, found on line {}", line),
                version,
            ),
            None => ("Missing //@version marker".to_string(), target_version),
        };
        let header = format!("//@version={}", version);
        diagnostics.push(
            Diagnostic::new(
                codes::MISSING_VERSION,
                Severity::Error,
                RuleCategory::Syntax,
                &message,
                1,
                1,
            )
            .with_suggestion(&format!("Start the script with {}", header))
            .with_quick_fix(QuickFix::new(
                "Add version marker",
                &format!("Insert {} as the first line", header),
                &format!("{}\n", header),
                Range::point(1, 1),
            )),
        );
    }

    if let Some((line, version)) = marker {
        if version < target_version {
            let width = lines
                .get(line - 1)
                .map_or(1, |l| l.text.chars().count() + 1);
            diagnostics.push(
                Diagnostic::new(
                    codes::OUTDATED_VERSION,
                    Severity::Warning,
                    RuleCategory::Syntax,
                    &format!(
                        "Script targets version {}, current version is {}",
                        version, target_version
                    ),
                    line,
                    1,
                )
                .with_suggestion(&format!("Upgrade to //@version={}", target_version))
                .with_quick_fix(QuickFix::new(
                    "Upgrade version",
                    &format!("Set the version marker to {}", target_version),
                    &format!("//@version={}", target_version),
                    Range::on_line(line, 1, width),
                )),
            );
        }
    }

    let declared = lines
        .iter()
        .filter(|l| l.is_code())
        .any(|l| DECLARATION.is_match(&l.code()));
    if !declared {
        diagnostics.push(
            Diagnostic::new(
                codes::MISSING_DECLARATION,
                Severity::Error,
                RuleCategory::Syntax,
                "Script has no indicator(), strategy() or library() declaration",
                1,
                1,
            )
            .with_suggestion("Declare the script, e.g. indicator(\"My Script\", overlay=true)"),
        );
    }

    diagnostics
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::split_lines;

    fn codes_of(source: &str, target: u32) -> Vec<String> {
        check(&split_lines(source), target)
            .into_iter()
            .map(|d| d.code)
            .collect()
    }

    #[test]
    fn test_detect_version() {
        assert_eq!(detect_version(&split_lines("//@version=5\nindicator(\"x\")")), Some(5));
        assert_eq!(detect_version(&split_lines("// @version = 4")), Some(4));
        assert_eq!(detect_version(&split_lines("indicator(\"x\")\n//@version=6")), Some(6));
        assert_eq!(detect_version(&split_lines("indicator(\"x\")")), None);
    }

    #[test]
    fn test_clean_header() {
        assert!(codes_of("//@version=5\nindicator(\"x\")", 5).is_empty());
        assert!(codes_of("//@version=6\nstrategy(\"x\")", 5).is_empty());
    }

    #[test]
    fn test_missing_version_reported_once() {
        let codes_found = codes_of("indicator(\"x\")\nplot(close)", 5);
        assert_eq!(codes_found, vec![codes::MISSING_VERSION]);
    }

    #[test]
    fn test_misplaced_marker_keeps_its_number_in_fix() {
        let diags = check(&split_lines("indicator(\"x\")\n//@version=4"), 5);
        let missing = diags.iter().find(|d| d.code == codes::MISSING_VERSION).unwrap();
        assert!(missing.message.contains("line 2"));
        assert_eq!(missing.quick_fix.as_ref().unwrap().replacement_text, "//@version=4\n");
        let outdated = diags.iter().find(|d| d.code == codes::OUTDATED_VERSION).unwrap();
        assert_eq!(outdated.line, 2);
    }

    #[test]
    fn test_outdated_version() {
        let diags = check(&split_lines("//@version=3\nstudy(\"x\")"), 5);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].code, codes::OUTDATED_VERSION);
        assert!(diags[0].is_warning());
        let fix = diags[0].quick_fix.as_ref().unwrap();
        assert_eq!(fix.replacement_text, "//@version=5");
        assert_eq!(fix.range, Range::on_line(1, 1, 13));
    }

    #[test]
    fn test_missing_declaration() {
        assert_eq!(codes_of("//@version=5\nplot(close)", 5), vec![codes::MISSING_DECLARATION]);
        // a commented-out declaration does not count
        assert_eq!(
            codes_of("//@version=5\n// indicator(\"x\")", 5),
            vec![codes::MISSING_DECLARATION]
        );
        assert!(codes_of("//@version=5\nlibrary(\"lib\")", 5).is_empty());
    }

    #[test]
    fn test_empty_source() {
        assert_eq!(
            codes_of("", 5),
            vec![codes::MISSING_VERSION, codes::MISSING_DECLARATION]
        );
    }
}

//! Performance score
//!
//! A bounded 0-100 heuristic: performance warnings and control flow cost
//! points, dense use of built-in library calls earns a small bonus.

use crate::config::ScoringConfig;
use crate::scanner::SourceLine;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

static BUILTIN_CALL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:ta|math|str|request|array|matrix|map)\.\w+\s*\(").expect("Invalid regex")
});

static LOOP: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*(?:for|while)\b").expect("Invalid regex"));

static CONDITIONAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(?:else\s+)?if\b").expect("Invalid regex"));

/// Score components
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreBreakdown {
    /// Performance-category warnings found by the rules
    pub performance_warnings: usize,
    /// `for` and `while` loops
    pub loops: usize,
    /// `if` statements inside another `if` block
    pub nested_conditionals: usize,
    /// Calls into built-in namespaces
    pub builtin_calls: usize,
    /// Lines carrying code
    pub code_lines: usize,
    pub performance_penalty: u32,
    pub control_flow_penalty: u32,
    pub builtin_bonus: u32,
    /// Final score, 0-100
    pub score: u8,
}

impl ScoreBreakdown {
    /// Calculate quality rating
    pub fn rating(&self) -> QualityRating {
        QualityRating::from_score(self.score)
    }
}

/// Quality rating levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QualityRating {
    /// 90 and above
    Excellent,
    /// 75-89
    Good,
    /// 50-74
    Fair,
    /// Below 50, the script is likely slow on the chart
    Poor,
}

impl QualityRating {
    pub fn from_score(score: u8) -> Self {
        match score {
            90..=u8::MAX => QualityRating::Excellent,
            75..=89 => QualityRating::Good,
            50..=74 => QualityRating::Fair,
            _ => QualityRating::Poor,
        }
    }
}

impl std::fmt::Display for QualityRating {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QualityRating::Excellent => write!(f, "excellent"),
            QualityRating::Good => write!(f, "good"),
            QualityRating::Fair => write!(f, "fair"),
            QualityRating::Poor => write!(f, "poor"),
        }
    }
}

/// Computes the performance score of a script
#[derive(Debug, Clone, Default)]
pub struct Scorer {
    weights: ScoringConfig,
}

impl Scorer {
    pub fn new(weights: ScoringConfig) -> Self {
        Self { weights }
    }

    /// Score `lines` given the number of performance warnings already found
    pub fn score(&self, lines: &[SourceLine], performance_warnings: usize) -> ScoreBreakdown {
        let mut breakdown = ScoreBreakdown {
            performance_warnings,
            ..ScoreBreakdown::default()
        };
        // indentation of the enclosing `if` blocks
        let mut open_ifs: Vec<usize> = Vec::new();

        for line in lines.iter().filter(|l| l.is_code()) {
            let code = line.code();
            let indent = line.indent_width();
            breakdown.code_lines += 1;

            while open_ifs.last().is_some_and(|&top| top >= indent) {
                open_ifs.pop();
            }

            if LOOP.is_match(&code) {
                breakdown.loops += 1;
            }
            if CONDITIONAL.is_match(&code) {
                if !open_ifs.is_empty() {
                    breakdown.nested_conditionals += 1;
                }
                open_ifs.push(indent);
            }
            breakdown.builtin_calls += BUILTIN_CALL.find_iter(&code).count();
        }

        let w = &self.weights;
        breakdown.performance_penalty = saturate(performance_warnings)
            .saturating_mul(w.performance_penalty)
            .min(w.performance_cap);
        breakdown.control_flow_penalty = saturate(breakdown.loops)
            .saturating_mul(w.loop_penalty)
            .saturating_add(saturate(breakdown.nested_conditionals).saturating_mul(w.nested_conditional_penalty))
            .min(w.control_flow_cap);
        breakdown.builtin_bonus = if breakdown.code_lines == 0 {
            0
        } else {
            let density = breakdown.builtin_calls as f64 / breakdown.code_lines as f64;
            ((density * w.builtin_bonus_factor as f64).round() as u32).min(w.builtin_bonus_cap)
        };

        let raw = 100_i64 - breakdown.performance_penalty as i64
            - breakdown.control_flow_penalty as i64
            + breakdown.builtin_bonus as i64;
        breakdown.score = raw.clamp(0, 100) as u8;

        breakdown
    }
}

fn saturate(count: usize) -> u32 {
    u32::try_from(count).unwrap_or(u32::MAX)
}

//! Built-in vocabulary of the scripting language
//!
//! Keywords, types, namespaces, built-in variables and functions, and the
//! table of deprecated calls. A [`Vocabulary`] is built once per analyzer and
//! shared read-only between calls.

use std::collections::HashSet;

/// Language keywords
pub const KEYWORDS: &[&str] = &[
    "and", "or", "not", "if", "else", "for", "to", "by", "in", "while", "switch", "var",
    "varip", "true", "false", "na", "import", "export", "method", "type", "enum", "as",
    "break", "continue", "return", "const", "simple", "series", "input",
];

/// Type names
pub const TYPES: &[&str] = &[
    "int", "float", "bool", "string", "color", "line", "label", "box", "table", "linefill",
    "polyline", "array", "matrix", "map", "chart",
];

/// Built-in namespaces accessed with member syntax
pub const NAMESPACES: &[&str] = &[
    "ta", "math", "str", "request", "strategy", "array", "matrix", "map", "color", "input",
    "syminfo", "timeframe", "barstate", "session", "line", "label", "box", "table", "linefill",
    "polyline", "chart", "plot", "shape", "location", "size", "display", "position", "extend",
    "xloc", "yloc", "format", "currency", "alert", "hline", "order", "scale", "dayofweek",
    "barmerge", "adjustment", "earnings", "dividends", "splits", "font", "text", "runtime",
    "log", "ticker", "backadjustment", "settlement_as_close",
];

/// Built-in series and constants (price fields, time fields, bar state)
pub const BUILTIN_VARIABLES: &[&str] = &[
    "open", "high", "low", "close", "volume", "hl2", "hlc3", "ohlc4", "hlcc4", "time",
    "time_close", "time_tradingday", "timenow", "year", "month", "weekofyear", "dayofmonth",
    "hour", "minute", "second", "bar_index", "last_bar_index", "last_bar_time",
];

/// Built-in functions callable without a namespace
pub const BUILTIN_FUNCTIONS: &[&str] = &[
    "indicator", "strategy", "library", "plot", "plotshape", "plotchar", "plotarrow",
    "plotbar", "plotcandle", "bgcolor", "barcolor", "fill", "hline", "alert", "alertcondition",
    "nz", "na", "fixnan", "max_bars_back", "timestamp", "int", "float", "bool", "string",
    "label", "line", "box", "table",
];

/// Deprecated calls and their replacement (`None` when there is no direct one)
pub const DEPRECATED_CALLS: &[(&str, Option<&str>)] = &[
    ("study", Some("indicator")),
    ("security", Some("request.security")),
    ("sma", Some("ta.sma")),
    ("ema", Some("ta.ema")),
    ("wma", Some("ta.wma")),
    ("rma", Some("ta.rma")),
    ("vwma", Some("ta.vwma")),
    ("rsi", Some("ta.rsi")),
    ("macd", Some("ta.macd")),
    ("stoch", Some("ta.stoch")),
    ("atr", Some("ta.atr")),
    ("crossover", Some("ta.crossover")),
    ("crossunder", Some("ta.crossunder")),
    ("cross", Some("ta.cross")),
    ("highest", Some("ta.highest")),
    ("lowest", Some("ta.lowest")),
    ("change", Some("ta.change")),
    ("stdev", Some("ta.stdev")),
    ("tostring", Some("str.tostring")),
    ("tonumber", Some("str.tonumber")),
    ("abs", Some("math.abs")),
    ("max", Some("math.max")),
    ("min", Some("math.min")),
    ("round", Some("math.round")),
    ("iff", None),
];

/// Lines starting with one of these never fall through to the next line
pub const EXIT_KEYWORDS: &[&str] = &["return", "break", "continue", "runtime.error"];

/// Immutable name sets used by the analysis passes
#[derive(Debug, Clone)]
pub struct Vocabulary {
    keywords: HashSet<String>,
    types: HashSet<String>,
    namespaces: HashSet<String>,
    variables: HashSet<String>,
    functions: HashSet<String>,
}

impl Default for Vocabulary {
    fn default() -> Self {
        Self::builtin()
    }
}

impl Vocabulary {
    /// The built-in vocabulary
    pub fn builtin() -> Self {
        fn set(words: &[&str]) -> HashSet<String> {
            words.iter().map(|w| w.to_string()).collect()
        }

        let mut functions = set(BUILTIN_FUNCTIONS);
        // deprecated names are reported by their own rule, never as undeclared
        functions.extend(DEPRECATED_CALLS.iter().map(|(name, _)| name.to_string()));

        Self {
            keywords: set(KEYWORDS),
            types: set(TYPES),
            namespaces: set(NAMESPACES),
            variables: set(BUILTIN_VARIABLES),
            functions,
        }
    }

    /// Extend with caller-supplied built-ins
    pub fn with_extra(mut self, functions: &[String], variables: &[String]) -> Self {
        self.functions.extend(functions.iter().cloned());
        self.variables.extend(variables.iter().cloned());
        self
    }

    pub fn is_keyword(&self, name: &str) -> bool {
        self.keywords.contains(name)
    }

    pub fn is_type(&self, name: &str) -> bool {
        self.types.contains(name)
    }

    pub fn is_namespace(&self, name: &str) -> bool {
        self.namespaces.contains(name)
    }

    pub fn is_builtin_variable(&self, name: &str) -> bool {
        self.variables.contains(name)
    }

    pub fn is_function(&self, name: &str) -> bool {
        self.functions.contains(name)
    }

    /// Built-in variables seeded into every symbol table
    pub fn variables(&self) -> impl Iterator<Item = &str> {
        self.variables.iter().map(|s| s.as_str())
    }

    /// Any name the language itself provides
    pub fn is_known(&self, name: &str) -> bool {
        self.is_keyword(name)
            || self.is_type(name)
            || self.is_namespace(name)
            || self.is_builtin_variable(name)
            || self.is_function(name)
    }
}

/// Replacement for a deprecated call name
pub fn deprecated_replacement(name: &str) -> Option<Option<&'static str>> {
    DEPRECATED_CALLS
        .iter()
        .find(|(old, _)| *old == name)
        .map(|(_, new)| *new)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_categories() {
        let vocab = Vocabulary::builtin();
        assert!(vocab.is_keyword("varip"));
        assert!(vocab.is_type("float"));
        assert!(vocab.is_namespace("ta"));
        assert!(vocab.is_builtin_variable("close"));
        assert!(vocab.is_function("plot"));
        assert!(!vocab.is_known("myValue"));
    }

    #[test]
    fn test_deprecated_names_are_known_functions() {
        let vocab = Vocabulary::builtin();
        assert!(vocab.is_function("study"));
        assert!(vocab.is_function("iff"));
    }

    #[test]
    fn test_with_extra() {
        let vocab = Vocabulary::builtin()
            .with_extra(&["myHelper".to_string()], &["session_open".to_string()]);
        assert!(vocab.is_function("myHelper"));
        assert!(vocab.is_builtin_variable("session_open"));
    }

    #[test]
    fn test_deprecated_replacement() {
        assert_eq!(deprecated_replacement("study"), Some(Some("indicator")));
        assert_eq!(deprecated_replacement("iff"), Some(None));
        assert_eq!(deprecated_replacement("ta"), None);
    }
}

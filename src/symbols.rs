//! Symbol table and declaration extraction
//!
//! The table is built in one pass over the whole file and is a plain value:
//! every analysis builds its own and passes it to the reference check.

use crate::scanner::SourceLine;
use crate::vocabulary::Vocabulary;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

/// `x = ...`, `var float x = ...`, `for i = 0 to 10`
static ASSIGNMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^\s*(?P<prefix>(?:[A-Za-z_][\w.]*(?:<[^>]*>)?\s+)*)(?P<name>[A-Za-z_]\w*)\s*=(?:[^=>]|$)",
    )
    .expect("Invalid regex")
});

/// `[a, b, c] = ...`
static TUPLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(?:var\s+)?\[(?P<names>[^\]]*)\]\s*=(?:[^=>]|$)").expect("Invalid regex")
});

/// `f(a, b) =>`, `export method f(this, x) =>`
static FUNCTION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^\s*(?:export\s+)?(?:method\s+)?(?P<name>[A-Za-z_]\w*)\s*\((?P<params>.*)\)\s*=>",
    )
    .expect("Invalid regex")
});

/// `for x in xs`, `for [i, x] in xs`
static FOR_IN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*for\s+(?:\[(?P<pair>[^\]]*)\]|(?P<item>[A-Za-z_]\w*))\s+in\b").expect("Invalid regex")
});

/// `type Point`, `export enum Side`
static TYPE_DECL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(?:export\s+)?(?:type|enum)\s+(?P<name>[A-Za-z_]\w*)").expect("Invalid regex")
});

/// `import user/lib/1 as lib`
static IMPORT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*import\s+\S+\s+as\s+(?P<name>[A-Za-z_]\w*)").expect("Invalid regex"));

static IDENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"[A-Za-z_]\w*").expect("Invalid regex"));

/// Leading words that turn `x = y` into a comparison rather than a declaration
const CONDITION_WORDS: &[&str] = &["if", "else", "while", "switch", "and", "or", "not", "return"];

/// How a name was declared
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclarationKind {
    Assignment,
    Tuple,
    Function,
    Parameter,
    LoopVariable,
    Type,
    ImportAlias,
}

/// A declaration site on one line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    pub name: String,
    /// Byte offset of the name within the line
    pub offset: usize,
    pub kind: DeclarationKind,
}

impl Declaration {
    fn new(name: &str, offset: usize, kind: DeclarationKind) -> Self {
        Self {
            name: name.to_string(),
            offset,
            kind,
        }
    }
}

/// Extract the declarations made on one masked code line
pub fn declarations_in(code: &str) -> Vec<Declaration> {
    let mut found = Vec::new();

    if let Some(caps) = FUNCTION.captures(code) {
        if let Some(name) = caps.name("name") {
            found.push(Declaration::new(name.as_str(), name.start(), DeclarationKind::Function));
        }
        if let Some(params) = caps.name("params") {
            for (offset, param) in split_top_level(params.as_str()) {
                if let Some((name, at)) = parameter_name(param) {
                    found.push(Declaration::new(
                        name,
                        params.start() + offset + at,
                        DeclarationKind::Parameter,
                    ));
                }
            }
        }
        return found;
    }

    if let Some(caps) = TUPLE.captures(code) {
        if let Some(names) = caps.name("names") {
            for m in IDENT.find_iter(names.as_str()) {
                found.push(Declaration::new(
                    m.as_str(),
                    names.start() + m.start(),
                    DeclarationKind::Tuple,
                ));
            }
        }
        return found;
    }

    if let Some(caps) = FOR_IN.captures(code) {
        let group = caps.name("pair").or_else(|| caps.name("item"));
        if let Some(group) = group {
            for m in IDENT.find_iter(group.as_str()) {
                found.push(Declaration::new(
                    m.as_str(),
                    group.start() + m.start(),
                    DeclarationKind::LoopVariable,
                ));
            }
        }
        return found;
    }

    if let Some(caps) = TYPE_DECL.captures(code) {
        if let Some(name) = caps.name("name") {
            found.push(Declaration::new(name.as_str(), name.start(), DeclarationKind::Type));
        }
        return found;
    }

    if let Some(caps) = IMPORT.captures(code) {
        if let Some(name) = caps.name("name") {
            found.push(Declaration::new(
                name.as_str(),
                name.start(),
                DeclarationKind::ImportAlias,
            ));
        }
        return found;
    }

    if let Some(caps) = ASSIGNMENT.captures(code) {
        let prefix = caps.name("prefix").map(|p| p.as_str()).unwrap_or("");
        let first_word = prefix.split_whitespace().next().unwrap_or("");
        if CONDITION_WORDS.contains(&first_word) {
            return found;
        }
        let kind = if first_word == "for" {
            DeclarationKind::LoopVariable
        } else {
            DeclarationKind::Assignment
        };
        if let Some(name) = caps.name("name") {
            found.push(Declaration::new(name.as_str(), name.start(), kind));
        }
    }

    found
}

/// Split a parameter list on commas outside nested delimiters
fn split_top_level(list: &str) -> Vec<(usize, &str)> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;

    for (idx, c) in list.char_indices() {
        match c {
            '(' | '[' | '<' => depth += 1,
            ')' | ']' | '>' => depth -= 1,
            ',' if depth <= 0 => {
                parts.push((start, &list[start..idx]));
                start = idx + 1;
            }
            _ => {}
        }
    }
    parts.push((start, &list[start..]));
    parts
}

/// Name of a parameter like `simple float src = close`
fn parameter_name(param: &str) -> Option<(&str, usize)> {
    let head = param.split('=').next().unwrap_or("");
    IDENT
        .find_iter(head)
        .last()
        .map(|m| (m.as_str(), m.start()))
}

/// Declared identifiers of one analysis
#[derive(Debug, Clone)]
pub struct SymbolTable<'v> {
    vocabulary: &'v Vocabulary,
    /// User declarations, name -> first declaration line
    declared: HashMap<String, usize>,
}

impl<'v> SymbolTable<'v> {
    /// Empty table seeded with the vocabulary's built-in variables
    pub fn new(vocabulary: &'v Vocabulary) -> Self {
        Self {
            vocabulary,
            declared: HashMap::new(),
        }
    }

    /// Build the table from every line of a file
    pub fn build(lines: &[SourceLine], vocabulary: &'v Vocabulary) -> Self {
        let mut table = Self::new(vocabulary);
        for line in lines.iter().filter(|l| l.is_code()) {
            for decl in declarations_in(&line.code()) {
                table.declare(&decl.name, line.number);
            }
        }
        log::debug!("symbol table built: {} user declarations", table.len());
        table
    }

    /// Record a declaration; returns false when the name was already declared
    pub fn declare(&mut self, name: &str, line: usize) -> bool {
        if self.declared.contains_key(name) {
            return false;
        }
        self.declared.insert(name.to_string(), line);
        true
    }

    /// Name is a built-in variable or a user declaration
    pub fn contains(&self, name: &str) -> bool {
        self.vocabulary.is_builtin_variable(name) || self.declared.contains_key(name)
    }

    /// Line of the first user declaration of `name`
    pub fn declared_at(&self, name: &str) -> Option<usize> {
        self.declared.get(name).copied()
    }

    /// Number of user declarations
    pub fn len(&self) -> usize {
        self.declared.len()
    }

    pub fn is_empty(&self) -> bool {
        self.declared.is_empty()
    }

    /// The vocabulary the table was seeded from
    pub fn vocabulary(&self) -> &'v Vocabulary {
        self.vocabulary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::split_lines;

    fn names(code: &str) -> Vec<(String, DeclarationKind)> {
        declarations_in(code)
            .into_iter()
            .map(|d| (d.name, d.kind))
            .collect()
    }

    #[test]
    fn test_assignment_forms() {
        use DeclarationKind::*;
        assert_eq!(names("x = 1"), vec![("x".to_string(), Assignment)]);
        assert_eq!(names("var float level = na"), vec![("level".to_string(), Assignment)]);
        assert_eq!(names("varip int count = 0"), vec![("count".to_string(), Assignment)]);
        assert_eq!(names("array<float> buf = array.new<float>()"), vec![("buf".to_string(), Assignment)]);
        assert_eq!(names("for i = 0 to 10"), vec![("i".to_string(), LoopVariable)]);
    }

    #[test]
    fn test_not_declarations() {
        assert!(names("x := x + 1").is_empty());
        assert!(names("x == 1").is_empty());
        assert!(names("if x = 1").is_empty());
        assert!(names("plot(x)").is_empty());
        assert!(names("x >= 1").is_empty());
    }

    #[test]
    fn test_tuple_and_for_in() {
        use DeclarationKind::*;
        assert_eq!(
            names("[m, s, h] = ta.macd(close, 12, 26, 9)"),
            vec![("m".to_string(), Tuple), ("s".to_string(), Tuple), ("h".to_string(), Tuple)]
        );
        assert_eq!(
            names("for [i, v] in values"),
            vec![("i".to_string(), LoopVariable), ("v".to_string(), LoopVariable)]
        );
        assert_eq!(names("for v in values"), vec![("v".to_string(), LoopVariable)]);
    }

    #[test]
    fn test_function_and_parameters() {
        use DeclarationKind::*;
        assert_eq!(
            names("f(simple float src = close, len = math.max(1, 2)) =>"),
            vec![("f".to_string(), Function), ("src".to_string(), Parameter), ("len".to_string(), Parameter)]
        );
        let decls = declarations_in("export method grow(this, n) => this * n");
        assert_eq!(decls[0].name, "grow");
        assert_eq!(decls[2].name, "n");
        assert_eq!(&"export method grow(this, n) => this * n"[decls[2].offset..decls[2].offset + 1], "n");
    }

    #[test]
    fn test_type_and_import() {
        assert_eq!(names("type Pivot"), vec![("Pivot".to_string(), DeclarationKind::Type)]);
        assert_eq!(
            names("import user/helpers/3 as h"),
            vec![("h".to_string(), DeclarationKind::ImportAlias)]
        );
    }

    #[test]
    fn test_build_is_whole_file_and_idempotent() {
        let vocab = Vocabulary::builtin();
        let lines = split_lines("plot(x)\nx = 1\nx = 2\n// y = 3\nlabel = \"z = 1\"");
        let table = SymbolTable::build(&lines, &vocab);

        assert!(table.contains("x"));
        assert_eq!(table.declared_at("x"), Some(2));
        assert!(!table.contains("y"));
        assert!(!table.contains("z"));
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_builtins_always_present() {
        let vocab = Vocabulary::builtin();
        let mut table = SymbolTable::new(&vocab);
        assert!(table.contains("close"));
        assert!(table.declare("close", 1));
        assert!(!table.declare("close", 2));
        assert!(table.contains("close"));
        assert_eq!(table.declared_at("close"), Some(1));
    }
}

//! Reference checking against a whole-file symbol table
//!
//! Declarations anywhere in the file make a name visible on every line, so a
//! name used above its declaration is accepted.

use crate::scanner::{SourceLine, Token, TokenKind};
use crate::symbols::{declarations_in, Declaration, SymbolTable};

/// Decides whether identifier occurrences refer to something declared
pub struct ReferenceChecker<'t, 'v> {
    symbols: &'t SymbolTable<'v>,
}

impl<'t, 'v> ReferenceChecker<'t, 'v> {
    pub fn new(symbols: &'t SymbolTable<'v>) -> Self {
        Self { symbols }
    }

    /// Check one identifier token of `text`
    ///
    /// `same_line` holds the declarations made on the token's own line.
    pub fn is_valid(&self, text: &str, token: &Token<'_>, same_line: &[Declaration]) -> bool {
        let name = token.text;

        if self.symbols.vocabulary().is_known(name) {
            return true;
        }
        if is_member_access(text, token) {
            return true;
        }
        if same_line.iter().any(|d| d.name == name) || is_assignment_target(text, token) {
            return true;
        }
        self.symbols.contains(name)
    }

    /// Identifier tokens of `line` that are used before declaration
    pub fn undeclared<'l>(&self, line: &'l SourceLine) -> Vec<Token<'l>> {
        if !line.is_code() {
            return Vec::new();
        }
        let same_line = declarations_in(&line.code());
        line.tokens()
            .into_iter()
            .filter(|t| t.kind == TokenKind::Identifier)
            .filter(|t| !self.is_valid(&line.text, t, &same_line))
            .collect()
    }
}

/// `obj.name` or `name.field`
fn is_member_access(text: &str, token: &Token<'_>) -> bool {
    text[..token.offset].ends_with('.') || text[token.end()..].starts_with('.')
}

/// `name = ...` including named arguments, but not `==` or `=>`
fn is_assignment_target(text: &str, token: &Token<'_>) -> bool {
    let rest = text[token.end()..].trim_start();
    rest.starts_with('=') && !rest.starts_with("==") && !rest.starts_with("=>")
}

//! Lexical scanner
//!
//! Splits script text into [`SourceLine`]s and produces lightweight per-line
//! token streams. The scanner never fails: any text yields lines and tokens,
//! and rejoining the lines with [`join_lines`] reproduces the input exactly.

/// Line-comment marker
pub const COMMENT_MARKER: &str = "//";

/// A physical source line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLine {
    /// Line number (1-based)
    pub number: usize,
    /// Raw text without the line break
    pub text: String,
    /// Line break that ended this line: `\r\n`, `\n`, or empty on the last line
    pub ending: &'static str,
}

impl SourceLine {
    pub fn new(number: usize, text: &str) -> Self {
        Self {
            number,
            text: text.to_string(),
            ending: "",
        }
    }

    /// Set the line break that ended this line
    pub fn with_ending(mut self, ending: &'static str) -> Self {
        self.ending = ending;
        self
    }

    /// Line contains only whitespace
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }

    /// First non-blank characters are the comment marker
    pub fn is_comment(&self) -> bool {
        self.text.trim_start().starts_with(COMMENT_MARKER)
    }

    /// Line carries code worth matching against
    pub fn is_code(&self) -> bool {
        !self.is_blank() && !self.is_comment()
    }

    /// Width of the leading indentation, tabs counted as four columns
    pub fn indent_width(&self) -> usize {
        self.text
            .chars()
            .take_while(|c| c.is_whitespace())
            .map(|c| if c == '\t' { 4 } else { 1 })
            .sum()
    }

    /// The line with string contents and comments blanked out
    pub fn code(&self) -> String {
        mask_code(&self.text)
    }

    /// Token stream of this line
    pub fn tokens(&self) -> Vec<Token<'_>> {
        tokenize(&self.text)
    }
}

/// First line break used by the source, `\n` when there is none
pub fn line_break(source: &str) -> &'static str {
    match source.find('\n') {
        Some(idx) if source[..idx].ends_with('\r') => "\r\n",
        _ => "\n",
    }
}

/// Split source text into numbered lines
///
/// Every `\n` ends a line, and a `\r` right before it belongs to the break,
/// so files mixing `\r\n` and `\n` still number their lines correctly.
pub fn split_lines(source: &str) -> Vec<SourceLine> {
    let mut lines = Vec::new();
    let mut rest = source;

    while let Some(idx) = rest.find('\n') {
        let (text, ending) = match rest[..idx].strip_suffix('\r') {
            Some(text) => (text, "\r\n"),
            None => (&rest[..idx], "\n"),
        };
        lines.push(SourceLine::new(lines.len() + 1, text).with_ending(ending));
        rest = &rest[idx + 1..];
    }
    lines.push(SourceLine::new(lines.len() + 1, rest));

    lines
}

/// Rejoin lines produced by [`split_lines`], each with its own line break
pub fn join_lines(lines: &[SourceLine]) -> String {
    lines
        .iter()
        .flat_map(|l| [l.text.as_str(), l.ending])
        .collect()
}

/// Bracketing delimiter kinds tracked by the structural checker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Delimiter {
    /// `(` and `)`
    Paren,
    /// `[` and `]`
    Bracket,
}

impl Delimiter {
    pub fn open_char(self) -> char {
        match self {
            Delimiter::Paren => '(',
            Delimiter::Bracket => '[',
        }
    }

    pub fn close_char(self) -> char {
        match self {
            Delimiter::Paren => ')',
            Delimiter::Bracket => ']',
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Delimiter::Paren => "parenthesis",
            Delimiter::Bracket => "bracket",
        }
    }
}

/// Kind of a scanned token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Open(Delimiter),
    Close(Delimiter),
    /// Opening quote of a string literal
    StringStart(char),
    /// Closing quote of a string literal
    StringEnd(char),
    Identifier,
    /// Start of a line comment; nothing after it is tokenized
    CommentStart,
}

/// A scanned unit within one line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    /// Column (1-based, in characters)
    pub column: usize,
    /// Byte offset within the line
    pub offset: usize,
    /// Source text of the token
    pub text: &'a str,
}

impl Token<'_> {
    /// Byte offset just past the token
    pub fn end(&self) -> usize {
        self.offset + self.text.len()
    }
}

/// Tokenize a single line
pub fn tokenize(text: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut chars = text.char_indices().peekable();
    let mut column = 0;
    let mut in_string: Option<char> = None;

    while let Some((offset, c)) = chars.next() {
        column += 1;
        let start_column = column;

        if let Some(quote) = in_string {
            if c == '\\' {
                if chars.next().is_some() {
                    column += 1;
                }
            } else if c == quote {
                tokens.push(Token {
                    kind: TokenKind::StringEnd(quote),
                    column,
                    offset,
                    text: &text[offset..offset + 1],
                });
                in_string = None;
            }
            continue;
        }

        let mut end = offset + c.len_utf8();
        let kind = match c {
            '"' | '\'' => {
                in_string = Some(c);
                TokenKind::StringStart(c)
            }
            '/' if text[offset..].starts_with(COMMENT_MARKER) => {
                tokens.push(Token {
                    kind: TokenKind::CommentStart,
                    column,
                    offset,
                    text: &text[offset..],
                });
                break;
            }
            '(' => TokenKind::Open(Delimiter::Paren),
            ')' => TokenKind::Close(Delimiter::Paren),
            '[' => TokenKind::Open(Delimiter::Bracket),
            ']' => TokenKind::Close(Delimiter::Bracket),
            // colour literals (#FF0000) and numbers never produce identifiers
            '#' => {
                while let Some(&(_, next)) = chars.peek() {
                    if !next.is_ascii_alphanumeric() {
                        break;
                    }
                    chars.next();
                    column += 1;
                }
                continue;
            }
            c if c.is_ascii_digit() => {
                while let Some(&(_, next)) = chars.peek() {
                    if !(next.is_ascii_alphanumeric() || next == '.' || next == '_') {
                        break;
                    }
                    chars.next();
                    column += 1;
                }
                continue;
            }
            c if c == '_' || c.is_alphabetic() => {
                while let Some(&(idx, next)) = chars.peek() {
                    if !(next == '_' || next.is_alphanumeric()) {
                        break;
                    }
                    end = idx + next.len_utf8();
                    chars.next();
                    column += 1;
                }
                TokenKind::Identifier
            }
            _ => continue,
        };

        tokens.push(Token {
            kind,
            column: start_column,
            offset,
            text: &text[offset..end],
        });
    }

    tokens
}

/// Blank out string contents and comments, keeping quotes and byte offsets
pub fn mask_code(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_string: Option<char> = None;
    let mut escaped = false;

    for (offset, c) in text.char_indices() {
        if let Some(quote) = in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == quote {
                in_string = None;
                out.push(c);
                continue;
            }
            blank(&mut out, c);
            continue;
        }

        match c {
            '"' | '\'' => {
                in_string = Some(c);
                out.push(c);
            }
            '/' if text[offset..].starts_with(COMMENT_MARKER) => {
                out.extend(std::iter::repeat(' ').take(text.len() - offset));
                break;
            }
            _ => out.push(c),
        }
    }

    out
}

fn blank(out: &mut String, c: char) {
    out.extend(std::iter::repeat(' ').take(c.len_utf8()));
}

/// 1-based character column of a byte offset within `text`
pub fn column_at(text: &str, offset: usize) -> usize {
    let mut offset = offset.min(text.len());
    while !text.is_char_boundary(offset) {
        offset -= 1;
    }
    text[..offset].chars().count() + 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn kinds(text: &str) -> Vec<TokenKind> {
        tokenize(text).into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_split_is_lossless() {
        for source in ["", "a", "a\nb", "a\nb\n", "a\r\nb\r\n", "\n\n", "x = 1\r\n// c", "a\r\nb\nc\r", "\r\n\n"] {
            assert_eq!(join_lines(&split_lines(source)), source);
        }
    }

    #[test]
    fn test_split_mixed_line_endings() {
        let source = "//@version=5\r\nindicator(\"x\")\nx = 1\r\ny = close)";
        let lines = split_lines(source);
        let texts: Vec<&str> = lines.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, vec!["//@version=5", "indicator(\"x\")", "x = 1", "y = close)"]);
        assert_eq!(lines[3].number, 4);
        assert_eq!(lines[1].ending, "\n");
        assert_eq!(join_lines(&lines), source);
    }

    #[test]
    fn test_line_break_uses_first_break() {
        assert_eq!(line_break("a\r\nb\nc"), "\r\n");
        assert_eq!(line_break("a\nb\r\nc"), "\n");
        assert_eq!(line_break("a"), "\n");
    }

    #[test]
    fn test_split_numbers_lines() {
        let lines = split_lines("a\nb\n");
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1], SourceLine::new(2, "b").with_ending("\n"));
        assert!(lines[2].is_blank());
    }

    #[test]
    fn test_comment_and_blank_lines() {
        assert!(SourceLine::new(1, "   // note").is_comment());
        assert!(!SourceLine::new(1, "x = 1 // note").is_comment());
        assert!(SourceLine::new(1, " \t ").is_blank());
        assert!(SourceLine::new(1, "x").is_code());
    }

    #[test]
    fn test_indent_width_counts_tabs() {
        assert_eq!(SourceLine::new(1, "\tx").indent_width(), 4);
        assert_eq!(SourceLine::new(1, "  x").indent_width(), 2);
    }

    #[test]
    fn test_tokenize_delimiters_and_identifiers() {
        let tokens = tokenize("x = ta.sma(close, 14)[1]");
        let idents: Vec<(&str, usize)> = tokens
            .iter()
            .filter(|t| t.kind == TokenKind::Identifier)
            .map(|t| (t.text, t.column))
            .collect();
        assert_eq!(idents, vec![("x", 1), ("ta", 5), ("sma", 8), ("close", 12)]);
        assert_eq!(
            kinds("f(a[0])"),
            vec![
                TokenKind::Identifier,
                TokenKind::Open(Delimiter::Paren),
                TokenKind::Identifier,
                TokenKind::Open(Delimiter::Bracket),
                TokenKind::Close(Delimiter::Bracket),
                TokenKind::Close(Delimiter::Paren),
            ]
        );
    }

    #[test]
    fn test_tokenize_strings_hide_contents() {
        let tokens = tokenize(r#"label.new(x, "a (b", 'c')"#);
        assert!(!tokens.iter().any(|t| t.text == "b"));
        let quotes: Vec<TokenKind> = tokens
            .iter()
            .filter(|t| matches!(t.kind, TokenKind::StringStart(_) | TokenKind::StringEnd(_)))
            .map(|t| t.kind)
            .collect();
        assert_eq!(
            quotes,
            vec![
                TokenKind::StringStart('"'),
                TokenKind::StringEnd('"'),
                TokenKind::StringStart('\''),
                TokenKind::StringEnd('\''),
            ]
        );
    }

    #[test]
    fn test_tokenize_escaped_quote_does_not_terminate() {
        let tokens = tokenize(r#"s = "say \"hi\"" + t"#);
        let ends = tokens
            .iter()
            .filter(|t| matches!(t.kind, TokenKind::StringEnd(_)))
            .count();
        assert_eq!(ends, 1);
        assert_eq!(tokens.last().map(|t| t.text), Some("t"));
    }

    #[test]
    fn test_tokenize_comment_stops_scanning() {
        let tokens = tokenize("x = 1 // (unbalanced");
        assert_eq!(tokens.last().map(|t| t.kind), Some(TokenKind::CommentStart));
        assert_eq!(tokens.last().map(|t| t.column), Some(7));
        assert!(!tokens.iter().any(|t| t.text == "unbalanced"));
    }

    #[test]
    fn test_tokenize_skips_literals() {
        let idents: Vec<&str> = tokenize("c = #FF00AA, n = 1e5 + 2.5")
            .into_iter()
            .filter(|t| t.kind == TokenKind::Identifier)
            .map(|t| t.text)
            .collect();
        assert_eq!(idents, vec!["c", "n"]);
    }

    #[test]
    fn test_mask_code_preserves_offsets() {
        let text = r#"plot(x, "é (", color=c) // note"#;
        let masked = mask_code(text);
        assert_eq!(masked.len(), text.len());
        assert!(masked.starts_with(r#"plot(x, "    ", color=c)"#));
        assert!(masked.trim_end().ends_with("color=c)"));
    }

    #[test]
    fn test_column_at_counts_chars() {
        assert_eq!(column_at("é = x", 3), 3);
        assert_eq!(column_at("abc", 0), 1);
        assert_eq!(column_at("é", 1), 1);
        assert_eq!(column_at("abc", 99), 4);
    }
}

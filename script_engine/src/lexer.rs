//! Tokenizer
//!
//! Turns source text into a flat token list. Newlines inside brackets are
//! dropped so expressions can span lines; everywhere else a newline ends
//! a statement.

use crate::error::{CompileError, CompileErrorKind};

/// Reserved words
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    True,
    False,
    None,
    And,
    Or,
    Not,
    In,
    Del,
    Raise,
    Pass,
    /// Reserved but not supported by this language
    Reserved(&'static str),
}

impl Keyword {
    /// Words that can start a statement or appear in an expression
    pub const SUPPORTED: [&'static str; 10] = [
        "True", "False", "None", "and", "or", "not", "in", "del", "raise", "pass",
    ];

    const RESERVED: [&'static str; 20] = [
        "as", "assert", "async", "await", "break", "class", "continue", "def", "elif", "else",
        "except", "finally", "for", "from", "global", "if", "import", "is", "lambda", "while",
    ];

    fn lookup(word: &str) -> Option<Keyword> {
        let keyword = match word {
            "True" => Keyword::True,
            "False" => Keyword::False,
            "None" => Keyword::None,
            "and" => Keyword::And,
            "or" => Keyword::Or,
            "not" => Keyword::Not,
            "in" => Keyword::In,
            "del" => Keyword::Del,
            "raise" => Keyword::Raise,
            "pass" => Keyword::Pass,
            other => {
                let reserved = Self::RESERVED.iter().copied().find(|r| *r == other)?;
                Keyword::Reserved(reserved)
            }
        };
        Some(keyword)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Name(String),
    Int(i64),
    Float(f64),
    Str(String),
    Keyword(Keyword),
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    Dot,
    Semicolon,
    Newline,
    Assign,
    PlusAssign,
    MinusAssign,
    StarAssign,
    SlashAssign,
    Plus,
    Minus,
    Star,
    DoubleStar,
    Slash,
    DoubleSlash,
    Percent,
    Eq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
    Eof,
}

impl TokenKind {
    /// Short description used in error messages
    pub fn describe(&self) -> String {
        match self {
            TokenKind::Name(name) => format!("name '{}'", name),
            TokenKind::Int(_) | TokenKind::Float(_) => "number".to_string(),
            TokenKind::Str(_) => "string".to_string(),
            TokenKind::Newline => "end of line".to_string(),
            TokenKind::Eof => "end of input".to_string(),
            other => format!("{:?}", other),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub line: usize,
    pub column: usize,
}

/// Deepest bracket nesting the tokenizer accepts.
pub const MAX_BRACKET_DEPTH: usize = 100;

struct Lexer {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    line_start: usize,
    depth: usize,
    tokens: Vec<Token>,
}

/// Tokenizes a whole program
pub fn tokenize(source: &str) -> Result<Vec<Token>, CompileError> {
    if let Some(offset) = source.find('\0') {
        let line = source[..offset].matches('\n').count() + 1;
        return Err(CompileError::new(
            CompileErrorKind::Type,
            "source code string cannot contain null bytes",
            line,
            1,
        ));
    }

    let mut lexer = Lexer {
        chars: source.chars().collect(),
        pos: 0,
        line: 1,
        line_start: 0,
        depth: 0,
        tokens: Vec::new(),
    };
    lexer.run()?;
    Ok(lexer.tokens)
}

impl Lexer {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn column(&self) -> usize {
        self.pos - self.line_start + 1
    }

    fn error(&self, kind: CompileErrorKind, message: impl Into<String>, column: usize) -> CompileError {
        CompileError::new(kind, message, self.line, column)
    }

    fn push(&mut self, kind: TokenKind, column: usize) {
        self.tokens.push(Token {
            kind,
            line: self.line,
            column,
        });
    }

    fn newline(&mut self) {
        self.pos += 1;
        self.line += 1;
        self.line_start = self.pos;
    }

    fn at_line_start(&self) -> bool {
        matches!(
            self.tokens.last().map(|t| &t.kind),
            None | Some(TokenKind::Newline)
        )
    }

    fn run(&mut self) -> Result<(), CompileError> {
        while let Some(c) = self.peek() {
            let column = self.column();
            match c {
                '\n' => {
                    if self.depth == 0 && !self.at_line_start() {
                        self.push(TokenKind::Newline, column);
                    }
                    self.newline();
                }
                ' ' | '\t' | '\r' | '\x0c' => {
                    if self.depth == 0 && self.pos == self.line_start && self.at_line_start() {
                        self.check_indent()?;
                    } else {
                        self.pos += 1;
                    }
                }
                '#' => {
                    while self.peek().is_some_and(|c| c != '\n') {
                        self.pos += 1;
                    }
                }
                '\\' => {
                    if self.peek_at(1) == Some('\n') {
                        self.pos += 1;
                        self.newline();
                    } else {
                        return Err(self.error(
                            CompileErrorKind::Syntax,
                            "unexpected character after line continuation character",
                            column,
                        ));
                    }
                }
                '0'..='9' => self.number()?,
                '.' if self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) => self.number()?,
                '\'' | '"' => self.string(false)?,
                c if c.is_alphabetic() || c == '_' => self.word()?,
                _ => self.operator()?,
            }
        }

        if self.depth > 0 {
            return Err(self.error(
                CompileErrorKind::Syntax,
                "unexpected EOF while parsing",
                self.column(),
            ));
        }
        if !self.at_line_start() {
            let column = self.column();
            self.push(TokenKind::Newline, column);
        }
        let column = self.column();
        self.push(TokenKind::Eof, column);
        Ok(())
    }

    /// Leading whitespace is only allowed on blank or comment lines.
    fn check_indent(&mut self) -> Result<(), CompileError> {
        while self
            .peek()
            .is_some_and(|c| matches!(c, ' ' | '\t' | '\r' | '\x0c'))
        {
            self.pos += 1;
        }
        match self.peek() {
            None | Some('\n') | Some('#') => Ok(()),
            Some(_) => Err(self.error(CompileErrorKind::Syntax, "unexpected indent", self.column())),
        }
    }

    fn word(&mut self) -> Result<(), CompileError> {
        let column = self.column();
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_alphanumeric() || c == '_') {
            self.pos += 1;
        }
        let word: String = self.chars[start..self.pos].iter().collect();

        if matches!(word.as_str(), "r" | "R") && matches!(self.peek(), Some('\'' | '"')) {
            return self.string(true);
        }

        let kind = match Keyword::lookup(&word) {
            Some(keyword) => TokenKind::Keyword(keyword),
            None => TokenKind::Name(word),
        };
        self.push(kind, column);
        Ok(())
    }

    fn number(&mut self) -> Result<(), CompileError> {
        let column = self.column();

        if self.peek() == Some('0') {
            let radix = match self.peek_at(1) {
                Some('x' | 'X') => Some(16),
                Some('o' | 'O') => Some(8),
                Some('b' | 'B') => Some(2),
                _ => None,
            };
            if let Some(radix) = radix {
                self.pos += 2;
                let digits = self.take_digits(|c| c.is_digit(radix));
                if digits.is_empty() {
                    return Err(self.error(CompileErrorKind::Syntax, "invalid syntax", column));
                }
                let value = i64::from_str_radix(&digits, radix).map_err(|_| {
                    self.error(CompileErrorKind::Overflow, "integer literal too large", column)
                })?;
                self.push(TokenKind::Int(value), column);
                return Ok(());
            }
        }

        let mut text = self.take_digits(|c| c.is_ascii_digit());
        let mut is_float = false;

        if self.peek() == Some('.') {
            is_float = true;
            self.pos += 1;
            text.push('.');
            text.push_str(&self.take_digits(|c| c.is_ascii_digit()));
        }

        if matches!(self.peek(), Some('e' | 'E')) {
            let sign = matches!(self.peek_at(1), Some('+' | '-'));
            let digit_at = if sign { 2 } else { 1 };
            if self.peek_at(digit_at).is_some_and(|c| c.is_ascii_digit()) {
                is_float = true;
                text.push('e');
                self.pos += 1;
                if sign {
                    text.push(self.chars[self.pos]);
                    self.pos += 1;
                }
                text.push_str(&self.take_digits(|c| c.is_ascii_digit()));
            }
        }

        if self.peek().is_some_and(|c| c.is_alphabetic() || c == '_') {
            return Err(self.error(CompileErrorKind::Syntax, "invalid decimal literal", column));
        }

        let kind = if is_float {
            let value: f64 = text
                .parse()
                .map_err(|_| self.error(CompileErrorKind::Syntax, "invalid float literal", column))?;
            TokenKind::Float(value)
        } else {
            let value: i64 = text.parse().map_err(|_| {
                self.error(CompileErrorKind::Overflow, "integer literal too large", column)
            })?;
            TokenKind::Int(value)
        };
        self.push(kind, column);
        Ok(())
    }

    /// Consumes digits, skipping `_` separators
    fn take_digits(&mut self, is_digit: impl Fn(char) -> bool) -> String {
        let mut digits = String::new();
        while let Some(c) = self.peek() {
            if is_digit(c) {
                digits.push(c);
            } else if c != '_' || !self.peek_at(1).is_some_and(&is_digit) {
                break;
            }
            self.pos += 1;
        }
        digits
    }

    fn string(&mut self, raw: bool) -> Result<(), CompileError> {
        let column = if raw { self.column() - 1 } else { self.column() };
        let start_line = self.line;
        let Some(quote) = self.peek() else {
            return Err(self.error(CompileErrorKind::Syntax, "invalid syntax", column));
        };
        let triple = self.peek_at(1) == Some(quote) && self.peek_at(2) == Some(quote);
        self.pos += if triple { 3 } else { 1 };

        let mut value = String::new();
        loop {
            let Some(c) = self.peek() else {
                let message = if triple {
                    "EOF while scanning triple-quoted string literal"
                } else {
                    "EOL while scanning string literal"
                };
                return Err(CompileError::syntax(message, start_line, column));
            };

            if c == quote {
                if !triple {
                    self.pos += 1;
                    break;
                }
                if self.peek_at(1) == Some(quote) && self.peek_at(2) == Some(quote) {
                    self.pos += 3;
                    break;
                }
                value.push(c);
                self.pos += 1;
                continue;
            }

            match c {
                '\n' if !triple => {
                    return Err(CompileError::syntax(
                        "EOL while scanning string literal",
                        start_line,
                        column,
                    ));
                }
                '\n' => {
                    value.push('\n');
                    self.newline();
                }
                '\\' if raw => {
                    value.push('\\');
                    self.pos += 1;
                    if let Some(next) = self.peek() {
                        if next == '\n' {
                            value.push('\n');
                            self.newline();
                        } else {
                            value.push(next);
                            self.pos += 1;
                        }
                    }
                }
                '\\' => self.escape(&mut value)?,
                _ => {
                    value.push(c);
                    self.pos += 1;
                }
            }
        }

        self.tokens.push(Token {
            kind: TokenKind::Str(value),
            line: start_line,
            column,
        });
        Ok(())
    }

    fn escape(&mut self, out: &mut String) -> Result<(), CompileError> {
        let column = self.column();
        self.pos += 1;
        let Some(c) = self.peek() else {
            return Err(self.error(CompileErrorKind::Syntax, "EOL while scanning string literal", column));
        };
        self.pos += 1;

        let decoded = match c {
            '\n' => {
                self.line += 1;
                self.line_start = self.pos;
                return Ok(());
            }
            '\\' => '\\',
            '\'' => '\'',
            '"' => '"',
            'n' => '\n',
            't' => '\t',
            'r' => '\r',
            '0' => '\0',
            'a' => '\x07',
            'b' => '\x08',
            'f' => '\x0c',
            'v' => '\x0b',
            'x' => self.hex_escape(2, "invalid \\x escape", column)?,
            'u' => self.hex_escape(4, "truncated \\uXXXX escape", column)?,
            'U' => self.hex_escape(8, "truncated \\UXXXXXXXX escape", column)?,
            other => {
                out.push('\\');
                other
            }
        };
        out.push(decoded);
        Ok(())
    }

    fn hex_escape(&mut self, width: usize, message: &str, column: usize) -> Result<char, CompileError> {
        let end = self.pos + width;
        let digits: String = self
            .chars
            .get(self.pos..end)
            .map(|chars| chars.iter().collect())
            .unwrap_or_default();
        if digits.chars().count() != width || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(self.error(CompileErrorKind::Value, message, column));
        }
        self.pos = end;
        u32::from_str_radix(&digits, 16)
            .ok()
            .and_then(char::from_u32)
            .ok_or_else(|| self.error(CompileErrorKind::Value, "illegal Unicode character", column))
    }

    fn operator(&mut self) -> Result<(), CompileError> {
        let column = self.column();
        let c = self.chars[self.pos];
        let next = self.peek_at(1);

        let (kind, width) = match (c, next) {
            ('*', Some('*')) => (TokenKind::DoubleStar, 2),
            ('/', Some('/')) => (TokenKind::DoubleSlash, 2),
            ('=', Some('=')) => (TokenKind::Eq, 2),
            ('!', Some('=')) => (TokenKind::NotEq, 2),
            ('<', Some('=')) => (TokenKind::Le, 2),
            ('>', Some('=')) => (TokenKind::Ge, 2),
            ('+', Some('=')) => (TokenKind::PlusAssign, 2),
            ('-', Some('=')) => (TokenKind::MinusAssign, 2),
            ('*', Some('=')) => (TokenKind::StarAssign, 2),
            ('/', Some('=')) => (TokenKind::SlashAssign, 2),
            ('(', _) => (TokenKind::LParen, 1),
            (')', _) => (TokenKind::RParen, 1),
            ('[', _) => (TokenKind::LBracket, 1),
            (']', _) => (TokenKind::RBracket, 1),
            (',', _) => (TokenKind::Comma, 1),
            ('.', _) => (TokenKind::Dot, 1),
            (';', _) => (TokenKind::Semicolon, 1),
            ('=', _) => (TokenKind::Assign, 1),
            ('+', _) => (TokenKind::Plus, 1),
            ('-', _) => (TokenKind::Minus, 1),
            ('*', _) => (TokenKind::Star, 1),
            ('/', _) => (TokenKind::Slash, 1),
            ('%', _) => (TokenKind::Percent, 1),
            ('<', _) => (TokenKind::Lt, 1),
            ('>', _) => (TokenKind::Gt, 1),
            ('!', _) => {
                return Err(self.error(CompileErrorKind::Syntax, "invalid syntax", column));
            }
            (other, _) => {
                return Err(self.error(
                    CompileErrorKind::Syntax,
                    format!("invalid character '{}' (U+{:04X})", other, other as u32),
                    column,
                ));
            }
        };

        match kind {
            TokenKind::LParen | TokenKind::LBracket => {
                self.depth += 1;
                if self.depth > MAX_BRACKET_DEPTH {
                    return Err(self.error(
                        CompileErrorKind::Memory,
                        "too many nested parentheses",
                        column,
                    ));
                }
            }
            TokenKind::RParen | TokenKind::RBracket => {
                if self.depth == 0 {
                    let closer = if kind == TokenKind::RParen { ')' } else { ']' };
                    return Err(self.error(
                        CompileErrorKind::Syntax,
                        format!("unmatched '{}'", closer),
                        column,
                    ));
                }
                self.depth -= 1;
            }
            _ => {}
        }

        self.pos += width;
        self.push(kind, column);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_simple_assignment() {
        assert_eq!(
            kinds("x = 1"),
            vec![
                TokenKind::Name("x".to_string()),
                TokenKind::Assign,
                TokenKind::Int(1),
                TokenKind::Newline,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_numbers() {
        assert_eq!(kinds("1.5")[0], TokenKind::Float(1.5));
        assert_eq!(kinds(".5")[0], TokenKind::Float(0.5));
        assert_eq!(kinds("1e3")[0], TokenKind::Float(1000.0));
        assert_eq!(kinds("0xff")[0], TokenKind::Int(255));
        assert_eq!(kinds("1_000")[0], TokenKind::Int(1000));
    }

    #[test]
    fn test_integer_literal_overflow() {
        let err = tokenize("99999999999999999999").unwrap_err();
        assert_eq!(err.kind, CompileErrorKind::Overflow);
    }

    #[test]
    fn test_nul_byte_is_type_error() {
        let err = tokenize("x = 1\0").unwrap_err();
        assert_eq!(err.kind, CompileErrorKind::Type);
    }

    #[test]
    fn test_string_escapes() {
        assert_eq!(kinds(r#"'a\nb'"#)[0], TokenKind::Str("a\nb".to_string()));
        assert_eq!(kinds(r#""\x41""#)[0], TokenKind::Str("A".to_string()));
        assert_eq!(kinds(r#"r'\n'"#)[0], TokenKind::Str("\\n".to_string()));
        assert_eq!(kinds(r#"'\q'"#)[0], TokenKind::Str("\\q".to_string()));
    }

    #[test]
    fn test_bad_hex_escape_is_value_error() {
        let err = tokenize(r#"'\x4'"#).unwrap_err();
        assert_eq!(err.kind, CompileErrorKind::Value);
    }

    #[test]
    fn test_unterminated_string() {
        let err = tokenize("'abc").unwrap_err();
        assert_eq!(err.kind, CompileErrorKind::Syntax);
        assert_eq!(err.message, "EOL while scanning string literal");
    }

    #[test]
    fn test_triple_quoted_string_spans_lines() {
        let tokens = tokenize("s = '''a\nb'''\nt = 1").unwrap();
        assert_eq!(tokens[2].kind, TokenKind::Str("a\nb".to_string()));
        let t = tokens
            .iter()
            .find(|t| t.kind == TokenKind::Name("t".to_string()))
            .unwrap();
        assert_eq!(t.line, 3);
    }

    #[test]
    fn test_newlines_inside_brackets_are_ignored() {
        let k = kinds("f(1,\n2)");
        assert_eq!(k.iter().filter(|k| **k == TokenKind::Newline).count(), 1);
    }

    #[test]
    fn test_blank_lines_and_comments() {
        let k = kinds("\n\n# comment\nx  # trailing\n\n");
        assert_eq!(
            k,
            vec![TokenKind::Name("x".to_string()), TokenKind::Newline, TokenKind::Eof]
        );
    }

    #[test]
    fn test_unexpected_indent() {
        let err = tokenize("x = 1\n  y = 2").unwrap_err();
        assert_eq!(err.message, "unexpected indent");
        assert_eq!(err.line, 2);
    }

    #[test]
    fn test_deep_nesting_is_memory_error() {
        let source = format!("{}1{}", "(".repeat(MAX_BRACKET_DEPTH + 1), ")".repeat(MAX_BRACKET_DEPTH + 1));
        let err = tokenize(&source).unwrap_err();
        assert_eq!(err.kind, CompileErrorKind::Memory);
    }

    #[test]
    fn test_unmatched_bracket() {
        let err = tokenize("1)").unwrap_err();
        assert_eq!(err.message, "unmatched ')'");
    }

    #[test]
    fn test_keywords() {
        assert_eq!(kinds("not")[0], TokenKind::Keyword(Keyword::Not));
        assert_eq!(kinds("def")[0], TokenKind::Keyword(Keyword::Reserved("def")));
    }
}

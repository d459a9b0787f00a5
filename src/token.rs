use log::debug;
use serde::Serialize;
use std::fmt;
use std::mem;

/// The token classes produced by the scanner.
///
/// Operators and reserved words are not split into one variant per spelling:
/// the parser matches on the lexeme, so a single `OPERATOR` / `RESERVED`
/// variant covers every fixed spelling. `FLOAT` and `STRING` carry their
/// decoded literal values and `ERROR` carries a human‑readable message.
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Serialize)]
pub enum TokenType {
    /// A numeric literal
    #[serde(rename = "FLOAT")]
    FLOAT(f64),

    /// A string literal (contents without quotes, escapes decoded)
    STRING(String),

    /// A user‑defined identifier
    IDENTIFIER,

    /// One of the reserved words (`if`, `while`, `fun`, …)
    RESERVED,

    /// Operator or punctuation (`+`, `:=`, `(`, …)
    OPERATOR,

    /// End‑of‑file marker
    EOF,

    /// Malformed input; carries the diagnostic message
    ERROR(String),
}

impl PartialEq for TokenType {
    /// Two TokenTypes are equal if they share the same variant
    /// (ignoring any inner data). Uses `mem::discriminant` to compare.
    fn eq(&self, other: &Self) -> bool {
        mem::discriminant(self) == mem::discriminant(other)
    }
}

/// 1‑based line and 0‑based column of a token or AST node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Position {
    pub line: usize,
    pub col: usize,
}

impl Position {
    pub const fn new(line: usize, col: usize) -> Self {
        Self { line, col }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}

/// A scanned token, including its type, the original lexeme,
/// and where it was found.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Token<'a> {
    /// The category of this token.
    pub token_type: TokenType,

    /// The exact substring from the source that produced this token.
    pub lexeme: &'a str,

    /// 1‑based line number in the source.
    pub line: usize,

    /// 0‑based column (in characters) of the first character.
    pub col: usize,
}

impl<'a> Token<'a> {
    pub fn new(token_type: TokenType, lexeme: &'a str, line: usize, col: usize) -> Self {
        debug!(
            "Creating new token: type={:?}, lexeme={}, line={}, col={}",
            token_type, lexeme, line, col
        );

        Self {
            token_type,
            lexeme,
            line,
            col,
        }
    }

    #[inline]
    pub fn position(&self) -> Position {
        Position::new(self.line, self.col)
    }

    /// Is this the operator spelled `op`?
    #[inline]
    pub fn is_operator(&self, op: &str) -> bool {
        matches!(self.token_type, TokenType::OPERATOR) && self.lexeme == op
    }

    /// Is this the reserved word `word`?
    #[inline]
    pub fn is_reserved(&self, word: &str) -> bool {
        matches!(self.token_type, TokenType::RESERVED) && self.lexeme == word
    }
}

impl<'a> fmt::Display for Token<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let variant: &'static str = match self.token_type {
            TokenType::FLOAT(_) => "FLOAT",
            TokenType::STRING(_) => "STRING",
            TokenType::IDENTIFIER => "IDENTIFIER",
            TokenType::RESERVED => "RESERVED",
            TokenType::OPERATOR => "OPERATOR",
            TokenType::EOF => "EOF",
            TokenType::ERROR(_) => "ERROR",
        };

        match &self.token_type {
            TokenType::FLOAT(n) => {
                // 3 → "3.0", 3.14 → "3.14"
                if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
                    let mut buf = itoa::Buffer::new();
                    write!(f, "{} {} {}.0", variant, self.lexeme, buf.format(*n as i64))
                } else {
                    write!(f, "{} {} {}", variant, self.lexeme, n)
                }
            }
            TokenType::STRING(s) => write!(f, "{} {} {}", variant, self.lexeme, s),
            TokenType::ERROR(message) => {
                write!(f, "{} {}:{}: {}", variant, self.line, self.col, message)
            }
            _ => write!(f, "{} {} null", variant, self.lexeme),
        }
    }
}

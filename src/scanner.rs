//! Module `scanner` implements a one‑pass, streaming lexer for the calculator language.
//!
//! It turns a borrowed source string into a sequence of `Token<'a>`s on demand, skipping
//! whitespace and comments, and emitting exactly one `EOF` token at the end. The parser pulls
//! tokens one at a time through [`Scanner::next_token`]; the `Iterator` implementation is a
//! `FusedIterator` over the same stream for tooling such as the `tokenize` subcommand.
//!
//! # Token recognition order
//!
//! 1. Comments: `//` to end of line, `/* … */` (non‑nesting).
//! 2. Operators and punctuation, longest match first (`->`, `:=`, `<-`, `==`, `<=`, `>=`,
//!    `!=`, `&&`, `||`, then single characters).
//! 3. Identifiers `[A-Za-z_$][A-Za-z0-9_$]*`, resolved against a perfect‑hash
//!    `RESERVED_WORDS` set.
//! 4. Numeric literals `[0-9]*\.?[0-9]+([eE][-+]?[0-9]+)?`.
//! 5. Double‑quoted string literals with backslash escapes.
//!
//! Malformed input never aborts the scan: it produces an `ERROR` token carrying a message and
//! the position of the offending character. [`Scanner::show_location`] renders the source line
//! with a caret under a column for diagnostics.
//!
//! # Example
//!
//! ```rust
//! use scicalc::scanner::Scanner;
//!
//! let mut scanner = Scanner::new("x := 1 + 2 // comment");
//! for token in &mut scanner {
//!     println!("{}", token);
//! }
//! ```

use crate::token::{Token, TokenType};
use log::{debug, info};
use memchr::{memchr, memmem};
use phf::phf_set;
use std::iter::FusedIterator;

// ─────────────────────────────────────────────────────────────────────────────
// Static tables
// ─────────────────────────────────────────────────────────────────────────────

static RESERVED_WORDS: phf::Set<&'static str> = phf_set! {
    "null", "true", "false", "if", "then", "elif", "else",
    "end", "do", "while", "fun", "div", "block",
};

/// Multi‑character operators, checked before the single‑character ones.
const LONG_OPERATORS: [&[u8; 2]; 9] = [
    b"->", b":=", b"<-", b"==", b"<=", b">=", b"!=", b"&&", b"||",
];

const SHORT_OPERATORS: &[u8] = b"-+*/^%()[],;<>!";

#[inline(always)]
fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_' || b == b'$'
}

#[inline(always)]
fn is_ident_continue(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'$'
}

/// A single pass scanner over a borrowed source string. Every emitted token's
/// `lexeme` is a slice of that string.
pub struct Scanner<'a> {
    src: &'a str,
    bytes: &'a [u8],
    start: usize,      // byte index of the first byte of the current lexeme
    curr: usize,       // byte index one past the last byte examined
    line: usize,       // 1‑based line counter
    col: usize,        // 0‑based column (characters) of `curr`
    start_line: usize, // position of `start`
    start_col: usize,
    finished: bool, // EOF already handed out by the iterator
}

impl<'a> Scanner<'a> {
    #[inline]
    pub fn new(src: &'a str) -> Self {
        info!("Scanner created over {} bytes", src.len());

        Self {
            src,
            bytes: src.as_bytes(),
            start: 0,
            curr: 0,
            line: 1,
            col: 0,
            start_line: 1,
            start_col: 0,
            finished: false,
        }
    }

    // ───────────────────────────── primitive helpers ────────────────────────

    #[inline(always)]
    fn is_at_end(&self) -> bool {
        self.curr >= self.bytes.len()
    }

    /// Advance one byte, keeping line/column up to date. Continuation bytes of
    /// a multi‑byte character do not move the column.
    #[inline(always)]
    fn advance(&mut self) -> u8 {
        let b = self.bytes[self.curr];
        self.curr += 1;

        if b == b'\n' {
            self.line += 1;
            self.col = 0;
        } else if b & 0xC0 != 0x80 {
            self.col += 1;
        }

        b
    }

    /// Advance over one whole character.
    fn advance_char(&mut self) -> Option<char> {
        let c = self.src[self.curr..].chars().next()?;

        for _ in 0..c.len_utf8() {
            self.advance();
        }

        Some(c)
    }

    /// Peek `offset` bytes past the cursor. Returns `0` past EOF.
    #[inline(always)]
    fn peek_at(&self, offset: usize) -> u8 {
        self.bytes.get(self.curr + offset).copied().unwrap_or(0)
    }

    #[inline(always)]
    fn peek(&self) -> u8 {
        self.peek_at(0)
    }

    #[inline(always)]
    fn starts_with(&self, s: &[u8]) -> bool {
        self.bytes[self.curr..].starts_with(s)
    }

    fn skip_whitespace(&mut self) {
        while !self.is_at_end() && self.peek().is_ascii_whitespace() {
            self.advance();
        }
    }

    fn mark_start(&mut self) {
        self.start = self.curr;
        self.start_line = self.line;
        self.start_col = self.col;
    }

    fn make_token(&self, token_type: TokenType) -> Token<'a> {
        Token::new(
            token_type,
            &self.src[self.start..self.curr],
            self.start_line,
            self.start_col,
        )
    }

    fn error_token(&self, message: impl Into<String>) -> Token<'a> {
        let message = message.into();

        debug!(
            "Scan error at {}:{}: {}",
            self.start_line, self.start_col, message
        );

        self.make_token(TokenType::ERROR(message))
    }

    // ───────────────────────────── core lexing ─────────────────────────────

    /// Produce the next token. After the end of input every call returns `EOF`.
    pub fn next_token(&mut self) -> Token<'a> {
        loop {
            self.skip_whitespace();
            self.mark_start();

            if self.is_at_end() {
                return self.make_token(TokenType::EOF);
            }

            // ── comments ───────────────────────────────────────────────
            if self.starts_with(b"//") {
                match memchr(b'\n', &self.bytes[self.curr..]) {
                    Some(pos) => self.skip_bytes(pos),
                    None => self.skip_bytes(self.bytes.len() - self.curr),
                }
                continue;
            }

            if self.starts_with(b"/*") {
                match memmem::find(&self.bytes[self.curr + 2..], b"*/") {
                    Some(pos) => {
                        self.skip_bytes(pos + 4);
                        continue;
                    }
                    None => {
                        self.skip_bytes(self.bytes.len() - self.curr);
                        return self.error_token("Unterminated block comment");
                    }
                }
            }

            // ── operators / punctuation ────────────────────────────────
            if LONG_OPERATORS.iter().any(|op| self.starts_with(&op[..])) {
                self.advance();
                self.advance();
                return self.make_token(TokenType::OPERATOR);
            }

            let b = self.peek();

            if SHORT_OPERATORS.contains(&b) {
                self.advance();
                return self.make_token(TokenType::OPERATOR);
            }

            if is_ident_start(b) {
                return self.identifier();
            }

            if b.is_ascii_digit() || (b == b'.' && self.peek_at(1).is_ascii_digit()) {
                return self.number();
            }

            if b == b'"' {
                return self.string();
            }

            let c = self.advance_char().unwrap_or('\0');
            return self.error_token(format!("Unexpected character '{}'", c));
        }
    }

    /// Skip `n` bytes known to contain no significant tokens.
    fn skip_bytes(&mut self, n: usize) {
        for _ in 0..n {
            self.advance();
        }
    }

    fn identifier(&mut self) -> Token<'a> {
        while is_ident_continue(self.peek()) {
            self.advance();
        }

        let word = &self.src[self.start..self.curr];

        if RESERVED_WORDS.contains(word) {
            self.make_token(TokenType::RESERVED)
        } else {
            self.make_token(TokenType::IDENTIFIER)
        }
    }

    fn number(&mut self) -> Token<'a> {
        while self.peek().is_ascii_digit() {
            self.advance();
        }

        // Optional fractional part.
        if self.peek() == b'.' && self.peek_at(1).is_ascii_digit() {
            self.advance();

            while self.peek().is_ascii_digit() {
                self.advance();
            }
        }

        // Optional exponent, only when digits actually follow.
        if matches!(self.peek(), b'e' | b'E') {
            let digits_at = if matches!(self.peek_at(1), b'+' | b'-') { 2 } else { 1 };

            if self.peek_at(digits_at).is_ascii_digit() {
                for _ in 0..digits_at {
                    self.advance();
                }

                while self.peek().is_ascii_digit() {
                    self.advance();
                }
            }
        }

        match self.src[self.start..self.curr].parse::<f64>() {
            Ok(n) => self.make_token(TokenType::FLOAT(n)),
            Err(_) => self.error_token("Invalid number"),
        }
    }

    fn string(&mut self) -> Token<'a> {
        self.advance(); // opening quote

        let mut value = String::new();

        loop {
            let Some(c) = self.advance_char() else {
                return self.error_token("Unterminated string");
            };

            match c {
                '"' => break,
                '\\' => {
                    let Some(escaped) = self.advance_char() else {
                        return self.error_token("Unterminated string");
                    };

                    value.push(match escaped {
                        'n' => '\n',
                        't' => '\t',
                        'r' => '\r',
                        '0' => '\0',
                        other => other,
                    });
                }
                other => value.push(other),
            }
        }

        self.make_token(TokenType::STRING(value))
    }

    // ───────────────────────────── diagnostics ─────────────────────────────

    /// Reproduce source line `line` (1‑based) with a caret under column `col`.
    /// Leading tabs are copied so the caret lines up in a terminal.
    pub fn show_location(&self, line: usize, col: usize) -> String {
        show_location(self.src, line, col)
    }
}

/// Free‑standing form of [`Scanner::show_location`].
pub fn show_location(src: &str, line: usize, col: usize) -> String {
    let Some(text) = src.lines().nth(line.saturating_sub(1)) else {
        return "at end of input".to_string();
    };

    let mut caret: String = text
        .chars()
        .chain(std::iter::repeat(' '))
        .take(col)
        .map(|c| if c == '\t' { '\t' } else { ' ' })
        .collect();
    caret.push('^');

    format!("{}\n{}", text.trim_end_matches('\r'), caret)
}

// ───────────────────────── Iterator implementation ─────────────────────────

impl<'a> Iterator for Scanner<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        let token = self.next_token();

        if matches!(token.token_type, TokenType::EOF) {
            self.finished = true;
        }

        Some(token)
    }
}

impl<'a> FusedIterator for Scanner<'a> {}

//! Centralised error hierarchy for the **calculator interpreter**.
//!
//! The scanner reports malformed input as `ERROR` tokens; the parser turns
//! those (and its own grammar violations) into [`SciError::Scan`] /
//! [`SciError::Parse`], each carrying a one‑line excerpt of the offending
//! source with a caret marker. Evaluation failures are [`RuntimeError`]s,
//! classified by [`RuntimeErrorKind`] and stamped with the position of the
//! expression that raised them when one is known.
//!
//! The module **does not** print diagnostics itself.

use std::fmt;
use std::io;
use thiserror::Error;

use log::info;

use crate::token::Position;

/// Canonical error type surfaced to embedders.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SciError {
    /// Lexical error: malformed token or unterminated comment/string.
    #[error("{line}:{col}: {message}\n{excerpt}")]
    Scan {
        message: String,
        line: usize,
        col: usize,
        /// Offending source line followed by a caret line.
        excerpt: String,
    },

    /// Grammar violation, unexpected token or trailing input.
    #[error("{line}:{col}: {message}\n{excerpt}")]
    Parse {
        message: String,
        line: usize,
        col: usize,
        excerpt: String,
    },

    /// Failure while evaluating a parsed program.
    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    /// Wrapper around `std::io::Error` (transparent). Enables `?` on I/O ops.
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl SciError {
    /// Helper constructor for the **scanner**.
    pub fn scan<S: Into<String>>(line: usize, col: usize, msg: S, excerpt: String) -> Self {
        let message: String = msg.into();

        info!("Creating Scan error: {}:{}, msg={}", line, col, message);

        SciError::Scan {
            message,
            line,
            col,
            excerpt,
        }
    }

    /// Helper constructor for the **parser**.
    pub fn parse<S: Into<String>>(line: usize, col: usize, msg: S, excerpt: String) -> Self {
        let message: String = msg.into();

        info!("Creating Parse error: {}:{}, msg={}", line, col, message);

        SciError::Parse {
            message,
            line,
            col,
            excerpt,
        }
    }

    /// The runtime classification, if this is a runtime error.
    pub fn runtime_kind(&self) -> Option<RuntimeErrorKind> {
        match self {
            SciError::Runtime(e) => Some(e.kind),
            _ => None,
        }
    }
}

/// Classification of evaluation failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeErrorKind {
    /// Operation unsupported by the value's variant.
    Type,
    /// Wrong number of arguments to a closure, primitive or label.
    Arity,
    /// Lookup or update of an unbound name.
    UndefinedVariable,
    /// Non‑integral or out‑of‑range index.
    Index,
    /// A label invoked after its block returned.
    InvalidNonLocalExit,
    /// `/`, `div` or `%` with a zero divisor.
    DivisionByZero,
    /// `print` / `print_line` could not write its output.
    Output,
}

impl fmt::Display for RuntimeErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RuntimeErrorKind::Type => "type error",
            RuntimeErrorKind::Arity => "arity error",
            RuntimeErrorKind::UndefinedVariable => "undefined variable",
            RuntimeErrorKind::Index => "index error",
            RuntimeErrorKind::InvalidNonLocalExit => "invalid non-local exit",
            RuntimeErrorKind::DivisionByZero => "division by zero",
            RuntimeErrorKind::Output => "output error",
        };

        f.write_str(name)
    }
}

/// An evaluation failure. Terminal for the current top‑level `evaluate`.
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeError {
    pub kind: RuntimeErrorKind,
    pub message: String,
    pub pos: Option<Position>,
}

impl RuntimeError {
    pub fn new<S: Into<String>>(kind: RuntimeErrorKind, msg: S) -> Self {
        Self {
            kind,
            message: msg.into(),
            pos: None,
        }
    }

    pub fn type_error<S: Into<String>>(msg: S) -> Self {
        Self::new(RuntimeErrorKind::Type, msg)
    }

    pub fn arity(expected: impl fmt::Display, given: usize) -> Self {
        Self::new(
            RuntimeErrorKind::Arity,
            format!("Expecting {} arguments. Given {}", expected, given),
        )
    }

    pub fn undefined(name: &str) -> Self {
        Self::new(
            RuntimeErrorKind::UndefinedVariable,
            format!("No such variable {}", name),
        )
    }

    pub fn index<S: Into<String>>(msg: S) -> Self {
        Self::new(RuntimeErrorKind::Index, msg)
    }

    /// Attach `pos` unless a more precise position is already recorded.
    pub fn at(mut self, pos: Position) -> Self {
        self.pos.get_or_insert(pos);
        self
    }
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.pos {
            Some(pos) => write!(f, "{}: {}: {}", pos, self.kind, self.message),
            None => write!(f, "{}: {}", self.kind, self.message),
        }
    }
}

impl std::error::Error for RuntimeError {}

/// Crate‑wide `Result` alias.
pub type Result<T> = std::result::Result<T, SciError>;

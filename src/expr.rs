use std::rc::Rc;

use serde::Serialize;

use crate::primitive::Primitive;
use crate::token::Position;
use crate::value::Value;

/// A literal constant appearing directly in the source.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum LiteralValue {
    Number(f64),

    /// String literal without surrounding quotes, escapes decoded.
    Str(Rc<str>),

    True,

    False,

    Null,
}

impl LiteralValue {
    pub fn to_value(&self) -> Value {
        match self {
            LiteralValue::Number(n) => Value::Number(*n),
            LiteralValue::Str(s) => Value::Str(Rc::clone(s)),
            LiteralValue::True => Value::Bool(true),
            LiteralValue::False => Value::Bool(false),
            LiteralValue::Null => Value::Null,
        }
    }
}

/// Parameters and body of a function literal; shared with the closures it
/// evaluates to.
#[derive(Debug, PartialEq, Serialize)]
pub struct FunctionDecl {
    pub params: Vec<String>,
    pub body: Expr,
}

/// **Abstract‑Syntax‑Tree node.** Everything is an expression: statements
/// are sequences, loops and stores that evaluate to `null`.
///
/// Operators do not get nodes of their own. The parser rewrites them into
/// `Apply` of a [`Primitive`], including indexing (`a[i]` is `get(a, i)`,
/// `a[i] <- v` is `set(a, i, v)`).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Expr {
    /// Number, string, `true`, `false` or `null`.
    Literal(LiteralValue),

    /// A built‑in operation in function position.
    Primitive(Primitive),

    /// `[a, b, c]`
    Array(Vec<Expr>),

    Variable {
        name: String,
        pos: Position,
    },

    /// `name := value` defines in the innermost scope.
    Store {
        name: String,
        value: Box<Expr>,
    },

    /// `name <- value` mutates the nearest existing binding.
    Update {
        name: String,
        value: Box<Expr>,
        pos: Position,
    },

    /// `first; second`
    Sequence(Box<Expr>, Box<Expr>),

    /// Short‑circuiting `&&`.
    And(Box<Expr>, Box<Expr>),

    /// Short‑circuiting `||`.
    Or(Box<Expr>, Box<Expr>),

    If {
        condition: Box<Expr>,
        consequent: Box<Expr>,
        alternate: Box<Expr>,
    },

    While {
        condition: Box<Expr>,
        body: Box<Expr>,
    },

    /// `fun (params) body end`
    Function(Rc<FunctionDecl>),

    /// `callee(arguments…)`
    Apply {
        callee: Box<Expr>,
        arguments: Vec<Expr>,
        /// Position of the operator or opening bracket, for diagnostics.
        pos: Position,
    },

    /// `block label do body end`
    Block {
        label: Option<String>,
        body: Box<Expr>,
    },
}

impl Expr {
    pub fn null() -> Self {
        Expr::Literal(LiteralValue::Null)
    }

    pub fn apply(callee: Expr, arguments: Vec<Expr>, pos: Position) -> Self {
        Expr::Apply {
            callee: Box::new(callee),
            arguments,
            pos,
        }
    }

    /// Application of a primitive, as produced by operator desugaring.
    pub fn primitive(op: Primitive, arguments: Vec<Expr>, pos: Position) -> Self {
        Expr::apply(Expr::Primitive(op), arguments, pos)
    }
}

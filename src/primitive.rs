//! Built‑in operations exposed as applicable values.
//!
//! The parser desugars arithmetic, comparison, unary operators and indexing
//! into applications of these primitives; the rest are bound by name in the
//! global environment. Each entry declares its arity and rejects any other
//! argument count with an arity error before touching its arguments.

use std::fmt;
use std::io::{self, Write};

use log::debug;
use serde::Serialize;

use crate::error::{RuntimeError, RuntimeErrorKind};
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Primitive {
    // arithmetic
    Add,
    Sub,
    Mul,
    Div,
    IntDiv,
    Mod,
    Pow,
    Neg,
    Plus,
    Not,
    // comparisons
    Lt,
    Lte,
    Gt,
    Gte,
    Eq,
    Neq,
    // output
    Print,
    PrintLine,
    // arrays and strings
    MakeArray,
    Get,
    Set,
    Push,
    Pop,
    Extend,
    Len,
}

/// Accepted argument counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exact(usize),
    Between(usize, usize),
    Variadic,
}

impl Arity {
    pub fn accepts(self, n: usize) -> bool {
        match self {
            Arity::Exact(k) => n == k,
            Arity::Between(lo, hi) => (lo..=hi).contains(&n),
            Arity::Variadic => true,
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arity::Exact(k) => write!(f, "{}", k),
            Arity::Between(lo, hi) => write!(f, "{} to {}", lo, hi),
            Arity::Variadic => f.write_str("any number of"),
        }
    }
}

/// Primitives reachable by name from the global scope.
pub const GLOBAL_PRIMITIVES: [Primitive; 7] = [
    Primitive::Print,
    Primitive::PrintLine,
    Primitive::MakeArray,
    Primitive::Push,
    Primitive::Pop,
    Primitive::Extend,
    Primitive::Len,
];

impl Primitive {
    pub fn name(self) -> &'static str {
        match self {
            Primitive::Add => "+",
            Primitive::Sub => "-",
            Primitive::Mul => "*",
            Primitive::Div => "/",
            Primitive::IntDiv => "div",
            Primitive::Mod => "%",
            Primitive::Pow => "^",
            Primitive::Neg => "neg",
            Primitive::Plus => "pos",
            Primitive::Not => "!",
            Primitive::Lt => "<",
            Primitive::Lte => "<=",
            Primitive::Gt => ">",
            Primitive::Gte => ">=",
            Primitive::Eq => "==",
            Primitive::Neq => "!=",
            Primitive::Print => "print",
            Primitive::PrintLine => "print_line",
            Primitive::MakeArray => "make_array",
            Primitive::Get => "get",
            Primitive::Set => "set",
            Primitive::Push => "push",
            Primitive::Pop => "pop",
            Primitive::Extend => "extend",
            Primitive::Len => "len",
        }
    }

    pub fn arity(self) -> Arity {
        match self {
            Primitive::Neg | Primitive::Plus | Primitive::Not | Primitive::Pop | Primitive::Len => {
                Arity::Exact(1)
            }
            Primitive::Set => Arity::Exact(3),
            Primitive::Print | Primitive::PrintLine => Arity::Variadic,
            Primitive::MakeArray => Arity::Between(0, 2),
            Primitive::Add
            | Primitive::Sub
            | Primitive::Mul
            | Primitive::Div
            | Primitive::IntDiv
            | Primitive::Mod
            | Primitive::Pow
            | Primitive::Lt
            | Primitive::Lte
            | Primitive::Gt
            | Primitive::Gte
            | Primitive::Eq
            | Primitive::Neq
            | Primitive::Get
            | Primitive::Push
            | Primitive::Extend => Arity::Exact(2),
        }
    }

    /// Run the primitive. `out` receives `print` / `print_line` output.
    pub fn call(self, args: &[Value], out: &mut dyn Write) -> Result<Value, RuntimeError> {
        let arity = self.arity();

        if !arity.accepts(args.len()) {
            debug!("{} called with {} arguments", self.name(), args.len());
            return Err(RuntimeError::arity(arity, args.len()));
        }

        match self {
            Primitive::Add => binary(args, |a, b| Ok(a + b)),
            Primitive::Sub => binary(args, |a, b| Ok(a - b)),
            Primitive::Mul => binary(args, |a, b| Ok(a * b)),
            Primitive::Div => binary(args, |a, b| nonzero(b).map(|b| a / b)),
            Primitive::IntDiv => binary(args, |a, b| {
                nonzero(b.trunc()).map(|b| (a.trunc() / b).trunc())
            }),
            Primitive::Mod => binary(args, |a, b| nonzero(b).map(|b| a % b)),
            Primitive::Pow => binary(args, |a, b| Ok(a.powf(b))),
            Primitive::Neg => Ok(Value::Number(-args[0].as_float()?)),
            Primitive::Plus => Ok(Value::Number(args[0].as_float()?)),
            Primitive::Not => Ok(Value::Bool(!args[0].as_bool())),

            Primitive::Lt => compare(args, |a, b| a < b),
            Primitive::Lte => compare(args, |a, b| a <= b),
            Primitive::Gt => compare(args, |a, b| a > b),
            Primitive::Gte => compare(args, |a, b| a >= b),
            Primitive::Eq => Ok(Value::Bool(args[0].equals(&args[1])?)),
            Primitive::Neq => Ok(Value::Bool(!args[0].equals(&args[1])?)),

            Primitive::Print => print(args, out, false),
            Primitive::PrintLine => print(args, out, true),

            Primitive::MakeArray => make_array(args),
            Primitive::Get => args[0].get(&args[1]),
            Primitive::Set => {
                args[0].set(&args[1], args[2].clone())?;
                Ok(Value::Null)
            }
            Primitive::Push => match &args[0] {
                Value::Array(items) => {
                    items.borrow_mut().push(args[1].clone());
                    Ok(Value::Null)
                }
                _ => Err(RuntimeError::type_error("First argument must be an array")),
            },
            Primitive::Pop => match &args[0] {
                Value::Array(items) => items
                    .borrow_mut()
                    .pop()
                    .ok_or_else(|| RuntimeError::index("Cannot pop from an empty array")),
                _ => Err(RuntimeError::type_error("First argument must be an array")),
            },
            Primitive::Extend => match (&args[0], &args[1]) {
                (Value::Array(dst), Value::Array(src)) => {
                    // `src` may alias `dst`; copy before borrowing mutably.
                    let items: Vec<Value> = src.borrow().clone();
                    dst.borrow_mut().extend(items);
                    Ok(Value::Null)
                }
                _ => Err(RuntimeError::type_error("Both arguments must be arrays")),
            },
            Primitive::Len => match &args[0] {
                Value::Array(items) => Ok(Value::Number(items.borrow().len() as f64)),
                Value::Str(s) => Ok(Value::Number(s.chars().count() as f64)),
                other => Err(RuntimeError::type_error(format!(
                    "{} has no length",
                    other.type_name()
                ))),
            },
        }
    }
}

impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn binary(
    args: &[Value],
    op: impl FnOnce(f64, f64) -> Result<f64, RuntimeError>,
) -> Result<Value, RuntimeError> {
    let a = args[0].as_float()?;
    let b = args[1].as_float()?;

    op(a, b).map(Value::Number)
}

fn compare(args: &[Value], op: impl FnOnce(f64, f64) -> bool) -> Result<Value, RuntimeError> {
    Ok(Value::Bool(op(args[0].as_float()?, args[1].as_float()?)))
}

fn nonzero(divisor: f64) -> Result<f64, RuntimeError> {
    if divisor == 0.0 {
        Err(RuntimeError::new(
            RuntimeErrorKind::DivisionByZero,
            "Division by zero",
        ))
    } else {
        Ok(divisor)
    }
}

fn print(args: &[Value], out: &mut dyn Write, newline: bool) -> Result<Value, RuntimeError> {
    write_values(out, args, newline)
        .map_err(|e| RuntimeError::new(RuntimeErrorKind::Output, e.to_string()))?;

    Ok(Value::Null)
}

fn write_values(out: &mut dyn Write, args: &[Value], newline: bool) -> io::Result<()> {
    for (i, value) in args.iter().enumerate() {
        if i > 0 {
            out.write_all(b" ")?;
        }
        write!(out, "{}", value)?;
    }

    if newline {
        out.write_all(b"\n")?;
    }

    Ok(())
}

/// Longest array `make_array` will allocate.
pub const MAX_ARRAY_LENGTH: usize = 1 << 28;

/// `make_array()`, `make_array(n)` (filled with null) or `make_array(n, fill)`.
fn make_array(args: &[Value]) -> Result<Value, RuntimeError> {
    let length = match args.first() {
        Some(n) => {
            let n = n.as_float()?;

            if n.fract() != 0.0 || n < 0.0 || !n.is_finite() {
                return Err(RuntimeError::index(
                    "Length must be a non-negative integer",
                ));
            }

            if n > MAX_ARRAY_LENGTH as f64 {
                debug!("make_array length {} over the limit", n);
                return Err(RuntimeError::index(format!(
                    "Length {} exceeds the maximum of {}",
                    Value::Number(n),
                    MAX_ARRAY_LENGTH
                )));
            }

            n as usize
        }
        None => 0,
    };

    let fill = args.get(1).cloned().unwrap_or(Value::Null);

    let mut items: Vec<Value> = Vec::new();
    items.try_reserve_exact(length).map_err(|e| {
        RuntimeError::index(format!("Cannot allocate an array of length {}: {}", length, e))
    })?;
    items.resize(length, fill);

    Ok(Value::array(items))
}

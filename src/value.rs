//! Runtime values.
//!
//! `Value` is a closed sum type; every variant answers the whole capability
//! set (`as_float`, `as_bool`, `get`, `set`, and application in the
//! interpreter), failing with a type error where the operation makes no
//! sense for that variant. Arrays are shared by reference: cloning a
//! `Value::Array` aliases the same storage.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use crate::environment::Environment;
use crate::error::RuntimeError;
use crate::expr::FunctionDecl;
use crate::primitive::Primitive;

/// Shared, mutable array storage.
pub type ArrayRef = Rc<RefCell<Vec<Value>>>;

/// Identity of an array's storage, for cycle tracking.
type ArrayPtr = *const RefCell<Vec<Value>>;

#[derive(Clone)]
pub enum Value {
    Number(f64),
    Bool(bool),
    Null,
    Str(Rc<str>),
    Array(ArrayRef),
    Closure(Rc<Closure>),
    Primitive(Primitive),
    Label(Rc<Label>),
}

/// A function literal paired with the environment it was evaluated in.
pub struct Closure {
    pub decl: Rc<FunctionDecl>,
    pub env: Rc<RefCell<Environment>>,
}

// The captured environment usually contains the closure itself.
impl fmt::Debug for Closure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Closure")
            .field("params", &self.decl.params)
            .finish_non_exhaustive()
    }
}

/// Non‑local exit capability of one `block` activation.
#[derive(Debug)]
pub struct Label {
    pub id: u64,
    pub name: Option<String>,
    active: Cell<bool>,
}

impl Label {
    pub fn new(id: u64, name: Option<String>) -> Self {
        Self {
            id,
            name,
            active: Cell::new(true),
        }
    }

    /// Whether the defining block is still running.
    pub fn is_active(&self) -> bool {
        self.active.get()
    }

    pub fn invalidate(&self) {
        self.active.set(false);
    }
}

impl Value {
    pub fn array(items: Vec<Value>) -> Self {
        Value::Array(Rc::new(RefCell::new(items)))
    }

    pub fn string(s: &str) -> Self {
        Value::Str(Rc::from(s))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Number(_) => "Number",
            Value::Bool(_) => "Boolean",
            Value::Null => "Null",
            Value::Str(_) => "String",
            Value::Array(_) => "Array",
            Value::Closure(_) => "Function",
            Value::Primitive(_) => "Function",
            Value::Label(_) => "Label",
        }
    }

    pub fn as_float(&self) -> Result<f64, RuntimeError> {
        match self {
            Value::Number(n) => Ok(*n),
            Value::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
            Value::Null => Ok(0.0),
            Value::Str(s) => parse_number(s).ok_or_else(|| {
                RuntimeError::type_error(format!("String \"{}\" is not a number", s))
            }),
            Value::Array(_) | Value::Closure(_) | Value::Primitive(_) | Value::Label(_) => Err(
                RuntimeError::type_error(format!("{} is not a number", self.type_name())),
            ),
        }
    }

    pub fn as_bool(&self) -> bool {
        match self {
            Value::Number(n) => *n != 0.0,
            Value::Bool(b) => *b,
            Value::Null => false,
            Value::Str(s) => !s.is_empty(),
            Value::Array(items) => !items.borrow().is_empty(),
            Value::Closure(_) | Value::Primitive(_) | Value::Label(_) => true,
        }
    }

    /// `self[index]`.
    pub fn get(&self, index: &Value) -> Result<Value, RuntimeError> {
        match self {
            Value::Str(s) => {
                let i = to_index(index, "string")?;

                s.chars()
                    .nth(i)
                    .map(|c| Value::Number(f64::from(u32::from(c))))
                    .ok_or_else(|| out_of_range(i, s.chars().count()))
            }
            Value::Array(items) => {
                let i = to_index(index, "array")?;
                let items = items.borrow();

                items
                    .get(i)
                    .cloned()
                    .ok_or_else(|| out_of_range(i, items.len()))
            }
            Value::Number(_)
            | Value::Bool(_)
            | Value::Null
            | Value::Closure(_)
            | Value::Primitive(_)
            | Value::Label(_) => Err(RuntimeError::type_error(format!(
                "{} is not indexable",
                self.type_name()
            ))),
        }
    }

    /// `self[index] <- value`.
    pub fn set(&self, index: &Value, value: Value) -> Result<(), RuntimeError> {
        match self {
            Value::Array(items) => {
                let i = to_index(index, "array")?;
                let mut items = items.borrow_mut();
                let len = items.len();

                match items.get_mut(i) {
                    Some(slot) => {
                        *slot = value;
                        Ok(())
                    }
                    None => Err(out_of_range(i, len)),
                }
            }
            Value::Str(_) => Err(RuntimeError::type_error("Strings are immutable")),
            Value::Number(_)
            | Value::Bool(_)
            | Value::Null
            | Value::Closure(_)
            | Value::Primitive(_)
            | Value::Label(_) => Err(RuntimeError::type_error(format!(
                "{} is not indexable",
                self.type_name()
            ))),
        }
    }

    /// Language‑level `==`: numbers by float equality, strings by text,
    /// same‑variant values structurally, anything else through float coercion.
    /// Self‑containing arrays compare equal when their shapes match.
    pub fn equals(&self, other: &Value) -> Result<bool, RuntimeError> {
        self.equals_in(other, &mut Vec::new())
    }

    fn equals_in(
        &self,
        other: &Value,
        seen: &mut Vec<(ArrayPtr, ArrayPtr)>,
    ) -> Result<bool, RuntimeError> {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => Ok(a == b),
            (Value::Str(a), Value::Str(b)) => Ok(a == b),
            (Value::Bool(a), Value::Bool(b)) => Ok(a == b),
            (Value::Null, Value::Null) => Ok(true),
            (Value::Array(a), Value::Array(b)) => {
                if Rc::ptr_eq(a, b) || !enter_pair(seen, a, b) {
                    return Ok(true);
                }

                let (a, b) = (a.borrow(), b.borrow());

                if a.len() != b.len() {
                    return Ok(false);
                }

                for (x, y) in a.iter().zip(b.iter()) {
                    if !x.equals_in(y, seen)? {
                        return Ok(false);
                    }
                }

                Ok(true)
            }
            (Value::Closure(a), Value::Closure(b)) => Ok(Rc::ptr_eq(a, b)),
            (Value::Primitive(a), Value::Primitive(b)) => Ok(a == b),
            (Value::Label(a), Value::Label(b)) => Ok(Rc::ptr_eq(a, b)),
            _ => Ok(self.as_float()? == other.as_float()?),
        }
    }

    /// Structural comparison without coercion; see `PartialEq`.
    fn same_as(&self, other: &Value, seen: &mut Vec<(ArrayPtr, ArrayPtr)>) -> bool {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Null, Value::Null) => true,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => {
                if Rc::ptr_eq(a, b) || !enter_pair(seen, a, b) {
                    return true;
                }

                let (a, b) = (a.borrow(), b.borrow());

                a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x.same_as(y, seen))
            }
            (Value::Closure(a), Value::Closure(b)) => Rc::ptr_eq(a, b),
            (Value::Primitive(a), Value::Primitive(b)) => a == b,
            (Value::Label(a), Value::Label(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    fn render(&self, f: &mut fmt::Formatter<'_>, open: &mut Vec<ArrayPtr>) -> fmt::Result {
        match self {
            Value::Number(n) => format_number(f, *n),

            Value::Bool(b) => write!(f, "{}", b),

            Value::Null => f.write_str("null"),

            Value::Str(s) => f.write_str(s),

            Value::Array(items) => {
                let ptr = Rc::as_ptr(items);

                if open.contains(&ptr) {
                    return f.write_str("[...]");
                }

                open.push(ptr);

                f.write_str("[")?;
                for (i, item) in items.borrow().iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    item.render(f, open)?;
                }

                open.pop();

                f.write_str("]")
            }

            Value::Closure(c) => write!(f, "<fun({})>", c.decl.params.join(", ")),

            Value::Primitive(p) => write!(f, "<primitive {}>", p.name()),

            Value::Label(l) => match &l.name {
                Some(name) => write!(f, "<label {}>", name),
                None => f.write_str("<label>"),
            },
        }
    }
}

/// Records that the pair `(a, b)` is being compared. Returns `false` if it
/// already was, in which case the pair is taken as equal.
fn enter_pair(seen: &mut Vec<(ArrayPtr, ArrayPtr)>, a: &ArrayRef, b: &ArrayRef) -> bool {
    let pair = (Rc::as_ptr(a), Rc::as_ptr(b));

    if seen.contains(&pair) {
        return false;
    }

    seen.push(pair);
    true
}

/// String to number coercion. Accepts decimal literals plus the spellings
/// `Infinity`, `-Infinity` and `NaN` that numbers render as.
fn parse_number(text: &str) -> Option<f64> {
    let text = text.trim();

    let (sign, body) = match text.strip_prefix('-') {
        Some(rest) => (-1.0, rest),
        None => (1.0, text.strip_prefix('+').unwrap_or(text)),
    };

    match body {
        "Infinity" => Some(sign * f64::INFINITY),
        "NaN" => Some(f64::NAN),
        _ if !body.is_empty()
            && body
                .bytes()
                .all(|b| b.is_ascii_digit() || matches!(b, b'.' | b'e' | b'E' | b'+' | b'-')) =>
        {
            text.parse().ok()
        }
        _ => None,
    }
}

fn to_index(index: &Value, what: &str) -> Result<usize, RuntimeError> {
    let f = index.as_float()?;

    if f.fract() != 0.0 || !f.is_finite() {
        return Err(RuntimeError::index(format!(
            "Index to {} must be an integer",
            what
        )));
    }

    if f < 0.0 {
        return Err(RuntimeError::index(format!("Index {} out of range", f)));
    }

    Ok(f as usize)
}

fn out_of_range(i: usize, len: usize) -> RuntimeError {
    RuntimeError::index(format!("Index {} out of range for length {}", i, len))
}

/// Integral numbers print without a decimal point, everything else as the
/// shortest round‑trip decimal. Non‑finite values print as `Infinity`,
/// `-Infinity` or `NaN`.
pub fn format_number(f: &mut fmt::Formatter<'_>, n: f64) -> fmt::Result {
    if n.is_nan() {
        f.write_str("NaN")
    } else if n.is_infinite() {
        f.write_str(if n > 0.0 { "Infinity" } else { "-Infinity" })
    } else if n == 0.0 {
        f.write_str("0")
    } else if n.fract() == 0.0 {
        write!(f, "{:.0}", n)
    } else {
        write!(f, "{}", n)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.render(f, &mut Vec::new())
    }
}

// Arrays print through the cycle‑safe rendering.
impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => f.debug_tuple("Number").field(n).finish(),
            Value::Bool(b) => f.debug_tuple("Bool").field(b).finish(),
            Value::Null => f.write_str("Null"),
            Value::Str(s) => f.debug_tuple("Str").field(s).finish(),
            Value::Array(_) => write!(f, "Array({})", self),
            Value::Closure(c) => f.debug_tuple("Closure").field(c).finish(),
            Value::Primitive(p) => f.debug_tuple("Primitive").field(p).finish(),
            Value::Label(l) => f.debug_tuple("Label").field(l).finish(),
        }
    }
}

/// Structural comparison without coercion, for hosts and tests.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.same_as(other, &mut Vec::new())
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::string(s)
    }
}

use std::cell::RefCell;
use std::f64::consts::{E, PI};
use std::io::{self, Write};
use std::rc::Rc;

use log::{debug, info};
use thiserror::Error;

use crate::environment::Environment;
use crate::error::{Result, RuntimeError, RuntimeErrorKind, SciError};
use crate::expr::Expr;
use crate::parser::Parser;
use crate::primitive::GLOBAL_PRIMITIVES;
use crate::scanner::Scanner;
use crate::value::{Closure, Label, Value};

/// Why evaluation of a subexpression stopped early.
#[derive(Error, Debug)]
pub enum InterpretError {
    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    /// A label was applied; unwinds to the `block` activation with this id.
    #[error("Non-local exit to label #{label}")]
    NonLocalExit { label: u64, value: Value },
}

/// Convenient alias for interpreter results.
pub type IResult<T> = std::result::Result<T, InterpretError>;

/// One interpreter session: a global environment that persists across
/// `evaluate` calls, plus the sink `print` writes to.
pub struct Interpreter {
    globals: Rc<RefCell<Environment>>,
    next_label: u64,
    out: Box<dyn Write>,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    /// Creates a session printing to stdout.
    pub fn new() -> Self {
        Self::with_output(io::stdout())
    }

    /// Creates a session whose `print` / `print_line` output goes to `out`.
    pub fn with_output(out: impl Write + 'static) -> Self {
        info!("Initializing Interpreter");

        let mut globals = Environment::new();

        globals.define("PI", Value::Number(PI));
        globals.define("E", Value::Number(E));

        for prim in GLOBAL_PRIMITIVES {
            debug!("Defining primitive '{}'", prim.name());
            globals.define(prim.name(), Value::Primitive(prim));
        }

        Self {
            globals: Rc::new(RefCell::new(globals)),
            next_label: 0,
            out: Box::new(out),
        }
    }

    /// The session's global scope.
    pub fn globals(&self) -> &Rc<RefCell<Environment>> {
        &self.globals
    }

    /// Bind `name` in the global scope.
    pub fn define(&mut self, name: &str, value: Value) {
        self.globals.borrow_mut().define(name, value);
    }

    /// Scan, parse and evaluate `source` in the global scope.
    pub fn evaluate(&mut self, source: &str) -> Result<Value> {
        info!("Evaluating {} bytes of source", source.len());

        let expr: Expr = Parser::new(Scanner::new(source)).parse()?;

        self.evaluate_expr(&expr)
    }

    /// Evaluate an already parsed program in the global scope.
    pub fn evaluate_expr(&mut self, expr: &Expr) -> Result<Value> {
        let globals = Rc::clone(&self.globals);
        let result = self.eval(expr, &globals);

        self.out.flush()?;

        let value = result.map_err(escape_to_top_level)?;

        info!("Evaluation completed: {}", value);

        Ok(value)
    }

    /// Apply a function value (closure, primitive or label) from host code.
    pub fn call(&mut self, callee: &Value, args: Vec<Value>) -> Result<Value> {
        let result = self.apply(callee, args);

        self.out.flush()?;

        result.map_err(escape_to_top_level)
    }

    // ───────────────────────── evaluation ─────────────────────────

    fn eval(&mut self, expr: &Expr, env: &Rc<RefCell<Environment>>) -> IResult<Value> {
        match expr {
            Expr::Literal(lit) => Ok(lit.to_value()),

            Expr::Primitive(prim) => Ok(Value::Primitive(*prim)),

            Expr::Array(items) => {
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    values.push(self.eval(item, env)?);
                }
                Ok(Value::array(values))
            }

            Expr::Variable { name, pos } => Ok(env.borrow().get(name).map_err(|e| e.at(*pos))?),

            Expr::Store { name, value } => {
                let value = self.eval(value, env)?;
                env.borrow_mut().define(name, value);
                Ok(Value::Null)
            }

            Expr::Update { name, value, pos } => {
                let value = self.eval(value, env)?;
                env.borrow_mut()
                    .assign(name, value)
                    .map_err(|e| e.at(*pos))?;
                Ok(Value::Null)
            }

            Expr::Sequence(..) => {
                let mut current = expr;
                while let Expr::Sequence(first, rest) = current {
                    self.eval(first, env)?;
                    current = rest.as_ref();
                }
                self.eval(current, env)
            }

            Expr::And(left, right) => {
                if !self.eval(left, env)?.as_bool() {
                    return Ok(Value::Bool(false));
                }
                Ok(Value::Bool(self.eval(right, env)?.as_bool()))
            }

            Expr::Or(left, right) => {
                if self.eval(left, env)?.as_bool() {
                    return Ok(Value::Bool(true));
                }
                Ok(Value::Bool(self.eval(right, env)?.as_bool()))
            }

            Expr::If {
                condition,
                consequent,
                alternate,
            } => {
                if self.eval(condition, env)?.as_bool() {
                    self.eval(consequent, env)
                } else {
                    self.eval(alternate, env)
                }
            }

            Expr::While { condition, body } => {
                while self.eval(condition, env)?.as_bool() {
                    self.eval(body, env)?;
                }
                Ok(Value::Null)
            }

            Expr::Function(decl) => Ok(Value::Closure(Rc::new(Closure {
                decl: Rc::clone(decl),
                env: Rc::clone(env),
            }))),

            Expr::Apply {
                callee,
                arguments,
                pos,
            } => {
                let callee = self.eval(callee, env)?;

                let mut args = Vec::with_capacity(arguments.len());
                for arg in arguments {
                    args.push(self.eval(arg, env)?);
                }

                self.apply(&callee, args).map_err(|e| match e {
                    InterpretError::Runtime(err) => InterpretError::Runtime(err.at(*pos)),
                    exit => exit,
                })
            }

            Expr::Block { label, body } => self.eval_block(label.as_deref(), body, env),
        }
    }

    fn apply(&mut self, callee: &Value, args: Vec<Value>) -> IResult<Value> {
        match callee {
            Value::Closure(closure) => {
                let params = &closure.decl.params;

                if params.len() != args.len() {
                    debug!(
                        "Closure expects {} arguments, got {}",
                        params.len(),
                        args.len()
                    );
                    return Err(RuntimeError::arity(params.len(), args.len()).into());
                }

                // Lexical scoping: the new frame hangs off the captured
                // environment, not the caller's.
                let mut frame = Environment::with_enclosing(Rc::clone(&closure.env));
                for (param, arg) in params.iter().zip(args) {
                    frame.define(param, arg);
                }

                self.eval(&closure.decl.body, &Rc::new(RefCell::new(frame)))
            }

            Value::Primitive(prim) => Ok(prim.call(&args, &mut *self.out)?),

            Value::Label(label) => {
                if !label.is_active() {
                    return Err(RuntimeError::new(
                        RuntimeErrorKind::InvalidNonLocalExit,
                        "Label invalid outside defining block",
                    )
                    .into());
                }

                if args.len() > 1 {
                    return Err(RuntimeError::arity("0 or 1", args.len()).into());
                }

                let value = args.into_iter().next().unwrap_or(Value::Null);

                debug!("Unwinding to label #{} with {}", label.id, value);

                Err(InterpretError::NonLocalExit {
                    label: label.id,
                    value,
                })
            }

            Value::Number(_) | Value::Bool(_) | Value::Null | Value::Str(_) | Value::Array(_) => {
                Err(RuntimeError::type_error(format!(
                    "{} is not a function",
                    callee.type_name()
                ))
                .into())
            }
        }
    }

    /// Run `body` with a fresh label bound in a child scope. An exit aimed at
    /// this activation becomes the block's value; any other keeps unwinding.
    fn eval_block(
        &mut self,
        name: Option<&str>,
        body: &Expr,
        env: &Rc<RefCell<Environment>>,
    ) -> IResult<Value> {
        let id = self.next_label;
        self.next_label += 1;

        let label = Rc::new(Label::new(id, name.map(str::to_string)));

        let mut scope = Environment::with_enclosing(Rc::clone(env));
        if let Some(name) = name {
            scope.define(name, Value::Label(Rc::clone(&label)));
        }

        debug!("Entering block #{} ({:?})", id, name);

        let result = self.eval(body, &Rc::new(RefCell::new(scope)));

        label.invalidate();

        match result {
            Err(InterpretError::NonLocalExit { label: target, value }) if target == id => {
                debug!("Block #{} exited early with {}", id, value);
                Ok(value)
            }
            other => other,
        }
    }
}

/// Convert an evaluation failure into the embedder‑facing error. A non‑local
/// exit cannot legitimately reach the top level: its label is invalidated as
/// soon as its block returns.
fn escape_to_top_level(err: InterpretError) -> SciError {
    match err {
        InterpretError::Runtime(e) => {
            debug!("Evaluation failed: {}", e);
            SciError::Runtime(e)
        }
        InterpretError::NonLocalExit { label, .. } => SciError::Runtime(RuntimeError::new(
            RuntimeErrorKind::InvalidNonLocalExit,
            format!("Label #{} escaped its block", label),
        )),
    }
}

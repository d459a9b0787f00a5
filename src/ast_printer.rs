use std::fmt::Write;

use crate::expr::{Expr, LiteralValue};

/// Converts an expression to a parenthesised prefix form, e.g.
/// `1 + 2 * 3` → `(+ 1 (* 2 3))`. Operator applications print under the
/// primitive's name; other applications print as `(call f args…)`.
pub struct AstPrinter;

impl AstPrinter {
    pub fn print(expr: &Expr) -> String {
        let mut out = String::new();
        Self::write(&mut out, expr);
        out
    }

    fn write(out: &mut String, expr: &Expr) {
        match expr {
            // ── leaves ──────────────────────────────────────────────────
            Expr::Literal(lit) => match lit {
                LiteralValue::Str(s) => {
                    let _ = write!(out, "{:?}", &**s);
                }
                // numbers share the runtime rendering: 3 → "3"
                other => {
                    let _ = write!(out, "{}", other.to_value());
                }
            },

            Expr::Primitive(prim) => out.push_str(prim.name()),

            Expr::Variable { name, .. } => out.push_str(name),

            // ── compound forms ──────────────────────────────────────────
            Expr::Array(items) => Self::node(out, "array", items.iter()),

            Expr::Store { name, value } => {
                let _ = write!(out, "(:= {} ", name);
                Self::write(out, value);
                out.push(')');
            }

            Expr::Update { name, value, .. } => {
                let _ = write!(out, "(<- {} ", name);
                Self::write(out, value);
                out.push(')');
            }

            Expr::Sequence(first, rest) => Self::node(out, "seq", [&**first, &**rest].into_iter()),

            Expr::And(l, r) => Self::node(out, "&&", [&**l, &**r].into_iter()),

            Expr::Or(l, r) => Self::node(out, "||", [&**l, &**r].into_iter()),

            Expr::If {
                condition,
                consequent,
                alternate,
            } => Self::node(
                out,
                "if",
                [&**condition, &**consequent, &**alternate].into_iter(),
            ),

            Expr::While { condition, body } => {
                Self::node(out, "while", [&**condition, &**body].into_iter())
            }

            Expr::Function(decl) => {
                let _ = write!(out, "(fun ({}) ", decl.params.join(" "));
                Self::write(out, &decl.body);
                out.push(')');
            }

            Expr::Apply {
                callee, arguments, ..
            } => match &**callee {
                Expr::Primitive(prim) => Self::node(out, prim.name(), arguments.iter()),
                other => {
                    out.push_str("(call ");
                    Self::write(out, other);
                    for arg in arguments {
                        out.push(' ');
                        Self::write(out, arg);
                    }
                    out.push(')');
                }
            },

            Expr::Block { label, body } => {
                out.push_str("(block ");
                if let Some(label) = label {
                    out.push_str(label);
                    out.push(' ');
                }
                Self::write(out, body);
                out.push(')');
            }
        }
    }

    fn node<'e>(out: &mut String, head: &str, children: impl Iterator<Item = &'e Expr>) {
        out.push('(');
        out.push_str(head);
        for child in children {
            out.push(' ');
            Self::write(out, child);
        }
        out.push(')');
    }
}

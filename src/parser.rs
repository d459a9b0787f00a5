/*!
Recursive‑descent **LL(1)** parser
==================================

The parser pulls tokens lazily from a [`Scanner`] and keeps exactly one token
of lookahead (`current`). Every production returns an [`Expr`]; operators
are desugared on the spot into applications of [`Primitive`]s.

Grammar (lowest to highest precedence, left‑associative unless noted)
---------------------------------------------------------------------

```text
program   → exprSeq EOF ;
exprSeq   → ";"* expr ( ";"+ expr )* ";"* ;            empty ⇒ null
expr      → store ;
store     → orOp ( ( ":=" | "<-" ) orOp )? ;
orOp      → andOp ( "||" andOp )* ;
andOp     → conds ( "&&" conds )* ;
conds     → addSub ( ( "==" | "!=" | "<" | "<=" | ">" | ">=" ) addSub )? ;
addSub    → ( "+" | "-" )? mulDiv ( ( "+" | "-" ) mulDiv )* ;
mulDiv    → pow ( ( "*" | "/" | "div" | "%" ) pow )* ;
pow       → term ( "^" pow )? ;                        right‑associative
term      → primary ( "(" args? ")" | "[" expr "]" )* ;
primary   → FLOAT | STRING | "null" | "true" | "false" | IDENT
          | "!" term | "(" exprSeq ")" | "[" args? "]"
          | "if" exprSeq ("do"|"then") exprSeq
                 ( "elif" exprSeq ("do"|"then") exprSeq )* ( "else" exprSeq )? "end"
          | "while" exprSeq ( "do" exprSeq )? "end"
          | "fun" IDENT? "(" params? ")" "->"? exprSeq "end"
          | "block" IDENT? "do" exprSeq "end" ;
```

Unary `+`/`-` live at `addSub`, one level above `pow`, so `-x^2` is
`-(x^2)`. Comparisons consume at most one operator, so `a < b < c` leaves a
trailing `<` that is reported as unexpected input.

### Logging Policy

| Location              | Level   | Purpose                                    |
|-----------------------|---------|--------------------------------------------|
| `Parser::new`, `parse`| `info`  | Lifecycle milestones.                      |
| compound forms        | `debug` | Descent into `if` / `while` / `fun` / `block`. |
*/

use std::collections::HashSet;
use std::mem;
use std::rc::Rc;

use crate::error::{Result, SciError};
use crate::expr::{Expr, FunctionDecl, LiteralValue};
use crate::primitive::Primitive;
use crate::scanner::Scanner;
use crate::token::{Token, TokenType};

use log::{debug, info};

/// Words that close an expression sequence.
const SEQUENCE_TERMINATORS: [&str; 5] = ["do", "then", "elif", "else", "end"];

pub struct Parser<'a> {
    scanner: Scanner<'a>,
    current: Token<'a>,
}

impl<'a> Parser<'a> {
    pub fn new(mut scanner: Scanner<'a>) -> Self {
        info!("Parser created");

        let current = scanner.next_token();

        Self { scanner, current }
    }

    // ───────────────────────── public API ─────────────────────────

    /// Parse a complete program. Trailing input is an error.
    pub fn parse(&mut self) -> Result<Expr> {
        info!("Beginning parse phase");

        self.reject_error_token()?;

        let expr = self.sequence()?;

        if !matches!(self.current.token_type, TokenType::EOF) {
            return Err(self.error("Expecting end of input"));
        }

        Ok(expr)
    }

    // ──────────────────────── sequences ───────────────────────────

    fn sequence(&mut self) -> Result<Expr> {
        while self.match_op(";")? {}

        let mut items: Vec<Expr> = Vec::new();

        while !self.at_sequence_end() {
            items.push(self.expression()?);

            if !self.match_op(";")? {
                break;
            }

            while self.match_op(";")? {}
        }

        // Right‑nested so evaluation can walk the spine iteratively.
        let mut items = items.into_iter().rev();

        let Some(last) = items.next() else {
            return Ok(Expr::null());
        };

        Ok(items.fold(last, |rest, first| {
            Expr::Sequence(Box::new(first), Box::new(rest))
        }))
    }

    fn at_sequence_end(&self) -> bool {
        match self.current.token_type {
            TokenType::EOF => true,
            TokenType::OPERATOR => self.current.lexeme == ")",
            TokenType::RESERVED => SEQUENCE_TERMINATORS.contains(&self.current.lexeme),
            _ => false,
        }
    }

    // ─────────────────────── expression rules ─────────────────────

    fn expression(&mut self) -> Result<Expr> {
        self.store()
    }

    fn store(&mut self) -> Result<Expr> {
        let target: Expr = self.or_op()?;

        if self.current.is_operator(":=") {
            let op = self.advance()?;

            return match target {
                Expr::Variable { name, .. } => Ok(Expr::Store {
                    name,
                    value: Box::new(self.or_op()?),
                }),
                _ => Err(self.error_at(&op, "Can only store/update a variable or index")),
            };
        }

        if self.current.is_operator("<-") {
            let op = self.advance()?;

            return match target {
                Expr::Variable { name, pos } => Ok(Expr::Update {
                    name,
                    value: Box::new(self.or_op()?),
                    pos,
                }),

                Expr::Apply {
                    callee,
                    mut arguments,
                    pos,
                } if *callee == Expr::Primitive(Primitive::Get) && arguments.len() == 2 => {
                    arguments.push(self.or_op()?);

                    Ok(Expr::primitive(Primitive::Set, arguments, pos))
                }

                _ => Err(self.error_at(&op, "Can only store/update a variable or index")),
            };
        }

        Ok(target)
    }

    fn or_op(&mut self) -> Result<Expr> {
        let mut expr: Expr = self.and_op()?;

        while self.match_op("||")? {
            let right: Expr = self.and_op()?;
            expr = Expr::Or(Box::new(expr), Box::new(right));
        }

        Ok(expr)
    }

    fn and_op(&mut self) -> Result<Expr> {
        let mut expr: Expr = self.conds()?;

        while self.match_op("&&")? {
            let right: Expr = self.conds()?;
            expr = Expr::And(Box::new(expr), Box::new(right));
        }

        Ok(expr)
    }

    fn conds(&mut self) -> Result<Expr> {
        let expr: Expr = self.add_sub()?;

        let op = match self.current.token_type {
            TokenType::OPERATOR => match self.current.lexeme {
                "==" => Primitive::Eq,
                "!=" => Primitive::Neq,
                "<" => Primitive::Lt,
                "<=" => Primitive::Lte,
                ">" => Primitive::Gt,
                ">=" => Primitive::Gte,
                _ => return Ok(expr),
            },
            _ => return Ok(expr),
        };

        let pos = self.advance()?.position();
        let right: Expr = self.add_sub()?;

        Ok(Expr::primitive(op, vec![expr, right], pos))
    }

    fn add_sub(&mut self) -> Result<Expr> {
        let mut expr: Expr = if self.current.is_operator("+") || self.current.is_operator("-") {
            let op = self.advance()?;
            let prim = if op.lexeme == "+" {
                Primitive::Plus
            } else {
                Primitive::Neg
            };

            Expr::primitive(prim, vec![self.mul_div()?], op.position())
        } else {
            self.mul_div()?
        };

        loop {
            let prim = if self.current.is_operator("+") {
                Primitive::Add
            } else if self.current.is_operator("-") {
                Primitive::Sub
            } else {
                break;
            };

            let pos = self.advance()?.position();
            let right: Expr = self.mul_div()?;
            expr = Expr::primitive(prim, vec![expr, right], pos);
        }

        Ok(expr)
    }

    fn mul_div(&mut self) -> Result<Expr> {
        let mut expr: Expr = self.pow()?;

        loop {
            let prim = if self.current.is_operator("*") {
                Primitive::Mul
            } else if self.current.is_operator("/") {
                Primitive::Div
            } else if self.current.is_operator("%") {
                Primitive::Mod
            } else if self.current.is_reserved("div") {
                Primitive::IntDiv
            } else {
                break;
            };

            let pos = self.advance()?.position();
            let right: Expr = self.pow()?;
            expr = Expr::primitive(prim, vec![expr, right], pos);
        }

        Ok(expr)
    }

    fn pow(&mut self) -> Result<Expr> {
        let base: Expr = self.term()?;

        if self.current.is_operator("^") {
            let pos = self.advance()?.position();
            let exponent: Expr = self.pow()?;

            return Ok(Expr::primitive(Primitive::Pow, vec![base, exponent], pos));
        }

        Ok(base)
    }

    // ───────────────────────── terms ──────────────────────────────

    fn term(&mut self) -> Result<Expr> {
        let mut expr: Expr = self.primary()?;

        loop {
            if self.current.is_operator("(") {
                let pos = self.advance()?.position();
                let arguments = self.expression_list(")")?;
                expr = Expr::apply(expr, arguments, pos);
            } else if self.current.is_operator("[") {
                let pos = self.advance()?.position();
                let index: Expr = self.expression()?;
                self.consume_op("]")?;
                expr = Expr::primitive(Primitive::Get, vec![expr, index], pos);
            } else {
                break;
            }
        }

        Ok(expr)
    }

    fn primary(&mut self) -> Result<Expr> {
        match &self.current.token_type {
            TokenType::FLOAT(n) => {
                let n = *n;
                self.advance()?;
                return Ok(Expr::Literal(LiteralValue::Number(n)));
            }

            TokenType::STRING(s) => {
                let s: Rc<str> = Rc::from(s.as_str());
                self.advance()?;
                return Ok(Expr::Literal(LiteralValue::Str(s)));
            }

            TokenType::IDENTIFIER => {
                let token = self.advance()?;
                return Ok(Expr::Variable {
                    name: token.lexeme.to_string(),
                    pos: token.position(),
                });
            }

            _ => {}
        }

        if self.current.is_operator("!") {
            let pos = self.advance()?.position();
            let operand: Expr = self.term()?;
            return Ok(Expr::primitive(Primitive::Not, vec![operand], pos));
        }

        if self.match_op("(")? {
            let expr: Expr = self.sequence()?;
            self.consume_op(")")?;
            return Ok(expr);
        }

        if self.match_op("[")? {
            return Ok(Expr::Array(self.expression_list("]")?));
        }

        if self.match_reserved("null")? {
            return Ok(Expr::Literal(LiteralValue::Null));
        }
        if self.match_reserved("true")? {
            return Ok(Expr::Literal(LiteralValue::True));
        }
        if self.match_reserved("false")? {
            return Ok(Expr::Literal(LiteralValue::False));
        }

        if self.match_reserved("if")? {
            let expr: Expr = self.if_rest()?;
            self.consume_reserved("end")?;
            return Ok(expr);
        }

        if self.match_reserved("while")? {
            return self.while_rest();
        }

        if self.match_reserved("fun")? {
            return self.function();
        }

        if self.match_reserved("block")? {
            return self.block();
        }

        Err(self.error("Expecting expression"))
    }

    /// Comma‑separated expressions up to `close`; a trailing comma is allowed.
    fn expression_list(&mut self, close: &str) -> Result<Vec<Expr>> {
        let mut items: Vec<Expr> = Vec::new();

        while !self.current.is_operator(close) {
            items.push(self.expression()?);

            if !self.match_op(",")? {
                break;
            }
        }

        self.consume_op(close)?;

        Ok(items)
    }

    /// Everything of an `if` after the keyword, up to (not including) `end`.
    /// `elif` chains become nested `If` nodes; a missing `else` yields null.
    fn if_rest(&mut self) -> Result<Expr> {
        debug!("Parsing if");

        let condition: Expr = self.sequence()?;

        if !(self.match_reserved("do")? || self.match_reserved("then")?) {
            return Err(self.error("Expecting do"));
        }

        let consequent: Expr = self.sequence()?;

        let alternate: Expr = if self.match_reserved("elif")? {
            self.if_rest()?
        } else if self.match_reserved("else")? {
            self.sequence()?
        } else {
            Expr::null()
        };

        Ok(Expr::If {
            condition: Box::new(condition),
            consequent: Box::new(consequent),
            alternate: Box::new(alternate),
        })
    }

    fn while_rest(&mut self) -> Result<Expr> {
        debug!("Parsing while");

        let condition: Expr = self.sequence()?;

        let body: Expr = if self.match_reserved("do")? {
            self.sequence()?
        } else {
            Expr::null()
        };

        self.consume_reserved("end")?;

        Ok(Expr::While {
            condition: Box::new(condition),
            body: Box::new(body),
        })
    }

    /// `fun name(a, b) body end` is sugar for `name := fun(a, b) body end`.
    fn function(&mut self) -> Result<Expr> {
        let name: Option<String> = self.optional_identifier()?;

        debug!("Parsing function {:?}", name);

        self.consume_op("(")?;

        let mut params: Vec<String> = Vec::new();
        let mut seen: HashSet<&'a str> = HashSet::new();

        while !self.current.is_operator(")") {
            if !matches!(self.current.token_type, TokenType::IDENTIFIER) {
                return Err(self.error("Expecting parameter"));
            }

            let param = self.advance()?;

            if !seen.insert(param.lexeme) {
                return Err(self.error_at(
                    &param,
                    format!("Duplicate parameter {}", param.lexeme),
                ));
            }

            params.push(param.lexeme.to_string());

            if !self.match_op(",")? {
                break;
            }
        }

        self.consume_op(")")?;
        self.match_op("->")?;

        let body: Expr = self.sequence()?;
        self.consume_reserved("end")?;

        let function = Expr::Function(Rc::new(FunctionDecl { params, body }));

        Ok(match name {
            Some(name) => Expr::Store {
                name,
                value: Box::new(function),
            },
            None => function,
        })
    }

    fn block(&mut self) -> Result<Expr> {
        let label: Option<String> = self.optional_identifier()?;

        debug!("Parsing block {:?}", label);

        self.consume_reserved("do")?;
        let body: Expr = self.sequence()?;
        self.consume_reserved("end")?;

        Ok(Expr::Block {
            label,
            body: Box::new(body),
        })
    }

    fn optional_identifier(&mut self) -> Result<Option<String>> {
        if matches!(self.current.token_type, TokenType::IDENTIFIER) {
            Ok(Some(self.advance()?.lexeme.to_string()))
        } else {
            Ok(None)
        }
    }

    // ────────────────────── utility helpers ───────────────────────

    /// Move to the next token, returning the one just consumed.
    fn advance(&mut self) -> Result<Token<'a>> {
        let next = self.scanner.next_token();
        let previous = mem::replace(&mut self.current, next);

        self.reject_error_token()?;

        Ok(previous)
    }

    fn reject_error_token(&self) -> Result<()> {
        if let TokenType::ERROR(message) = &self.current.token_type {
            let (line, col) = (self.current.line, self.current.col);

            return Err(SciError::scan(
                line,
                col,
                message.clone(),
                self.scanner.show_location(line, col),
            ));
        }

        Ok(())
    }

    #[inline]
    fn match_op(&mut self, op: &str) -> Result<bool> {
        if self.current.is_operator(op) {
            self.advance()?;
            return Ok(true);
        }

        Ok(false)
    }

    #[inline]
    fn match_reserved(&mut self, word: &str) -> Result<bool> {
        if self.current.is_reserved(word) {
            self.advance()?;
            return Ok(true);
        }

        Ok(false)
    }

    fn consume_op(&mut self, op: &str) -> Result<Token<'a>> {
        if self.current.is_operator(op) {
            return self.advance();
        }

        Err(self.error(format!("Expecting {}", op)))
    }

    fn consume_reserved(&mut self, word: &str) -> Result<Token<'a>> {
        if self.current.is_reserved(word) {
            return self.advance();
        }

        Err(self.error(format!("Expecting {}", word)))
    }

    fn error(&self, message: impl Into<String>) -> SciError {
        self.error_at(&self.current, message)
    }

    fn error_at(&self, token: &Token<'_>, message: impl Into<String>) -> SciError {
        debug!("Parse error at {}:{}", token.line, token.col);

        SciError::parse(
            token.line,
            token.col,
            message,
            self.scanner.show_location(token.line, token.col),
        )
    }
}

//! A small s-expression reader and evaluator.
//!
//! Supports integers, floats, strings, `true`/`false`/`nil`, quoted data and
//! a handful of built-ins. It stands in for a language runtime when the
//! manager is driven from the command line or the LSP host.

use crate::overlay::Evaluator;
use crate::util::syntax::{tokenize, LexError, Token, TokenKind};
use std::fmt;
use thiserror::Error;

/// A value produced by evaluation; also the shape of read code.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Symbol(String),
    List(Vec<Value>),
}

impl Value {
    fn is_truthy(&self) -> bool {
        !matches!(self, Value::Nil | Value::Bool(false))
    }

    fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::Symbol(_) => "symbol",
            Value::List(_) => "list",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(x) if x.is_finite() && x.fract() == 0.0 => write!(f, "{:.1}", x),
            Value::Float(x) => write!(f, "{}", x),
            Value::Str(s) => write!(f, "{:?}", s),
            Value::Symbol(s) => write!(f, "{}", s),
            Value::List(items) => {
                write!(f, "(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, ")")
            }
        }
    }
}

/// Error reading source text into a form.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReadError {
    #[error(transparent)]
    Lex(#[from] LexError),
    #[error("nothing to evaluate")]
    Empty,
    #[error("unclosed list starting at byte {0}")]
    Unclosed(usize),
    #[error("unexpected '{ch}' at byte {at}")]
    UnexpectedClose { ch: char, at: usize },
    #[error("'{close}' at byte {at} does not match '{open}'")]
    Mismatched { open: char, close: char, at: usize },
    #[error("unexpected input after the form at byte {0}")]
    Trailing(usize),
    #[error("forms nested too deeply at byte {0}")]
    TooDeep(usize),
}

/// Error evaluating a form.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    #[error(transparent)]
    Read(#[from] ReadError),
    #[error("unbound symbol: {0}")]
    UnboundSymbol(String),
    #[error("not a function: {0}")]
    NotCallable(String),
    #[error("{name}: expected {expected} argument(s), got {found}")]
    Arity {
        name: String,
        expected: &'static str,
        found: usize,
    },
    #[error("{name}: expected a number, got {found}")]
    NotANumber { name: String, found: &'static str },
    #[error("division by zero")]
    DivisionByZero,
    #[error("integer overflow in {0}")]
    Overflow(String),
    #[error("evaluation nested too deeply")]
    TooDeep,
}

/// Deepest nesting the reader and evaluator accept.
pub const MAX_DEPTH: usize = 256;

/// Read exactly one form from `source`.
pub fn read(source: &str) -> Result<Value, ReadError> {
    let tokens = tokenize(source)?;
    let mut pos = 0;
    let form = read_form(&tokens, &mut pos, 0)?;
    if let Some(extra) = tokens.get(pos) {
        return Err(ReadError::Trailing(extra.start));
    }
    Ok(form)
}

fn closing_for(open: char) -> char {
    match open {
        '[' => ']',
        '{' => '}',
        _ => ')',
    }
}

fn read_form(tokens: &[Token<'_>], pos: &mut usize, depth: usize) -> Result<Value, ReadError> {
    let token = tokens.get(*pos).ok_or(ReadError::Empty)?;
    if depth > MAX_DEPTH {
        return Err(ReadError::TooDeep(token.start));
    }
    *pos += 1;

    match &token.kind {
        TokenKind::Quote => {
            let quoted = read_form(tokens, pos, depth + 1)?;
            Ok(Value::List(vec![Value::Symbol("quote".to_string()), quoted]))
        }
        TokenKind::Open(open) => {
            let mut items = Vec::new();
            loop {
                match tokens.get(*pos) {
                    None => return Err(ReadError::Unclosed(token.start)),
                    Some(Token {
                        kind: TokenKind::Close(close),
                        start,
                        ..
                    }) => {
                        *pos += 1;
                        if *close != closing_for(*open) {
                            return Err(ReadError::Mismatched {
                                open: *open,
                                close: *close,
                                at: *start,
                            });
                        }
                        return Ok(Value::List(items));
                    }
                    Some(_) => items.push(read_form(tokens, pos, depth + 1)?),
                }
            }
        }
        TokenKind::Close(ch) => Err(ReadError::UnexpectedClose {
            ch: *ch,
            at: token.start,
        }),
        TokenKind::Str(s) => Ok(Value::Str(s.clone())),
        TokenKind::Atom(atom) => Ok(read_atom(atom)),
    }
}

fn read_atom(atom: &str) -> Value {
    match atom {
        "nil" => Value::Nil,
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => {
            if let Ok(n) = atom.parse::<i64>() {
                Value::Int(n)
            } else if let Some(x) = atom
                .parse::<f64>()
                .ok()
                .filter(|_| atom.starts_with(|c: char| c.is_ascii_digit() || c == '-' || c == '.'))
            {
                Value::Float(x)
            } else {
                Value::Symbol(atom.to_string())
            }
        }
    }
}

/// Evaluates s-expressions with the built-in function set.
#[derive(Debug, Default)]
pub struct SexpEvaluator;

impl SexpEvaluator {
    pub fn new() -> Self {
        Self
    }

    pub fn eval(&self, form: &Value) -> Result<Value, EvalError> {
        self.eval_at(form, 0)
    }

    fn eval_at(&self, form: &Value, depth: usize) -> Result<Value, EvalError> {
        if depth > MAX_DEPTH {
            return Err(EvalError::TooDeep);
        }
        match form {
            Value::Symbol(name) => Err(EvalError::UnboundSymbol(name.clone())),
            Value::List(items) => match items.split_first() {
                None => Ok(Value::Nil),
                Some((Value::Symbol(op), args)) => self.apply(op, args, depth + 1),
                Some((head, _)) => Err(EvalError::NotCallable(head.to_string())),
            },
            other => Ok(other.clone()),
        }
    }

    fn apply(&self, op: &str, args: &[Value], depth: usize) -> Result<Value, EvalError> {
        match op {
            "quote" => {
                expect_arity(op, args.len(), "1", |n| n == 1)?;
                return Ok(args[0].clone());
            }
            "if" => {
                expect_arity(op, args.len(), "2 or 3", |n| n == 2 || n == 3)?;
                return if self.eval_at(&args[0], depth)?.is_truthy() {
                    self.eval_at(&args[1], depth)
                } else {
                    args.get(2).map_or(Ok(Value::Nil), |alt| self.eval_at(alt, depth))
                };
            }
            _ => {}
        }

        let values = args
            .iter()
            .map(|arg| self.eval_at(arg, depth))
            .collect::<Result<Vec<_>, _>>()?;

        match op {
            "+" => fold_numbers(op, &values, Num::Int(0), Num::plus),
            "*" => fold_numbers(op, &values, Num::Int(1), Num::times),
            "-" => match values.as_slice() {
                [] => Err(arity(op, "at least 1", 0)),
                [only] => Num::Int(0).minus(number(op, only)?, op).map(Num::into_value),
                [first, rest @ ..] => fold_numbers(op, rest, number(op, first)?, Num::minus),
            },
            "/" => match values.as_slice() {
                [] => Err(arity(op, "at least 1", 0)),
                [only] => Num::Int(1).divide(number(op, only)?, op).map(Num::into_value),
                [first, rest @ ..] => fold_numbers(op, rest, number(op, first)?, Num::divide),
            },
            "max" | "min" => {
                let (first, rest) = values
                    .split_first()
                    .ok_or_else(|| arity(op, "at least 1", 0))?;
                let mut best = number(op, first)?;
                for v in rest {
                    let n = number(op, v)?;
                    let better = if op == "max" {
                        n.as_f64() > best.as_f64()
                    } else {
                        n.as_f64() < best.as_f64()
                    };
                    if better {
                        best = n;
                    }
                }
                Ok(best.into_value())
            }
            "=" => Ok(Value::Bool(values.windows(2).all(|w| values_equal(&w[0], &w[1])))),
            "<" | ">" | "<=" | ">=" => {
                let nums = values
                    .iter()
                    .map(|v| number(op, v).map(Num::as_f64))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Value::Bool(nums.windows(2).all(|w| match op {
                    "<" => w[0] < w[1],
                    ">" => w[0] > w[1],
                    "<=" => w[0] <= w[1],
                    _ => w[0] >= w[1],
                })))
            }
            "not" => {
                expect_arity(op, values.len(), "1", |n| n == 1)?;
                Ok(Value::Bool(!values[0].is_truthy()))
            }
            "str" => Ok(Value::Str(
                values
                    .iter()
                    .map(|v| match v {
                        Value::Str(s) => s.clone(),
                        Value::Nil => String::new(),
                        other => other.to_string(),
                    })
                    .collect(),
            )),
            "list" => Ok(Value::List(values)),
            _ => Err(EvalError::UnboundSymbol(op.to_string())),
        }
    }
}

impl Evaluator for SexpEvaluator {
    type Value = Value;
    type Error = EvalError;

    fn evaluate(&mut self, source: &str) -> Result<Value, EvalError> {
        let form = read(source)?;
        self.eval(&form)
    }
}

fn arity(name: &str, expected: &'static str, found: usize) -> EvalError {
    EvalError::Arity {
        name: name.to_string(),
        expected,
        found,
    }
}

fn expect_arity(
    name: &str,
    found: usize,
    expected: &'static str,
    ok: impl Fn(usize) -> bool,
) -> Result<(), EvalError> {
    if ok(found) {
        Ok(())
    } else {
        Err(arity(name, expected, found))
    }
}

#[derive(Debug, Clone, Copy)]
enum Num {
    Int(i64),
    Float(f64),
}

impl Num {
    fn as_f64(self) -> f64 {
        match self {
            Num::Int(n) => n as f64,
            Num::Float(x) => x,
        }
    }

    fn into_value(self) -> Value {
        match self {
            Num::Int(n) => Value::Int(n),
            Num::Float(x) => Value::Float(x),
        }
    }

    fn combine(
        self,
        other: Num,
        op: &str,
        int: fn(i64, i64) -> Option<i64>,
        float: fn(f64, f64) -> f64,
    ) -> Result<Num, EvalError> {
        match (self, other) {
            (Num::Int(a), Num::Int(b)) => int(a, b)
                .map(Num::Int)
                .ok_or_else(|| EvalError::Overflow(op.to_string())),
            (a, b) => Ok(Num::Float(float(a.as_f64(), b.as_f64()))),
        }
    }

    fn plus(self, other: Num, op: &str) -> Result<Num, EvalError> {
        self.combine(other, op, i64::checked_add, |a, b| a + b)
    }

    fn minus(self, other: Num, op: &str) -> Result<Num, EvalError> {
        self.combine(other, op, i64::checked_sub, |a, b| a - b)
    }

    fn times(self, other: Num, op: &str) -> Result<Num, EvalError> {
        self.combine(other, op, i64::checked_mul, |a, b| a * b)
    }

    fn divide(self, other: Num, op: &str) -> Result<Num, EvalError> {
        if other.as_f64() == 0.0 {
            return Err(EvalError::DivisionByZero);
        }
        match (self, other) {
            (Num::Int(a), Num::Int(b)) if a.checked_rem(b) != Some(0) => {
                Ok(Num::Float(a as f64 / b as f64))
            }
            _ => self.combine(other, op, i64::checked_div, |a, b| a / b),
        }
    }
}

fn number(name: &str, value: &Value) -> Result<Num, EvalError> {
    match value {
        Value::Int(n) => Ok(Num::Int(*n)),
        Value::Float(x) => Ok(Num::Float(*x)),
        other => Err(EvalError::NotANumber {
            name: name.to_string(),
            found: other.type_name(),
        }),
    }
}

fn fold_numbers(
    op: &str,
    values: &[Value],
    init: Num,
    step: fn(Num, Num, &str) -> Result<Num, EvalError>,
) -> Result<Value, EvalError> {
    values
        .iter()
        .try_fold(init, |acc, v| step(acc, number(op, v)?, op))
        .map(Num::into_value)
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (number("=", a), number("=", b)) {
        (Ok(x), Ok(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

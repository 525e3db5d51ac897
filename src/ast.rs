//! This module defines the typed Abstract Syntax Tree (AST) of the interpreter together
//! with the untyped S-expression data produced by the reader. [`SExpr`] is what the
//! reader hands to the syntax layer, [`Expression`] is what the evaluator, the
//! substitution engine and the desugaring pass operate on, and [`Program`] is an
//! ordered sequence of top-level expressions.
//!
//! Expressions are immutable trees. Every transformation (renaming, substitution,
//! desugaring) builds a new tree rather than editing one in place.
//!
//! The `Display` implementations unparse back into source text that the reader
//! accepts, so `format!("{expr}")` can be fed straight back into the parser.

use crate::builtinops::BuiltinOp;
use crate::value::Value;
use std::fmt;

/// Type alias for number values in interpreter
pub type NumberType = f64;

/// Allowed non-alphanumeric characters in symbol names
/// Most represent mathematical symbols or predicates ("?"), "$" supported for JavaScript identifiers
pub(crate) const SYMBOL_SPECIAL_CHARS: &str = "+-*/<>=!?_$";

/// Check if a string is a valid symbol name
/// Valid: non-empty, no leading digit, no "-digit" prefix, alphanumeric + SYMBOL_SPECIAL_CHARS
///
/// Renaming relies on this: fresh names contain `#`, which no readable symbol can.
pub(crate) fn is_valid_symbol(name: &str) -> bool {
    let mut chars = name.chars();

    match chars.next() {
        None => false, // name is empty
        Some(first_char) => {
            if first_char.is_ascii_digit() {
                return false;
            }

            if (first_char == '-' || first_char == '+')
                && let Some(second_char) = chars.next()
                && (second_char.is_ascii_digit() || second_char == '.')
            {
                return false;
            }

            name.chars()
                .all(|c| c.is_alphanumeric() || SYMBOL_SPECIAL_CHARS.contains(c))
        }
    }
}

/// Untyped S-expression as produced by the reader
#[derive(Debug, Clone, PartialEq)]
pub enum SExpr {
    Number(NumberType),
    Bool(bool),
    String(String),
    Symbol(String),
    List(Vec<SExpr>),
}

/// A `(name value)` pair, used by `let` bindings and class methods
#[derive(Debug, Clone, PartialEq)]
pub struct Binding {
    pub name: String,
    pub value: Expression,
}

impl Binding {
    pub fn new(name: impl Into<String>, value: Expression) -> Self {
        Binding {
            name: name.into(),
            value,
        }
    }
}

/// Typed expression tree
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Number(NumberType),
    Bool(bool),
    String(String),
    /// Reference to a primitive operation from the builtin registry
    PrimOp(&'static BuiltinOp),
    /// Variable reference
    Var(String),
    If {
        test: Box<Expression>,
        then: Box<Expression>,
        alt: Box<Expression>,
    },
    /// Procedure expression; `body` is never empty
    Lambda {
        params: Vec<String>,
        body: Vec<Expression>,
    },
    Application {
        operator: Box<Expression>,
        operands: Vec<Expression>,
    },
    Let {
        bindings: Vec<Binding>,
        body: Vec<Expression>,
    },
    /// Quoted datum, already converted to the value it evaluates to
    Literal(Value),
    /// Top-level definition; only legal as an element of a program
    Define {
        name: String,
        value: Box<Expression>,
    },
    /// Class expression: field names plus named methods (each expected to be a lambda)
    Class {
        fields: Vec<String>,
        methods: Vec<Binding>,
    },
}

impl Expression {
    pub fn var(name: impl Into<String>) -> Self {
        Expression::Var(name.into())
    }

    pub fn lambda(params: Vec<String>, body: Vec<Expression>) -> Self {
        Expression::Lambda { params, body }
    }

    pub fn app(operator: Expression, operands: Vec<Expression>) -> Self {
        Expression::Application {
            operator: Box::new(operator),
            operands,
        }
    }

    pub fn if_expr(test: Expression, then: Expression, alt: Expression) -> Self {
        Expression::If {
            test: Box::new(test),
            then: Box::new(then),
            alt: Box::new(alt),
        }
    }

    /// Quoted symbol, i.e. `'name`
    pub fn quoted_symbol(name: impl Into<String>) -> Self {
        Expression::Literal(Value::Symbol(name.into()))
    }

    pub fn is_lambda(&self) -> bool {
        matches!(self, Expression::Lambda { .. })
    }
}

/// Ordered sequence of top-level expressions
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
    pub exprs: Vec<Expression>,
}

impl Program {
    pub fn new(exprs: Vec<Expression>) -> Self {
        Program { exprs }
    }
}

pub(crate) fn write_string_literal(f: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    write!(f, "\"")?;
    for ch in s.chars() {
        match ch {
            '"' => write!(f, "\\\"")?,
            '\\' => write!(f, "\\\\")?,
            '\n' => write!(f, "\\n")?,
            '\t' => write!(f, "\\t")?,
            '\r' => write!(f, "\\r")?,
            c => write!(f, "{c}")?,
        }
    }
    write!(f, "\"")
}

/// Write items separated by single spaces
fn write_spaced<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: &[T]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, " ")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

fn write_bindings(f: &mut fmt::Formatter<'_>, bindings: &[Binding]) -> fmt::Result {
    write!(f, "(")?;
    for (i, Binding { name, value }) in bindings.iter().enumerate() {
        if i > 0 {
            write!(f, " ")?;
        }
        write!(f, "({name} {value})")?;
    }
    write!(f, ")")
}

impl fmt::Display for SExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SExpr::Number(n) => write!(f, "{n}"),
            SExpr::Bool(b) => write!(f, "{}", if *b { "#t" } else { "#f" }),
            SExpr::String(s) => write_string_literal(f, s),
            SExpr::Symbol(s) => write!(f, "{s}"),
            SExpr::List(elements) => {
                write!(f, "(")?;
                write_spaced(f, elements)?;
                write!(f, ")")
            }
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Number(n) => write!(f, "{n}"),
            Expression::Bool(b) => write!(f, "{}", if *b { "#t" } else { "#f" }),
            Expression::String(s) => write_string_literal(f, s),
            Expression::PrimOp(op) => write!(f, "{}", op.id),
            Expression::Var(name) => write!(f, "{name}"),
            Expression::If { test, then, alt } => write!(f, "(if {test} {then} {alt})"),
            Expression::Lambda { params, body } => {
                write!(f, "(lambda (")?;
                write_spaced(f, params)?;
                write!(f, ") ")?;
                write_spaced(f, body)?;
                write!(f, ")")
            }
            Expression::Application { operator, operands } => {
                write!(f, "({operator}")?;
                for operand in operands {
                    write!(f, " {operand}")?;
                }
                write!(f, ")")
            }
            Expression::Let { bindings, body } => {
                write!(f, "(let ")?;
                write_bindings(f, bindings)?;
                write!(f, " ")?;
                write_spaced(f, body)?;
                write!(f, ")")
            }
            Expression::Literal(value) => match value {
                // Self-evaluating data need no quote
                Value::Number(_) | Value::Bool(_) | Value::String(_) => write!(f, "{value}"),
                _ => write!(f, "'{value}"),
            },
            Expression::Define { name, value } => write!(f, "(define {name} {value})"),
            Expression::Class { fields, methods } => {
                write!(f, "(class (")?;
                write_spaced(f, fields)?;
                write!(f, ") ")?;
                write_bindings(f, methods)?;
                write!(f, ")")
            }
        }
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(L3")?;
        for expr in &self.exprs {
            write!(f, " {expr}")?;
        }
        write!(f, ")")
    }
}

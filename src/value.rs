//! Runtime values produced by evaluation.
//!
//! [`Value`] is a closed enum: the evaluator's `apply` matches it exhaustively, so the
//! set of callable things (primitives, closures, classes, objects) is fixed here.
//! Compound values are shared through `Arc` and never mutated after construction.
//!
//! Quoted data evaluate to [`Value::Symbol`] and [`Value::List`]; the empty list is the
//! only "nil". Conversion traits for common Rust types are provided so tests can build
//! values from literals with [`val`].

use crate::Error;
use crate::ast::{Binding, Expression, NumberType, SExpr, write_string_literal};
use crate::builtinops::BuiltinOp;
use crate::result::Result;
use std::fmt;
use std::sync::Arc;

/// A procedure value: formal parameters and an unevaluated body.
///
/// There is no captured environment. Free variables of the body are either top-level
/// names (looked up at evaluation time) or have already been substituted away.
#[derive(Debug, Clone, PartialEq)]
pub struct Closure {
    pub params: Vec<String>,
    pub body: Vec<Expression>,
}

/// A class value: field names and named methods
#[derive(Debug, Clone, PartialEq)]
pub struct Class {
    pub fields: Vec<String>,
    pub methods: Vec<Binding>,
}

impl Class {
    pub fn find_method(&self, name: &str) -> Option<&Expression> {
        self.methods
            .iter()
            .find(|method| method.name == name)
            .map(|method| &method.value)
    }

    pub fn method_names(&self) -> impl Iterator<Item = &str> {
        self.methods.iter().map(|method| method.name.as_str())
    }
}

/// An instance: a class whose method bodies have the field values substituted in
#[derive(Debug, Clone, PartialEq)]
pub struct Object {
    pub class: Class,
}

/// Result of evaluating an expression
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Number(NumberType),
    Bool(bool),
    String(String),
    /// Quoted symbol
    Symbol(String),
    /// Quoted or constructed list; the empty list represents nil
    List(Vec<Value>),
    PrimOp(&'static BuiltinOp),
    Closure(Arc<Closure>),
    Class(Arc<Class>),
    Object(Arc<Object>),
}

impl Value {
    pub fn closure(params: Vec<String>, body: Vec<Expression>) -> Self {
        Value::Closure(Arc::new(Closure { params, body }))
    }

    pub fn class(fields: Vec<String>, methods: Vec<Binding>) -> Self {
        Value::Class(Arc::new(Class { fields, methods }))
    }

    pub fn object(class: Class) -> Self {
        Value::Object(Arc::new(Object { class }))
    }

    /// Only the boolean `#f` is false; every other value counts as true
    pub fn is_true(&self) -> bool {
        !matches!(self, Value::Bool(false))
    }

    /// Check if a value represents nil (empty list)
    pub fn is_nil(&self) -> bool {
        matches!(self, Value::List(list) if list.is_empty())
    }

    pub fn is_procedure(&self) -> bool {
        matches!(
            self,
            Value::PrimOp(_) | Value::Closure(_) | Value::Class(_) | Value::Object(_)
        )
    }

    pub fn as_number(&self) -> Result<NumberType> {
        match self {
            Value::Number(n) => Ok(*n),
            other => Err(Error::TypeError(format!("expected number, got {other}"))),
        }
    }

    pub fn as_str(&self) -> Result<&str> {
        match self {
            Value::String(s) => Ok(s),
            other => Err(Error::TypeError(format!("expected string, got {other}"))),
        }
    }

    pub fn as_list(&self) -> Result<&[Value]> {
        match self {
            Value::List(items) => Ok(items),
            other => Err(Error::TypeError(format!("expected list, got {other}"))),
        }
    }
}

impl From<&SExpr> for Value {
    fn from(datum: &SExpr) -> Self {
        match datum {
            SExpr::Number(n) => Value::Number(*n),
            SExpr::Bool(b) => Value::Bool(*b),
            SExpr::String(s) => Value::String(s.clone()),
            SExpr::Symbol(s) => Value::Symbol(s.clone()),
            SExpr::List(items) => Value::List(items.iter().map(Value::from).collect()),
        }
    }
}

// From trait implementations for Value - enables .into() conversion
impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<NumberType> for Value {
    fn from(n: NumberType) -> Self {
        Value::Number(n)
    }
}

macro_rules! impl_from_integer {
    ($int_type:ty) => {
        impl From<$int_type> for Value {
            fn from(n: $int_type) -> Self {
                Value::Number(NumberType::from(n))
            }
        }
    };
}

impl_from_integer!(i8);
impl_from_integer!(i16);
impl_from_integer!(i32);
impl_from_integer!(u8);
impl_from_integer!(u16);
impl_from_integer!(u32);

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::List(v.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>, const N: usize> From<[T; N]> for Value {
    fn from(arr: [T; N]) -> Self {
        Value::List(arr.into_iter().map(Into::into).collect())
    }
}

/// Helper function for creating Values - works great in mixed lists!
/// Accepts any type that can be converted to Value
#[cfg_attr(not(test), expect(dead_code))]
pub(crate) fn val<T: Into<Value>>(value: T) -> Value {
    value.into()
}

/// Helper function for creating quoted symbols
#[cfg_attr(not(test), expect(dead_code))]
pub(crate) fn sym<S: AsRef<str>>(name: S) -> Value {
    Value::Symbol(name.as_ref().to_owned())
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{n}"),
            Value::Bool(b) => write!(f, "{}", if *b { "#t" } else { "#f" }),
            Value::String(s) => write_string_literal(f, s),
            Value::Symbol(s) => write!(f, "{s}"),
            Value::List(elements) => {
                write!(f, "(")?;
                for (i, elem) in elements.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{elem}")?;
                }
                write!(f, ")")
            }
            Value::PrimOp(op) => write!(f, "#<primitive:{}>", op.id),
            Value::Closure(closure) => {
                write!(f, "#<closure ({})", closure.params.join(" "))?;
                for expr in &closure.body {
                    write!(f, " {expr}")?;
                }
                write!(f, ">")
            }
            Value::Class(class) => write!(f, "#<class ({})>", class.fields.join(" ")),
            Value::Object(object) => {
                let names: Vec<&str> = object.class.method_names().collect();
                write!(f, "#<object ({})>", names.join(" "))
            }
        }
    }
}

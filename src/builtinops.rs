//! Built-in primitive operations registry.
//!
//! Primitives are ordinary procedures over evaluated arguments. The reader's syntax
//! layer turns a symbol naming a primitive into an [`Expression::PrimOp`] node that
//! points straight into this registry, so primitive names are not environment
//! bindings and cannot be shadowed by `define`.
//!
//! ```scheme
//! (+ 1 2 3)          ; arithmetic
//! (eq? 'a 'a)        ; symbol equality, used by desugared class dispatch
//! (car '(1 2 3))     ; list operations
//! ```
//!
//! ## Truthiness
//!
//! `not`, `and` and `or` follow the language's truthiness rule: only `#f` is false.
//!
//! ## Adding New Operations
//!
//! 1. **Implement the function** with the signature `fn(&[Value]) -> Result<Value>`
//! 2. **Add it to BUILTIN_OPS** with its identifier and arity
//! 3. **Add tests** covering edge cases and error conditions
//!
//! Arity is validated by [`apply_primitive`] before the function runs, so
//! implementations may index their arguments within the declared arity.
//!
//! [`Expression::PrimOp`]: crate::ast::Expression::PrimOp

use crate::Error;
use crate::ast::NumberType;
use crate::result::Result;
use crate::value::Value;
use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

/// Canonical builtin function signature
pub(crate) type OperationFn = fn(&[Value]) -> Result<Value>;

/// Number of arguments an operation accepts
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Arity {
    Exact(usize),
    AtLeast(usize),
    Any,
}

impl Arity {
    pub fn validate(&self, arg_count: usize) -> Result<()> {
        match *self {
            Arity::Exact(expected) if arg_count != expected => {
                Err(Error::arity_error(expected, arg_count))
            }
            Arity::AtLeast(expected) if arg_count < expected => {
                Err(Error::arity_error(expected, arg_count))
            }
            _ => Ok(()),
        }
    }
}

/// Definition of a built-in operation
pub struct BuiltinOp {
    /// The identifier for this operation in source text
    pub id: &'static str,
    pub(crate) func: OperationFn,
    /// Expected number of arguments
    pub arity: Arity,
}

impl std::fmt::Debug for BuiltinOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "BuiltinOp({})", self.id)
    }
}

impl PartialEq for BuiltinOp {
    fn eq(&self, other: &Self) -> bool {
        // Identifiers are unique within the registry
        self.id == other.id
    }
}

//
// Builtin Function Implementations
//

// Macro to generate chained numeric comparison functions
macro_rules! numeric_comparison {
    ($name:ident, $op:tt) => {
        fn $name(args: &[Value]) -> Result<Value> {
            let numbers = args
                .iter()
                .map(Value::as_number)
                .collect::<Result<Vec<NumberType>>>()?;
            Ok(Value::Bool(numbers.windows(2).all(|pair| pair[0] $op pair[1])))
        }
    };
}

numeric_comparison!(builtin_num_eq, ==);
numeric_comparison!(builtin_lt, <);
numeric_comparison!(builtin_gt, >);
numeric_comparison!(builtin_le, <=);
numeric_comparison!(builtin_ge, >=);

fn builtin_add(args: &[Value]) -> Result<Value> {
    let mut sum = 0.0;
    for arg in args {
        sum += arg.as_number()?;
    }
    Ok(Value::Number(sum))
}

fn builtin_mul(args: &[Value]) -> Result<Value> {
    let mut product = 1.0;
    for arg in args {
        product *= arg.as_number()?;
    }
    Ok(Value::Number(product))
}

fn builtin_sub(args: &[Value]) -> Result<Value> {
    let (first, rest) = split_first_number(args)?;
    if rest.is_empty() {
        return Ok(Value::Number(-first));
    }

    let mut result = first;
    for arg in rest {
        result -= arg.as_number()?;
    }
    Ok(Value::Number(result))
}

fn builtin_div(args: &[Value]) -> Result<Value> {
    let (first, rest) = split_first_number(args)?;
    let (mut result, divisors) = if rest.is_empty() {
        (1.0, args)
    } else {
        (first, rest)
    };

    for arg in divisors {
        let divisor = arg.as_number()?;
        if divisor == 0.0 {
            return Err(Error::EvalError("Division by zero".into()));
        }
        result /= divisor;
    }
    Ok(Value::Number(result))
}

fn split_first_number(args: &[Value]) -> Result<(NumberType, &[Value])> {
    match args {
        [first, rest @ ..] => Ok((first.as_number()?, rest)),
        [] => Err(Error::arity_error(1, 0)),
    }
}

fn builtin_not(args: &[Value]) -> Result<Value> {
    Ok(Value::Bool(!args[0].is_true()))
}

fn builtin_and(args: &[Value]) -> Result<Value> {
    Ok(args
        .iter()
        .find(|arg| !arg.is_true())
        .or(args.last())
        .cloned()
        .unwrap_or(Value::Bool(true)))
}

fn builtin_or(args: &[Value]) -> Result<Value> {
    Ok(args
        .iter()
        .find(|arg| arg.is_true())
        .cloned()
        .unwrap_or(Value::Bool(false)))
}

/// Identity-style equality: atoms by value, compound values by reference
fn values_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x == y,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::String(x), Value::String(y)) | (Value::Symbol(x), Value::Symbol(y)) => x == y,
        (Value::List(x), Value::List(y)) => x.is_empty() && y.is_empty(),
        (Value::PrimOp(x), Value::PrimOp(y)) => x == y,
        (Value::Closure(x), Value::Closure(y)) => Arc::ptr_eq(x, y),
        (Value::Class(x), Value::Class(y)) => Arc::ptr_eq(x, y),
        (Value::Object(x), Value::Object(y)) => Arc::ptr_eq(x, y),
        _ => false,
    }
}

fn builtin_eq(args: &[Value]) -> Result<Value> {
    Ok(Value::Bool(values_eq(&args[0], &args[1])))
}

fn builtin_equal(args: &[Value]) -> Result<Value> {
    Ok(Value::Bool(args[0] == args[1]))
}

fn builtin_string_eq(args: &[Value]) -> Result<Value> {
    let first = args[0].as_str()?;
    for arg in &args[1..] {
        if arg.as_str()? != first {
            return Ok(Value::Bool(false));
        }
    }
    Ok(Value::Bool(true))
}

fn builtin_cons(args: &[Value]) -> Result<Value> {
    match &args[1] {
        Value::List(tail) => {
            let mut new_list = Vec::with_capacity(tail.len() + 1);
            new_list.push(args[0].clone());
            new_list.extend_from_slice(tail);
            Ok(Value::List(new_list))
        }
        // Improper lists are not representable
        other => Err(Error::TypeError(format!(
            "cons requires a list as second argument, got {other}"
        ))),
    }
}

fn builtin_car(args: &[Value]) -> Result<Value> {
    match args[0].as_list()? {
        [first, ..] => Ok(first.clone()),
        [] => Err(Error::EvalError("car of empty list".into())),
    }
}

fn builtin_cdr(args: &[Value]) -> Result<Value> {
    match args[0].as_list()? {
        [_, rest @ ..] => Ok(Value::List(rest.to_vec())),
        [] => Err(Error::EvalError("cdr of empty list".into())),
    }
}

fn builtin_list(args: &[Value]) -> Result<Value> {
    Ok(Value::List(args.to_vec()))
}

macro_rules! type_predicate {
    ($name:ident, $pattern:pat) => {
        fn $name(args: &[Value]) -> Result<Value> {
            Ok(Value::Bool(matches!(&args[0], $pattern)))
        }
    };
}

type_predicate!(builtin_is_number, Value::Number(_));
type_predicate!(builtin_is_boolean, Value::Bool(_));
type_predicate!(builtin_is_string, Value::String(_));
type_predicate!(builtin_is_symbol, Value::Symbol(_));
type_predicate!(builtin_is_list, Value::List(_));

fn builtin_is_pair(args: &[Value]) -> Result<Value> {
    Ok(Value::Bool(matches!(&args[0], Value::List(items) if !items.is_empty())))
}

fn builtin_is_null(args: &[Value]) -> Result<Value> {
    Ok(Value::Bool(args[0].is_nil()))
}

fn builtin_is_procedure(args: &[Value]) -> Result<Value> {
    Ok(Value::Bool(args[0].is_procedure()))
}

/// Global registry of all built-in operations
static BUILTIN_OPS: &[BuiltinOp] = &[
    // Arithmetic operations
    BuiltinOp { id: "+", func: builtin_add, arity: Arity::Any },
    BuiltinOp { id: "-", func: builtin_sub, arity: Arity::AtLeast(1) },
    BuiltinOp { id: "*", func: builtin_mul, arity: Arity::Any },
    BuiltinOp { id: "/", func: builtin_div, arity: Arity::AtLeast(1) },
    // Comparison operations
    BuiltinOp { id: "=", func: builtin_num_eq, arity: Arity::AtLeast(2) },
    BuiltinOp { id: "<", func: builtin_lt, arity: Arity::AtLeast(2) },
    BuiltinOp { id: ">", func: builtin_gt, arity: Arity::AtLeast(2) },
    BuiltinOp { id: "<=", func: builtin_le, arity: Arity::AtLeast(2) },
    BuiltinOp { id: ">=", func: builtin_ge, arity: Arity::AtLeast(2) },
    // Logical operations
    BuiltinOp { id: "not", func: builtin_not, arity: Arity::Exact(1) },
    BuiltinOp { id: "and", func: builtin_and, arity: Arity::Any },
    BuiltinOp { id: "or", func: builtin_or, arity: Arity::Any },
    // Equality
    BuiltinOp { id: "eq?", func: builtin_eq, arity: Arity::Exact(2) },
    BuiltinOp { id: "equal?", func: builtin_equal, arity: Arity::Exact(2) },
    BuiltinOp { id: "string=?", func: builtin_string_eq, arity: Arity::AtLeast(2) },
    // List operations
    BuiltinOp { id: "cons", func: builtin_cons, arity: Arity::Exact(2) },
    BuiltinOp { id: "car", func: builtin_car, arity: Arity::Exact(1) },
    BuiltinOp { id: "cdr", func: builtin_cdr, arity: Arity::Exact(1) },
    BuiltinOp { id: "list", func: builtin_list, arity: Arity::Any },
    // Type predicates
    BuiltinOp { id: "pair?", func: builtin_is_pair, arity: Arity::Exact(1) },
    BuiltinOp { id: "null?", func: builtin_is_null, arity: Arity::Exact(1) },
    BuiltinOp { id: "list?", func: builtin_is_list, arity: Arity::Exact(1) },
    BuiltinOp { id: "number?", func: builtin_is_number, arity: Arity::Exact(1) },
    BuiltinOp { id: "boolean?", func: builtin_is_boolean, arity: Arity::Exact(1) },
    BuiltinOp { id: "symbol?", func: builtin_is_symbol, arity: Arity::Exact(1) },
    BuiltinOp { id: "string?", func: builtin_is_string, arity: Arity::Exact(1) },
    BuiltinOp { id: "procedure?", func: builtin_is_procedure, arity: Arity::Exact(1) },
];

/// Lazy static map from id to BuiltinOp (private - use find_primitive)
static BUILTIN_INDEX: LazyLock<HashMap<&'static str, &'static BuiltinOp>> =
    LazyLock::new(|| BUILTIN_OPS.iter().map(|op| (op.id, op)).collect());

/// Get all builtin operations
pub fn get_builtin_ops() -> &'static [BuiltinOp] {
    BUILTIN_OPS
}

/// Find a builtin operation by its identifier
pub fn find_primitive(id: &str) -> Option<&'static BuiltinOp> {
    BUILTIN_INDEX.get(id).copied()
}

/// The symbol-equality primitive, used by the class desugaring pass
pub(crate) fn eq_op() -> Option<&'static BuiltinOp> {
    find_primitive("eq?")
}

/// Apply a primitive to already-evaluated arguments
pub fn apply_primitive(op: &BuiltinOp, args: Vec<Value>) -> Result<Value> {
    tracing::trace!(op = op.id, argc = args.len(), "apply primitive");
    if let Err(Error::ArityError { expected, got, .. }) = op.arity.validate(args.len()) {
        return Err(Error::arity_error_with_context(
            expected,
            got,
            format!("primitive {}", op.id),
        ));
    }
    (op.func)(&args)
}

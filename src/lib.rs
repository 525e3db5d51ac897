//! SubstXP - substitution-model evaluator for a small Scheme dialect with classes
//!
//! This crate evaluates a small Lisp-family language without building runtime
//! environments for procedure calls. Applying a procedure renames the bound
//! variables of its body to fresh names and then substitutes the argument values
//! directly into the body text. Environments exist only for top-level `define`s.
//!
//! The language has one extension over plain Scheme: a `class` form.
//!
//! ```scheme
//! (define circle
//!   (class (r)
//!     ((area (lambda () (* r r)))
//!      (scale (lambda (k) (* k r))))))
//! (define c (circle 3))
//! (c 'area)        ; => 9
//! (c 'scale 2)     ; => 6
//! ```
//!
//! Classes can either be evaluated directly (applying a class builds an object whose
//! methods have the field values substituted in), or eliminated up front by the
//! [`desugar`] pass, which rewrites every class into a procedure returning a
//! message dispatcher. Both strategies agree on single-level classes with
//! zero-argument methods.
//!
//! ## Totality
//!
//! Every fallible step returns [`Result`]. Evaluation never panics; failures carry a
//! descriptive [`Error`] that callers can report, default, or abort on.
//!
//! ## Modules
//!
//! - `ast`: typed expressions, programs and reader data
//! - `value`: runtime values (closures, classes, objects)
//! - `result`: success/failure combinators
//! - `substitute`: alpha-renaming and capture-avoiding substitution
//! - `evaluator`: the substitution-model interpreter
//! - `desugar`: class-to-procedure rewriting
//! - `builtinops`: primitive operation registry
//! - `syntax`: S-expression to AST conversion
//! - `scheme`: text reader (feature `scheme`)
//! - `config`: interpreter configuration

use thiserror::Error;

/// Maximum parsing depth to prevent stack overflow attacks
/// This limits deeply nested structures in the S-expression reader
pub const MAX_PARSE_DEPTH: usize = 64;

/// Maximum evaluation depth to prevent stack overflow in recursive evaluation
/// Set higher than parse depth since every substitution step re-enters the evaluator.
///
/// Depth counts nested evaluation steps, not procedure calls. A recursive call
/// such as `(* n (fact (- n 1)))` nests about five steps, so plain recursion
/// stops at roughly 50 levels by default. Raise the limit with
/// [`InterpreterConfig::with_max_depth`] for deeper programs.
pub const MAX_EVAL_DEPTH: usize = 256;

/// Error types for the interpreter
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error("ParseError: {0}")]
    ParseError(String),
    #[error("EvaluationError: {0}")]
    EvalError(String),
    #[error("Type error: {0}")]
    TypeError(String),
    #[error("Unbound variable: {0}")]
    UnboundVariable(String),
    #[error("not a procedure: {0}")]
    NotAProcedure(String),
    #[error(
        "ArityError: {prefix}wrong number of arguments: expected {expected}, got {got}",
        prefix = context_prefix(.context)
    )]
    ArityError {
        expected: usize,
        got: usize,
        context: Option<String>,
    },
    #[error("Object received an unrecognized method: {0}")]
    UnrecognizedMethod(String),
    #[error("Unsupported: {0} not supported")]
    Unsupported(String),
    #[error("Bad class instance: {0}")]
    MalformedClassInstance(String),
}

fn context_prefix(context: &Option<String>) -> String {
    context.as_ref().map(|c| format!("{c}: ")).unwrap_or_default()
}

impl Error {
    /// Create an ArityError without context
    pub fn arity_error(expected: usize, got: usize) -> Self {
        Error::ArityError {
            expected,
            got,
            context: None,
        }
    }

    /// Create an ArityError naming what was called
    pub fn arity_error_with_context(expected: usize, got: usize, context: impl Into<String>) -> Self {
        Error::ArityError {
            expected,
            got,
            context: Some(context.into()),
        }
    }
}

pub mod ast;
pub mod builtinops;
pub mod config;
pub mod desugar;
pub mod evaluator;
pub mod result;
pub mod substitute;
pub mod syntax;
pub mod value;

#[cfg(feature = "scheme")]
pub mod scheme;

pub use config::{ClassStrategy, InterpreterConfig, LetMode};
pub use evaluator::{Environment, Interpreter, evaluate_program};
pub use result::Result;

#[cfg(feature = "scheme")]
pub use evaluator::evaluate_text;

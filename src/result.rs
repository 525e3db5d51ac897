//! Success/failure combinators.
//!
//! Every fallible operation in the crate returns [`Result<T>`], an alias for
//! `std::result::Result<T, Error>`. Most code propagates failures with `?`; the
//! named combinators below exist for the places where a fold or a chained callback
//! reads better than early return, and they spell out the contract each one keeps:
//!
//! - [`bind`] runs its callback only on success and returns the first failure unchanged
//! - [`mapv`] transforms a success value and leaves a failure untouched
//! - [`either`] folds a result into a single value, invoking exactly one branch

use crate::Error;

/// Result type used throughout the interpreter
pub type Result<T> = std::result::Result<T, Error>;

/// Wrap a success value
pub fn ok<T>(value: T) -> Result<T> {
    Ok(value)
}

/// Wrap a failure
pub fn failure<T>(error: Error) -> Result<T> {
    Err(error)
}

pub fn is_ok<T>(result: &Result<T>) -> bool {
    result.is_ok()
}

pub fn is_failure<T>(result: &Result<T>) -> bool {
    result.is_err()
}

/// Apply `f` to the success value, short-circuiting on failure
pub fn bind<T, U>(result: Result<T>, f: impl FnOnce(T) -> Result<U>) -> Result<U> {
    result.and_then(f)
}

/// Transform the success value, leaving a failure untouched
pub fn mapv<T, U>(result: Result<T>, f: impl FnOnce(T) -> U) -> Result<U> {
    result.map(f)
}

/// Fold a result into a single value
pub fn either<T, U>(
    result: Result<T>,
    on_ok: impl FnOnce(T) -> U,
    on_failure: impl FnOnce(Error) -> U,
) -> U {
    result.map_or_else(on_failure, on_ok)
}

/// Map a fallible function over a sequence, stopping at the first failure
pub fn map_result<T, U>(items: &[T], f: impl FnMut(&T) -> Result<U>) -> Result<Vec<U>> {
    items.iter().map(f).collect()
}

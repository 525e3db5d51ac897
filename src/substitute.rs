//! Alpha-renaming and capture-avoiding substitution.
//!
//! Applying a closure is a textual operation: the closure body gets a fresh copy of
//! every variable it binds ([`rename`]), and then the parameters are replaced by the
//! argument values turned back into expressions ([`substitute`], [`value_to_expr`]).
//!
//! Substitution is plain (non-hygienic) replacement. It is safe because renaming
//! first gives every binding site in the body a globally unique name, so a value
//! inserted for a parameter can never be captured by a binder inside the body.
//! Fresh names have the form `base#N`; `#` cannot occur in a symbol read from
//! source text, so fresh names never collide with user-written names either.

use crate::ast::{Binding, Expression};
use crate::value::Value;

/// Source of globally fresh variable names.
///
/// Owned by an interpreter and advanced through `&mut self`; the counter starts at
/// zero when the interpreter is created and never goes backwards.
#[derive(Debug, Default)]
pub struct NameGenerator {
    counter: usize,
}

impl NameGenerator {
    pub fn new() -> Self {
        NameGenerator { counter: 0 }
    }

    /// Produce a fresh name derived from `base`.
    /// Any previous `#N` suffix is dropped so repeated renaming stays readable.
    pub fn fresh(&mut self, base: &str) -> String {
        self.counter += 1;
        let stem = base.split_once('#').map_or(base, |(stem, _)| stem);
        format!("{stem}#{}", self.counter)
    }

    /// Number of names handed out so far
    pub fn issued(&self) -> usize {
        self.counter
    }
}

/// Scope of active renamings, innermost last
type Renames = Vec<(String, String)>;

fn lookup_rename<'a>(scope: &'a Renames, name: &str) -> Option<&'a str> {
    scope
        .iter()
        .rev()
        .find(|(old, _)| old == name)
        .map(|(_, new)| new.as_str())
}

/// Bind fresh names for `binders` in `scope`, returning the new names
fn push_fresh(binders: &[String], scope: &mut Renames, names: &mut NameGenerator) -> Vec<String> {
    binders
        .iter()
        .map(|old| {
            let new = names.fresh(old);
            scope.push((old.clone(), new.clone()));
            new
        })
        .collect()
}

/// Copy `exprs` with every variable bound by `lambda`, `let` or class fields replaced
/// by a fresh name throughout its scope. Free variables are left untouched.
pub fn rename(exprs: &[Expression], names: &mut NameGenerator) -> Vec<Expression> {
    let before = names.issued();
    let mut scope = Renames::new();
    let renamed: Vec<Expression> = exprs
        .iter()
        .map(|expr| rename_expr(expr, &mut scope, names))
        .collect();
    tracing::trace!(fresh = names.issued() - before, "renamed bound variables");
    renamed
}

fn rename_expr(expr: &Expression, scope: &mut Renames, names: &mut NameGenerator) -> Expression {
    match expr {
        Expression::Var(name) => match lookup_rename(scope, name) {
            Some(new) => Expression::Var(new.to_owned()),
            None => expr.clone(),
        },

        Expression::Number(_)
        | Expression::Bool(_)
        | Expression::String(_)
        | Expression::PrimOp(_)
        | Expression::Literal(_) => expr.clone(),

        Expression::If { test, then, alt } => Expression::if_expr(
            rename_expr(test, scope, names),
            rename_expr(then, scope, names),
            rename_expr(alt, scope, names),
        ),

        Expression::Application { operator, operands } => Expression::app(
            rename_expr(operator, scope, names),
            operands
                .iter()
                .map(|operand| rename_expr(operand, scope, names))
                .collect(),
        ),

        Expression::Lambda { params, body } => {
            let mark = scope.len();
            let new_params = push_fresh(params, scope, names);
            let new_body = body
                .iter()
                .map(|expr| rename_expr(expr, scope, names))
                .collect();
            scope.truncate(mark);
            Expression::lambda(new_params, new_body)
        }

        Expression::Let { bindings, body } => {
            // Binding values are outside the scope of the names they bind
            let values: Vec<Expression> = bindings
                .iter()
                .map(|binding| rename_expr(&binding.value, scope, names))
                .collect();
            let mark = scope.len();
            let binders: Vec<String> = bindings.iter().map(|b| b.name.clone()).collect();
            let new_names = push_fresh(&binders, scope, names);
            let new_body = body
                .iter()
                .map(|expr| rename_expr(expr, scope, names))
                .collect();
            scope.truncate(mark);
            Expression::Let {
                bindings: new_names
                    .into_iter()
                    .zip(values)
                    .map(|(name, value)| Binding { name, value })
                    .collect(),
                body: new_body,
            }
        }

        Expression::Class { fields, methods } => {
            let mark = scope.len();
            let new_fields = push_fresh(fields, scope, names);
            let new_methods = methods
                .iter()
                .map(|method| Binding::new(method.name.clone(), rename_expr(&method.value, scope, names)))
                .collect();
            scope.truncate(mark);
            Expression::Class {
                fields: new_fields,
                methods: new_methods,
            }
        }

        Expression::Define { name, value } => Expression::Define {
            name: name.clone(),
            value: Box::new(rename_expr(value, scope, names)),
        },
    }
}

/// Pending replacements, name to expression
type Substitution<'a> = Vec<(&'a str, &'a Expression)>;

/// Drop replacements for names re-bound by `binders`
fn without<'a>(subst: &Substitution<'a>, binders: &[String]) -> Substitution<'a> {
    subst
        .iter()
        .filter(|(name, _)| !binders.iter().any(|b| b.as_str() == *name))
        .copied()
        .collect()
}

/// Replace every free occurrence of `names[i]` in `exprs` by `replacements[i]`.
///
/// The replacement is simultaneous: inserted expressions are not themselves
/// substituted into.
pub fn substitute(exprs: &[Expression], names: &[String], replacements: &[Expression]) -> Vec<Expression> {
    let subst: Substitution<'_> = names
        .iter()
        .map(String::as_str)
        .zip(replacements.iter())
        .collect();
    exprs.iter().map(|expr| substitute_expr(expr, &subst)).collect()
}

fn substitute_expr(expr: &Expression, subst: &Substitution<'_>) -> Expression {
    if subst.is_empty() {
        return expr.clone();
    }

    match expr {
        Expression::Var(name) => subst
            .iter()
            .find(|(var, _)| *var == name.as_str())
            .map_or_else(|| expr.clone(), |(_, replacement)| (*replacement).clone()),

        Expression::Number(_)
        | Expression::Bool(_)
        | Expression::String(_)
        | Expression::PrimOp(_)
        | Expression::Literal(_) => expr.clone(),

        Expression::If { test, then, alt } => Expression::if_expr(
            substitute_expr(test, subst),
            substitute_expr(then, subst),
            substitute_expr(alt, subst),
        ),

        Expression::Application { operator, operands } => Expression::app(
            substitute_expr(operator, subst),
            operands
                .iter()
                .map(|operand| substitute_expr(operand, subst))
                .collect(),
        ),

        Expression::Lambda { params, body } => {
            let inner = without(subst, params);
            Expression::lambda(
                params.clone(),
                body.iter().map(|expr| substitute_expr(expr, &inner)).collect(),
            )
        }

        Expression::Let { bindings, body } => {
            let binders: Vec<String> = bindings.iter().map(|b| b.name.clone()).collect();
            let inner = without(subst, &binders);
            Expression::Let {
                bindings: bindings
                    .iter()
                    .map(|b| Binding::new(b.name.clone(), substitute_expr(&b.value, subst)))
                    .collect(),
                body: body.iter().map(|expr| substitute_expr(expr, &inner)).collect(),
            }
        }

        Expression::Class { fields, methods } => {
            let inner = without(subst, fields);
            Expression::Class {
                fields: fields.clone(),
                methods: methods
                    .iter()
                    .map(|m| Binding::new(m.name.clone(), substitute_expr(&m.value, &inner)))
                    .collect(),
            }
        }

        Expression::Define { name, value } => Expression::Define {
            name: name.clone(),
            value: Box::new(substitute_expr(value, subst)),
        },
    }
}

/// Turn an evaluated argument back into an expression that evaluates to it
pub fn value_to_expr(value: &Value) -> Expression {
    match value {
        Value::Number(n) => Expression::Number(*n),
        Value::Bool(b) => Expression::Bool(*b),
        Value::String(s) => Expression::String(s.clone()),
        Value::PrimOp(op) => Expression::PrimOp(*op),
        Value::Closure(closure) => Expression::lambda(closure.params.clone(), closure.body.clone()),
        Value::Symbol(_) | Value::List(_) | Value::Class(_) | Value::Object(_) => {
            Expression::Literal(value.clone())
        }
    }
}

/// Whether `name` occurs anywhere in `exprs`, as a reference or as a binder
pub fn mentions(exprs: &[Expression], name: &str) -> bool {
    exprs.iter().any(|expr| expr_mentions(expr, name))
}

fn expr_mentions(expr: &Expression, name: &str) -> bool {
    match expr {
        Expression::Var(var) => var == name,
        Expression::Number(_)
        | Expression::Bool(_)
        | Expression::String(_)
        | Expression::PrimOp(_)
        | Expression::Literal(_) => false,
        Expression::If { test, then, alt } => {
            expr_mentions(test, name) || expr_mentions(then, name) || expr_mentions(alt, name)
        }
        Expression::Application { operator, operands } => {
            expr_mentions(operator, name) || mentions(operands, name)
        }
        Expression::Lambda { params, body } => params.iter().any(|p| p == name) || mentions(body, name),
        Expression::Let { bindings, body } => {
            bindings
                .iter()
                .any(|b| b.name == name || expr_mentions(&b.value, name))
                || mentions(body, name)
        }
        Expression::Class { fields, methods } => {
            fields.iter().any(|f| f == name) || methods.iter().any(|m| expr_mentions(&m.value, name))
        }
        Expression::Define { name: defined, value } => defined == name || expr_mentions(value, name),
    }
}

//! Source-level rewrites that remove derived forms before evaluation.
//!
//! [`desugar_classes`] replaces every `class` expression by an ordinary procedure:
//!
//! ```scheme
//! (class (r) ((area (lambda () (* r r)))))
//! ;; becomes
//! (lambda (r)
//!   (lambda (msg)
//!     (if (eq? msg 'area) ((lambda () (* r r))) #f)))
//! ```
//!
//! Applying the outer procedure to field values yields a dispatcher; applying the
//! dispatcher to a message symbol runs the matching method with no arguments, or
//! yields `#f` when no method matches.
//!
//! [`let_to_application`] turns `let` into an immediately applied `lambda`.

use crate::Error;
use crate::ast::{Binding, Expression, Program};
use crate::builtinops::eq_op;
use crate::result::{Result, map_result};
use crate::substitute::mentions;

/// Base name of the dispatcher parameter
const MESSAGE_PARAM: &str = "msg";

/// Nodes that can have their classes rewritten into procedures
pub trait Desugarable: Sized {
    fn desugar(&self) -> Result<Self>;
}

impl Desugarable for Expression {
    fn desugar(&self) -> Result<Self> {
        rewrite_classes(self)
    }
}

impl Desugarable for Program {
    fn desugar(&self) -> Result<Self> {
        map_result(&self.exprs, rewrite_classes).map(Program::new)
    }
}

/// Rewrite every `class` in `node`, innermost first. The result contains no
/// [`Expression::Class`].
pub fn desugar_classes<T: Desugarable>(node: &T) -> Result<T> {
    node.desugar()
}

/// Pick the dispatcher parameter: `msg`, or `msg1`, `msg2`, ... if `msg` would
/// capture a field or a name used by a method
fn message_param(fields: &[String], methods: &[Expression]) -> String {
    let is_free = |candidate: &str| !fields.iter().any(|f| f == candidate) && !mentions(methods, candidate);
    if is_free(MESSAGE_PARAM) {
        return MESSAGE_PARAM.to_owned();
    }
    (1..)
        .map(|n| format!("{MESSAGE_PARAM}{n}"))
        .find(|candidate| is_free(candidate.as_str()))
        .unwrap_or_default()
}

/// Translate one class into a constructor procedure returning a message dispatcher
pub fn class_to_proc(fields: &[String], methods: &[Binding]) -> Result<Expression> {
    let eq = eq_op().ok_or_else(|| Error::EvalError("eq? primitive is not registered".to_owned()))?;
    let method_values: Vec<Expression> = methods.iter().map(|m| m.value.clone()).collect();
    let msg = message_param(fields, &method_values);

    let dispatch = methods
        .iter()
        .rev()
        .fold(Expression::Bool(false), |otherwise, method| {
            Expression::if_expr(
                Expression::app(
                    Expression::PrimOp(eq),
                    vec![Expression::var(msg.clone()), Expression::quoted_symbol(method.name.clone())],
                ),
                Expression::app(method.value.clone(), vec![]),
                otherwise,
            )
        });

    tracing::debug!(fields = fields.len(), methods = methods.len(), %msg, "class rewritten to dispatcher");
    Ok(Expression::lambda(
        fields.to_vec(),
        vec![Expression::lambda(vec![msg], vec![dispatch])],
    ))
}

fn rewrite_all(exprs: &[Expression]) -> Result<Vec<Expression>> {
    map_result(exprs, rewrite_classes)
}

fn rewrite_bindings(bindings: &[Binding]) -> Result<Vec<Binding>> {
    map_result(bindings, |binding| {
        Ok(Binding::new(binding.name.clone(), rewrite_classes(&binding.value)?))
    })
}

fn rewrite_classes(expr: &Expression) -> Result<Expression> {
    match expr {
        Expression::Number(_)
        | Expression::Bool(_)
        | Expression::String(_)
        | Expression::PrimOp(_)
        | Expression::Var(_)
        | Expression::Literal(_) => Ok(expr.clone()),

        Expression::If { test, then, alt } => Ok(Expression::if_expr(
            rewrite_classes(test)?,
            rewrite_classes(then)?,
            rewrite_classes(alt)?,
        )),

        Expression::Lambda { params, body } => Ok(Expression::lambda(params.clone(), rewrite_all(body)?)),

        Expression::Application { operator, operands } => Ok(Expression::app(
            rewrite_classes(operator)?,
            rewrite_all(operands)?,
        )),

        Expression::Let { bindings, body } => Ok(Expression::Let {
            bindings: rewrite_bindings(bindings)?,
            body: rewrite_all(body)?,
        }),

        Expression::Define { name, value } => Ok(Expression::Define {
            name: name.clone(),
            value: Box::new(rewrite_classes(value)?),
        }),

        Expression::Class { fields, methods } => class_to_proc(fields, &rewrite_bindings(methods)?),
    }
}

/// `(let ((x e) ...) body ...)` as `((lambda (x ...) body ...) e ...)`
pub fn let_to_application(bindings: &[Binding], body: &[Expression]) -> Expression {
    let (names, values): (Vec<String>, Vec<Expression>) = bindings
        .iter()
        .map(|binding| (binding.name.clone(), binding.value.clone()))
        .unzip();
    Expression::app(Expression::lambda(names, body.to_vec()), values)
}

#[cfg(all(test, feature = "scheme"))]
#[expect(clippy::unwrap_used)] // test code OK
mod tests {
    use super::*;
    use crate::scheme::parse_text;
    use crate::syntax::{parse_expression, parse_program};
    use pretty_assertions::assert_eq;

    fn expr(source: &str) -> Expression {
        parse_expression(&parse_text(source).unwrap()[0]).unwrap()
    }

    fn contains_class(expr: &Expression) -> bool {
        match expr {
            Expression::Class { .. } => true,
            Expression::If { test, then, alt } => {
                contains_class(test) || contains_class(then) || contains_class(alt)
            }
            Expression::Lambda { body, .. } => body.iter().any(contains_class),
            Expression::Application { operator, operands } => {
                contains_class(operator) || operands.iter().any(contains_class)
            }
            Expression::Let { bindings, body } => {
                bindings.iter().any(|b| contains_class(&b.value)) || body.iter().any(contains_class)
            }
            Expression::Define { value, .. } => contains_class(value),
            _ => false,
        }
    }

    #[test]
    fn test_class_to_proc_shape() {
        let test_cases = vec![
            (
                "(class (r) ((area (lambda () (* r r)))))",
                "(lambda (r) (lambda (msg) (if (eq? msg 'area) ((lambda () (* r r))) #f)))",
            ),
            (
                "(class (a b) ((first (lambda () a)) (second (lambda () b))))",
                "(lambda (a b) (lambda (msg) (if (eq? msg 'first) ((lambda () a)) (if (eq? msg 'second) ((lambda () b)) #f))))",
            ),
            ("(class () ())", "(lambda () (lambda (msg) #f))"),
            // The dispatcher parameter avoids fields and names the methods use
            (
                "(class (msg) ((get (lambda () msg))))",
                "(lambda (msg) (lambda (msg1) (if (eq? msg1 'get) ((lambda () msg)) #f)))",
            ),
            (
                "(class (msg) ((get (lambda () (list msg msg1)))))",
                "(lambda (msg) (lambda (msg2) (if (eq? msg2 'get) ((lambda () (list msg msg1))) #f)))",
            ),
        ];

        for (i, (input, expected)) in test_cases.into_iter().enumerate() {
            let result = desugar_classes(&expr(input)).unwrap();
            assert_eq!(result.to_string(), expected, "case #{}", i + 1);
        }
    }

    #[test]
    fn test_nested_classes_are_rewritten() {
        let test_cases = vec![
            "(class (r) ((inner (lambda () (class (s) ((get (lambda () s))))))))",
            "(let ((c (class (x) ((m (lambda () x)))))) (c 1))",
            "(if #t (class () ()) ((class (q) ((m (lambda () q)))) 2))",
            "((lambda (k) (class (f) ((m (lambda () (class () ())))))) 0)",
        ];

        for input in test_cases {
            let original = expr(input);
            assert!(contains_class(&original));
            let result = desugar_classes(&original).unwrap();
            assert!(!contains_class(&result), "class left in {result}");
        }
    }

    #[test]
    fn test_desugar_program() {
        let data = parse_text("(define c (class (r) ((area (lambda () r))))) ((c 3) 'area)").unwrap();
        let program = parse_program(&data).unwrap();
        let result = desugar_classes(&program).unwrap();

        assert_eq!(result.exprs.len(), 2);
        assert!(!result.exprs.iter().any(contains_class));
        assert_eq!(
            result.to_string(),
            "(L3 (define c (lambda (r) (lambda (msg) (if (eq? msg 'area) ((lambda () r)) #f)))) ((c 3) 'area))"
        );
        // Programs without classes come back unchanged
        let plain = parse_program(&parse_text("(define x 1) (+ x 2)").unwrap()).unwrap();
        assert_eq!(desugar_classes(&plain).unwrap(), plain);
    }

    #[test]
    fn test_let_to_application() {
        let Expression::Let { bindings, body } = expr("(let ((x 1) (y (+ 1 1))) (* x y) y)") else {
            panic!("expected let");
        };
        assert_eq!(
            let_to_application(&bindings, &body),
            expr("((lambda (x y) (* x y) y) 1 (+ 1 1))")
        );

        let Expression::Let { bindings, body } = expr("(let () 5)") else {
            panic!("expected let");
        };
        assert_eq!(let_to_application(&bindings, &body), expr("((lambda () 5))"));
    }
}

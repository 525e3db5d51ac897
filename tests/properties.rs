//! Property-based tests for the evaluator.
//!
//! Generated programs check that:
//! 1. Literals evaluate to themselves whatever has been defined before them
//! 2. `if` takes the alternative only for `#f`
//! 3. Closure application never captures a caller's variable
//! 4. Inline class evaluation and the desugaring pass agree on `((C v ...) 'm)`

#![cfg(feature = "scheme")]
#![allow(clippy::unwrap_used, clippy::expect_used, reason = "Tests can panic")]

use proptest::prelude::*;
use substxp::builtinops::find_primitive;
use substxp::value::Value;
use substxp::{ClassStrategy, Interpreter, InterpreterConfig, evaluate_text};

// -- Generation Strategies --

const KEYWORDS: &[&str] = &["quote", "if", "lambda", "let", "class", "define"];

/// A name usable as a variable: not a keyword and not a primitive
fn identifier_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z][a-z0-9]{0,6}")
        .expect("valid regex")
        .prop_filter("not reserved", |s| {
            !KEYWORDS.contains(&s.as_str()) && find_primitive(s).is_none()
        })
}

/// Source text of a self-evaluating literal, paired with its value
fn literal_strategy() -> impl Strategy<Value = (String, Value)> {
    prop_oneof![
        (-100_000i32..100_000).prop_map(|n| (n.to_string(), Value::Number(f64::from(n)))),
        (0i32..1000).prop_map(|n| (format!("{n}.5"), Value::Number(f64::from(n) + 0.5))),
        any::<bool>().prop_map(|b| (if b { "#t" } else { "#f" }.to_owned(), Value::Bool(b))),
        "[a-zA-Z0-9 ]{0,12}".prop_map(|s| (format!("\"{s}\""), Value::String(s))),
    ]
}

/// Any value that can be written as a quoted or literal test expression
fn test_value_strategy() -> impl Strategy<Value = (String, bool)> {
    prop_oneof![
        literal_strategy().prop_map(|(source, value)| {
            let falsy = value == Value::Bool(false);
            (source, falsy)
        }),
        identifier_strategy().prop_map(|name| (format!("'{name}"), false)),
        Just(("'()".to_owned(), false)),
        Just(("(lambda () #f)".to_owned(), false)),
    ]
}

/// A class with `fields` fields and one zero-argument method per generated body
fn class_strategy() -> impl Strategy<Value = (usize, Vec<String>, Vec<i32>)> {
    (1usize..4).prop_flat_map(|fields| {
        let body = prop_oneof![
            (0..fields).prop_map(|i| format!("f{i}")),
            (0..fields, 0..fields).prop_map(|(i, j)| format!("(+ f{i} f{j})")),
            (0..fields, -5i32..5).prop_map(|(i, k)| format!("(* f{i} {k})")),
            (0..fields).prop_map(|i| format!("(if (< f{i} 0) 'neg 'pos)")),
        ];
        (
            Just(fields),
            prop::collection::vec(body, 1..4),
            prop::collection::vec(-50i32..50, fields),
        )
    })
}

fn class_source(fields: usize, bodies: &[String]) -> String {
    let field_names: Vec<String> = (0..fields).map(|i| format!("f{i}")).collect();
    let methods: Vec<String> = bodies
        .iter()
        .enumerate()
        .map(|(i, body)| format!("(m{i} (lambda () {body}))"))
        .collect();
    format!("(class ({}) ({}))", field_names.join(" "), methods.join(" "))
}

fn evaluate_with(strategy: ClassStrategy, source: &str) -> Value {
    let config = InterpreterConfig::default().with_class_strategy(strategy);
    Interpreter::with_config(config)
        .evaluate_text(source)
        .unwrap_or_else(|e| panic!("failed to evaluate {source}: {e}"))
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 128,
        ..ProptestConfig::default()
    })]

    /// Literals ignore the environment they are evaluated in.
    #[test]
    fn prop_literals_evaluate_to_themselves(
        (source, expected) in literal_strategy(),
        name in identifier_strategy(),
        (other, _) in literal_strategy(),
    ) {
        let program = format!("(define {name} {other}) {source}");
        prop_assert_eq!(evaluate_text(&program).unwrap(), expected.clone());
        prop_assert_eq!(evaluate_text(&source).unwrap(), expected);
    }

    /// Only `#f` selects the alternative branch.
    #[test]
    fn prop_if_truthiness((test, falsy) in test_value_strategy()) {
        let result = evaluate_text(&format!("(if {test} 'then 'else)")).unwrap();
        let expected = if falsy { "else" } else { "then" };
        prop_assert_eq!(result, Value::Symbol(expected.to_owned()));
    }

    /// A parameter of the callee never captures a free variable of an argument.
    #[test]
    fn prop_application_is_capture_free(
        name in identifier_strategy(),
        outer in -1000i32..1000,
        inner in -1000i32..1000,
    ) {
        prop_assume!(name != "f" && name != "g");
        let program = format!(
            "(define {name} {outer}) (define g (lambda () {name})) ((lambda (f) ((lambda ({name}) (f)) {inner})) g)"
        );
        prop_assert_eq!(evaluate_text(&program).unwrap(), Value::Number(f64::from(outer)));
    }

    /// Two instances of one closure stay independent.
    #[test]
    fn prop_closure_instances_are_independent(a in -100i32..100, b in -100i32..100, c in -100i32..100) {
        let program = format!(
            "(define add (lambda (x) (lambda (y) (+ x y)))) (define p (add {a})) (define q (add {b})) (list (p {c}) (q {c}) (p {c}))"
        );
        let sum = |n: i32| Value::Number(f64::from(n + c));
        prop_assert_eq!(
            evaluate_text(&program).unwrap(),
            Value::List(vec![sum(a), sum(b), sum(a)])
        );
    }

    /// Inline classes and desugared classes give the same answer for every method.
    #[test]
    fn prop_inline_and_desugared_classes_agree((fields, bodies, values) in class_strategy()) {
        let class = class_source(fields, &bodies);
        let args: Vec<String> = values.iter().map(i32::to_string).collect();
        for method in 0..bodies.len() {
            let program = format!(
                "(define c {class}) (define o (c {})) (o 'm{method})",
                args.join(" ")
            );
            let inline = evaluate_with(ClassStrategy::Inline, &program);
            let desugared = evaluate_with(ClassStrategy::Desugar, &program);
            prop_assert_eq!(inline, desugared, "program: {}", program);
        }
    }
}

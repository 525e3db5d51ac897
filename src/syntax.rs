//! Conversion from reader data ([`SExpr`]) into the typed [`Expression`] AST.
//!
//! Special forms are recognised by their head symbol: `quote`, `if`, `lambda`,
//! `let`, `class` and (at top level only) `define`. Any other list is an
//! application. Symbols naming a primitive operation become
//! [`Expression::PrimOp`] nodes; all other symbols are variable references.

use crate::Error;
use crate::ast::{Binding, Expression, Program, SExpr, is_valid_symbol};
use crate::builtinops::find_primitive;
use crate::result::{Result, map_result};
use crate::value::Value;

/// Head symbol of the optional program wrapper `(L3 form...)`
pub const PROGRAM_TAG: &str = "L3";

const KEYWORDS: &[&str] = &["quote", "if", "lambda", "let", "class", "define", PROGRAM_TAG];

fn is_keyword(name: &str) -> bool {
    KEYWORDS.contains(&name)
}

fn syntax_error(message: impl Into<String>) -> Error {
    Error::ParseError(message.into())
}

/// Parse a single expression. `define` is rejected here; use [`parse_program`].
pub fn parse_expression(sexpr: &SExpr) -> Result<Expression> {
    match sexpr {
        SExpr::Number(n) => Ok(Expression::Number(*n)),
        SExpr::Bool(b) => Ok(Expression::Bool(*b)),
        SExpr::String(s) => Ok(Expression::String(s.clone())),
        SExpr::Symbol(name) => parse_symbol(name),
        SExpr::List(elements) => parse_compound(elements),
    }
}

/// Parse a program: either a bare sequence of top-level forms, or a single
/// `(L3 form...)` wrapper around them.
pub fn parse_program(sexprs: &[SExpr]) -> Result<Program> {
    let forms = match sexprs {
        [SExpr::List(elements)] if is_tagged(elements, PROGRAM_TAG) => &elements[1..],
        _ => sexprs,
    };
    map_result(forms, parse_top_level).map(Program::new)
}

fn parse_top_level(sexpr: &SExpr) -> Result<Expression> {
    match sexpr {
        SExpr::List(elements) if is_tagged(elements, "define") => parse_define(&elements[1..]),
        _ => parse_expression(sexpr),
    }
}

fn is_tagged(elements: &[SExpr], tag: &str) -> bool {
    matches!(elements.first(), Some(SExpr::Symbol(head)) if head == tag)
}

fn parse_symbol(name: &str) -> Result<Expression> {
    if let Some(op) = find_primitive(name) {
        return Ok(Expression::PrimOp(op));
    }
    if is_keyword(name) {
        return Err(syntax_error(format!("Unexpected keyword '{name}'")));
    }
    parse_identifier(&SExpr::Symbol(name.to_owned())).map(Expression::Var)
}

/// An identifier usable as a variable, parameter, field or method name
fn parse_identifier(sexpr: &SExpr) -> Result<String> {
    match sexpr {
        SExpr::Symbol(name) if is_keyword(name) => {
            Err(syntax_error(format!("Keyword '{name}' cannot be used as a name")))
        }
        SExpr::Symbol(name) if find_primitive(name).is_some() => {
            Err(syntax_error(format!("Primitive '{name}' cannot be rebound")))
        }
        SExpr::Symbol(name) if is_valid_symbol(name) => Ok(name.clone()),
        other => Err(syntax_error(format!("Expected identifier, got {other}"))),
    }
}

/// Parse a list of distinct identifiers, e.g. lambda parameters or class fields
fn parse_identifier_list(sexpr: &SExpr, what: &str) -> Result<Vec<String>> {
    let SExpr::List(elements) = sexpr else {
        return Err(syntax_error(format!("Expected {what} list, got {sexpr}")));
    };
    let names = map_result(elements, parse_identifier)?;
    check_distinct(&names, what)?;
    Ok(names)
}

fn check_distinct(names: &[String], what: &str) -> Result<()> {
    for (i, name) in names.iter().enumerate() {
        if names[..i].contains(name) {
            return Err(syntax_error(format!("Duplicate {what} name '{name}'")));
        }
    }
    Ok(())
}

/// Parse `((name expr) ...)`, used by `let` bindings and class methods
fn parse_bindings(sexpr: &SExpr, what: &str) -> Result<Vec<Binding>> {
    let SExpr::List(pairs) = sexpr else {
        return Err(syntax_error(format!("Expected {what} list, got {sexpr}")));
    };
    let bindings = map_result(pairs, |pair| match pair {
        SExpr::List(parts) if parts.len() == 2 => Ok(Binding::new(
            parse_identifier(&parts[0])?,
            parse_expression(&parts[1])?,
        )),
        other => Err(syntax_error(format!("Malformed {what}: {other}"))),
    })?;
    let names: Vec<String> = bindings.iter().map(|b| b.name.clone()).collect();
    check_distinct(&names, what)?;
    Ok(bindings)
}

fn parse_body(forms: &[SExpr], form: &str) -> Result<Vec<Expression>> {
    if forms.is_empty() {
        return Err(syntax_error(format!("{form}: body must not be empty")));
    }
    map_result(forms, parse_expression)
}

fn parse_compound(elements: &[SExpr]) -> Result<Expression> {
    let Some((head, rest)) = elements.split_first() else {
        return Err(syntax_error("Empty combination ()"));
    };

    if let SExpr::Symbol(keyword) = head {
        match keyword.as_str() {
            "quote" => return parse_quote(rest),
            "if" => return parse_if(rest),
            "lambda" => return parse_lambda(rest),
            "let" => return parse_let(rest),
            "class" => return parse_class(rest),
            "define" => return Err(syntax_error("define is only allowed at top level")),
            PROGRAM_TAG => return Err(syntax_error("L3 program wrapper must be outermost")),
            _ => {}
        }
    }

    Ok(Expression::app(
        parse_expression(head)?,
        map_result(rest, parse_expression)?,
    ))
}

fn parse_quote(rest: &[SExpr]) -> Result<Expression> {
    match rest {
        [datum] => Ok(Expression::Literal(Value::from(datum))),
        _ => Err(syntax_error("quote requires exactly 1 argument")),
    }
}

fn parse_if(rest: &[SExpr]) -> Result<Expression> {
    match rest {
        [test, then, alt] => Ok(Expression::if_expr(
            parse_expression(test)?,
            parse_expression(then)?,
            parse_expression(alt)?,
        )),
        _ => Err(syntax_error(format!(
            "if requires exactly 3 arguments, got {}",
            rest.len()
        ))),
    }
}

fn parse_lambda(rest: &[SExpr]) -> Result<Expression> {
    let Some((params, body)) = rest.split_first() else {
        return Err(syntax_error("lambda requires a parameter list"));
    };
    Ok(Expression::lambda(
        parse_identifier_list(params, "parameter")?,
        parse_body(body, "lambda")?,
    ))
}

fn parse_let(rest: &[SExpr]) -> Result<Expression> {
    let Some((bindings, body)) = rest.split_first() else {
        return Err(syntax_error("let requires a binding list"));
    };
    Ok(Expression::Let {
        bindings: parse_bindings(bindings, "binding")?,
        body: parse_body(body, "let")?,
    })
}

fn parse_class(rest: &[SExpr]) -> Result<Expression> {
    match rest {
        [fields, methods] => Ok(Expression::Class {
            fields: parse_identifier_list(fields, "field")?,
            methods: parse_bindings(methods, "method")?,
        }),
        _ => Err(syntax_error("class requires a field list and a method list")),
    }
}

fn parse_define(rest: &[SExpr]) -> Result<Expression> {
    match rest {
        [name, value] => Ok(Expression::Define {
            name: parse_identifier(name)?,
            value: Box::new(parse_expression(value)?),
        }),
        _ => Err(syntax_error("define requires a name and a value")),
    }
}

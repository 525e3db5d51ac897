use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::{tag, take_while1},
    character::complete::{char, digit0, digit1, multispace0, one_of},
    combinator::{opt, value},
    error::ErrorKind,
    sequence::pair,
};

use crate::Error;
use crate::MAX_PARSE_DEPTH;
use crate::ast::{NumberType, SExpr, SYMBOL_SPECIAL_CHARS, is_valid_symbol};
use crate::result::Result;

type ParseResult<'a, T> = IResult<&'a str, T>;

fn parse_failure(input: &str, kind: ErrorKind) -> nom::Err<nom::error::Error<&str>> {
    nom::Err::Error(nom::error::Error::new(input, kind))
}

/// Like [`parse_failure`], but stops `alt` from trying other branches
fn parse_abort(input: &str, kind: ErrorKind) -> nom::Err<nom::error::Error<&str>> {
    nom::Err::Failure(nom::error::Error::new(input, kind))
}

/// Convert nom parsing errors to user-friendly messages
fn parse_error_to_message(input: &str, error: nom::Err<nom::error::Error<&str>>) -> String {
    match error {
        nom::Err::Error(e) | nom::Err::Failure(e) => {
            let position = input.len().saturating_sub(e.input.len());
            match e.code {
                ErrorKind::Char => format!("Expected character at position {position}"),
                ErrorKind::Tag => format!("Unexpected token at position {position}"),
                ErrorKind::TooLarge => {
                    format!("Expression too deeply nested (max depth: {MAX_PARSE_DEPTH})")
                }
                ErrorKind::Eof => "Unexpected end of input".into(),
                _ => {
                    if position < input.len() {
                        let remaining_chars: String =
                            input.chars().skip(position).take(10).collect();
                        format!("Invalid syntax near '{remaining_chars}'")
                    } else {
                        "Unexpected end of input".into()
                    }
                }
            }
        }
        nom::Err::Incomplete(_) => "Incomplete input".into(),
    }
}

/// Skip whitespace and `;` line comments
fn skip_whitespace(input: &str) -> ParseResult<'_, ()> {
    let mut input = input;
    loop {
        let (rest, _) = multispace0::<_, nom::error::Error<&str>>(input)?;
        match rest.strip_prefix(';') {
            Some(comment) => input = comment.find('\n').map_or("", |end| &comment[end..]),
            None => return Ok((rest, ())),
        }
    }
}

/// Atoms must end at a delimiter, so `1abc` is an error rather than `1` then `abc`
fn at_delimiter(input: &str) -> bool {
    input
        .chars()
        .next()
        .is_none_or(|c| c.is_whitespace() || "()';\"".contains(c))
}

/// Parse a number (decimal with optional fraction, or #x hexadecimal)
fn parse_number(input: &str) -> ParseResult<'_, SExpr> {
    let (rest, number) = alt((parse_hexadecimal, parse_decimal)).parse(input)?;
    if at_delimiter(rest) {
        Ok((rest, number))
    } else {
        Err(parse_failure(input, ErrorKind::Digit))
    }
}

fn parse_decimal(input: &str) -> ParseResult<'_, SExpr> {
    let (rest, _) = (opt(one_of("+-")), digit1, opt(pair(char('.'), digit0))).parse(input)?;
    let number_str = &input[..input.len() - rest.len()];

    match number_str.parse::<NumberType>() {
        Ok(n) => Ok((rest, SExpr::Number(n))),
        Err(_) => Err(parse_failure(input, ErrorKind::Digit)),
    }
}

/// Parse a hexadecimal number (#x or #X prefix)
fn parse_hexadecimal(input: &str) -> ParseResult<'_, SExpr> {
    let (input, _) = char('#').parse(input)?;
    let (input, _) = one_of("xX").parse(input)?;
    let (rest, hex_digits) = take_while1(|c: char| c.is_ascii_hexdigit()).parse(input)?;

    match i64::from_str_radix(hex_digits, 16) {
        // Precision loss above 2^53 matches the reader's float number model
        Ok(n) => Ok((rest, SExpr::Number(n as NumberType))),
        Err(_) => Err(parse_failure(input, ErrorKind::HexDigit)),
    }
}

/// Parse a boolean (#t/#f, also #true/#false)
fn parse_bool(input: &str) -> ParseResult<'_, SExpr> {
    let (rest, parsed) = alt((
        value(SExpr::Bool(true), tag("#true")),
        value(SExpr::Bool(false), tag("#false")),
        value(SExpr::Bool(true), tag("#t")),
        value(SExpr::Bool(false), tag("#f")),
    ))
    .parse(input)?;

    if at_delimiter(rest) {
        Ok((rest, parsed))
    } else {
        Err(parse_failure(input, ErrorKind::Tag))
    }
}

/// Parse a symbol (identifier)
fn parse_symbol(input: &str) -> ParseResult<'_, SExpr> {
    let mut symbol_chars =
        take_while1(|c: char| c.is_alphanumeric() || SYMBOL_SPECIAL_CHARS.contains(c));

    let (remaining, candidate) = symbol_chars.parse(input)?;

    if is_valid_symbol(candidate) && at_delimiter(remaining) {
        Ok((remaining, SExpr::Symbol(candidate.into())))
    } else {
        Err(parse_failure(input, ErrorKind::Alpha))
    }
}

/// Parse a string literal
fn parse_string(input: &str) -> ParseResult<'_, SExpr> {
    let (mut remaining, _) = char('"').parse(input)?;
    let mut chars = String::new();

    loop {
        let mut char_iter = remaining.chars();
        match char_iter.next() {
            Some('"') => return Ok((char_iter.as_str(), SExpr::String(chars))),
            Some('\\') => {
                match char_iter.next() {
                    Some('n') => chars.push('\n'),
                    Some('t') => chars.push('\t'),
                    Some('r') => chars.push('\r'),
                    Some('\\') => chars.push('\\'),
                    Some('"') => chars.push('"'),
                    // Unknown or incomplete escape sequence
                    Some(_) | None => return Err(parse_abort(remaining, ErrorKind::Char)),
                }
                remaining = char_iter.as_str();
            }
            Some(ch) => {
                chars.push(ch);
                remaining = char_iter.as_str();
            }
            // Reached end of input without finding closing quote
            None => return Err(parse_abort(remaining, ErrorKind::Char)),
        }
    }
}

/// Parse a parenthesised list
fn parse_list(input: &str, depth: usize) -> ParseResult<'_, SExpr> {
    let (mut input, _) = char('(').parse(input)?;
    let mut elements = Vec::new();

    loop {
        let (rest, ()) = skip_whitespace(input)?;
        if let Some(after) = rest.strip_prefix(')') {
            return Ok((after, SExpr::List(elements)));
        }
        if rest.is_empty() {
            return Err(parse_abort(rest, ErrorKind::Eof));
        }
        let (rest, element) = parse_sexpr(rest, depth + 1)?;
        elements.push(element);
        input = rest;
    }
}

/// Parse quoted expression ('expr -> (quote expr))
fn parse_quote(input: &str, depth: usize) -> ParseResult<'_, SExpr> {
    let (input, _) = char('\'').parse(input)?;
    let (input, ()) = skip_whitespace(input)?;
    let (input, expr) = parse_sexpr(input, depth + 1)?;
    Ok((input, SExpr::List(vec![SExpr::Symbol("quote".into()), expr])))
}

/// Parse one S-expression (leading whitespace already skipped)
fn parse_sexpr(input: &str, depth: usize) -> ParseResult<'_, SExpr> {
    if depth >= MAX_PARSE_DEPTH {
        return Err(parse_abort(input, ErrorKind::TooLarge));
    }
    alt((
        |input| parse_quote(input, depth),
        |input| parse_list(input, depth),
        parse_number,
        parse_bool,
        parse_string,
        parse_symbol,
    ))
    .parse(input)
}

/// Parse every top-level S-expression in `input`.
pub fn parse_text(input: &str) -> Result<Vec<SExpr>> {
    let to_error = |e| Error::ParseError(parse_error_to_message(input, e));
    let mut forms = Vec::new();
    let mut rest = input;

    loop {
        let (after_ws, ()) = skip_whitespace(rest).map_err(to_error)?;
        if after_ws.is_empty() {
            return Ok(forms);
        }
        let (after, form) = parse_sexpr(after_ws, 0).map_err(to_error)?;
        forms.push(form);
        rest = after;
    }
}

/// Parse exactly one S-expression.
pub fn parse_datum(input: &str) -> Result<SExpr> {
    let mut forms = parse_text(input)?;
    match forms.len() {
        1 => Ok(forms.remove(0)),
        0 => Err(Error::ParseError("Unexpected end of input".into())),
        _ => Err(Error::ParseError(format!(
            "Unexpected remaining input after '{}'",
            forms[0]
        ))),
    }
}

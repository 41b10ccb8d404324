/// Filter expression parser
///
/// Precedence, loosest first:
/// OR, AND, comparison (non-associative), `+ -`, `* /`, unary `-`/`NOT`, primary.
/// Primaries are field names, numbers, quoted strings, TRUE/FALSE/NULL and
/// parenthesised sub-expressions. Aggregate calls are rejected here; they only
/// belong in a select list.

use super::common::{
    identifier, keyword, non_keyword_identifier, number_literal, string_literal, to_query_error,
    ws, PResult, SyntaxError,
};
use super::statement::{AggregateKind, BinaryOperator, Expression, UnaryOperator};
use crate::core::{QueryError, QueryResult, Scalar};
use nom::{
    branch::alt,
    bytes::complete::tag,
    character::complete::char,
    combinator::{cut, map, value},
    sequence::{delimited, preceded, tuple},
};

/// Parses a complete filter expression.
pub fn parse_expression(text: &str) -> QueryResult<Expression> {
    parse_expression_at(text, 0)
}

/// Same as [`parse_expression`], reporting positions relative to `offset`.
pub(crate) fn parse_expression_at(text: &str, offset: usize) -> QueryResult<Expression> {
    if text.trim().is_empty() {
        return Err(QueryError::parse(offset, "expected an expression"));
    }

    match ws(or_expr)(text) {
        Ok(("", expr)) => Ok(expr),
        Ok((rest, _)) => Err(to_query_error(
            text,
            offset,
            nom::Err::Error(SyntaxError::new(rest, super::common::describe_unexpected(rest))),
        )),
        Err(e) => Err(to_query_error(text, offset, e)),
    }
}

/// Parses `operand (operator operand)*`, folding to the left.
fn left_assoc<'a>(
    input: &'a str,
    operand: fn(&'a str) -> PResult<'a, Expression>,
    operator: fn(&'a str) -> PResult<'a, BinaryOperator>,
) -> PResult<'a, Expression> {
    let (mut input, mut acc) = operand(input)?;
    loop {
        match operator(input) {
            Ok((rest, op)) => {
                let (rest, rhs) = cut(operand)(rest)?;
                acc = Expression::binary(op, acc, rhs);
                input = rest;
            }
            Err(nom::Err::Error(_)) => return Ok((input, acc)),
            Err(e) => return Err(e),
        }
    }
}

fn or_expr(input: &str) -> PResult<'_, Expression> {
    left_assoc(input, and_expr, or_operator)
}

fn or_operator(input: &str) -> PResult<'_, BinaryOperator> {
    ws(alt((
        value(BinaryOperator::Or, keyword("OR")),
        value(BinaryOperator::Or, tag("||")),
    )))(input)
}

fn and_expr(input: &str) -> PResult<'_, Expression> {
    left_assoc(input, comparison, and_operator)
}

fn and_operator(input: &str) -> PResult<'_, BinaryOperator> {
    ws(alt((
        value(BinaryOperator::And, keyword("AND")),
        value(BinaryOperator::And, tag("&&")),
    )))(input)
}

fn comparison(input: &str) -> PResult<'_, Expression> {
    let (input, left) = additive(input)?;
    match comparison_operator(input) {
        Ok((rest, op)) => {
            let (rest, right) = cut(additive)(rest)?;
            Ok((rest, Expression::binary(op, left, right)))
        }
        Err(nom::Err::Error(_)) => Ok((input, left)),
        Err(e) => Err(e),
    }
}

fn comparison_operator(input: &str) -> PResult<'_, BinaryOperator> {
    ws(alt((
        value(BinaryOperator::Ge, tag(">=")),
        value(BinaryOperator::Le, tag("<=")),
        value(BinaryOperator::NotEq, tag("!=")),
        value(BinaryOperator::NotEq, tag("<>")),
        value(BinaryOperator::Eq, tag("==")),
        value(BinaryOperator::Eq, tag("=")),
        value(BinaryOperator::Gt, tag(">")),
        value(BinaryOperator::Lt, tag("<")),
    )))(input)
}

fn additive(input: &str) -> PResult<'_, Expression> {
    left_assoc(input, multiplicative, additive_operator)
}

fn additive_operator(input: &str) -> PResult<'_, BinaryOperator> {
    ws(alt((
        value(BinaryOperator::Add, char('+')),
        value(BinaryOperator::Sub, char('-')),
    )))(input)
}

fn multiplicative(input: &str) -> PResult<'_, Expression> {
    left_assoc(input, unary, multiplicative_operator)
}

fn multiplicative_operator(input: &str) -> PResult<'_, BinaryOperator> {
    ws(alt((
        value(BinaryOperator::Mul, char('*')),
        value(BinaryOperator::Div, char('/')),
    )))(input)
}

fn unary(input: &str) -> PResult<'_, Expression> {
    alt((
        map(preceded(ws(char('-')), cut(unary)), negate),
        map(
            preceded(ws(alt((keyword("NOT"), tag("!")))), cut(unary)),
            |operand| Expression::unary(UnaryOperator::Not, operand),
        ),
        primary,
    ))(input)
}

/// `-` applied to a numeric literal folds into the literal.
fn negate(operand: Expression) -> Expression {
    match operand {
        Expression::Literal(Scalar::Number(n)) => Expression::Literal(Scalar::Number(-n)),
        other => Expression::unary(UnaryOperator::Neg, other),
    }
}

fn primary(input: &str) -> PResult<'_, Expression> {
    ws(alt((
        aggregate_call,
        delimited(char('('), cut(ws(or_expr)), cut(char(')'))),
        map(number_literal, |n| Expression::Literal(Scalar::Number(n))),
        map(string_literal, |s| Expression::Literal(Scalar::String(s))),
        value(Expression::Literal(Scalar::Boolean(true)), keyword("TRUE")),
        value(Expression::Literal(Scalar::Boolean(false)), keyword("FALSE")),
        value(Expression::Literal(Scalar::Null), keyword("NULL")),
        map(non_keyword_identifier, Expression::Field),
    )))(input)
}

/// Recognises `FUNC(field)` only to reject it with a precise position.
fn aggregate_call(input: &str) -> PResult<'_, Expression> {
    let (_, (name, _, field, _)) = tuple((
        identifier,
        ws(char('(')),
        ws(alt((identifier, map(char('*'), |_| "*".to_string())))),
        char(')'),
    ))(input)?;

    let message = if AggregateKind::from_name(&name).is_ok() {
        format!("aggregate {name}({field}) is only allowed in the select list")
    } else {
        format!("unknown function {name}")
    };
    Err(nom::Err::Failure(SyntaxError::new(input, message)))
}

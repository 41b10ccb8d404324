use crate::core::QueryError;
use nom::{
    branch::alt,
    bytes::complete::{tag, tag_no_case, take_while},
    character::complete::{alpha1, char, digit1, multispace0, satisfy},
    combinator::{map, map_res, not, opt, recognize, verify},
    error::{ErrorKind, FromExternalError, ParseError},
    sequence::{delimited, pair, terminated, tuple},
    IResult,
};

/// Words that can never be field names inside an expression.
const RESERVED_WORDS: [&str; 6] = ["AND", "OR", "NOT", "TRUE", "FALSE", "NULL"];

/// nom error carrying the remaining input (for the position) and a readable message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxError<'a> {
    pub input: &'a str,
    pub message: String,
}

impl<'a> SyntaxError<'a> {
    pub fn new(input: &'a str, message: impl Into<String>) -> Self {
        Self {
            input,
            message: message.into(),
        }
    }
}

impl<'a> ParseError<&'a str> for SyntaxError<'a> {
    fn from_error_kind(input: &'a str, _kind: ErrorKind) -> Self {
        Self::new(input, describe_unexpected(input))
    }

    fn append(_input: &'a str, _kind: ErrorKind, other: Self) -> Self {
        other
    }
}

impl<'a, E: std::fmt::Display> FromExternalError<&'a str, E> for SyntaxError<'a> {
    fn from_external_error(input: &'a str, _kind: ErrorKind, e: E) -> Self {
        Self::new(input, format!("invalid literal: {e}"))
    }
}

pub type PResult<'a, O> = IResult<&'a str, O, SyntaxError<'a>>;

pub fn describe_unexpected(input: &str) -> String {
    if input.trim().is_empty() {
        "unexpected end of input".to_string()
    } else {
        let snippet: String = input.trim_start().chars().take(16).collect();
        format!("unexpected input '{snippet}'")
    }
}

/// Maps a nom failure to a `ParseError` whose position is a byte offset into the
/// enclosing query (`offset` is where `source` starts within it).
pub fn to_query_error(source: &str, offset: usize, err: nom::Err<SyntaxError<'_>>) -> QueryError {
    match err {
        nom::Err::Incomplete(_) => QueryError::parse(offset + source.len(), "incomplete input"),
        nom::Err::Error(e) | nom::Err::Failure(e) => {
            QueryError::parse(offset + source.len().saturating_sub(e.input.len()), e.message)
        }
    }
}

pub fn ws<'a, F, O>(inner: F) -> impl FnMut(&'a str) -> PResult<'a, O>
where
    F: FnMut(&'a str) -> PResult<'a, O>,
{
    delimited(multispace0, inner, multispace0)
}

const fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

pub fn identifier(input: &str) -> PResult<'_, String> {
    map(
        recognize(pair(
            alt((alpha1, tag("_"))),
            take_while(|c: char| c.is_alphanumeric() || c == '_'),
        )),
        |s: &str| s.to_string(),
    )(input)
}

/// Identifier that is not a reserved word; used for field references in expressions.
pub fn non_keyword_identifier(input: &str) -> PResult<'_, String> {
    verify(identifier, |s: &String| {
        !RESERVED_WORDS.iter().any(|word| word.eq_ignore_ascii_case(s))
    })(input)
}

/// Case-insensitive keyword that must end at a word boundary (`AND` but not `ANDroid`).
pub fn keyword<'a>(word: &'static str) -> impl FnMut(&'a str) -> PResult<'a, &'a str> {
    terminated(tag_no_case(word), not(satisfy(is_ident_char)))
}

/// Unsigned decimal number: `12`, `3.5`, `1e3`, `2.5E-2`.
pub fn number_literal(input: &str) -> PResult<'_, f64> {
    map_res(
        recognize(tuple((
            digit1,
            opt(pair(char('.'), digit1)),
            opt(tuple((
                alt((char('e'), char('E'))),
                opt(alt((char('+'), char('-')))),
                digit1,
            ))),
        ))),
        str::parse::<f64>,
    )(input)
}

/// Single- or double-quoted string; the quote character doubled is a literal quote.
pub fn string_literal(input: &str) -> PResult<'_, String> {
    let Some(quote) = input.chars().next().filter(|c| *c == '\'' || *c == '"') else {
        return Err(nom::Err::Error(SyntaxError::new(input, "expected a string literal")));
    };

    let mut text = String::new();
    let mut rest = &input[1..];
    loop {
        let Some(end) = rest.find(quote) else {
            return Err(nom::Err::Failure(SyntaxError::new(
                input,
                "unterminated string literal",
            )));
        };
        text.push_str(&rest[..end]);
        rest = &rest[end + 1..];
        if rest.starts_with(quote) {
            text.push(quote);
            rest = &rest[1..];
        } else {
            return Ok((rest, text));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier() {
        assert_eq!(identifier("salary > 1"), Ok((" > 1", "salary".to_string())));
        assert_eq!(identifier("_tmp1"), Ok(("", "_tmp1".to_string())));
        assert!(identifier("1abc").is_err());
    }

    #[test]
    fn test_reserved_words_are_not_fields() {
        assert!(non_keyword_identifier("and").is_err());
        assert!(non_keyword_identifier("NULL").is_err());
        assert!(non_keyword_identifier("android").is_ok());
    }

    #[test]
    fn test_keyword_respects_word_boundary() {
        assert!(keyword("AND")("and x").is_ok());
        assert!(keyword("AND")("ANDroid").is_err());
    }

    #[test]
    fn test_number_literal() {
        assert_eq!(number_literal("42 rest"), Ok((" rest", 42.0)));
        assert_eq!(number_literal("3.25"), Ok(("", 3.25)));
        assert_eq!(number_literal("1e3"), Ok(("", 1000.0)));
        assert!(number_literal(".5").is_err());
    }

    #[test]
    fn test_string_literal_escapes() {
        assert_eq!(string_literal("'O''Brien' x"), Ok((" x", "O'Brien".to_string())));
        assert_eq!(string_literal("\"New York\""), Ok(("", "New York".to_string())));
        assert_eq!(string_literal("''"), Ok(("", String::new())));
        assert!(matches!(string_literal("'open"), Err(nom::Err::Failure(_))));
    }

    #[test]
    fn test_error_position_is_offset_into_source() {
        let source = "age > ";
        let err = to_query_error(
            source,
            10,
            nom::Err::Error(SyntaxError::new(&source[6..], "unexpected end of input")),
        );
        assert!(matches!(err, QueryError::Parse { position: 16, .. }));
    }
}

use super::common::{describe_unexpected, identifier, to_query_error, ws, PResult};
use super::expression::parse_expression_at;
use super::statement::{AggregateKind, AggregateFunction, ColumnSpec, QueryConfig, SortOrder};
use crate::core::{QueryError, QueryResult};
use nom::{
    branch::alt,
    character::complete::char,
    combinator::map,
    sequence::tuple,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Clause {
    Select,
    Where,
    GroupBy,
    OrderBy,
    Limit,
    Offset,
}

impl Clause {
    /// Keyword words, in the only order clauses may appear.
    const ALL: [(Self, &'static [&'static str]); 6] = [
        (Self::Select, &["SELECT"]),
        (Self::Where, &["WHERE"]),
        (Self::GroupBy, &["GROUP", "BY"]),
        (Self::OrderBy, &["ORDER", "BY"]),
        (Self::Limit, &["LIMIT"]),
        (Self::Offset, &["OFFSET"]),
    ];

    const fn name(self) -> &'static str {
        match self {
            Self::Select => "SELECT",
            Self::Where => "WHERE",
            Self::GroupBy => "GROUP BY",
            Self::OrderBy => "ORDER BY",
            Self::Limit => "LIMIT",
            Self::Offset => "OFFSET",
        }
    }
}

/// One clause located in the query text.
#[derive(Debug)]
struct ClauseSpan<'a> {
    clause: Clause,
    keyword_at: usize,
    body: &'a str,
    body_at: usize,
}

/// Parses `SELECT ... [WHERE ...] [GROUP BY ...] [ORDER BY ...] [LIMIT n [OFFSET m]]`.
///
/// Keywords are case-sensitive and recognised only as whole words outside quoted
/// strings. Every clause is optional; a missing or empty SELECT selects all fields.
pub fn parse_query(text: &str) -> QueryResult<QueryConfig> {
    let spans = split_clauses(text)?;
    let mut config = QueryConfig::default();
    let mut offset = None;

    for span in &spans {
        match span.clause {
            Clause::Select => config.select = parse_select_list(span.body, span.body_at)?,
            Clause::Where => config.filter = Some(parse_expression_at(span.body, span.body_at)?),
            Clause::GroupBy => config.group_by = parse_field_list(span.body, span.body_at)?,
            Clause::OrderBy => config.order_by = parse_order_list(span.body, span.body_at)?,
            Clause::Limit => config.limit = Some(parse_count(span.body, span.body_at)?),
            Clause::Offset => offset = Some(parse_count(span.body, span.body_at)?),
        }
    }
    config.offset = offset.unwrap_or(0);

    tracing::trace!(?config, "parsed query");
    Ok(config)
}

/// Parses one select-list column: `field`, `*` or `FUNC(field)`.
pub fn parse_column(text: &str) -> QueryResult<ColumnSpec> {
    let (column, rest) = parse_column_prefix(text, 0)?;
    if rest.trim().is_empty() {
        Ok(column)
    } else {
        let position = text.len() - rest.len();
        Err(QueryError::parse(position, describe_unexpected(rest)))
    }
}

fn split_clauses(text: &str) -> QueryResult<Vec<ClauseSpan<'_>>> {
    let mut found: Vec<(Clause, usize, usize)> = Vec::new();
    let bytes = text.as_bytes();
    let mut quote: Option<u8> = None;
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        if let Some(q) = quote {
            if b == q {
                quote = None;
            }
            i += 1;
            continue;
        }
        if b == b'\'' || b == b'"' {
            quote = Some(b);
            i += 1;
            continue;
        }
        let at_boundary = i == 0 || !is_word_byte(bytes[i - 1]);
        if at_boundary {
            if let Some((clause, end)) = match_clause_keyword(text, i) {
                found.push((clause, i, end));
                i = end;
                continue;
            }
        }
        i += 1;
    }

    let leading_end = found.first().map_or(text.len(), |(_, at, _)| *at);
    let leading = &text[..leading_end];
    if !leading.trim().is_empty() {
        let position = leading.len() - leading.trim_start().len();
        return Err(QueryError::parse(
            position,
            "expected SELECT, WHERE, GROUP BY or ORDER BY",
        ));
    }

    let mut spans = Vec::with_capacity(found.len());
    for (idx, &(clause, keyword_at, body_at)) in found.iter().enumerate() {
        if let Some(&(previous, ..)) = idx.checked_sub(1).and_then(|p| found.get(p)) {
            if clause == previous {
                return Err(QueryError::config(format!(
                    "duplicate {} clause at position {keyword_at}",
                    clause.name()
                )));
            }
            if clause < previous {
                return Err(QueryError::config(format!(
                    "{} clause must come before {}",
                    clause.name(),
                    previous.name()
                )));
            }
        }
        let body_end = found.get(idx + 1).map_or(text.len(), |(_, at, _)| *at);
        spans.push(ClauseSpan {
            clause,
            keyword_at,
            body: &text[body_at..body_end],
            body_at,
        });
    }

    if let Some(span) = spans.iter().find(|s| s.clause == Clause::Offset) {
        if !spans.iter().any(|s| s.clause == Clause::Limit) {
            tracing::debug!(position = span.keyword_at, "OFFSET without LIMIT has no effect");
        }
    }

    Ok(spans)
}

const fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Matches a clause keyword (words separated by whitespace) starting at `start`.
/// Returns the clause and the byte offset just past the keyword.
fn match_clause_keyword(text: &str, start: usize) -> Option<(Clause, usize)> {
    let bytes = text.as_bytes();
    'clauses: for (clause, words) in Clause::ALL {
        let mut pos = start;
        for (n, word) in words.iter().enumerate() {
            if n > 0 {
                let gap = bytes[pos..].iter().take_while(|b| b.is_ascii_whitespace()).count();
                if gap == 0 {
                    continue 'clauses;
                }
                pos += gap;
            }
            if !bytes[pos..].starts_with(word.as_bytes()) {
                continue 'clauses;
            }
            pos += word.len();
        }
        if bytes.get(pos).is_some_and(|b| is_word_byte(*b)) {
            continue;
        }
        return Some((clause, pos));
    }
    None
}

/// Splits a comma-separated clause body into trimmed items with their absolute offsets.
fn split_list(body: &str, body_at: usize) -> QueryResult<Vec<(&str, usize)>> {
    if body.trim().is_empty() {
        return Err(QueryError::parse(body_at, "expected a column list"));
    }

    let mut items = Vec::new();
    let mut start = 0;
    for piece in body.split(',') {
        let trimmed = piece.trim();
        let lead = piece.len() - piece.trim_start().len();
        if trimmed.is_empty() {
            return Err(QueryError::parse(body_at + start + lead, "empty list item"));
        }
        items.push((trimmed, body_at + start + lead));
        start += piece.len() + 1;
    }
    Ok(items)
}

fn parse_select_list(body: &str, body_at: usize) -> QueryResult<Vec<ColumnSpec>> {
    if body.trim().is_empty() {
        return Ok(vec![ColumnSpec::Wildcard]);
    }
    split_list(body, body_at)?
        .into_iter()
        .map(|(item, at)| {
            let (column, rest) = parse_column_prefix(item, at)?;
            if rest.is_empty() {
                Ok(column)
            } else {
                Err(QueryError::parse(
                    at + item.len() - rest.len(),
                    describe_unexpected(rest),
                ))
            }
        })
        .collect()
}

fn parse_field_list(body: &str, body_at: usize) -> QueryResult<Vec<String>> {
    split_list(body, body_at)?
        .into_iter()
        .map(|(item, at)| match identifier(item) {
            Ok(("", name)) => Ok(name),
            Ok((rest, _)) => Err(QueryError::parse(
                at + item.len() - rest.len(),
                format!("GROUP BY expects field names, {}", describe_unexpected(rest)),
            )),
            Err(e) => Err(to_query_error(item, at, e)),
        })
        .collect()
}

fn parse_order_list(body: &str, body_at: usize) -> QueryResult<Vec<(ColumnSpec, SortOrder)>> {
    split_list(body, body_at)?
        .into_iter()
        .map(|(item, at)| {
            let (column, rest) = parse_column_prefix(item, at)?;
            let direction = if rest.is_empty() {
                SortOrder::Asc
            } else {
                SortOrder::from_token(rest)?
            };
            Ok((column, direction))
        })
        .collect()
}

fn parse_count(body: &str, body_at: usize) -> QueryResult<usize> {
    let trimmed = body.trim();
    let at = body_at + body.len() - body.trim_start().len();
    trimmed
        .parse::<usize>()
        .map_err(|_| QueryError::parse(at, format!("expected a non-negative integer, got '{trimmed}'")))
}

/// Column syntax before any semantic check of the function name.
enum RawColumn {
    Star,
    Field(String),
    Call(String, String),
}

fn raw_column(input: &str) -> PResult<'_, RawColumn> {
    ws(alt((
        map(char('*'), |_| RawColumn::Star),
        map(
            tuple((
                identifier,
                ws(char('(')),
                ws(alt((identifier, map(char('*'), |_| "*".to_string())))),
                char(')'),
            )),
            |(name, _, field, _)| RawColumn::Call(name, field),
        ),
        map(identifier, RawColumn::Field),
    )))(input)
}

/// Parses a column at the start of `item`, returning it with the trimmed remainder.
fn parse_column_prefix(item: &str, at: usize) -> QueryResult<(ColumnSpec, &str)> {
    let (rest, raw) = raw_column(item).map_err(|e| to_query_error(item, at, e))?;
    Ok((resolve_column(raw)?, rest.trim()))
}

fn resolve_column(raw: RawColumn) -> QueryResult<ColumnSpec> {
    Ok(match raw {
        RawColumn::Star => ColumnSpec::Wildcard,
        RawColumn::Field(name) => ColumnSpec::Field(name),
        RawColumn::Call(name, field) => {
            let kind = AggregateKind::from_name(&name)?;
            if field == "*" && kind != AggregateKind::Count {
                return Err(QueryError::config(format!(
                    "{}(*) is not supported, only COUNT(*)",
                    kind.name()
                )));
            }
            ColumnSpec::Aggregate(AggregateFunction { kind, field })
        }
    })
}

/// Column named by a record key: `*` and `FUNC(field)` keep their meaning,
/// any other text is a field name taken verbatim (`first name`, `e-mail`).
pub fn column_from_key(key: &str) -> QueryResult<ColumnSpec> {
    match raw_column(key) {
        Ok((rest, raw @ (RawColumn::Star | RawColumn::Call(..)))) if rest.is_empty() => {
            resolve_column(raw)
        }
        _ => Ok(ColumnSpec::Field(key.to_string())),
    }
}

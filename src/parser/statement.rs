use crate::core::{QueryError, QueryResult, Scalar};
use std::fmt;

/// Parsed query. Both the textual parser and the fluent builder produce one,
/// and the executor only ever sees this form.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct QueryConfig {
    pub select: Vec<ColumnSpec>,
    pub filter: Option<Expression>,
    pub group_by: Vec<String>,
    pub order_by: Vec<(ColumnSpec, SortOrder)>,
    pub limit: Option<usize>,
    /// Only applied together with `limit`
    pub offset: usize,
}

impl QueryConfig {
    /// Select list as executed: an empty list means every field.
    #[must_use]
    pub fn effective_select(&self) -> Vec<ColumnSpec> {
        if self.select.is_empty() {
            vec![ColumnSpec::Wildcard]
        } else {
            self.select.clone()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnSpec {
    Wildcard,                     // *
    Field(String),                // plain field reference
    Aggregate(AggregateFunction), // FUNC(field)
}

impl ColumnSpec {
    #[must_use]
    pub const fn is_aggregate(&self) -> bool {
        matches!(self, Self::Aggregate(_))
    }
}

/// Result rows are keyed by this text, e.g. `department` or `AVG(salary)`.
impl fmt::Display for ColumnSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Wildcard => write!(f, "*"),
            Self::Field(name) => write!(f, "{name}"),
            Self::Aggregate(agg) => write!(f, "{agg}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateFunction {
    pub kind: AggregateKind,
    pub field: String,
}

impl fmt::Display for AggregateFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.kind.name(), self.field)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateKind {
    Count,
    Sum,
    Avg,
    Min,
    Max,
}

impl AggregateKind {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Count => "COUNT",
            Self::Sum => "SUM",
            Self::Avg => "AVG",
            Self::Min => "MIN",
            Self::Max => "MAX",
        }
    }

    /// Function names are case-sensitive, like every other keyword.
    pub fn from_name(name: &str) -> QueryResult<Self> {
        match name {
            "COUNT" => Ok(Self::Count),
            "SUM" => Ok(Self::Sum),
            "AVG" => Ok(Self::Avg),
            "MIN" => Ok(Self::Min),
            "MAX" => Ok(Self::Max),
            other => Err(QueryError::config(format!(
                "unknown aggregate function: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    /// `ASC`/`DESC` in any case.
    pub fn from_token(token: &str) -> QueryResult<Self> {
        if token.eq_ignore_ascii_case("ASC") {
            Ok(Self::Asc)
        } else if token.eq_ignore_ascii_case("DESC") {
            Ok(Self::Desc)
        } else {
            Err(QueryError::config(format!("invalid sort direction: {token}")))
        }
    }
}

/// Filter expression tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Literal(Scalar),
    Field(String),
    Unary {
        op: UnaryOperator,
        operand: Box<Expression>,
    },
    Binary {
        op: BinaryOperator,
        left: Box<Expression>,
        right: Box<Expression>,
    },
}

impl Expression {
    pub fn binary(op: BinaryOperator, left: Self, right: Self) -> Self {
        Self::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn unary(op: UnaryOperator, operand: Self) -> Self {
        Self::Unary {
            op,
            operand: Box::new(operand),
        }
    }

    /// `field op literal`, with the literal kept as a typed value.
    pub fn comparison(field: impl Into<String>, op: BinaryOperator, value: impl Into<Scalar>) -> Self {
        Self::binary(op, Self::Field(field.into()), Self::Literal(value.into()))
    }

    /// Folds conditions into a left-leaning AND chain; `None` for an empty list.
    pub fn conjunction(conditions: impl IntoIterator<Item = Self>) -> Option<Self> {
        conditions
            .into_iter()
            .reduce(|acc, next| Self::binary(BinaryOperator::And, acc, next))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Neg,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Or,
    And,
    Eq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
    Add,
    Sub,
    Mul,
    Div,
}

impl BinaryOperator {
    /// Comparison operator from its textual form (`=`, `!=`, `<`, `<=`, `>`, `>=`
    /// and the `==` / `<>` aliases).
    pub fn comparison_from_symbol(symbol: &str) -> QueryResult<Self> {
        match symbol.trim() {
            "=" | "==" => Ok(Self::Eq),
            "!=" | "<>" => Ok(Self::NotEq),
            "<" => Ok(Self::Lt),
            "<=" => Ok(Self::Le),
            ">" => Ok(Self::Gt),
            ">=" => Ok(Self::Ge),
            other => Err(QueryError::config(format!(
                "unknown comparison operator: {other}"
            ))),
        }
    }

    #[must_use]
    pub const fn is_comparison(self) -> bool {
        matches!(
            self,
            Self::Eq | Self::NotEq | Self::Lt | Self::Le | Self::Gt | Self::Ge
        )
    }
}

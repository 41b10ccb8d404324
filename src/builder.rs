/// Fluent query builder
///
/// Accumulates select / filter / group-by / order-by / limit calls, then `get()` turns
/// them into a [`QueryConfig`], runs it and clears the accumulator for the next query.
///
/// ```no_run
/// use jsonql::{Jql, SortOrder};
///
/// let mut jql = Jql::from_json(r#"[{"name": "Bob", "age": 35}]"#)?;
/// let rows = jql
///     .select(["name", "age"])
///     .filter("age", ">", 30)
///     .order_by("age", SortOrder::Desc)
///     .get()?;
/// # Ok::<(), jsonql::QueryError>(())
/// ```

use crate::core::{Dataset, QueryResult, Scalar};
use crate::executor::{ExecutionOptions, QueryExecutor};
use crate::parser::{
    column_from_key, parse_query, BinaryOperator, ColumnSpec, Expression, QueryConfig, SortOrder,
};
use std::mem;

/// Accumulated builder calls, still in textual form.
#[derive(Debug, Default)]
struct PendingQuery {
    select: Vec<String>,
    conditions: Vec<(String, String, Scalar)>,
    group_by: Vec<String>,
    order_by: Vec<(String, SortOrder)>,
    limit: Option<(usize, usize)>,
}

pub struct Jql {
    data: Dataset,
    options: ExecutionOptions,
    pending: PendingQuery,
}

impl Jql {
    #[must_use]
    pub fn new(data: Dataset) -> Self {
        Self {
            data,
            options: ExecutionOptions::default(),
            pending: PendingQuery::default(),
        }
    }

    /// Decodes a JSON array of flat objects.
    pub fn from_json(text: &str) -> QueryResult<Self> {
        Ok(Self::new(Dataset::from_json(text)?))
    }

    #[must_use]
    pub fn with_options(mut self, options: ExecutionOptions) -> Self {
        self.options = options;
        self
    }

    pub const fn data(&self) -> &Dataset {
        &self.data
    }

    /// Replaces the select list. Entries are `*`, `FUNC(field)` or any field name as-is.
    pub fn select<I, S>(&mut self, columns: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.pending.select = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Adds `field op value` to the AND-chain. The value stays a typed literal.
    pub fn filter(&mut self, field: impl Into<String>, op: &str, value: impl Into<Scalar>) -> &mut Self {
        self.pending
            .conditions
            .push((field.into(), op.to_string(), value.into()));
        self
    }

    pub fn group_by<I, S>(&mut self, fields: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.pending.group_by = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Appends a sort key; earlier keys take precedence.
    pub fn order_by(&mut self, column: impl Into<String>, direction: SortOrder) -> &mut Self {
        self.pending.order_by.push((column.into(), direction));
        self
    }

    /// Keep `count` rows after skipping `offset`.
    pub fn limit(&mut self, count: usize, offset: usize) -> &mut Self {
        self.pending.limit = Some((count, offset));
        self
    }

    /// Runs the accumulated query. The accumulator is reset even when the query fails.
    pub fn get(&mut self) -> QueryResult<Dataset> {
        let pending = mem::take(&mut self.pending);
        let config = Self::build(pending)?;
        QueryExecutor::execute_with(&self.data, &config, self.options)
    }

    /// Runs a textual query. Does not touch the builder accumulator.
    pub fn query(&self, text: &str) -> QueryResult<Dataset> {
        let config = parse_query(text)?;
        QueryExecutor::execute_with(&self.data, &config, self.options)
    }

    fn build(pending: PendingQuery) -> QueryResult<QueryConfig> {
        let select = pending
            .select
            .iter()
            .map(|column| column_from_key(column))
            .collect::<QueryResult<Vec<ColumnSpec>>>()?;

        let conditions = pending
            .conditions
            .into_iter()
            .map(|(field, op, value)| -> QueryResult<Expression> {
                let op = BinaryOperator::comparison_from_symbol(&op)?;
                Ok(Expression::comparison(field, op, value))
            })
            .collect::<QueryResult<Vec<Expression>>>()?;

        let order_by = pending
            .order_by
            .iter()
            .map(|(column, direction)| -> QueryResult<(ColumnSpec, SortOrder)> {
                Ok((column_from_key(column)?, *direction))
            })
            .collect::<QueryResult<Vec<_>>>()?;

        let (limit, offset) = match pending.limit {
            Some((count, offset)) => (Some(count), offset),
            None => (None, 0),
        };

        let config = QueryConfig {
            select,
            filter: Expression::conjunction(conditions),
            group_by: pending.group_by,
            order_by,
            limit,
            offset,
        };
        tracing::trace!(?config, "built query");
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::QueryError;

    fn create_test_builder() -> Jql {
        Jql::from_json(
            r#"[
                {"name": "John", "age": 30, "department": "IT"},
                {"name": "Jane", "age": 25, "department": "HR"},
                {"name": "Bob", "age": 35, "department": "IT"}
            ]"#,
        )
        .unwrap()
    }

    #[test]
    fn test_get_without_calls_returns_everything() {
        let mut jql = create_test_builder();
        let result = jql.get().unwrap();
        assert_eq!(&result, jql.data());
    }

    #[test]
    fn test_filters_are_anded() {
        let mut jql = create_test_builder();
        let result = jql
            .select(["name"])
            .filter("department", "=", "IT")
            .filter("age", "<", 33)
            .get()
            .unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result.records()[0].get("name"), Some(&Scalar::from("John")));
    }

    #[test]
    fn test_get_resets_state() {
        let mut jql = create_test_builder();
        let first = jql.select(["name"]).filter("age", ">", 26).limit(1, 0).get().unwrap();
        assert_eq!(first.len(), 1);

        let second = jql.get().unwrap();
        assert_eq!(second.len(), 3);
        assert_eq!(second.records()[0].len(), 3);
    }

    #[test]
    fn test_failed_get_still_resets_state() {
        let mut jql = create_test_builder();
        let err = jql.filter("age", "~", 1).get().unwrap_err();
        assert!(matches!(err, QueryError::Config(_)));
        assert_eq!(jql.get().unwrap().len(), 3);
    }

    #[test]
    fn test_unknown_aggregate_in_select() {
        let mut jql = create_test_builder();
        let err = jql.select(["MEDIAN(age)"]).group_by(["department"]).get().unwrap_err();
        assert!(matches!(err, QueryError::Config(_)));
    }

    #[test]
    fn test_select_and_order_by_take_any_field_name() {
        let mut jql = Jql::from_json(
            r#"[
                {"first name": "Bob", "e-mail": "bob@example.com", "2fa": 2},
                {"first name": "Ann", "e-mail": "ann@example.com", "2fa": 1}
            ]"#,
        )
        .unwrap();
        let result = jql
            .select(["first name", "e-mail"])
            .filter("first name", "!=", "Eve")
            .order_by("2fa", SortOrder::Asc)
            .get()
            .unwrap();
        assert_eq!(result.records()[0].get("first name"), Some(&Scalar::from("Ann")));
        let names: Vec<&str> = result.records()[0].field_names().collect();
        assert_eq!(names, vec!["first name", "e-mail"]);
    }

    #[test]
    fn test_literal_is_never_reparsed() {
        let mut jql = create_test_builder();
        let result = jql.filter("name", "=", "x' OR '1' = '1").get().unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn test_query_leaves_accumulator_alone() {
        let mut jql = create_test_builder();
        jql.select(["name"]);
        let text = jql.query("SELECT age WHERE age > 26").unwrap();
        assert!(text.iter().all(|r| r.contains("age") && !r.contains("name")));

        let built = jql.get().unwrap();
        assert!(built.iter().all(|r| r.contains("name") && !r.contains("age")));
    }
}

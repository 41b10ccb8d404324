// Module declarations
mod statement;
mod common;
mod expression;
mod query;

// Re-export all public types
pub use statement::{
    QueryConfig,
    ColumnSpec,
    AggregateFunction,
    AggregateKind,
    SortOrder,
    Expression,
    UnaryOperator,
    BinaryOperator,
};
pub use expression::parse_expression;
pub use query::{parse_query, parse_column, column_from_key};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{QueryError, Scalar};

    fn field(name: &str) -> ColumnSpec {
        ColumnSpec::Field(name.to_string())
    }

    fn agg(kind: AggregateKind, name: &str) -> ColumnSpec {
        ColumnSpec::Aggregate(AggregateFunction {
            kind,
            field: name.to_string(),
        })
    }

    #[test]
    fn test_parse_select_fields() {
        let config = parse_query("SELECT name, age").unwrap();
        assert_eq!(config.select, vec![field("name"), field("age")]);
        assert!(config.filter.is_none());
        assert!(config.group_by.is_empty());
        assert!(config.order_by.is_empty());
        assert_eq!(config.limit, None);
    }

    #[test]
    fn test_parse_select_star_and_empty() {
        assert_eq!(parse_query("SELECT *").unwrap().select, vec![ColumnSpec::Wildcard]);
        assert_eq!(parse_query("SELECT").unwrap().select, vec![ColumnSpec::Wildcard]);
        let config = parse_query("WHERE age > 30").unwrap();
        assert!(config.select.is_empty());
        assert_eq!(config.effective_select(), vec![ColumnSpec::Wildcard]);
    }

    #[test]
    fn test_parse_select_with_where() {
        let config = parse_query("SELECT name, age, salary WHERE age > 30").unwrap();
        assert_eq!(
            config.filter,
            Some(Expression::comparison("age", BinaryOperator::Gt, 30))
        );
    }

    #[test]
    fn test_parse_select_with_and() {
        let config = parse_query("SELECT * WHERE age > 25 AND age < 35").unwrap();
        match config.filter {
            Some(Expression::Binary { op: BinaryOperator::And, .. }) => (),
            other => panic!("Expected AND condition, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_select_with_or() {
        let config = parse_query("SELECT * WHERE name = 'Alice' OR name = 'Bob'").unwrap();
        match config.filter {
            Some(Expression::Binary { op: BinaryOperator::Or, .. }) => (),
            other => panic!("Expected OR condition, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_group_by_with_aggregates() {
        let config =
            parse_query("SELECT department, SUM(salary) WHERE age > 25 GROUP BY department").unwrap();
        assert_eq!(
            config.select,
            vec![field("department"), agg(AggregateKind::Sum, "salary")]
        );
        assert_eq!(config.group_by, vec!["department".to_string()]);
    }

    #[test]
    fn test_parse_order_by_defaults_to_asc() {
        let config = parse_query("SELECT name, age ORDER BY age").unwrap();
        assert_eq!(config.order_by, vec![(field("age"), SortOrder::Asc)]);
    }

    #[test]
    fn test_parse_order_by_multiple_keys() {
        let config = parse_query(
            "SELECT department, COUNT(name), AVG(salary) GROUP BY department ORDER BY AVG(salary) DESC, department",
        )
        .unwrap();
        assert_eq!(
            config.order_by,
            vec![
                (agg(AggregateKind::Avg, "salary"), SortOrder::Desc),
                (field("department"), SortOrder::Asc),
            ]
        );
    }

    #[test]
    fn test_parse_limit_offset() {
        let config = parse_query("SELECT * ORDER BY age LIMIT 2 OFFSET 1").unwrap();
        assert_eq!(config.limit, Some(2));
        assert_eq!(config.offset, 1);

        let config = parse_query("SELECT * OFFSET 3").unwrap();
        assert_eq!(config.limit, None);
        assert_eq!(config.offset, 3);
    }

    #[test]
    fn test_keywords_are_case_sensitive() {
        assert!(matches!(
            parse_query("select name"),
            Err(QueryError::Parse { position: 0, .. })
        ));
        // lowercase "where" is just part of the select list and fails there
        assert!(matches!(
            parse_query("SELECT name where age > 1"),
            Err(QueryError::Parse { .. })
        ));
    }

    #[test]
    fn test_clause_order_is_fixed() {
        assert!(matches!(
            parse_query("SELECT name ORDER BY age WHERE age > 1"),
            Err(QueryError::Config(_))
        ));
        assert!(matches!(
            parse_query("SELECT name WHERE age > 1 WHERE age < 5"),
            Err(QueryError::Config(_))
        ));
    }

    #[test]
    fn test_unknown_aggregate_is_config_error() {
        assert!(matches!(
            parse_query("SELECT MEDIAN(salary) GROUP BY department"),
            Err(QueryError::Config(_))
        ));
    }

    #[test]
    fn test_invalid_direction_is_config_error() {
        assert!(matches!(
            parse_query("SELECT name ORDER BY age DOWN"),
            Err(QueryError::Config(_))
        ));
    }

    #[test]
    fn test_where_parse_error_position_is_absolute() {
        let err = parse_query("SELECT name WHERE age > ").unwrap_err();
        assert!(matches!(err, QueryError::Parse { position: 24, .. }));
    }

    #[test]
    fn test_where_literal_is_typed() {
        let config = parse_query("SELECT * WHERE city = \"Los Angeles\"").unwrap();
        assert_eq!(
            config.filter,
            Some(Expression::comparison(
                "city",
                BinaryOperator::Eq,
                Scalar::from("Los Angeles")
            ))
        );
    }
}

/// Expression evaluation for WHERE clauses
///
/// A pure tree walk over [`Expression`]: nothing in a filter is ever executed as code.
/// Field references resolve against the record; a field the record lacks is Null.

use crate::core::{QueryError, QueryResult, Record, Scalar};
use crate::parser::{BinaryOperator, Expression, UnaryOperator};

pub struct ConditionEvaluator;

impl ConditionEvaluator {
    /// Evaluate an expression against a record
    pub fn evaluate(expr: &Expression, record: &Record) -> QueryResult<Scalar> {
        match expr {
            Expression::Literal(value) => Ok(value.clone()),
            Expression::Field(name) => Ok(record.get_or_null(name).clone()),
            Expression::Unary { op, operand } => {
                let value = Self::evaluate(operand, record)?;
                match op {
                    UnaryOperator::Neg => Ok(Scalar::Number(-value.to_number()?)),
                    UnaryOperator::Not => Ok(Scalar::Boolean(!value.is_truthy())),
                }
            }
            Expression::Binary { op, left, right } => {
                Self::evaluate_binary(*op, left, right, record)
            }
        }
    }

    /// Whether `record` passes the filter (the expression value is truthy).
    pub fn matches(expr: &Expression, record: &Record) -> QueryResult<bool> {
        Ok(Self::evaluate(expr, record)?.is_truthy())
    }

    fn evaluate_binary(
        op: BinaryOperator,
        left: &Expression,
        right: &Expression,
        record: &Record,
    ) -> QueryResult<Scalar> {
        let lhs = Self::evaluate(left, record)?;
        // AND / OR short-circuit: the right side is only evaluated when it can matter
        let rhs = || Self::evaluate(right, record);

        match op {
            BinaryOperator::And => Ok(Scalar::Boolean(lhs.is_truthy() && rhs()?.is_truthy())),
            BinaryOperator::Or => Ok(Scalar::Boolean(lhs.is_truthy() || rhs()?.is_truthy())),
            BinaryOperator::Eq => Ok(Scalar::Boolean(lhs.loose_eq(&rhs()?))),
            BinaryOperator::NotEq => Ok(Scalar::Boolean(!lhs.loose_eq(&rhs()?))),
            BinaryOperator::Lt => Ok(Scalar::Boolean(lhs.compare(&rhs()?)?.is_lt())),
            BinaryOperator::Le => Ok(Scalar::Boolean(lhs.compare(&rhs()?)?.is_le())),
            BinaryOperator::Gt => Ok(Scalar::Boolean(lhs.compare(&rhs()?)?.is_gt())),
            BinaryOperator::Ge => Ok(Scalar::Boolean(lhs.compare(&rhs()?)?.is_ge())),
            BinaryOperator::Add => Self::arithmetic(&lhs, &rhs()?, |a, b| Ok(a + b)),
            BinaryOperator::Sub => Self::arithmetic(&lhs, &rhs()?, |a, b| Ok(a - b)),
            BinaryOperator::Mul => Self::arithmetic(&lhs, &rhs()?, |a, b| Ok(a * b)),
            BinaryOperator::Div => Self::arithmetic(&lhs, &rhs()?, |a, b| {
                if b == 0.0 {
                    Err(QueryError::evaluation("division by zero"))
                } else {
                    Ok(a / b)
                }
            }),
        }
    }

    /// Both operands must be numbers or numeric strings.
    fn arithmetic(
        lhs: &Scalar,
        rhs: &Scalar,
        apply: impl FnOnce(f64, f64) -> QueryResult<f64>,
    ) -> QueryResult<Scalar> {
        let a = lhs.to_number()?;
        let b = rhs.to_number()?;
        apply(a, b).map(Scalar::Number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_expression;

    fn create_test_record() -> Record {
        [
            ("name", Scalar::from("Alice")),
            ("age", Scalar::from(28)),
            ("salary", Scalar::from(52000)),
            ("zip", Scalar::from("10001")),
            ("active", Scalar::from(true)),
            ("manager", Scalar::Null),
        ]
        .into_iter()
        .collect()
    }

    fn eval(text: &str) -> QueryResult<Scalar> {
        ConditionEvaluator::evaluate(&parse_expression(text).unwrap(), &create_test_record())
    }

    #[test]
    fn test_comparisons() {
        assert_eq!(eval("age > 25").unwrap(), Scalar::Boolean(true));
        assert_eq!(eval("age >= 28").unwrap(), Scalar::Boolean(true));
        assert_eq!(eval("age < 28").unwrap(), Scalar::Boolean(false));
        assert_eq!(eval("name = 'Alice'").unwrap(), Scalar::Boolean(true));
        assert_eq!(eval("name != 'Bob'").unwrap(), Scalar::Boolean(true));
    }

    #[test]
    fn test_numeric_string_field_compares_numerically() {
        assert_eq!(eval("zip > 9999").unwrap(), Scalar::Boolean(true));
        assert_eq!(eval("zip = 10001").unwrap(), Scalar::Boolean(true));
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(eval("salary / 1000 + age * 2").unwrap(), Scalar::from(108));
        assert_eq!(eval("-age").unwrap(), Scalar::from(-28));
        assert_eq!(eval("zip - 1").unwrap(), Scalar::from(10000));
        assert_eq!(eval("salary * 1.1 > 57000").unwrap(), Scalar::Boolean(true));
    }

    #[test]
    fn test_negative_zero_compares_equal_to_zero() {
        assert_eq!(eval("0 = -0").unwrap(), Scalar::Boolean(true));
        assert_eq!(eval("0 * -1 >= 0").unwrap(), Scalar::Boolean(true));
        assert_eq!(eval("-0 != 0").unwrap(), Scalar::Boolean(false));
    }

    #[test]
    fn test_division_by_zero_fails() {
        assert!(matches!(eval("age / 0"), Err(QueryError::Evaluation(_))));
        assert!(matches!(eval("age / (age - 28)"), Err(QueryError::Evaluation(_))));
    }

    #[test]
    fn test_arithmetic_on_non_numbers_fails() {
        assert!(matches!(eval("name + 1"), Err(QueryError::Evaluation(_))));
        assert!(matches!(eval("manager * 2"), Err(QueryError::Evaluation(_))));
        assert!(matches!(eval("-active"), Err(QueryError::Evaluation(_))));
    }

    #[test]
    fn test_boolean_ordering_against_number_fails() {
        assert!(matches!(eval("active > 0"), Err(QueryError::Evaluation(_))));
        assert_eq!(eval("active = TRUE").unwrap(), Scalar::Boolean(true));
    }

    #[test]
    fn test_unknown_field_is_null() {
        assert_eq!(eval("missing").unwrap(), Scalar::Null);
        assert_eq!(eval("missing = NULL").unwrap(), Scalar::Boolean(true));
        assert_eq!(eval("missing < 0").unwrap(), Scalar::Boolean(true));
        assert_eq!(eval("manager = 0").unwrap(), Scalar::Boolean(false));
    }

    #[test]
    fn test_logical_short_circuit_skips_errors() {
        // the right side would divide by zero
        assert_eq!(eval("age < 0 AND age / 0 > 1").unwrap(), Scalar::Boolean(false));
        assert_eq!(eval("age > 0 OR age / 0 > 1").unwrap(), Scalar::Boolean(true));
        assert!(eval("age > 0 AND age / 0 > 1").is_err());
    }

    #[test]
    fn test_not_and_truthiness() {
        assert_eq!(eval("NOT manager").unwrap(), Scalar::Boolean(true));
        assert_eq!(eval("!active").unwrap(), Scalar::Boolean(false));
        let record = create_test_record();
        assert!(ConditionEvaluator::matches(&parse_expression("name").unwrap(), &record).unwrap());
        assert!(!ConditionEvaluator::matches(&parse_expression("age - 28").unwrap(), &record).unwrap());
    }
}

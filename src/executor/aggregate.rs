/// GROUP BY and aggregate functions (COUNT, SUM, AVG, MIN, MAX)

use crate::core::{QueryError, QueryResult, Record, Scalar};
use crate::parser::{AggregateFunction, AggregateKind, ColumnSpec};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;

/// Joins stringified group-by values into one key.
const KEY_SEPARATOR: char = '\u{1f}';

/// What a grouped result does with select columns that are neither grouped nor aggregated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupColumnPolicy {
    /// Take the value from the first record of the group
    #[default]
    First,
    /// Leave the column out of the result row
    Omit,
}

impl FromStr for GroupColumnPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "first" => Ok(Self::First),
            "omit" => Ok(Self::Omit),
            other => Err(format!("unknown group column policy '{other}' (expected first or omit)")),
        }
    }
}

/// One bucket: its first member plus one value list per aggregate column.
struct Group<'a> {
    first: &'a Record,
    accumulators: Vec<Vec<&'a Scalar>>,
}

pub struct Aggregator;

impl Aggregator {
    /// Groups `records` by `group_fields` and computes every aggregate in `select`.
    ///
    /// Groups come out in first-seen order. Each output row holds the select columns in
    /// order, followed by any group-by field the select list did not mention.
    pub fn group_and_aggregate(
        records: &[&Record],
        group_fields: &[String],
        select: &[ColumnSpec],
        policy: GroupColumnPolicy,
    ) -> QueryResult<Vec<Record>> {
        let aggregates: Vec<&AggregateFunction> = select
            .iter()
            .filter_map(|column| match column {
                ColumnSpec::Aggregate(agg) => Some(agg),
                _ => None,
            })
            .collect();

        let mut slots: HashMap<String, usize> = HashMap::new();
        let mut groups: Vec<Group<'_>> = Vec::new();

        for &record in records {
            let key = Self::group_key(record, group_fields);
            let slot = *slots.entry(key).or_insert_with(|| {
                groups.push(Group {
                    first: record,
                    accumulators: vec![Vec::new(); aggregates.len()],
                });
                groups.len() - 1
            });

            for (values, agg) in groups[slot].accumulators.iter_mut().zip(&aggregates) {
                values.push(record.get_or_null(&agg.field));
            }
        }

        tracing::debug!(records = records.len(), groups = groups.len(), "grouped records");

        groups
            .iter()
            .map(|group| Self::finalize(group, group_fields, select, policy))
            .collect()
    }

    /// Stringified group-by values in field order; a missing field counts as Null.
    fn group_key(record: &Record, group_fields: &[String]) -> String {
        let mut key = String::new();
        for (i, field) in group_fields.iter().enumerate() {
            if i > 0 {
                key.push(KEY_SEPARATOR);
            }
            key.push_str(&record.get_or_null(field).key_fragment());
        }
        key
    }

    fn finalize(
        group: &Group<'_>,
        group_fields: &[String],
        select: &[ColumnSpec],
        policy: GroupColumnPolicy,
    ) -> QueryResult<Record> {
        let mut row = Record::new();
        let mut accumulators = group.accumulators.iter();

        for column in select {
            match column {
                ColumnSpec::Aggregate(agg) => {
                    let values = accumulators.next().map_or(&[][..], Vec::as_slice);
                    row.insert(agg.to_string(), Self::compute(agg.kind, values)?);
                }
                ColumnSpec::Field(name) if group_fields.contains(name) => {
                    row.insert(name.clone(), group.first.get_or_null(name).clone());
                }
                ColumnSpec::Field(name) => {
                    if policy == GroupColumnPolicy::First {
                        row.insert(name.clone(), group.first.get_or_null(name).clone());
                    }
                }
                ColumnSpec::Wildcard => {
                    if policy == GroupColumnPolicy::First {
                        for (name, value) in group.first.fields() {
                            row.insert(name, value.clone());
                        }
                    }
                }
            }
        }

        for field in group_fields {
            if !row.contains(field) {
                row.insert(field.clone(), group.first.get_or_null(field).clone());
            }
        }

        Ok(row)
    }

    /// Applies one aggregate function to the collected values.
    ///
    /// COUNT is the number of values (Nulls included), SUM treats Null as 0,
    /// AVG is SUM / COUNT, MIN and MAX use the total value order.
    pub fn compute(kind: AggregateKind, values: &[&Scalar]) -> QueryResult<Scalar> {
        match kind {
            AggregateKind::Count => Ok(Scalar::from(values.len())),
            AggregateKind::Sum => Self::sum(values).map(Scalar::Number),
            AggregateKind::Avg => {
                if values.is_empty() {
                    return Err(QueryError::evaluation("AVG over an empty group"));
                }
                Ok(Scalar::Number(Self::sum(values)? / values.len() as f64))
            }
            AggregateKind::Min => Ok(values
                .iter()
                .min_by(|a, b| a.sort_cmp(b))
                .map_or(Scalar::Null, |v| (*v).clone())),
            AggregateKind::Max => Ok(values
                .iter()
                .max_by(|a, b| a.sort_cmp(b))
                .map_or(Scalar::Null, |v| (*v).clone())),
        }
    }

    fn sum(values: &[&Scalar]) -> QueryResult<f64> {
        values
            .iter()
            .filter(|v| !v.is_null())
            .try_fold(0.0, |acc, v| Ok(acc + v.to_number()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows() -> Vec<Record> {
        vec![
            [("dept", Scalar::from("IT")), ("name", Scalar::from("John")), ("salary", Scalar::from(50000))]
                .into_iter()
                .collect(),
            [("dept", Scalar::from("HR")), ("name", Scalar::from("Jane")), ("salary", Scalar::from(55000))]
                .into_iter()
                .collect(),
            [("dept", Scalar::from("IT")), ("name", Scalar::from("Bob")), ("salary", Scalar::Null)]
                .into_iter()
                .collect(),
        ]
    }

    fn agg(kind: AggregateKind, field: &str) -> ColumnSpec {
        ColumnSpec::Aggregate(AggregateFunction {
            kind,
            field: field.to_string(),
        })
    }

    #[test]
    fn test_groups_in_first_seen_order() {
        let data = rows();
        let refs: Vec<&Record> = data.iter().collect();
        let result = Aggregator::group_and_aggregate(
            &refs,
            &["dept".to_string()],
            &[ColumnSpec::Field("dept".to_string()), agg(AggregateKind::Count, "name")],
            GroupColumnPolicy::First,
        )
        .unwrap();

        assert_eq!(result.len(), 2);
        assert_eq!(result[0].get("dept"), Some(&Scalar::from("IT")));
        assert_eq!(result[0].get("COUNT(name)"), Some(&Scalar::from(2)));
        assert_eq!(result[1].get("dept"), Some(&Scalar::from("HR")));
        assert_eq!(result[1].get("COUNT(name)"), Some(&Scalar::from(1)));
    }

    #[test]
    fn test_sum_and_avg_treat_null_as_zero() {
        let data = rows();
        let refs: Vec<&Record> = data.iter().collect();
        let result = Aggregator::group_and_aggregate(
            &refs,
            &["dept".to_string()],
            &[agg(AggregateKind::Sum, "salary"), agg(AggregateKind::Avg, "salary")],
            GroupColumnPolicy::First,
        )
        .unwrap();

        assert_eq!(result[0].get("SUM(salary)"), Some(&Scalar::from(50000)));
        assert_eq!(result[0].get("AVG(salary)"), Some(&Scalar::from(25000)));
        // group-by field appended after the select columns
        let names: Vec<&str> = result[0].field_names().collect();
        assert_eq!(names, vec!["SUM(salary)", "AVG(salary)", "dept"]);
    }

    #[test]
    fn test_non_grouped_column_policies() {
        let data = rows();
        let refs: Vec<&Record> = data.iter().collect();
        let select = [ColumnSpec::Field("dept".to_string()), ColumnSpec::Field("name".to_string())];

        let first = Aggregator::group_and_aggregate(
            &refs,
            &["dept".to_string()],
            &select,
            GroupColumnPolicy::First,
        )
        .unwrap();
        assert_eq!(first[0].get("name"), Some(&Scalar::from("John")));

        let omitted = Aggregator::group_and_aggregate(
            &refs,
            &["dept".to_string()],
            &select,
            GroupColumnPolicy::Omit,
        )
        .unwrap();
        assert_eq!(omitted[0].get("name"), None);
        assert_eq!(omitted[0].get("dept"), Some(&Scalar::from("IT")));
    }

    #[test]
    fn test_missing_group_field_groups_as_null() {
        let data: Vec<Record> = vec![
            [("a", 1)].into_iter().collect(),
            [("a", 2)].into_iter().collect(),
        ];
        let refs: Vec<&Record> = data.iter().collect();
        let result = Aggregator::group_and_aggregate(
            &refs,
            &["missing".to_string()],
            &[agg(AggregateKind::Count, "a")],
            GroupColumnPolicy::First,
        )
        .unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].get("missing"), Some(&Scalar::Null));
        assert_eq!(result[0].get("COUNT(a)"), Some(&Scalar::from(2)));
    }

    #[test]
    fn test_compute_min_max_use_total_order() {
        let values = [Scalar::from(3), Scalar::from("b"), Scalar::from(-1)];
        let refs: Vec<&Scalar> = values.iter().collect();
        assert_eq!(Aggregator::compute(AggregateKind::Min, &refs).unwrap(), Scalar::from(-1));
        assert_eq!(Aggregator::compute(AggregateKind::Max, &refs).unwrap(), Scalar::from("b"));
        assert_eq!(Aggregator::compute(AggregateKind::Min, &[]).unwrap(), Scalar::Null);
    }

    #[test]
    fn test_compute_failures() {
        assert!(matches!(
            Aggregator::compute(AggregateKind::Avg, &[]),
            Err(QueryError::Evaluation(_))
        ));
        let text = Scalar::from("abc");
        assert!(matches!(
            Aggregator::compute(AggregateKind::Sum, &[&text]),
            Err(QueryError::Evaluation(_))
        ));
    }

    #[test]
    fn test_policy_from_str() {
        assert_eq!("omit".parse::<GroupColumnPolicy>(), Ok(GroupColumnPolicy::Omit));
        assert_eq!("First".parse::<GroupColumnPolicy>(), Ok(GroupColumnPolicy::First));
        assert!("drop".parse::<GroupColumnPolicy>().is_err());
    }
}

/// Query pipeline
///
/// filter -> group-or-project -> order -> paginate, over an immutable input dataset.

use super::aggregate::{Aggregator, GroupColumnPolicy};
use super::conditions::ConditionEvaluator;
use super::order::Orderer;
use crate::core::{Dataset, QueryError, QueryResult, Record};
use crate::parser::{ColumnSpec, QueryConfig};

/// Knobs that shape execution without being part of the query text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecutionOptions {
    pub group_columns: GroupColumnPolicy,
}

pub struct QueryExecutor;

impl QueryExecutor {
    /// Runs `config` against `data` with default options.
    pub fn execute(data: &Dataset, config: &QueryConfig) -> QueryResult<Dataset> {
        Self::execute_with(data, config, ExecutionOptions::default())
    }

    /// Execution order:
    /// 1. WHERE filter (an evaluation error fails the whole query)
    /// 2. GROUP BY + aggregates, or plain projection
    /// 3. ORDER BY
    /// 4. OFFSET + LIMIT (only when a limit is set)
    pub fn execute_with(
        data: &Dataset,
        config: &QueryConfig,
        options: ExecutionOptions,
    ) -> QueryResult<Dataset> {
        Self::validate(config)?;
        let select = config.effective_select();

        let filtered = Self::filter(data, config)?;
        tracing::debug!(input = data.len(), kept = filtered.len(), "filter applied");

        let rows = if config.group_by.is_empty() {
            Self::project(&filtered, &select)?
        } else {
            Aggregator::group_and_aggregate(&filtered, &config.group_by, &select, options.group_columns)?
        };

        let rows = Orderer::order(rows, &config.order_by);
        let rows = Self::paginate(rows, config.limit, config.offset);
        tracing::debug!(rows = rows.len(), "query finished");

        Ok(Dataset::new(rows))
    }

    fn validate(config: &QueryConfig) -> QueryResult<()> {
        if config
            .order_by
            .iter()
            .any(|(column, _)| matches!(column, ColumnSpec::Wildcard))
        {
            return Err(QueryError::config("ORDER BY * is not supported"));
        }
        if let Some(field) = config.group_by.iter().find(|f| f.trim().is_empty()) {
            return Err(QueryError::config(format!("invalid GROUP BY field '{field}'")));
        }
        Ok(())
    }

    fn filter<'a>(data: &'a Dataset, config: &QueryConfig) -> QueryResult<Vec<&'a Record>> {
        let Some(filter) = &config.filter else {
            return Ok(data.iter().collect());
        };

        let mut kept = Vec::new();
        for record in data {
            if ConditionEvaluator::matches(filter, record)? {
                kept.push(record);
            }
        }
        Ok(kept)
    }

    /// Copies selected fields per record. Without GROUP BY an aggregate column is
    /// computed over that single record's value.
    fn project(records: &[&Record], select: &[ColumnSpec]) -> QueryResult<Vec<Record>> {
        records
            .iter()
            .map(|record| {
                let mut row = Record::new();
                for column in select {
                    match column {
                        ColumnSpec::Wildcard => {
                            for (name, value) in record.fields() {
                                row.insert(name, value.clone());
                            }
                        }
                        ColumnSpec::Field(name) => {
                            row.insert(name.clone(), record.get_or_null(name).clone());
                        }
                        ColumnSpec::Aggregate(agg) => {
                            let value = Aggregator::compute(agg.kind, &[record.get_or_null(&agg.field)])?;
                            row.insert(agg.to_string(), value);
                        }
                    }
                }
                Ok(row)
            })
            .collect()
    }

    fn paginate(rows: Vec<Record>, limit: Option<usize>, offset: usize) -> Vec<Record> {
        match limit {
            Some(limit) => rows.into_iter().skip(offset).take(limit).collect(),
            None => rows,
        }
    }
}

/// Executor module - runs parsed queries over a dataset
///
/// Structure:
/// - conditions: WHERE expression evaluation
/// - aggregate: GROUP BY and aggregate functions
/// - order: ORDER BY (stable, multi-key)
/// - queries: the full pipeline (filter, group/project, order, paginate)

pub mod conditions;
pub mod aggregate;
pub mod order;
pub mod queries;

pub use conditions::ConditionEvaluator;
pub use aggregate::{Aggregator, GroupColumnPolicy};
pub use order::Orderer;
pub use queries::{ExecutionOptions, QueryExecutor};

// jsonql - SQL-like queries over in-memory JSON record collections
// Fluent builder and mini-SQL text share one query representation and one executor

// Clippy configuration
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::option_if_let_else)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::needless_pass_by_value)]

// Value model, records, errors
pub mod core;

// Query AST plus the nom-based text parsers
pub mod parser;

// Expression evaluation, grouping, ordering, pipeline
pub mod executor;

// Fluent builder
pub mod builder;

// Layered configuration (file, env)
pub mod config;

// Table / JSON rendering for the CLI
pub mod output;

// Re-export commonly used types for convenience
pub use crate::core::{Dataset, QueryError, QueryResult, Record, Scalar};
pub use crate::parser::{parse_query, parse_expression, ColumnSpec, Expression, QueryConfig, SortOrder};
pub use crate::executor::{ExecutionOptions, GroupColumnPolicy, QueryExecutor};
pub use crate::builder::Jql;
pub use crate::config::{EngineConfig, OutputFormat};

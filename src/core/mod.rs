// Module declarations
pub mod error;
pub mod value;
pub mod record;

// Re-exports for convenience
pub use error::{QueryError, QueryResult};
pub use value::Scalar;
pub use record::{Dataset, Record};

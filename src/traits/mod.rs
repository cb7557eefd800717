mod context;
mod executor;

pub use context::{AsAny, DatasourceConnectionConfig, QueryExecutionContext};
pub use executor::{DynQueryExecutor, QueryExecutor};

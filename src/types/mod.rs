mod result;
mod sql_value;
mod structure;
mod visitor;

pub use result::{QueryExecutionResult, Row};
pub use sql_value::SqlValue;
pub use structure::{
    ColumnStructure, DatasourceStructure, KeyStructure, KeyType, TableStructure, TableType,
};
pub use visitor::{QueryConfig, QueryVisitorContext, RequestParams};

mod in_memory;
mod postgres;
mod sql;

pub use self::in_memory::{
    InMemoryConnection, InMemoryConnectionConfig, InMemoryPlugin, InMemoryResponseBuilder,
    RecordedQuery, REDACTED,
};
pub use self::postgres::{PostgresConnectionConfig, PostgresPlugin};
pub use self::sql::{SqlQueryContext, DISABLE_PREPARED_STATEMENT_KEY, SQL_KEY};

//! qexec - the query execution contract between a host and its datasource plugins
//!
//! A plugin implements [`QueryExecutor`] with its own connection config,
//! connection and query context types. Hosts talk to plugins through
//! [`DynQueryExecutor`], which checks every argument's concrete type and
//! classifies every failure before it reaches the caller.
//!
//! # Example
//! ```ignore
//! use qexec::plugins::{PostgresConnectionConfig, PostgresPlugin};
//! use qexec::{DynQueryExecutor, QueryVisitorContext};
//!
//! let config = PostgresConnectionConfig::default();
//! let client = config.connect().await?;
//!
//! let mut query_config = qexec::QueryConfig::new();
//! query_config.insert("sql".into(), "SELECT name FROM users WHERE id = {{id}}".into());
//! let mut params = qexec::RequestParams::new();
//! params.insert("id".into(), 42.into());
//!
//! let context = PostgresPlugin
//!     .build_context(&config, &query_config, &params, &QueryVisitorContext::anonymous())
//!     .await?;
//! let result = PostgresPlugin.do_execute_query(&client, context).await?;
//! let name = result.single_row()?.get("name")?.clone();
//! ```

pub mod error;
pub mod plugins;
pub mod registry;
pub mod template;
pub mod traits;
pub mod types;

// Re-export main types for convenient access
pub use error::{BizError, ClassifiedError, ExecutorError, PluginError, PluginErrorKind, Result};
pub use registry::PluginRegistry;
pub use traits::{DatasourceConnectionConfig, DynQueryExecutor, QueryExecutionContext, QueryExecutor};
pub use types::{
    DatasourceStructure, QueryConfig, QueryExecutionResult, QueryVisitorContext, RequestParams,
    Row, SqlValue,
};

use serde_json::Value;

use crate::error::ExecutorError;
use crate::template;
use crate::traits::QueryExecutionContext;
use crate::types::{QueryConfig, RequestParams, SqlValue};

/// Query config key holding the statement text.
pub const SQL_KEY: &str = "sql";
/// Query config key that switches from bound parameters to inlined literals.
pub const DISABLE_PREPARED_STATEMENT_KEY: &str = "disablePreparedStatement";

/// Ready-to-run SQL statement shared by the SQL plugins.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlQueryContext {
    pub sql: String,
    pub params: Vec<SqlValue>,
    pub disable_prepared_statement: bool,
}

impl QueryExecutionContext for SqlQueryContext {}

impl SqlQueryContext {
    /// Resolves the `sql` entry of `query_config` against `request_params`.
    pub fn from_query_config(
        query_config: &QueryConfig,
        request_params: &RequestParams,
    ) -> Result<Self, ExecutorError> {
        let sql = match query_config.get(SQL_KEY) {
            Some(Value::String(sql)) if !sql.trim().is_empty() => sql,
            Some(Value::String(_)) | None => {
                return Err(ExecutorError::msg("query is empty"));
            }
            Some(other) => {
                return Err(ExecutorError::msg(format!(
                    "expected `{}` to be a string, got {}",
                    SQL_KEY, other
                )));
            }
        };
        let disable_prepared_statement = match query_config.get(DISABLE_PREPARED_STATEMENT_KEY) {
            None | Some(Value::Null) => false,
            Some(Value::Bool(b)) => *b,
            Some(other) => {
                return Err(ExecutorError::msg(format!(
                    "expected `{}` to be a boolean, got {}",
                    DISABLE_PREPARED_STATEMENT_KEY, other
                )));
            }
        };

        if disable_prepared_statement {
            return Ok(Self {
                sql: template::inline(sql, request_params)?,
                params: Vec::new(),
                disable_prepared_statement,
            });
        }

        let bound = template::bind(sql, request_params)?;
        Ok(Self {
            sql: bound.sql,
            params: bound.params,
            disable_prepared_statement,
        })
    }
}

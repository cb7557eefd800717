use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use crate::error::ExecutorError;
use crate::plugins::sql::SqlQueryContext;
use crate::traits::{DatasourceConnectionConfig, QueryExecutor};
use crate::types::{
    DatasourceStructure, QueryConfig, QueryExecutionResult, QueryVisitorContext, RequestParams,
    SqlValue,
};

/// Placeholder written over redacted query config values.
pub const REDACTED: &str = "******";

/// Connection settings for the in-memory datasource.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct InMemoryConnectionConfig {
    pub database: String,
}

impl DatasourceConnectionConfig for InMemoryConnectionConfig {}

/// A recorded query execution for verification.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedQuery {
    pub sql: String,
    pub params: Vec<SqlValue>,
}

/// Live handle to an in-memory datasource.
///
/// Returns scripted responses in FIFO order and records every executed
/// statement so tests can verify what the plugin ran.
///
/// # Example
/// ```
/// use qexec::plugins::{InMemoryConnection, InMemoryResponseBuilder};
/// use serde_json::json;
///
/// let connection = InMemoryConnection::new().with_response(
///     InMemoryResponseBuilder::new()
///         .columns(&["id", "name"])
///         .row(vec![json!(1), json!("Alice")])
///         .build(),
/// );
/// ```
pub struct InMemoryConnection {
    responses: Mutex<VecDeque<Result<QueryExecutionResult, ExecutorError>>>,
    recorded_queries: Mutex<Vec<RecordedQuery>>,
    default_response: Option<QueryExecutionResult>,
    structure: Option<DatasourceStructure>,
}

impl InMemoryConnection {
    /// Create a new connection with no pre-configured responses.
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            recorded_queries: Mutex::new(Vec::new()),
            default_response: None,
            structure: None,
        }
    }

    /// Add a response to be returned by the next query.
    /// Responses are returned in FIFO order.
    pub fn with_response(self, response: QueryExecutionResult) -> Self {
        self.responses.lock().unwrap().push_back(Ok(response));
        self
    }

    /// Make the next query fail with `error`.
    pub fn with_error(self, error: ExecutorError) -> Self {
        self.responses.lock().unwrap().push_back(Err(error));
        self
    }

    /// Set a default response to use when no queued responses remain.
    pub fn with_default_response(mut self, response: QueryExecutionResult) -> Self {
        self.default_response = Some(response);
        self
    }

    /// Schema served by structure introspection.
    pub fn with_structure(mut self, structure: DatasourceStructure) -> Self {
        self.structure = Some(structure);
        self
    }

    /// Get all recorded queries that have been executed.
    pub fn recorded_queries(&self) -> Vec<RecordedQuery> {
        self.recorded_queries.lock().unwrap().clone()
    }

    /// Get the last recorded query, if any.
    pub fn last_query(&self) -> Option<RecordedQuery> {
        self.recorded_queries.lock().unwrap().last().cloned()
    }

    /// Assert that the last query matches the expected SQL and parameters.
    pub fn assert_last_query(&self, expected_sql: &str, expected_params: &[SqlValue]) {
        let last = self.last_query().expect("No queries were recorded");
        assert_eq!(
            last.sql, expected_sql,
            "SQL mismatch.\nExpected: {}\nActual: {}",
            expected_sql, last.sql
        );
        assert_eq!(
            last.params, expected_params,
            "Parameters mismatch.\nExpected: {:?}\nActual: {:?}",
            expected_params, last.params
        );
    }

    /// Assert that exactly n queries were executed.
    pub fn assert_query_count(&self, expected: usize) {
        let actual = self.recorded_queries.lock().unwrap().len();
        assert_eq!(
            actual, expected,
            "Query count mismatch. Expected: {}, Actual: {}",
            expected, actual
        );
    }

    fn run(&self, sql: &str, params: &[SqlValue]) -> Result<QueryExecutionResult, ExecutorError> {
        self.recorded_queries.lock().unwrap().push(RecordedQuery {
            sql: sql.to_string(),
            params: params.to_vec(),
        });

        if let Some(response) = self.responses.lock().unwrap().pop_front() {
            return response;
        }
        if let Some(response) = &self.default_response {
            return Ok(response.clone());
        }
        Ok(select_literal(sql).unwrap_or_else(|| QueryExecutionResult::new(Value::Array(vec![]))))
    }
}

impl Default for InMemoryConnection {
    fn default() -> Self {
        Self::new()
    }
}

/// Answers `SELECT <integer>` the way Postgres names an unaliased column.
fn select_literal(sql: &str) -> Option<QueryExecutionResult> {
    let sql = sql.trim().trim_end_matches(';').trim_end();
    let (keyword, rest) = sql.split_once(char::is_whitespace)?;
    if !keyword.eq_ignore_ascii_case("select") {
        return None;
    }
    let value: i64 = rest.trim().parse().ok()?;
    Some(QueryExecutionResult::from_rows(
        &["?column?".to_string()],
        vec![vec![Value::from(value)]],
    ))
}

/// Plugin backed by [`InMemoryConnection`].
#[derive(Debug, Clone, Default)]
pub struct InMemoryPlugin {
    redacted_keys: Vec<String>,
}

impl InMemoryPlugin {
    pub fn new() -> Self {
        Self::default()
    }

    /// Query config keys whose values are replaced by [`REDACTED`] when the
    /// config is sanitized.
    pub fn with_redacted_keys(mut self, keys: &[&str]) -> Self {
        self.redacted_keys = keys.iter().map(|k| k.to_string()).collect();
        self
    }
}

#[async_trait]
impl QueryExecutor for InMemoryPlugin {
    type ConnectionConfig = InMemoryConnectionConfig;
    type Connection = InMemoryConnection;
    type Context = SqlQueryContext;

    fn plugin_id(&self) -> &'static str {
        "in-memory"
    }

    async fn do_build_query_execution_context(
        &self,
        _config: &InMemoryConnectionConfig,
        query_config: &QueryConfig,
        request_params: &RequestParams,
        _visitor: &QueryVisitorContext,
    ) -> Result<SqlQueryContext, ExecutorError> {
        SqlQueryContext::from_query_config(query_config, request_params)
    }

    async fn execute_query(
        &self,
        connection: &InMemoryConnection,
        context: SqlQueryContext,
    ) -> Result<QueryExecutionResult, ExecutorError> {
        connection.run(&context.sql, &context.params)
    }

    async fn get_structure(
        &self,
        connection: &InMemoryConnection,
        _config: &InMemoryConnectionConfig,
    ) -> Result<Option<DatasourceStructure>, ExecutorError> {
        Ok(connection.structure.clone())
    }

    fn sanitize_query_config(&self, mut query_config: QueryConfig) -> QueryConfig {
        for key in &self.redacted_keys {
            if let Some(value) = query_config.get_mut(key) {
                *value = Value::String(REDACTED.to_string());
            }
        }
        query_config
    }
}

/// Builder for creating scripted tabular responses.
pub struct InMemoryResponseBuilder {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl InMemoryResponseBuilder {
    pub fn new() -> Self {
        Self {
            columns: Vec::new(),
            rows: Vec::new(),
        }
    }

    /// Set the column names for the response.
    pub fn columns(mut self, cols: &[&str]) -> Self {
        self.columns = cols.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Add a row of values in column order.
    pub fn row(mut self, values: Vec<Value>) -> Self {
        self.rows.push(values);
        self
    }

    pub fn build(self) -> QueryExecutionResult {
        QueryExecutionResult::from_rows(&self.columns, self.rows)
    }
}

impl Default for InMemoryResponseBuilder {
    fn default() -> Self {
        Self::new()
    }
}

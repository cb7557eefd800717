use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::{codes, ClassifiedError, ExecutorError, PluginError, PluginErrorKind, Result};
use crate::traits::context::{
    downcast_config, downcast_connection, downcast_context, DatasourceConnectionConfig,
    QueryExecutionContext,
};
use crate::types::{
    DatasourceStructure, QueryConfig, QueryExecutionResult, QueryVisitorContext, RequestParams,
};

/// Trait implemented by datasource plugins.
///
/// A plugin supplies the datasource-specific logic: turning a query config
/// into a context and running that context against a live connection. Type
/// checks and error classification are done by [`DynQueryExecutor`], which
/// every `QueryExecutor` gets for free.
#[async_trait]
pub trait QueryExecutor: Send + Sync + 'static {
    type ConnectionConfig: DatasourceConnectionConfig;
    type Connection: Send + Sync + 'static;
    type Context: QueryExecutionContext;

    /// Stable identifier of the plugin, e.g. `"postgres"`.
    fn plugin_id(&self) -> &'static str;

    /// Builds a query context without suspending.
    #[deprecated(note = "implement `do_build_query_execution_context` instead")]
    fn build_query_execution_context(
        &self,
        _config: &Self::ConnectionConfig,
        _query_config: &QueryConfig,
        _request_params: &RequestParams,
        _visitor: &QueryVisitorContext,
    ) -> std::result::Result<Self::Context, ExecutorError> {
        Err(PluginError::invalid_query_settings(
            codes::QUERY_ARGUMENT_ERROR,
            format!("plugin {} has no synchronous query builder", self.plugin_id()),
        )
        .into())
    }

    /// Builds a query context. Plugins that parse templates or perform I/O
    /// while building should override this.
    ///
    /// The default runs the legacy synchronous builder; a panic in it is
    /// reported as `QUERY_ARGUMENT_ERROR`.
    async fn do_build_query_execution_context(
        &self,
        config: &Self::ConnectionConfig,
        query_config: &QueryConfig,
        request_params: &RequestParams,
        visitor: &QueryVisitorContext,
    ) -> std::result::Result<Self::Context, ExecutorError> {
        run_legacy_builder(self, config, query_config, request_params, visitor)
    }

    async fn execute_query(
        &self,
        connection: &Self::Connection,
        context: Self::Context,
    ) -> std::result::Result<QueryExecutionResult, ExecutorError>;

    /// Describes the datasource schema. `None` for datasources without
    /// introspection.
    async fn get_structure(
        &self,
        _connection: &Self::Connection,
        _config: &Self::ConnectionConfig,
    ) -> std::result::Result<Option<DatasourceStructure>, ExecutorError> {
        Ok(None)
    }

    /// Strips or normalizes a query config before it is persisted or logged.
    fn sanitize_query_config(&self, query_config: QueryConfig) -> QueryConfig {
        query_config
    }
}

/// Type-erased view of a plugin used by hosts and the registry.
///
/// Every call checks the concrete types of its arguments against the
/// plugin's declared types and classifies all failures, so callers only
/// ever observe a [`ClassifiedError`].
#[async_trait]
pub trait DynQueryExecutor: Send + Sync {
    fn id(&self) -> &'static str;

    async fn build_context(
        &self,
        config: &dyn DatasourceConnectionConfig,
        query_config: &QueryConfig,
        request_params: &RequestParams,
        visitor: &QueryVisitorContext,
    ) -> Result<Box<dyn QueryExecutionContext>>;

    /// Legacy non-suspending build. Also converts a panicking plugin into a
    /// classified error.
    #[deprecated(note = "use `build_context` instead")]
    fn build_context_blocking(
        &self,
        config: &dyn DatasourceConnectionConfig,
        query_config: &QueryConfig,
        request_params: &RequestParams,
        visitor: &QueryVisitorContext,
    ) -> Result<Box<dyn QueryExecutionContext>>;

    async fn do_execute_query(
        &self,
        connection: &(dyn Any + Send + Sync),
        context: Box<dyn QueryExecutionContext>,
    ) -> Result<QueryExecutionResult>;

    async fn do_get_structure(
        &self,
        connection: &(dyn Any + Send + Sync),
        config: &dyn DatasourceConnectionConfig,
    ) -> Result<Option<DatasourceStructure>>;

    fn sanitize_config(&self, query_config: QueryConfig) -> QueryConfig;
}

#[async_trait]
impl<E: QueryExecutor> DynQueryExecutor for E {
    fn id(&self) -> &'static str {
        self.plugin_id()
    }

    async fn build_context(
        &self,
        config: &dyn DatasourceConnectionConfig,
        query_config: &QueryConfig,
        request_params: &RequestParams,
        visitor: &QueryVisitorContext,
    ) -> Result<Box<dyn QueryExecutionContext>> {
        let plugin = self.plugin_id();
        let config = downcast_config::<E::ConnectionConfig>(config).map_err(|message| {
            warn!(plugin = plugin, %message, "connection config type mismatch");
            PluginError::invalid_query_settings(codes::INVALID_QUERY_SETTINGS, message)
        })?;

        debug!(plugin = plugin, "building query execution context");
        let context = QueryExecutor::do_build_query_execution_context(
            self,
            config,
            query_config,
            request_params,
            visitor,
        )
        .await
        .map_err(|e| classify_build_error(plugin, e))?;
        Ok(Box::new(context))
    }

    fn build_context_blocking(
        &self,
        config: &dyn DatasourceConnectionConfig,
        query_config: &QueryConfig,
        request_params: &RequestParams,
        visitor: &QueryVisitorContext,
    ) -> Result<Box<dyn QueryExecutionContext>> {
        let plugin = self.plugin_id();
        let config = downcast_config::<E::ConnectionConfig>(config).map_err(|message| {
            warn!(plugin = plugin, %message, "connection config type mismatch");
            PluginError::invalid_query_settings(codes::INVALID_QUERY_SETTINGS, message)
        })?;

        run_legacy_builder(self, config, query_config, request_params, visitor)
            .map(|context| Box::new(context) as Box<dyn QueryExecutionContext>)
            .map_err(|e| classify_build_error(plugin, e))
    }

    async fn do_execute_query(
        &self,
        connection: &(dyn Any + Send + Sync),
        context: Box<dyn QueryExecutionContext>,
    ) -> Result<QueryExecutionResult> {
        let plugin = self.plugin_id();
        let (connection, context) = downcast_connection::<E::Connection>(connection)
            .and_then(|connection| Ok((connection, downcast_context::<E::Context>(context)?)))
            .map_err(|message| {
                warn!(plugin = plugin, %message, "query context type mismatch");
                PluginError::invalid_query_settings(codes::INVALID_QUERY_SETTINGS, message)
            })?;

        debug!(plugin = plugin, "executing query");
        QueryExecutor::execute_query(self, connection, context)
            .await
            .map_err(|e| {
                let err = ClassifiedError::wrap(
                    e,
                    PluginErrorKind::QueryExecutionError,
                    codes::QUERY_EXECUTION_ERROR,
                );
                warn!(plugin = plugin, code = err.code(), error = %err, "query execution failed");
                err
            })
    }

    async fn do_get_structure(
        &self,
        connection: &(dyn Any + Send + Sync),
        config: &dyn DatasourceConnectionConfig,
    ) -> Result<Option<DatasourceStructure>> {
        let plugin = self.plugin_id();
        let (connection, config) = downcast_connection::<E::Connection>(connection)
            .and_then(|connection| Ok((connection, downcast_config::<E::ConnectionConfig>(config)?)))
            .map_err(|message| {
                warn!(plugin = plugin, %message, "structure request type mismatch");
                PluginError::invalid_query_settings(codes::DATASOURCE_GET_STRUCTURE_ERROR, message)
            })?;

        debug!(plugin = plugin, "fetching datasource structure");
        QueryExecutor::get_structure(self, connection, config)
            .await
            .map_err(|e| {
                // Only plugin errors survive here; business errors are reported
                // as structure failures too.
                let message = match e {
                    ExecutorError::Plugin(e) => return ClassifiedError::Plugin(e),
                    ExecutorError::Biz(e) => e.message,
                    ExecutorError::Other(e) => e.to_string(),
                };
                let err: ClassifiedError = PluginError::query_execution(
                    codes::DATASOURCE_GET_STRUCTURE_ERROR,
                    message,
                )
                .into();
                warn!(plugin = plugin, code = err.code(), error = %err, "structure introspection failed");
                err
            })
    }

    fn sanitize_config(&self, query_config: QueryConfig) -> QueryConfig {
        QueryExecutor::sanitize_query_config(self, query_config)
    }
}

/// Calls the deprecated synchronous builder, turning a panic into an
/// argument error.
#[allow(deprecated)]
fn run_legacy_builder<E: QueryExecutor + ?Sized>(
    plugin: &E,
    config: &E::ConnectionConfig,
    query_config: &QueryConfig,
    request_params: &RequestParams,
    visitor: &QueryVisitorContext,
) -> std::result::Result<E::Context, ExecutorError> {
    panic::catch_unwind(AssertUnwindSafe(|| {
        plugin.build_query_execution_context(config, query_config, request_params, visitor)
    }))
    .unwrap_or_else(|payload| {
        let message = panic_message(payload.as_ref());
        warn!(plugin = plugin.plugin_id(), %message, "query builder panicked");
        Err(PluginError::invalid_query_settings(codes::QUERY_ARGUMENT_ERROR, message).into())
    })
}

fn classify_build_error(plugin: &str, err: ExecutorError) -> ClassifiedError {
    let err = ClassifiedError::wrap(
        err,
        PluginErrorKind::InvalidQuerySettings,
        codes::QUERY_ARGUMENT_ERROR,
    );
    warn!(plugin = plugin, code = err.code(), error = %err, "failed to build query execution context");
    err
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "query builder panicked".to_string()
    }
}

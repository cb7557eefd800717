use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::error::{codes, BizError, Result};
use crate::traits::{DatasourceConnectionConfig, DynQueryExecutor};
use crate::types::{
    DatasourceStructure, QueryConfig, QueryExecutionResult, QueryVisitorContext, RequestParams,
};

/// Routes host requests to the plugin registered for a datasource type.
#[derive(Clone, Default)]
pub struct PluginRegistry {
    plugins: HashMap<&'static str, Arc<dyn DynQueryExecutor>>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a plugin under its own id, replacing any earlier plugin
    /// with the same id.
    pub fn register(&mut self, plugin: Arc<dyn DynQueryExecutor>) -> &mut Self {
        let id = plugin.id();
        if self.plugins.insert(id, plugin).is_some() {
            debug!(plugin = id, "replaced registered plugin");
        }
        self
    }

    pub fn with_plugin(mut self, plugin: Arc<dyn DynQueryExecutor>) -> Self {
        self.register(plugin);
        self
    }

    pub fn get(&self, plugin_id: &str) -> Result<Arc<dyn DynQueryExecutor>> {
        self.plugins.get(plugin_id).cloned().ok_or_else(|| {
            BizError::new(
                codes::PLUGIN_NOT_FOUND,
                format!("no plugin registered for {}", plugin_id),
            )
            .into()
        })
    }

    /// Registered plugin ids, sorted.
    pub fn plugin_ids(&self) -> Vec<&'static str> {
        let mut ids: Vec<_> = self.plugins.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Builds a query context and executes it on `connection`. Execution
    /// starts only after the context has been built.
    pub async fn run(
        &self,
        plugin_id: &str,
        connection: &(dyn Any + Send + Sync),
        config: &dyn DatasourceConnectionConfig,
        query_config: &QueryConfig,
        request_params: &RequestParams,
        visitor: &QueryVisitorContext,
    ) -> Result<QueryExecutionResult> {
        let plugin = self.get(plugin_id)?;
        let context = plugin
            .build_context(config, query_config, request_params, visitor)
            .await?;
        plugin.do_execute_query(connection, context).await
    }

    pub async fn structure(
        &self,
        plugin_id: &str,
        connection: &(dyn Any + Send + Sync),
        config: &dyn DatasourceConnectionConfig,
    ) -> Result<Option<DatasourceStructure>> {
        self.get(plugin_id)?
            .do_get_structure(connection, config)
            .await
    }
}

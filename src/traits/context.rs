use std::any::{self, Any};
use std::fmt;

/// Type-erasure helpers used for checked downcasts at the plugin boundary.
/// Implemented automatically for every `'static + Send + Sync` type.
pub trait AsAny: Any + Send + Sync {
    fn as_any(&self) -> &dyn Any;

    fn into_any(self: Box<Self>) -> Box<dyn Any + Send>;

    /// Name of the concrete type behind a trait object.
    fn type_name(&self) -> &'static str;
}

impl<T: Any + Send + Sync> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any + Send> {
        self
    }

    fn type_name(&self) -> &'static str {
        any::type_name::<T>()
    }
}

/// Plugin-specific settings needed to reach a datasource.
///
/// Each plugin declares its own concrete config type; the host passes it
/// around as `&dyn DatasourceConnectionConfig` and the contract downcasts it
/// back before calling the plugin.
pub trait DatasourceConnectionConfig: AsAny + fmt::Debug {}

/// A fully-resolved, single-use representation of one query.
///
/// Only the plugin that built a context may execute it; the contract checks
/// the concrete type before handing it back to the plugin.
pub trait QueryExecutionContext: AsAny + fmt::Debug {}

/// Message used when a value handed to a plugin has the wrong concrete type.
pub(crate) fn cast_failure(actual: &str, expected: &str) -> String {
    format!("cannot cast {} to {}", actual, expected)
}

/// Downcasts a connection config to the plugin's declared type.
pub(crate) fn downcast_config<'a, C: DatasourceConnectionConfig>(
    config: &'a dyn DatasourceConnectionConfig,
) -> Result<&'a C, String> {
    config
        .as_any()
        .downcast_ref::<C>()
        .ok_or_else(|| cast_failure(config.type_name(), any::type_name::<C>()))
}

/// Downcasts an owned query context to the plugin's declared type.
pub(crate) fn downcast_context<C: QueryExecutionContext>(
    context: Box<dyn QueryExecutionContext>,
) -> Result<C, String> {
    let actual = (*context).type_name();
    context
        .into_any()
        .downcast::<C>()
        .map(|c| *c)
        .map_err(|_| cast_failure(actual, any::type_name::<C>()))
}

/// Downcasts a borrowed connection handle to the plugin's declared type.
pub(crate) fn downcast_connection<'a, T: Any>(
    connection: &'a (dyn Any + Send + Sync),
) -> Result<&'a T, String> {
    connection
        .downcast_ref::<T>()
        .ok_or_else(|| cast_failure("connection", any::type_name::<T>()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct ConfigA;
    #[derive(Debug)]
    struct ConfigB;
    impl DatasourceConnectionConfig for ConfigA {}
    impl DatasourceConnectionConfig for ConfigB {}

    #[derive(Debug, PartialEq)]
    struct ContextA(u32);
    #[derive(Debug)]
    struct ContextB;
    impl QueryExecutionContext for ContextA {}
    impl QueryExecutionContext for ContextB {}

    #[test]
    fn test_downcast_config() {
        let config: &dyn DatasourceConnectionConfig = &ConfigA;
        assert!(downcast_config::<ConfigA>(config).is_ok());

        let err = downcast_config::<ConfigB>(config).unwrap_err();
        assert!(err.contains("ConfigA"), "{}", err);
        assert!(err.contains("ConfigB"), "{}", err);
    }

    #[test]
    fn test_downcast_context() {
        let context: Box<dyn QueryExecutionContext> = Box::new(ContextA(7));
        assert_eq!(downcast_context::<ContextA>(context).unwrap(), ContextA(7));

        let context: Box<dyn QueryExecutionContext> = Box::new(ContextA(7));
        let err = downcast_context::<ContextB>(context).unwrap_err();
        assert!(err.contains("ContextA"), "{}", err);
    }

    #[test]
    fn test_downcast_connection() {
        let connection = String::from("conn");
        let erased: &(dyn Any + Send + Sync) = &connection;
        assert_eq!(downcast_connection::<String>(erased).unwrap(), "conn");
        assert!(downcast_connection::<u64>(erased).is_err());
    }
}

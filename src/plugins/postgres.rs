use std::collections::BTreeMap;
use std::error::Error;
use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use tokio_postgres::types::{FromSql, Kind, ToSql, Type};
use tokio_postgres::{Client, NoTls, Row};
use uuid::Uuid;

use crate::error::{codes, ExecutorError, PluginError};
use crate::plugins::sql::SqlQueryContext;
use crate::traits::{DatasourceConnectionConfig, QueryExecutor};
use crate::types::{
    ColumnStructure, DatasourceStructure, KeyStructure, KeyType, QueryConfig,
    QueryExecutionResult, QueryVisitorContext, RequestParams, SqlValue, TableStructure, TableType,
};

/// Connection settings for a PostgreSQL datasource.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PostgresConnectionConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub username: String,
    pub password: Option<String>,
    /// Require TLS. No TLS connector is bundled, so this is rejected on
    /// connect.
    pub ssl: bool,
}

impl Default for PostgresConnectionConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            database: "postgres".to_string(),
            username: "postgres".to_string(),
            password: None,
            ssl: false,
        }
    }
}

impl DatasourceConnectionConfig for PostgresConnectionConfig {}

impl PostgresConnectionConfig {
    /// Renders the settings as a libpq-style `key=value` connection string.
    pub fn connection_string(&self) -> String {
        let mut parts = vec![
            format!("host={}", quote_conn_value(&self.host)),
            format!("port={}", self.port),
            format!("dbname={}", quote_conn_value(&self.database)),
            format!("user={}", quote_conn_value(&self.username)),
        ];
        if let Some(password) = &self.password {
            parts.push(format!("password={}", quote_conn_value(password)));
        }
        parts.join(" ")
    }

    /// Opens a client for these settings. The connection lifecycle belongs
    /// to the caller; query execution only borrows the returned client.
    pub async fn connect(&self) -> Result<Client, ExecutorError> {
        if self.ssl {
            return Err(PluginError::invalid_query_settings(
                codes::INVALID_QUERY_SETTINGS,
                "SSL connections are not supported by the postgres plugin",
            )
            .into());
        }
        let (client, connection) = tokio_postgres::connect(&self.connection_string(), NoTls).await?;

        // Spawn the connection handler
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::error!(error = %e, "PostgreSQL connection error");
            }
        });

        Ok(client)
    }
}

fn quote_conn_value(value: &str) -> String {
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "\\'"))
}

/// PostgreSQL plugin implemented with tokio-postgres.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresPlugin;

#[async_trait]
impl QueryExecutor for PostgresPlugin {
    type ConnectionConfig = PostgresConnectionConfig;
    type Connection = Client;
    type Context = SqlQueryContext;

    fn plugin_id(&self) -> &'static str {
        "postgres"
    }

    async fn do_build_query_execution_context(
        &self,
        _config: &PostgresConnectionConfig,
        query_config: &QueryConfig,
        request_params: &RequestParams,
        _visitor: &QueryVisitorContext,
    ) -> Result<SqlQueryContext, ExecutorError> {
        SqlQueryContext::from_query_config(query_config, request_params)
    }

    async fn execute_query(
        &self,
        client: &Client,
        context: SqlQueryContext,
    ) -> Result<QueryExecutionResult, ExecutorError> {
        let statement = client.prepare(&context.sql).await?;

        // Convert bound values to the types the server inferred for each slot
        let converted_params: Vec<BoxedParam> = context
            .params
            .iter()
            .zip(statement.params())
            .map(|(value, ty)| sql_value_to_tosql(value, ty))
            .collect::<Result<_, _>>()?;
        let param_refs: Vec<&(dyn ToSql + Sync)> = converted_params
            .iter()
            .map(|b| b.as_ref() as &(dyn ToSql + Sync))
            .collect();

        let rows = client.query(&statement, &param_refs).await?;

        let columns: Vec<String> = statement
            .columns()
            .iter()
            .map(|c| c.name().to_string())
            .collect();
        let result_rows = rows.iter().map(row_to_json).collect::<Result<Vec<_>, _>>()?;

        Ok(QueryExecutionResult::from_rows(&columns, result_rows))
    }

    async fn get_structure(
        &self,
        client: &Client,
        _config: &PostgresConnectionConfig,
    ) -> Result<Option<DatasourceStructure>, ExecutorError> {
        let columns = client
            .query(COLUMNS_QUERY, &[])
            .await?
            .iter()
            .map(ColumnRecord::from_row)
            .collect::<Result<Vec<_>, _>>()?;
        let keys = client
            .query(KEYS_QUERY, &[])
            .await?
            .iter()
            .map(KeyRecord::from_row)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Some(assemble_structure(columns, keys)))
    }
}

const COLUMNS_QUERY: &str = "\
SELECT c.table_schema::text, c.table_name::text, t.table_type::text, c.column_name::text, \
       c.data_type::text, c.is_nullable::text, c.column_default::text, c.is_identity::text \
FROM information_schema.columns c \
JOIN information_schema.tables t \
  ON t.table_schema = c.table_schema AND t.table_name = c.table_name \
WHERE c.table_schema NOT IN ('pg_catalog', 'information_schema') \
ORDER BY c.table_schema, c.table_name, c.ordinal_position";

const KEYS_QUERY: &str = "\
SELECT tc.table_schema::text, tc.table_name::text, tc.constraint_name::text, \
       tc.constraint_type::text, kcu.column_name::text \
FROM information_schema.table_constraints tc \
JOIN information_schema.key_column_usage kcu \
  ON tc.constraint_schema = kcu.constraint_schema \
 AND tc.constraint_name = kcu.constraint_name \
 AND tc.table_name = kcu.table_name \
WHERE tc.constraint_type IN ('PRIMARY KEY', 'FOREIGN KEY', 'UNIQUE') \
  AND tc.table_schema NOT IN ('pg_catalog', 'information_schema') \
ORDER BY tc.table_schema, tc.table_name, tc.constraint_name, kcu.ordinal_position";

/// One row of `COLUMNS_QUERY`.
#[derive(Debug, Clone)]
struct ColumnRecord {
    schema: String,
    table: String,
    table_type: String,
    column: String,
    data_type: String,
    is_nullable: String,
    default_value: Option<String>,
    is_identity: Option<String>,
}

impl ColumnRecord {
    fn from_row(row: &Row) -> Result<Self, tokio_postgres::Error> {
        Ok(Self {
            schema: row.try_get(0)?,
            table: row.try_get(1)?,
            table_type: row.try_get(2)?,
            column: row.try_get(3)?,
            data_type: row.try_get(4)?,
            is_nullable: row.try_get(5)?,
            default_value: row.try_get(6)?,
            is_identity: row.try_get(7)?,
        })
    }
}

/// One row of `KEYS_QUERY`.
#[derive(Debug, Clone)]
struct KeyRecord {
    schema: String,
    table: String,
    constraint: String,
    constraint_type: String,
    column: String,
}

impl KeyRecord {
    fn from_row(row: &Row) -> Result<Self, tokio_postgres::Error> {
        Ok(Self {
            schema: row.try_get(0)?,
            table: row.try_get(1)?,
            constraint: row.try_get(2)?,
            constraint_type: row.try_get(3)?,
            column: row.try_get(4)?,
        })
    }
}

/// Groups flat catalog rows into tables, preserving column order.
fn assemble_structure(columns: Vec<ColumnRecord>, keys: Vec<KeyRecord>) -> DatasourceStructure {
    let mut tables: BTreeMap<(String, String), TableStructure> = BTreeMap::new();

    for record in columns {
        let table = tables
            .entry((record.schema.clone(), record.table.clone()))
            .or_insert_with(|| {
                let table_type = if record.table_type.eq_ignore_ascii_case("VIEW") {
                    TableType::View
                } else {
                    TableType::Table
                };
                TableStructure::new(Some(record.schema.clone()), record.table.clone(), table_type)
            });

        let is_autogenerated = record.is_identity.as_deref() == Some("YES")
            || record
                .default_value
                .as_deref()
                .map_or(false, |d| d.starts_with("nextval("));
        table.columns.push(ColumnStructure {
            name: record.column,
            column_type: record.data_type,
            nullable: record.is_nullable == "YES",
            default_value: record.default_value,
            is_autogenerated,
        });
    }

    for record in keys {
        let Some(table) = tables.get_mut(&(record.schema, record.table)) else {
            continue;
        };
        let key_type = match record.constraint_type.as_str() {
            "PRIMARY KEY" => KeyType::Primary,
            "FOREIGN KEY" => KeyType::Foreign,
            _ => KeyType::Unique,
        };
        match table.keys.iter_mut().find(|k| k.name == record.constraint) {
            Some(key) => key.columns.push(record.column),
            None => table.keys.push(KeyStructure {
                name: record.constraint,
                key_type,
                columns: vec![record.column],
            }),
        }
    }

    DatasourceStructure::new(tables.into_values().collect())
}

type BoxedParam = Box<dyn ToSql + Sync + Send>;

/// Convert a SqlValue to a boxed ToSql trait object matching the parameter
/// type the server expects. Values that cannot be represented in the target
/// type are rejected rather than narrowed.
fn sql_value_to_tosql(value: &SqlValue, ty: &Type) -> Result<BoxedParam, ExecutorError> {
    let param: BoxedParam = match value {
        // NULL still has to be typed: tokio-postgres type-checks `None` too.
        SqlValue::Null => match *ty {
            Type::BOOL => Box::new(None::<bool>),
            Type::INT2 => Box::new(None::<i16>),
            Type::INT4 => Box::new(None::<i32>),
            Type::INT8 => Box::new(None::<i64>),
            Type::FLOAT4 => Box::new(None::<f32>),
            Type::FLOAT8 => Box::new(None::<f64>),
            Type::NUMERIC => Box::new(None::<Decimal>),
            Type::JSON | Type::JSONB => Box::new(None::<Value>),
            _ => Box::new(None::<String>),
        },
        SqlValue::Bool(b) => Box::new(*b),
        SqlValue::Int64(i) => match *ty {
            Type::INT2 => Box::new(narrow::<i16>(*i, ty)?),
            Type::INT4 => Box::new(narrow::<i32>(*i, ty)?),
            Type::FLOAT4 => Box::new(*i as f32),
            Type::FLOAT8 => Box::new(*i as f64),
            Type::NUMERIC => Box::new(Decimal::from(*i)),
            Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME => Box::new(i.to_string()),
            _ => Box::new(*i),
        },
        SqlValue::Float64(f) => match *ty {
            Type::FLOAT4 => Box::new(*f as f32),
            Type::NUMERIC => Box::new(Decimal::try_from(*f).map_err(|e| out_of_range(f, ty, e))?),
            Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME => Box::new(f.to_string()),
            _ => Box::new(*f),
        },
        SqlValue::Numeric(n) => match *ty {
            Type::INT2 => Box::new(n.parse::<i16>().map_err(|e| out_of_range(n, ty, e))?),
            Type::INT4 => Box::new(n.parse::<i32>().map_err(|e| out_of_range(n, ty, e))?),
            Type::INT8 => Box::new(n.parse::<i64>().map_err(|e| out_of_range(n, ty, e))?),
            Type::NUMERIC => Box::new(Decimal::from_str(n).map_err(|e| out_of_range(n, ty, e))?),
            Type::FLOAT8 => Box::new(n.parse::<f64>().map_err(|e| out_of_range(n, ty, e))?),
            _ => Box::new(n.clone()),
        },
        SqlValue::Text(s) => match *ty {
            Type::INT2 => parse_or_text::<i16>(s),
            Type::INT4 => parse_or_text::<i32>(s),
            Type::INT8 => parse_or_text::<i64>(s),
            Type::FLOAT4 => parse_or_text::<f32>(s),
            Type::FLOAT8 => parse_or_text::<f64>(s),
            Type::NUMERIC => parse_or_text::<Decimal>(s),
            Type::BOOL => parse_or_text::<bool>(s),
            Type::UUID => parse_or_text::<Uuid>(s),
            _ => Box::new(s.clone()),
        },
        SqlValue::Json(v) => match *ty {
            Type::JSON | Type::JSONB => Box::new(v.clone()),
            _ => Box::new(v.to_string()),
        },
    };
    Ok(param)
}

fn narrow<T: TryFrom<i64>>(value: i64, ty: &Type) -> Result<T, ExecutorError>
where
    T::Error: fmt::Display,
{
    T::try_from(value).map_err(|e| out_of_range(value, ty, e))
}

fn out_of_range(value: impl fmt::Display, ty: &Type, cause: impl fmt::Display) -> ExecutorError {
    ExecutorError::msg(format!(
        "parameter value {} does not fit type {}: {}",
        value,
        ty.name(),
        cause
    ))
}

/// Unparseable text is bound as-is so the type check reports the mismatch.
fn parse_or_text<T>(s: &str) -> BoxedParam
where
    T: FromStr + ToSql + Sync + Send + 'static,
{
    match s.trim().parse::<T>() {
        Ok(v) => Box::new(v),
        Err(_) => Box::new(s.to_string()),
    }
}

/// A single result cell decoded straight into JSON.
///
/// Accepts every column type; types without a JSON mapping fail the decode
/// instead of producing a placeholder.
#[derive(Debug, Clone, PartialEq)]
struct JsonCell(Value);

impl<'a> FromSql<'a> for JsonCell {
    fn from_sql(ty: &Type, raw: &'a [u8]) -> Result<Self, Box<dyn Error + Sync + Send>> {
        let value = match *ty {
            Type::BOOL => Value::from(bool::from_sql(ty, raw)?),
            Type::INT2 => Value::from(i16::from_sql(ty, raw)?),
            Type::INT4 => Value::from(i32::from_sql(ty, raw)?),
            Type::INT8 => Value::from(i64::from_sql(ty, raw)?),
            Type::OID => Value::from(u32::from_sql(ty, raw)?),
            Type::FLOAT4 => Value::from(f32::from_sql(ty, raw)?),
            Type::FLOAT8 => Value::from(f64::from_sql(ty, raw)?),
            // Kept as a string: JSON numbers would lose precision and scale.
            Type::NUMERIC => Value::from(Decimal::from_sql(ty, raw)?.to_string()),
            Type::JSON | Type::JSONB => Value::from_sql(ty, raw)?,
            Type::UUID => Value::from(Uuid::from_sql(ty, raw)?.to_string()),
            Type::DATE => Value::from(NaiveDate::from_sql(ty, raw)?.to_string()),
            Type::TIME => Value::from(NaiveTime::from_sql(ty, raw)?.to_string()),
            Type::TIMESTAMP => Value::from(
                NaiveDateTime::from_sql(ty, raw)?
                    .format("%Y-%m-%dT%H:%M:%S%.f")
                    .to_string(),
            ),
            Type::TIMESTAMPTZ => Value::from(DateTime::<Utc>::from_sql(ty, raw)?.to_rfc3339()),
            Type::BYTEA => Value::from(<Vec<u8>>::from_sql(ty, raw)?),
            Type::BOOL_ARRAY => array::<bool>(ty, raw)?,
            Type::INT2_ARRAY => array::<i16>(ty, raw)?,
            Type::INT4_ARRAY => array::<i32>(ty, raw)?,
            Type::INT8_ARRAY => array::<i64>(ty, raw)?,
            Type::FLOAT8_ARRAY => array::<f64>(ty, raw)?,
            Type::TEXT_ARRAY | Type::VARCHAR_ARRAY => array::<String>(ty, raw)?,
            _ if <String as FromSql>::accepts(ty) => Value::from(String::from_sql(ty, raw)?),
            // Enum labels travel as plain UTF-8 in the binary format.
            _ if matches!(ty.kind(), Kind::Enum(_)) => Value::from(std::str::from_utf8(raw)?),
            _ => return Err(format!("unsupported column type {}", ty.name()).into()),
        };
        Ok(JsonCell(value))
    }

    fn from_sql_null(_ty: &Type) -> Result<Self, Box<dyn Error + Sync + Send>> {
        Ok(JsonCell(Value::Null))
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }
}

fn array<'a, T>(ty: &Type, raw: &'a [u8]) -> Result<Value, Box<dyn Error + Sync + Send>>
where
    T: FromSql<'a> + Into<Value>,
{
    let items = <Vec<Option<T>>>::from_sql(ty, raw)?;
    Ok(Value::Array(
        items
            .into_iter()
            .map(|item| item.map_or(Value::Null, Into::into))
            .collect(),
    ))
}

/// Convert every column of `row` to JSON, failing on the first column that
/// has no JSON mapping.
fn row_to_json(row: &Row) -> Result<Vec<Value>, ExecutorError> {
    (0..row.len())
        .map(|i| -> Result<Value, ExecutorError> { Ok(row.try_get::<_, JsonCell>(i)?.0) })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BytesMut;
    use tokio_postgres::types::IsNull;

    fn column(table: &str, name: &str, default: Option<&str>) -> ColumnRecord {
        ColumnRecord {
            schema: "public".to_string(),
            table: table.to_string(),
            table_type: "BASE TABLE".to_string(),
            column: name.to_string(),
            data_type: "integer".to_string(),
            is_nullable: "NO".to_string(),
            default_value: default.map(str::to_string),
            is_identity: Some("NO".to_string()),
        }
    }

    #[test]
    fn test_connection_string() {
        let config = PostgresConnectionConfig {
            password: Some("p'w".to_string()),
            ..Default::default()
        };
        assert_eq!(
            config.connection_string(),
            "host='localhost' port=5432 dbname='postgres' user='postgres' password='p\\'w'"
        );
    }

    #[test]
    fn test_config_deserializes_with_defaults() {
        let config: PostgresConnectionConfig =
            serde_json::from_value(serde_json::json!({"host": "db", "database": "app"})).unwrap();
        assert_eq!(config.host, "db");
        assert_eq!(config.database, "app");
        assert_eq!(config.port, 5432);
        assert_eq!(config.password, None);
        assert!(!config.ssl);
    }

    #[tokio::test]
    async fn test_connect_rejects_ssl() {
        let config = PostgresConnectionConfig {
            ssl: true,
            ..Default::default()
        };
        match config.connect().await {
            Err(ExecutorError::Plugin(e)) => {
                assert_eq!(e.code, codes::INVALID_QUERY_SETTINGS);
            }
            Err(other) => panic!("Expected plugin error, got {}", other),
            Ok(_) => panic!("Expected connect to fail"),
        }
    }

    fn bind(value: SqlValue, ty: &Type) -> BoxedParam {
        sql_value_to_tosql(&value, ty).unwrap()
    }

    fn accepts(param: &BoxedParam, ty: &Type) -> bool {
        param.to_sql_checked(ty, &mut BytesMut::new()).is_ok()
    }

    #[test]
    fn test_int_params_are_never_truncated() {
        let err = sql_value_to_tosql(&SqlValue::Int64(4_294_967_297), &Type::INT4).unwrap_err();
        assert!(err.to_string().contains("int4"), "{}", err);

        let err = sql_value_to_tosql(&SqlValue::Int64(70_000), &Type::INT2).unwrap_err();
        assert!(err.to_string().contains("70000"), "{}", err);

        let param = bind(SqlValue::Int64(70_000), &Type::INT4);
        assert_eq!(format!("{:?}", param), "70000");
        assert!(accepts(&param, &Type::INT4));

        let param = bind(SqlValue::Int64(-3), &Type::INT2);
        assert_eq!(format!("{:?}", param), "-3");
        assert!(accepts(&param, &Type::INT2));
    }

    #[test]
    fn test_int_params_widen_to_float_and_numeric() {
        let param = bind(SqlValue::Int64(3), &Type::FLOAT8);
        assert_eq!(format!("{:?}", param), "3.0");
        assert!(accepts(&param, &Type::FLOAT8));

        assert!(accepts(&bind(SqlValue::Int64(3), &Type::NUMERIC), &Type::NUMERIC));
    }

    #[test]
    fn test_nulls_are_typed() {
        for ty in [
            Type::BOOL,
            Type::INT2,
            Type::INT4,
            Type::INT8,
            Type::FLOAT8,
            Type::NUMERIC,
            Type::JSONB,
            Type::TEXT,
        ] {
            let param = bind(SqlValue::Null, &ty);
            assert!(
                matches!(param.to_sql_checked(&ty, &mut BytesMut::new()), Ok(IsNull::Yes)),
                "NULL rejected for {}",
                ty
            );
        }
    }

    #[test]
    fn test_text_params_parse_or_fall_back() {
        let param = bind(SqlValue::Text("42".to_string()), &Type::INT8);
        assert_eq!(format!("{:?}", param), "42");
        assert!(accepts(&param, &Type::INT8));

        // Left as text, so the type check rejects it instead of guessing.
        let param = bind(SqlValue::Text("abc".to_string()), &Type::INT8);
        assert_eq!(format!("{:?}", param), "\"abc\"");
        assert!(!accepts(&param, &Type::INT8));
    }

    #[test]
    fn test_json_params_on_text_columns() {
        let param = bind(SqlValue::Json(serde_json::json!({"a": 1})), &Type::TEXT);
        let mut buf = BytesMut::new();
        param.to_sql_checked(&Type::TEXT, &mut buf).unwrap();
        assert_eq!(&buf[..], b"{\"a\":1}");

        assert!(accepts(
            &bind(SqlValue::Json(serde_json::json!([1])), &Type::JSONB),
            &Type::JSONB
        ));
    }

    #[test]
    fn test_big_numeric_params() {
        let big = SqlValue::Numeric("18446744073709551615".to_string());
        assert!(sql_value_to_tosql(&big, &Type::INT8).is_err());
        assert!(accepts(&bind(big, &Type::NUMERIC), &Type::NUMERIC));
    }

    fn encode<T: ToSql>(value: T, ty: &Type) -> BytesMut {
        let mut buf = BytesMut::new();
        value.to_sql(ty, &mut buf).unwrap();
        buf
    }

    fn decode(ty: &Type, raw: &[u8]) -> Value {
        JsonCell::from_sql(ty, raw).unwrap().0
    }

    #[test]
    fn test_cells_decode_to_json() {
        use serde_json::json;

        assert_eq!(decode(&Type::INT4, &encode(7i32, &Type::INT4)), json!(7));
        assert_eq!(decode(&Type::BOOL, &encode(true, &Type::BOOL)), json!(true));
        assert_eq!(decode(&Type::TEXT, &encode("hi", &Type::TEXT)), json!("hi"));
        assert_eq!(
            JsonCell::from_sql_null(&Type::INT4).unwrap(),
            JsonCell(Value::Null)
        );
    }

    #[test]
    fn test_cells_keep_precise_and_temporal_values() {
        use chrono::TimeZone;
        use serde_json::json;

        let amount = Decimal::from_str("12.5").unwrap();
        assert_eq!(
            decode(&Type::NUMERIC, &encode(amount, &Type::NUMERIC)),
            json!("12.5")
        );

        let id = Uuid::nil();
        assert_eq!(
            decode(&Type::UUID, &encode(id, &Type::UUID)),
            json!("00000000-0000-0000-0000-000000000000")
        );

        let day = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        assert_eq!(decode(&Type::DATE, &encode(day, &Type::DATE)), json!("2024-01-02"));

        let at = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(
            decode(&Type::TIMESTAMPTZ, &encode(at, &Type::TIMESTAMPTZ)),
            json!("2024-01-02T03:04:05+00:00")
        );

        let ids = vec![Some(1i32), None];
        assert_eq!(
            decode(&Type::INT4_ARRAY, &encode(ids, &Type::INT4_ARRAY)),
            json!([1, null])
        );
    }

    #[test]
    fn test_unmapped_cells_are_errors() {
        let err = JsonCell::from_sql(&Type::POINT, &[0u8; 16]).unwrap_err();
        assert!(err.to_string().contains("point"), "{}", err);
    }

    #[test]
    fn test_assemble_structure() {
        let columns = vec![
            column("users", "id", Some("nextval('users_id_seq'::regclass)")),
            column("users", "org_id", None),
            column("orgs", "id", None),
        ];
        let keys = vec![
            KeyRecord {
                schema: "public".to_string(),
                table: "users".to_string(),
                constraint: "users_pkey".to_string(),
                constraint_type: "PRIMARY KEY".to_string(),
                column: "id".to_string(),
            },
            KeyRecord {
                schema: "public".to_string(),
                table: "users".to_string(),
                constraint: "users_org_fk".to_string(),
                constraint_type: "FOREIGN KEY".to_string(),
                column: "org_id".to_string(),
            },
        ];

        let structure = assemble_structure(columns, keys);
        assert_eq!(structure.tables.len(), 2);

        let users = structure.table(Some("public"), "users").unwrap();
        assert_eq!(users.table_type, TableType::Table);
        assert_eq!(users.columns.len(), 2);
        assert!(users.column("id").unwrap().is_autogenerated);
        assert!(!users.column("org_id").unwrap().is_autogenerated);
        assert_eq!(users.keys.len(), 2);
        assert_eq!(users.keys[0].key_type, KeyType::Primary);
        assert_eq!(users.keys[1].key_type, KeyType::Foreign);
        assert!(structure.table(None, "orgs").unwrap().keys.is_empty());
    }
}

use serde::{Deserialize, Serialize};

/// Schema description of a datasource that supports introspection.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DatasourceStructure {
    pub tables: Vec<TableStructure>,
}

impl DatasourceStructure {
    pub fn new(tables: Vec<TableStructure>) -> Self {
        Self { tables }
    }

    /// Looks up a table by name, optionally restricted to a schema.
    pub fn table(&self, schema: Option<&str>, name: &str) -> Option<&TableStructure> {
        self.tables.iter().find(|t| {
            t.name == name && schema.map_or(true, |s| t.schema.as_deref() == Some(s))
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TableType {
    Table,
    View,
    Collection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableStructure {
    pub schema: Option<String>,
    pub name: String,
    #[serde(rename = "type")]
    pub table_type: TableType,
    pub columns: Vec<ColumnStructure>,
    #[serde(default)]
    pub keys: Vec<KeyStructure>,
}

impl TableStructure {
    pub fn new(schema: Option<String>, name: impl Into<String>, table_type: TableType) -> Self {
        Self {
            schema,
            name: name.into(),
            table_type,
            columns: Vec::new(),
            keys: Vec::new(),
        }
    }

    /// Returns the fully qualified table name (schema.table or just table).
    pub fn qualified_name(&self) -> String {
        match &self.schema {
            Some(schema) => format!("{}.{}", schema, self.name),
            None => self.name.clone(),
        }
    }

    pub fn column(&self, name: &str) -> Option<&ColumnStructure> {
        self.columns.iter().find(|c| c.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnStructure {
    pub name: String,
    /// Datasource-native type name, e.g. `integer` or `character varying`.
    #[serde(rename = "type")]
    pub column_type: String,
    pub nullable: bool,
    #[serde(default)]
    pub default_value: Option<String>,
    #[serde(default)]
    pub is_autogenerated: bool,
}

impl ColumnStructure {
    pub fn new(name: impl Into<String>, column_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            column_type: column_type.into(),
            nullable: true,
            default_value: None,
            is_autogenerated: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum KeyType {
    Primary,
    Foreign,
    Unique,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyStructure {
    pub name: String,
    pub key_type: KeyType,
    pub columns: Vec<String>,
}

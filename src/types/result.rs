use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ResultError;

/// Normalized outcome of a query, returned uniformly by every plugin.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryExecutionResult {
    /// Success payload. Tabular plugins store an array of row objects.
    pub data: Value,
    /// Optional response metadata (e.g. HTTP headers, affected row counts).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hint_messages: Vec<String>,
}

impl QueryExecutionResult {
    pub fn new(data: Value) -> Self {
        Self {
            data,
            headers: None,
            hint_messages: Vec::new(),
        }
    }

    /// Builds a tabular result. Each row becomes a JSON object keyed by
    /// column name; surplus values beyond the column list are ignored.
    ///
    /// Repeated column names (e.g. `SELECT a.id, b.id`) get a numeric
    /// suffix, so the second `id` is stored as `id_1`.
    pub fn from_rows(columns: &[String], rows: Vec<Vec<Value>>) -> Self {
        let columns = unique_columns(columns);
        let data = rows
            .into_iter()
            .map(|values| {
                let object: Map<String, Value> = columns
                    .iter()
                    .cloned()
                    .zip(values)
                    .collect();
                Value::Object(object)
            })
            .collect();
        Self::new(Value::Array(data))
    }

    pub fn with_headers(mut self, headers: Value) -> Self {
        self.headers = Some(headers);
        self
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint_messages.push(hint.into());
        self
    }

    /// Returns all rows of a tabular result.
    pub fn rows(&self) -> Result<Vec<Row>, ResultError> {
        let Value::Array(items) = &self.data else {
            return Err(ResultError::NotTabular);
        };
        items
            .iter()
            .map(|item| match item {
                Value::Object(values) => Ok(Row::new(values.clone())),
                _ => Err(ResultError::NotTabular),
            })
            .collect()
    }

    /// Extracts a single row from the result.
    /// Returns an error if the result contains zero or more than one row.
    pub fn single_row(&self) -> Result<Row, ResultError> {
        let mut rows = self.rows()?;
        if rows.len() != 1 {
            return Err(ResultError::UnexpectedRowCount {
                expected: 1,
                actual: rows.len(),
            });
        }
        Ok(rows.remove(0))
    }

    /// Number of rows for tabular results, 0 otherwise.
    pub fn len(&self) -> usize {
        match &self.data {
            Value::Array(items) => items.len(),
            _ => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A single row of a tabular result, accessed by column name.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    values: Map<String, Value>,
}

impl Row {
    pub(crate) fn new(values: Map<String, Value>) -> Self {
        Self { values }
    }

    /// Gets a value by column name.
    pub fn get(&self, column: &str) -> Result<&Value, ResultError> {
        self.values
            .get(column)
            .ok_or_else(|| ResultError::ColumnNotFound(column.to_string()))
    }

    /// Returns all column names in this row.
    pub fn columns(&self) -> Vec<&str> {
        self.values.keys().map(|s| s.as_str()).collect()
    }

    /// Returns the number of columns in this row.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if this row has no columns.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

fn unique_columns(columns: &[String]) -> Vec<String> {
    let mut seen = HashSet::with_capacity(columns.len());
    columns
        .iter()
        .map(|name| {
            let mut unique = name.clone();
            let mut n = 1;
            while seen.contains(&unique) {
                unique = format!("{}_{}", name, n);
                n += 1;
            }
            seen.insert(unique.clone());
            unique
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn cols(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_row_get() {
        let result = QueryExecutionResult::from_rows(
            &cols(&["id", "name"]),
            vec![vec![json!(1), json!("John")]],
        );
        let row = result.single_row().unwrap();

        assert_eq!(row.get("id").unwrap(), &json!(1));
        assert_eq!(row.get("name").unwrap(), &json!("John"));
        assert!(row.get("missing").is_err());
        assert_eq!(row.len(), 2);
    }

    #[test]
    fn test_repeated_columns_are_all_kept() {
        let result = QueryExecutionResult::from_rows(
            &cols(&["id", "id", "id_1"]),
            vec![vec![json!(1), json!(2), json!(3)]],
        );
        let row = result.single_row().unwrap();

        assert_eq!(row.len(), 3);
        assert_eq!(row.get("id").unwrap(), &json!(1));
        assert_eq!(row.get("id_1").unwrap(), &json!(2));
        assert_eq!(row.get("id_1_1").unwrap(), &json!(3));
    }

    #[test]
    fn test_single_row_error_on_empty() {
        let result = QueryExecutionResult::from_rows(&cols(&["id"]), vec![]);
        match result.single_row().unwrap_err() {
            ResultError::UnexpectedRowCount { expected, actual } => {
                assert_eq!(expected, 1);
                assert_eq!(actual, 0);
            }
            _ => panic!("Expected UnexpectedRowCount error"),
        }
    }

    #[test]
    fn test_single_row_error_on_multiple() {
        let result = QueryExecutionResult::from_rows(
            &cols(&["id"]),
            vec![vec![json!(1)], vec![json!(2)]],
        );
        match result.single_row().unwrap_err() {
            ResultError::UnexpectedRowCount { expected, actual } => {
                assert_eq!(expected, 1);
                assert_eq!(actual, 2);
            }
            _ => panic!("Expected UnexpectedRowCount error"),
        }
    }

    #[test]
    fn test_non_tabular_data() {
        let result = QueryExecutionResult::new(json!({"ok": true}));
        assert!(matches!(result.rows(), Err(ResultError::NotTabular)));
        assert!(result.is_empty());
    }

    #[test]
    fn test_serializes_camel_case() {
        let result = QueryExecutionResult::new(json!([])).with_hint("slow query");
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value, json!({"data": [], "hintMessages": ["slow query"]}));
    }
}

//! Resolution of `{{ name }}` placeholders against request parameters.
//!
//! Placeholders are replaced by positional parameters (`$1`, `$2`, ...) in
//! order of appearance, and the matching values are collected for binding.

use serde_json::Value;

use crate::error::TemplateError;
use crate::types::{RequestParams, SqlValue};

const OPEN: &str = "{{";
const CLOSE: &str = "}}";

/// A statement with its placeholders rewritten to positional parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundStatement {
    pub sql: String,
    pub params: Vec<SqlValue>,
}

/// Rewrites placeholders in `template` to `$n` and collects their values.
pub fn bind(template: &str, params: &RequestParams) -> Result<BoundStatement, TemplateError> {
    let mut sql = String::with_capacity(template.len());
    let mut values = Vec::new();

    for segment in parse(template)? {
        match segment {
            Segment::Text(text) => sql.push_str(text),
            Segment::Variable(name) => {
                let value = lookup(params, name)
                    .ok_or_else(|| TemplateError::MissingVariable(name.to_string()))?;
                values.push(SqlValue::from(value));
                sql.push('$');
                sql.push_str(&values.len().to_string());
            }
        }
    }

    Ok(BoundStatement {
        sql,
        params: values,
    })
}

/// Replaces placeholders in `template` with SQL literals of their values,
/// for datasources running without prepared statements.
pub fn inline(template: &str, params: &RequestParams) -> Result<String, TemplateError> {
    let mut sql = String::with_capacity(template.len());
    for segment in parse(template)? {
        match segment {
            Segment::Text(text) => sql.push_str(text),
            Segment::Variable(name) => {
                let value = lookup(params, name)
                    .ok_or_else(|| TemplateError::MissingVariable(name.to_string()))?;
                sql.push_str(&SqlValue::from(value).to_sql_literal());
            }
        }
    }
    Ok(sql)
}

/// Lists the variable names referenced by `template`, in order of appearance.
pub fn variables(template: &str) -> Result<Vec<&str>, TemplateError> {
    Ok(parse(template)?
        .into_iter()
        .filter_map(|segment| match segment {
            Segment::Variable(name) => Some(name),
            Segment::Text(_) => None,
        })
        .collect())
}

enum Segment<'a> {
    Text(&'a str),
    Variable(&'a str),
}

fn parse(template: &str) -> Result<Vec<Segment<'_>>, TemplateError> {
    let mut segments = Vec::new();
    let mut rest = template;
    let mut offset = 0;

    while let Some(start) = rest.find(OPEN) {
        if start > 0 {
            segments.push(Segment::Text(&rest[..start]));
        }
        let after_open = &rest[start + OPEN.len()..];
        let end = after_open
            .find(CLOSE)
            .ok_or(TemplateError::Unterminated(offset + start))?;
        let name = after_open[..end].trim();
        if name.is_empty() {
            return Err(TemplateError::EmptyName(offset + start));
        }
        segments.push(Segment::Variable(name));

        let consumed = start + OPEN.len() + end + CLOSE.len();
        rest = &rest[consumed..];
        offset += consumed;
    }
    if !rest.is_empty() {
        segments.push(Segment::Text(rest));
    }
    Ok(segments)
}

/// Resolves `name` as a top-level key first, then as a dotted path.
fn lookup<'a>(params: &'a RequestParams, name: &str) -> Option<&'a Value> {
    if let Some(value) = params.get(name) {
        return Some(value);
    }
    let mut parts = name.split('.');
    let mut current = params.get(parts.next()?)?;
    for part in parts {
        current = match current {
            Value::Object(map) => map.get(part)?,
            Value::Array(items) => items.get(part.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(value: Value) -> RequestParams {
        match value {
            Value::Object(map) => map,
            _ => panic!("params must be an object"),
        }
    }

    #[test]
    fn test_no_placeholders() {
        let bound = bind("SELECT 1", &RequestParams::new()).unwrap();
        assert_eq!(bound.sql, "SELECT 1");
        assert!(bound.params.is_empty());
    }

    #[test]
    fn test_bind_in_order() {
        let p = params(json!({"name": "John", "age": 30}));
        let bound = bind(
            "SELECT id FROM users WHERE name = {{ name }} AND age > {{age}}",
            &p,
        )
        .unwrap();

        assert_eq!(bound.sql, "SELECT id FROM users WHERE name = $1 AND age > $2");
        assert_eq!(
            bound.params,
            vec![SqlValue::Text("John".to_string()), SqlValue::Int64(30)]
        );
    }

    #[test]
    fn test_dotted_path() {
        let p = params(json!({"form": {"user": {"id": 5}}, "ids": [10, 11]}));
        let bound = bind("{{form.user.id}} {{ids.1}}", &p).unwrap();
        assert_eq!(bound.params, vec![SqlValue::Int64(5), SqlValue::Int64(11)]);
    }

    #[test]
    fn test_missing_variable() {
        let err = bind("SELECT {{ nope }}", &RequestParams::new()).unwrap_err();
        assert_eq!(err, TemplateError::MissingVariable("nope".to_string()));
    }

    #[test]
    fn test_unterminated_and_empty() {
        assert_eq!(
            bind("SELECT {{ a", &RequestParams::new()).unwrap_err(),
            TemplateError::Unterminated(7)
        );
        assert_eq!(
            bind("SELECT {{ }}", &RequestParams::new()).unwrap_err(),
            TemplateError::EmptyName(7)
        );
    }

    #[test]
    fn test_variables() {
        assert_eq!(variables("{{a}} x {{ b.c }}").unwrap(), vec!["a", "b.c"]);
    }

    #[test]
    fn test_inlined() {
        let p = params(json!({"name": "O'Brien", "n": 2}));
        assert_eq!(
            inline("WHERE name = {{name}} LIMIT {{n}}", &p).unwrap(),
            "WHERE name = 'O''Brien' LIMIT 2"
        );
    }
}

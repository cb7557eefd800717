use std::collections::HashMap;

use serde_json::{Map, Value};

/// User-authored query configuration. Each plugin interprets its own keys.
pub type QueryConfig = Map<String, Value>;

/// Runtime substitution values for templated queries.
pub type RequestParams = Map<String, Value>;

/// Caller identity and environment passed through to context construction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryVisitorContext {
    pub user_id: Option<String>,
    pub org_id: Option<String>,
    pub cookies: HashMap<String, String>,
}

impl QueryVisitorContext {
    /// Context for an unauthenticated caller.
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn for_user(user_id: impl Into<String>, org_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            org_id: Some(org_id.into()),
            cookies: HashMap::new(),
        }
    }

    pub fn with_cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.cookies.insert(name.into(), value.into());
        self
    }

    pub fn is_anonymous(&self) -> bool {
        self.user_id.is_none()
    }
}

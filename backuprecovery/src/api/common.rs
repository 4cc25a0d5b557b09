//! Common types and utilities for the Backup Recovery API

use serde::{Deserialize, Serialize};

/// Error body returned by the service
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiErrorResponse {
    pub error_code: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, thiserror::Error)]
#[error("API error details: error_code={error_code:?}, message={message:?}")]
pub struct ApiErrorDetails {
    pub error_code: Option<String>,
    pub message: Option<String>,
}

/// Key/value pair used by advanced configs and alert properties
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyValuePair {
    pub key: String,
    pub value: String,
}

/// Per-request headers
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    /// Sent as `X-IBM-Tenant-Id`
    pub tenant_id: Option<String>,
    /// Sent as `X-Scope-Identifier`
    pub scope_identifier: Option<String>,
    /// Sent as `Cookie: session_name=...` to connector endpoints
    pub session_cookie: Option<String>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tenant(tenant_id: &str) -> Self {
        Self {
            tenant_id: Some(tenant_id.to_string()),
            ..Default::default()
        }
    }

    pub fn scope(scope_identifier: &str) -> Self {
        Self {
            scope_identifier: Some(scope_identifier.to_string()),
            ..Default::default()
        }
    }

    pub fn session(cookie: &str) -> Self {
        Self {
            session_cookie: Some(cookie.to_string()),
            ..Default::default()
        }
    }

    pub fn with_tenant(mut self, tenant_id: Option<String>) -> Self {
        self.tenant_id = tenant_id;
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct ApiQueryParams {
    params: Vec<(String, String)>,
}

impl ApiQueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add<K: Into<String>, V: ToString>(mut self, key: K, value: V) -> Self {
        self.params.push((key.into(), value.to_string()));
        self
    }

    pub fn add_optional<K: Into<String>, V: ToString>(mut self, key: K, value: Option<V>) -> Self {
        if let Some(v) = value {
            self.params.push((key.into(), v.to_string()));
        }
        self
    }

    /// Lists go out comma separated; an empty or absent list adds nothing
    pub fn add_list<K: Into<String>, V: ToString>(mut self, key: K, values: Option<&[V]>) -> Self {
        if let Some(values) = values.filter(|v| !v.is_empty()) {
            let joined = values
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(",");
            self.params.push((key.into(), joined));
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn to_query_string(&self) -> String {
        if self.params.is_empty() {
            String::new()
        } else {
            format!(
                "?{}",
                self.params
                    .iter()
                    .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
                    .collect::<Vec<_>>()
                    .join("&")
            )
        }
    }
}

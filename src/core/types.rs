//! # Core Types Module
//!
//! Requests, responses and records as the mock backend sees them.
//!
//! Records are schema-less: every collection stores open-ended JSON objects whose only
//! required field is the store-assigned integer `id`. `serde_json::Map` keeps keys ordered,
//! which keeps persisted documents and responses stable between runs.

use http::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use uuid::Uuid;

/// A single record inside a collection
pub type Record = serde_json::Map<String, Value>;

/// Named placeholder bindings extracted from a matched path
pub type ParamMap = HashMap<String, String>;

/// Field every record is keyed by
pub const ID_FIELD: &str = "id";

/// An HTTP-shaped call intercepted by the router
#[derive(Debug, Clone)]
pub struct MockRequest {
    /// Unique identifier for this request (for tracing and logging)
    pub id: String,

    /// HTTP verb
    pub method: Method,

    /// Path without the query string
    pub path: String,

    /// Raw query string, kept only so passthrough can forward it verbatim
    pub query: Option<String>,

    /// Raw request body, parsed as JSON on dispatch
    pub body: Option<String>,

    /// Request headers
    pub headers: HashMap<String, String>,
}

impl MockRequest {
    /// Create a new request, splitting any query string off the URI
    pub fn new(method: Method, uri: &str) -> Self {
        let (path, query) = match uri.split_once('?') {
            Some((path, query)) => (path.to_string(), Some(query.to_string())),
            None => (uri.to_string(), None),
        };

        Self {
            id: Uuid::new_v4().to_string(),
            method,
            path,
            query,
            body: None,
            headers: HashMap::new(),
        }
    }

    /// Attach a raw body
    pub fn with_body<S: Into<String>>(mut self, body: S) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Attach a header
    pub fn with_header<K: Into<String>, V: Into<String>>(mut self, name: K, value: V) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Path plus query string, as it arrived
    pub fn uri(&self) -> String {
        match &self.query {
            Some(query) => format!("{}?{}", self.path, query),
            None => self.path.clone(),
        }
    }
}

/// Response envelope returned for every dispatched request
///
/// Collection reads carry `{items: [...]}`, single-record reads and writes carry
/// `{item: {...}}` and failures carry `{error: {code, message}}`. Passthrough responses
/// carry whatever the live backend returned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MockResponse {
    /// HTTP status code
    pub status_code: u16,

    /// Canonical reason phrase for the status code
    pub status_text: String,

    /// Response body
    pub body: Value,

    /// Response headers
    pub headers: HashMap<String, String>,
}

impl MockResponse {
    /// Create a JSON response with the given status
    pub fn json(status: StatusCode, body: Value) -> Self {
        let mut headers = HashMap::new();
        headers.insert("content-type".to_string(), "application/json".to_string());

        Self {
            status_code: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            body,
            headers,
        }
    }

    /// 200 response wrapping a list of records
    pub fn items(records: Vec<Record>) -> Self {
        Self::json(StatusCode::OK, json!({ "items": records }))
    }

    /// 200 response wrapping one record
    pub fn item(record: Record) -> Self {
        Self::json(StatusCode::OK, json!({ "item": record }))
    }

    /// Error envelope
    pub fn error<S: Into<String>>(status: StatusCode, message: S) -> Self {
        Self::json(
            status,
            json!({
                "error": {
                    "code": status.as_u16(),
                    "message": message.into(),
                }
            }),
        )
    }

    /// Status as an `http::StatusCode`
    pub fn status(&self) -> StatusCode {
        StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    /// Check for a 2xx status
    pub fn is_success(&self) -> bool {
        self.status().is_success()
    }

    /// Records of a collection read, if this is one
    pub fn body_items(&self) -> Option<&Vec<Value>> {
        self.body.get("items").and_then(Value::as_array)
    }

    /// Record of a single-item read or write, if this is one
    pub fn body_item(&self) -> Option<&Record> {
        self.body.get("item").and_then(Value::as_object)
    }
}

/// ID used for lookups: numbers and strings compare by their textual form,
/// so `2` and `"2"` address the same record.
pub fn record_id_key(value: &Value) -> Option<String> {
    match value {
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => Some(s.clone()),
        _ => None,
    }
}

/// Integer value of an ID, accepting numeric strings
pub fn record_numeric_id(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_splits_query() {
        let request = MockRequest::new(Method::GET, "/users?page=2");
        assert_eq!(request.path, "/users");
        assert_eq!(request.query.as_deref(), Some("page=2"));
        assert_eq!(request.uri(), "/users?page=2");
    }

    #[test]
    fn test_response_serializes_camel_case() {
        let response = MockResponse::items(Vec::new());
        let value = serde_json::to_value(&response).unwrap();

        assert_eq!(value["statusCode"], 200);
        assert_eq!(value["statusText"], "OK");
        assert_eq!(value["body"]["items"], json!([]));
    }

    #[test]
    fn test_id_keys_tolerate_strings() {
        assert_eq!(record_id_key(&json!(2)), record_id_key(&json!("2")));
        assert_eq!(record_numeric_id(&json!("17")), Some(17));
        assert_eq!(record_id_key(&json!(null)), None);
    }
}

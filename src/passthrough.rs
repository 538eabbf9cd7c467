//! # Passthrough
//!
//! Requests no route claims are handed to a passthrough, which forwards them unmodified to
//! a live backend. This lets emulated and real endpoints be mixed in one process.
//!
//! - [`HttpPassthrough`] forwards over HTTP with `reqwest`
//! - [`OfflinePassthrough`] answers a 404 envelope when no live backend is configured

use async_trait::async_trait;
use http::StatusCode;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use crate::core::error::{MockError, MockResult};
use crate::core::types::{MockRequest, MockResponse};

/// Collaborator that serves requests no route matched
#[async_trait]
pub trait Passthrough: Send + Sync {
    /// Forward `request` and return the genuine response
    async fn forward(&self, request: &MockRequest) -> MockResult<MockResponse>;

    /// Human-readable target, for logs
    fn describe(&self) -> String;
}

/// Passthrough used when no live backend is configured
#[derive(Debug, Default, Clone)]
pub struct OfflinePassthrough;

#[async_trait]
impl Passthrough for OfflinePassthrough {
    async fn forward(&self, request: &MockRequest) -> MockResult<MockResponse> {
        debug!(method = %request.method, path = %request.path, "No live backend configured");
        Ok(MockResponse::error(
            StatusCode::NOT_FOUND,
            format!("no route for {} {}", request.method, request.path),
        ))
    }

    fn describe(&self) -> String {
        "offline".to_string()
    }
}

/// Forwards requests to a live HTTP backend
#[derive(Debug, Clone)]
pub struct HttpPassthrough {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpPassthrough {
    /// Create a passthrough targeting `base_url`
    pub fn new(base_url: &str, timeout: Duration) -> MockResult<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| MockError::config(format!("Invalid passthrough base URL '{}': {}", base_url, e)))?;

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| MockError::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, base_url })
    }

    /// Absolute URL a request is forwarded to
    pub fn target_url(&self, request: &MockRequest) -> Url {
        let base_path = self.base_url.path().trim_end_matches('/');
        let mut url = self.base_url.clone();
        url.set_path(&format!("{}{}", base_path, request.path));
        url.set_query(request.query.as_deref());
        url
    }
}

#[async_trait]
impl Passthrough for HttpPassthrough {
    async fn forward(&self, request: &MockRequest) -> MockResult<MockResponse> {
        let url = self.target_url(request);
        let method = reqwest::Method::from_bytes(request.method.as_str().as_bytes())
            .map_err(|e| MockError::passthrough(format!("Unsupported method {}: {}", request.method, e)))?;

        debug!(method = %request.method, url = %url, "Forwarding request to live backend");

        let mut builder = self.client.request(method, url.clone());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder.send().await.map_err(|e| {
            warn!(url = %url, error = %e, "Live backend request failed");
            MockError::from(e)
        })?;

        let status = response.status().as_u16();
        let status_text = response
            .status()
            .canonical_reason()
            .unwrap_or_default()
            .to_string();

        let mut headers = HashMap::new();
        for (name, value) in response.headers() {
            if let Ok(value) = value.to_str() {
                headers.insert(name.as_str().to_string(), value.to_string());
            }
        }

        let text = response.text().await?;
        let body = if text.is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).unwrap_or(Value::String(text))
        };

        Ok(MockResponse {
            status_code: status,
            status_text,
            body,
            headers,
        })
    }

    fn describe(&self) -> String {
        self.base_url.to_string()
    }
}

//! Provider API abstraction
//!
//! Every provider client (AWS, Kubernetes) implements [`ApiClient`]. A client
//! only has to know how to send one request and return one page; the
//! provided `get`, `list` and `call` methods handle result extraction,
//! pagination and the per-request allow-list of expected error codes.
//!
//! # Example
//!
//! ```ignore
//! let request = ApiRequest::new("cloudtrail", "get-insight-selectors")
//!     .result("InsightSelectors")
//!     .param("TrailName", arn)
//!     .expect_errors(&["InsightNotEnabledException"]);
//! let selectors = client.list(&request).await?;
//! ```

pub mod error;

pub use error::{format_api_error, ApiError};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Maximum length of response body to log (to avoid logging sensitive data)
const MAX_LOG_BODY_LENGTH: usize = 200;

/// Provider family a client talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Aws,
    Kubernetes,
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provider::Aws => write!(f, "aws"),
            Provider::Kubernetes => write!(f, "kubernetes"),
        }
    }
}

/// A provider API operation, as declared by collectors and resource definitions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiSpec {
    pub service: String,
    pub operation: String,
    /// Key of the result inside the response (dot-separated)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_name: Option<String>,
    /// Fixed parameters sent with every call
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub params: Map<String, Value>,
}

impl ApiSpec {
    pub fn new(service: &str, operation: &str) -> Self {
        Self {
            service: service.to_string(),
            operation: operation.to_string(),
            result_name: None,
            params: Map::new(),
        }
    }
}

impl fmt::Display for ApiSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.service, self.operation)
    }
}

/// One call against a provider API
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub service: String,
    pub operation: String,
    pub result_name: Option<String>,
    pub params: Map<String, Value>,
    /// Error codes that mean "no data" for this call
    pub expected_errors: Vec<String>,
}

impl ApiRequest {
    pub fn new(service: &str, operation: &str) -> Self {
        Self {
            service: service.to_string(),
            operation: operation.to_string(),
            result_name: None,
            params: Map::new(),
            expected_errors: Vec::new(),
        }
    }

    pub fn from_spec(spec: &ApiSpec) -> Self {
        Self {
            service: spec.service.clone(),
            operation: spec.operation.clone(),
            result_name: spec.result_name.clone(),
            params: spec.params.clone(),
            expected_errors: Vec::new(),
        }
    }

    pub fn result(mut self, name: &str) -> Self {
        self.result_name = Some(name.to_string());
        self
    }

    pub fn param(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.params.insert(key.to_string(), value.into());
        self
    }

    pub fn expect_errors(mut self, codes: &[&str]) -> Self {
        self.expected_errors
            .extend(codes.iter().map(|c| c.to_string()));
        self
    }

    /// Whether this error is on the request's allow-list
    pub fn is_expected(&self, error: &ApiError) -> bool {
        error
            .code()
            .is_some_and(|code| self.expected_errors.iter().any(|e| e == code))
    }
}

impl fmt::Display for ApiRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.service, self.operation)
    }
}

/// One page of a provider response
#[derive(Debug, Clone, Default)]
pub struct Page {
    pub body: Value,
    pub next_token: Option<String>,
}

impl Page {
    pub fn new(body: Value) -> Self {
        Self {
            body,
            next_token: None,
        }
    }
}

/// Client handle shared read-only by all collection tasks of a scope
#[async_trait]
pub trait ApiClient: Send + Sync {
    fn provider(&self) -> Provider;

    /// Scope this client collects (AWS region, Kubernetes cluster name)
    fn scope(&self) -> &str;

    /// Send one request and return one page
    async fn send(&self, request: &ApiRequest, page_token: Option<&str>) -> Result<Page, ApiError>;

    /// Fetch a single record; `None` if the result is absent or the error is expected
    async fn get(&self, request: &ApiRequest) -> Result<Option<Value>, ApiError> {
        match self.send(request, None).await {
            Ok(page) => Ok(extract_result(page.body, request.result_name.as_deref())),
            Err(e) if request.is_expected(&e) => {
                tracing::debug!("{} returned expected error: {}", request, e);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Fetch all items (auto-paginate); empty if the error is expected
    async fn list(&self, request: &ApiRequest) -> Result<Vec<Value>, ApiError> {
        let mut all_items = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let page = match self.send(request, page_token.as_deref()).await {
                Ok(page) => page,
                Err(e) if request.is_expected(&e) => {
                    tracing::debug!("{} returned expected error: {}", request, e);
                    return Ok(Vec::new());
                }
                Err(e) => return Err(e),
            };
            all_items.extend(extract_items(page.body, request.result_name.as_deref()));

            if page.next_token.is_none() {
                break;
            }
            page_token = page.next_token;
        }

        Ok(all_items)
    }

    /// Issue a mutating call; returns the raw response body
    async fn call(&self, request: &ApiRequest) -> Result<Option<Value>, ApiError> {
        tracing::info!("call: {}", request);
        match self.send(request, None).await {
            Ok(page) => Ok(extract_result(page.body, request.result_name.as_deref())),
            Err(e) if request.is_expected(&e) => {
                tracing::debug!("{} returned expected error: {}", request, e);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}

/// Walk a dot-separated path into a JSON value
pub fn lookup_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return Some(value);
    }

    let mut current = value;
    for part in path.split('.') {
        current = match current {
            Value::Array(arr) => arr.get(part.parse::<usize>().ok()?)?,
            _ => current.get(part)?,
        };
    }
    Some(current)
}

/// Extract a single result from a response body
pub fn extract_result(body: Value, result_name: Option<&str>) -> Option<Value> {
    let value = match result_name {
        Some(name) => lookup_path(&body, name).cloned(),
        None => Some(body),
    };
    value.filter(|v| !v.is_null())
}

/// Extract the list of items from a response body
pub fn extract_items(body: Value, result_name: Option<&str>) -> Vec<Value> {
    match extract_result(body, result_name) {
        Some(Value::Array(items)) => items,
        Some(item) => vec![item],
        None => vec![],
    }
}

/// Sanitize response body for logging
/// Truncates long responses and strips control characters
pub(crate) fn sanitize_for_log(body: &str) -> String {
    let truncated = if body.chars().count() > MAX_LOG_BODY_LENGTH {
        let head: String = body.chars().take(MAX_LOG_BODY_LENGTH).collect();
        format!("{}... [truncated, {} bytes total]", head, body.len())
    } else {
        body.to_string()
    };

    truncated.replace(|c: char| !c.is_ascii_graphic() && c != ' ', "")
}

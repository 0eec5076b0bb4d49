//! HTTP utilities for the AWS JSON 1.1 protocol

use crate::api::{sanitize_for_log, ApiError};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde_json::Value;

const AMZ_JSON_CONTENT_TYPE: &str = "application/x-amz-json-1.1";
const AMZ_TARGET_HEADER: &str = "X-Amz-Target";
const AMZ_ERROR_TYPE_HEADER: &str = "x-amzn-ErrorType";

/// HTTP client wrapper for AWS API calls
#[derive(Clone)]
pub struct AwsHttpClient {
    client: Client,
}

impl AwsHttpClient {
    /// Create a new HTTP client
    pub fn new() -> Result<Self, ApiError> {
        let client = Client::builder()
            .user_agent(concat!("cloudgraph/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client })
    }

    /// Build a JSON protocol POST; the caller signs it before [`Self::send`]
    pub fn post(&self, url: &str, target: &str, body: &Value) -> RequestBuilder {
        tracing::debug!("POST {} ({})", url, target);

        self.client
            .post(url)
            .header(CONTENT_TYPE, AMZ_JSON_CONTENT_TYPE)
            .header(AMZ_TARGET_HEADER, target)
            .body(body.to_string())
    }

    /// Send a signed request and parse the JSON response
    pub async fn send(&self, request: RequestBuilder) -> Result<Value, ApiError> {
        let response = request.send().await?;

        let status = response.status();
        let error_type = response
            .headers()
            .get(AMZ_ERROR_TYPE_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.text().await?;

        if !status.is_success() {
            // Security: Only log sanitized/truncated error body to avoid leaking sensitive data
            tracing::error!("API error: {} - {}", status, sanitize_for_log(&body));
            return Err(parse_error(status, error_type.as_deref(), &body));
        }

        // Handle empty response
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }

        Ok(serde_json::from_str(&body)?)
    }
}

/// Build a service error from an AWS JSON protocol error response
///
/// The code comes from the body's `__type` (or `code`) field, falling back to
/// the `x-amzn-ErrorType` header. Namespaced codes keep only the part after `#`.
pub fn parse_error(status: StatusCode, error_type: Option<&str>, body: &str) -> ApiError {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    let field = |names: &[&str]| -> Option<String> {
        let obj = parsed.as_ref()?.as_object()?;
        names
            .iter()
            .find_map(|n| obj.get(*n).and_then(|v| v.as_str()))
            .map(str::to_string)
    };

    let raw_code = field(&["__type", "code", "Code"])
        .or_else(|| error_type.map(|h| h.split(':').next().unwrap_or(h).to_string()))
        .unwrap_or_else(|| format!("Http{}", status.as_u16()));
    let code = raw_code
        .rsplit('#')
        .next()
        .unwrap_or(&raw_code)
        .to_string();
    let message = field(&["message", "Message"]).unwrap_or_default();

    ApiError::Service {
        status: status.as_u16(),
        code,
        message,
    }
}

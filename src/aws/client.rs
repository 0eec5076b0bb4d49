//! AWS Client
//!
//! Regional client speaking the AWS JSON 1.1 protocol, combining request
//! signing and HTTP functionality.

use super::auth::RequestSigner;
use super::http::AwsHttpClient;
use crate::api::{ApiClient, ApiError, ApiRequest, Page, Provider};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use url::Url;

/// Pagination token key, both in requests and responses
const NEXT_TOKEN: &str = "NextToken";

/// Main AWS client, bound to one region
#[derive(Clone)]
pub struct AwsClient {
    http: AwsHttpClient,
    signer: Arc<dyn RequestSigner>,
    region: String,
    endpoint: Option<Url>,
}

impl AwsClient {
    /// Create a new AWS client
    ///
    /// `endpoint` overrides the regional service endpoint for every service
    /// (signing proxies, local emulators).
    pub fn new(
        region: &str,
        endpoint: Option<&str>,
        signer: Arc<dyn RequestSigner>,
    ) -> Result<Self, ApiError> {
        let endpoint = endpoint.map(Url::parse).transpose()?;

        Ok(Self {
            http: AwsHttpClient::new()?,
            signer,
            region: region.to_string(),
            endpoint,
        })
    }

    /// Build the service endpoint URL
    pub fn service_url(&self, service: &str) -> String {
        match &self.endpoint {
            Some(url) => url.to_string(),
            None => format!("https://{}.{}.amazonaws.com/", service, self.region),
        }
    }
}

#[async_trait]
impl ApiClient for AwsClient {
    fn provider(&self) -> Provider {
        Provider::Aws
    }

    fn scope(&self) -> &str {
        &self.region
    }

    async fn send(&self, request: &ApiRequest, page_token: Option<&str>) -> Result<Page, ApiError> {
        tracing::debug!("send: {} region={}", request, self.region);

        let target = format!(
            "{}.{}",
            target_prefix(&request.service)?,
            operation_name(&request.operation)
        );

        let mut params = request.params.clone();
        if let Some(token) = page_token {
            params.insert(NEXT_TOKEN.to_string(), Value::String(token.to_string()));
        }

        let url = self.service_url(&request.service);
        let builder = self.http.post(&url, &target, &Value::Object(params));
        let builder = self.signer.sign(builder, &self.region, &request.service);
        let body = self.http.send(builder).await?;

        let next_token = body
            .get(NEXT_TOKEN)
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        Ok(Page { body, next_token })
    }
}

/// `X-Amz-Target` prefix of a service
pub fn target_prefix(service: &str) -> Result<&'static str, ApiError> {
    match service {
        "cloudtrail" => Ok("com.amazonaws.cloudtrail.v20131101.CloudTrail_20131101"),
        _ => Err(ApiError::UnknownOperation {
            service: service.to_string(),
            operation: String::new(),
        }),
    }
}

/// Convert a CLI-style operation name to its API name
/// e.g., "get-trail-status" -> "GetTrailStatus"
pub fn operation_name(operation: &str) -> String {
    operation
        .split('-')
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect()
}

//! Kubernetes Client
//!
//! Client for one cluster's API server using bearer-token authentication.

use super::dispatch;
use crate::api::{sanitize_for_log, ApiClient, ApiError, ApiRequest, Page, Provider};
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Certificate, Client};
use serde_json::Value;
use url::Url;

/// Main Kubernetes client
#[derive(Clone)]
pub struct KubeClient {
    client: Client,
    server: Url,
    token: Option<String>,
    cluster: String,
}

impl KubeClient {
    /// Create a new Kubernetes client for `cluster`, served at `server`
    pub fn new(server: &str, token: Option<String>, cluster: &str) -> Result<Self, ApiError> {
        Ok(Self {
            client: http_client(None)?,
            server: Url::parse(server)?,
            token,
            cluster: cluster.to_string(),
        })
    }

    /// Also trust the CA certificate(s) in `pem`, e.g. a cluster-signed CA
    pub fn with_root_certificate(mut self, pem: &[u8]) -> Result<Self, ApiError> {
        let ca = Certificate::from_pem(pem)?;
        self.client = http_client(Some(ca))?;
        Ok(self)
    }
}

fn http_client(ca: Option<Certificate>) -> Result<Client, ApiError> {
    let mut builder = Client::builder().user_agent(concat!("cloudgraph/", env!("CARGO_PKG_VERSION")));
    if let Some(ca) = ca {
        builder = builder.add_root_certificate(ca);
    }
    Ok(builder.build()?)
}

#[async_trait]
impl ApiClient for KubeClient {
    fn provider(&self) -> Provider {
        Provider::Kubernetes
    }

    fn scope(&self) -> &str {
        &self.cluster
    }

    async fn send(&self, request: &ApiRequest, page_token: Option<&str>) -> Result<Page, ApiError> {
        let route = dispatch::route(request)?;

        let mut url = self.server.join(&route.path)?;
        {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in &route.query {
                pairs.append_pair(key, value);
            }
            if let Some(token) = page_token {
                pairs.append_pair("continue", token);
            }
        }
        if url.query() == Some("") {
            url.set_query(None);
        }

        tracing::debug!("{} {}", route.method, url);

        let mut builder = self.client.request(route.method.clone(), url);
        if let Some(token) = &self.token {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &route.body {
            builder = builder
                .header(CONTENT_TYPE, route.content_type.unwrap_or("application/json"))
                .body(body.to_string());
        }

        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            // Security: Only log sanitized/truncated error body to avoid leaking sensitive data
            tracing::error!("API error: {} - {}", status, sanitize_for_log(&body));
            return Err(parse_status(status.as_u16(), &body));
        }

        let body: Value = if body.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&body)?
        };

        let next_token = body
            .pointer("/metadata/continue")
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        Ok(Page { body, next_token })
    }
}

/// Build a service error from a Kubernetes `Status` object
fn parse_status(status: u16, body: &str) -> ApiError {
    let parsed: Value = serde_json::from_str(body).unwrap_or(Value::Null);
    let code = parsed
        .get("reason")
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| format!("Http{}", status));
    let message = parsed
        .get("message")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();

    ApiError::Service {
        status,
        code,
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_status_uses_reason() {
        let err = parse_status(
            404,
            r#"{"kind":"Status","reason":"NotFound","message":"deployments.apps \"web\" not found"}"#,
        );
        assert_eq!(err.code(), Some("NotFound"));
        assert_eq!(err.status(), Some(404));
    }

    #[test]
    fn test_parse_status_without_body() {
        assert_eq!(parse_status(502, "").code(), Some("Http502"));
    }

    #[test]
    fn test_with_root_certificate_accepts_cluster_ca() {
        let pem = include_bytes!("../../tests/fixtures/cluster-ca.pem");
        let client = KubeClient::new("https://10.96.0.1:443", None, "in-cluster")
            .unwrap()
            .with_root_certificate(pem)
            .unwrap();
        assert_eq!(client.scope(), "in-cluster");
        assert_eq!(client.server.as_str(), "https://10.96.0.1/");
    }
}

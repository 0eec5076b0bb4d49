//! AWS request signing
//!
//! Credential management is delegated: requests pass through a
//! [`RequestSigner`] before they are sent. The built-in [`BearerSigner`]
//! attaches an optional token, which is what signing proxies
//! (e.g. aws-sigv4-proxy) and local emulators expect.

use reqwest::RequestBuilder;
use std::sync::Arc;

/// Environment variable holding the token for [`BearerSigner`]
pub const TOKEN_ENV: &str = "CLOUDGRAPH_AWS_TOKEN";

/// Signs outgoing provider requests
pub trait RequestSigner: Send + Sync {
    fn sign(&self, request: RequestBuilder, region: &str, service: &str) -> RequestBuilder;
}

/// Adds `Authorization: Bearer <token>` when a token is configured
#[derive(Debug, Clone, Default)]
pub struct BearerSigner {
    token: Option<String>,
}

impl BearerSigner {
    pub fn new(token: Option<String>) -> Self {
        Self { token }
    }

    /// Use the configured token, falling back to the environment
    pub fn from_config(token: Option<&str>) -> Arc<dyn RequestSigner> {
        let token = token
            .map(str::to_string)
            .or_else(|| std::env::var(TOKEN_ENV).ok())
            .filter(|t| !t.is_empty());
        Arc::new(Self::new(token))
    }
}

impl RequestSigner for BearerSigner {
    fn sign(&self, request: RequestBuilder, region: &str, service: &str) -> RequestBuilder {
        tracing::trace!("signing {} request for {}", service, region);
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

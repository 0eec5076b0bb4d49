//! Operation Dispatch
//!
//! Maps Kubernetes client operation names to REST API calls.

use crate::api::{ApiError, ApiRequest};
use reqwest::Method;
use serde_json::Value;

/// Content type for JSON merge patches
pub const MERGE_PATCH_CONTENT_TYPE: &str = "application/merge-patch+json";

/// A resolved REST call
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
    pub content_type: Option<&'static str>,
}

impl Route {
    fn get(path: String) -> Self {
        Self {
            method: Method::GET,
            path,
            query: Vec::new(),
            body: None,
            content_type: None,
        }
    }
}

/// Resolve an operation to its REST call
pub fn route(request: &ApiRequest) -> Result<Route, ApiError> {
    tracing::debug!("route: service={}, method={}", request.service, request.operation);

    match request.service.as_str() {
        "core" => route_core(request),
        "apps" => route_apps(request),
        _ => Err(unknown(request)),
    }
}

// =============================================================================
// Core / version
// =============================================================================

fn route_core(request: &ApiRequest) -> Result<Route, ApiError> {
    match request.operation.as_str() {
        "get_code" => Ok(Route::get("/version".to_string())),
        _ => Err(unknown(request)),
    }
}

// =============================================================================
// apps/v1
// =============================================================================

fn route_apps(request: &ApiRequest) -> Result<Route, ApiError> {
    match request.operation.as_str() {
        "list_deployment_for_all_namespaces" => {
            let mut route = Route::get("/apis/apps/v1/deployments".to_string());
            route.query = query_params(request);
            Ok(route)
        }
        "patch_namespaced_deployment" => {
            let body = request
                .params
                .get("body")
                .cloned()
                .ok_or_else(|| ApiError::MissingParameter("body".to_string()))?;
            Ok(Route {
                method: Method::PATCH,
                path: deployment_path(request)?,
                query: Vec::new(),
                body: Some(body),
                content_type: Some(MERGE_PATCH_CONTENT_TYPE),
            })
        }
        "delete_namespaced_deployment" => Ok(Route {
            method: Method::DELETE,
            path: deployment_path(request)?,
            query: Vec::new(),
            body: None,
            content_type: None,
        }),
        _ => Err(unknown(request)),
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn unknown(request: &ApiRequest) -> ApiError {
    ApiError::UnknownOperation {
        service: request.service.clone(),
        operation: request.operation.clone(),
    }
}

fn deployment_path(request: &ApiRequest) -> Result<String, ApiError> {
    let namespace = get_param_str(request, "namespace")?;
    let name = get_param_str(request, "name")?;
    Ok(format!(
        "/apis/apps/v1/namespaces/{}/deployments/{}",
        urlencoding::encode(&namespace),
        urlencoding::encode(&name)
    ))
}

fn get_param_str(request: &ApiRequest, key: &str) -> Result<String, ApiError> {
    request
        .params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| ApiError::MissingParameter(key.to_string()))
}

fn query_params(request: &ApiRequest) -> Vec<(String, String)> {
    let mut query_parts = Vec::new();

    for (key, value) in &request.params {
        // Path and body params are not query params
        if key == "namespace" || key == "name" || key == "body" {
            continue;
        }

        match value {
            Value::String(s) => query_parts.push((key.clone(), s.clone())),
            Value::Number(n) => query_parts.push((key.clone(), n.to_string())),
            Value::Bool(b) => query_parts.push((key.clone(), b.to_string())),
            _ => {}
        }
    }

    query_parts
}

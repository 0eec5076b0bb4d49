//! Scripted in-memory [`ApiClient`] shared by the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use cloudgraph::api::{ApiClient, ApiError, ApiRequest, Page, Provider};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Mutex;

enum Reply {
    Body(Value),
    Error { status: u16, code: String },
}

/// Answers each operation with a canned body or error and records every call
pub struct FakeClient {
    provider: Provider,
    scope: String,
    replies: HashMap<String, Reply>,
    calls: Mutex<Vec<ApiRequest>>,
}

impl FakeClient {
    pub fn aws(region: &str) -> Self {
        Self::new(Provider::Aws, region)
    }

    pub fn kubernetes(cluster: &str) -> Self {
        Self::new(Provider::Kubernetes, cluster)
    }

    fn new(provider: Provider, scope: &str) -> Self {
        Self {
            provider,
            scope: scope.to_string(),
            replies: HashMap::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn respond(mut self, operation: &str, body: Value) -> Self {
        self.replies.insert(operation.to_string(), Reply::Body(body));
        self
    }

    pub fn fail(mut self, operation: &str, status: u16, code: &str) -> Self {
        self.replies.insert(
            operation.to_string(),
            Reply::Error {
                status,
                code: code.to_string(),
            },
        );
        self
    }

    /// Number of calls made to `operation`
    pub fn calls(&self, operation: &str) -> usize {
        self.requests(operation).len()
    }

    pub fn requests(&self, operation: &str) -> Vec<ApiRequest> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.operation == operation)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl ApiClient for FakeClient {
    fn provider(&self) -> Provider {
        self.provider
    }

    fn scope(&self) -> &str {
        &self.scope
    }

    async fn send(&self, request: &ApiRequest, _page_token: Option<&str>) -> Result<Page, ApiError> {
        self.calls.lock().unwrap().push(request.clone());

        match self.replies.get(&request.operation) {
            Some(Reply::Body(body)) => Ok(Page::new(body.clone())),
            Some(Reply::Error { status, code }) => Err(ApiError::Service {
                status: *status,
                code: code.clone(),
                message: format!("scripted {}", code),
            }),
            None => Ok(Page::new(json!({}))),
        }
    }
}

pub const REGION: &str = "us-east-1";
pub const TRAIL_ARN: &str = "arn:aws:cloudtrail:us-east-1:123456789012:trail/management";

/// `list-trails` entry for the management trail
pub fn trail_listing(home_region: &str) -> Value {
    json!({
        "TrailARN": TRAIL_ARN,
        "Name": "management",
        "HomeRegion": home_region
    })
}

/// `get-trail` body for the management trail
pub fn trail_detail(custom_event_selectors: bool, insight_selectors: bool) -> Value {
    json!({
        "Trail": {
            "Name": "management",
            "TrailARN": TRAIL_ARN,
            "S3BucketName": "audit-logs",
            "HomeRegion": REGION,
            "IsMultiRegionTrail": true,
            "HasCustomEventSelectors": custom_event_selectors,
            "HasInsightSelectors": insight_selectors
        }
    })
}

/// Client answering every trail operation with healthy data
pub fn trail_client(custom_event_selectors: bool, insight_selectors: bool) -> FakeClient {
    FakeClient::aws(REGION)
        .respond("list-trails", json!({ "Trails": [trail_listing(REGION)] }))
        .respond("get-trail", trail_detail(custom_event_selectors, insight_selectors))
        .respond(
            "get-trail-status",
            json!({
                "IsLogging": true,
                "StartLoggingTime": 1_704_067_200,
                "LatestDeliveryTime": 1_706_745_600
            }),
        )
        .respond(
            "list-tags",
            json!({
                "ResourceTagList": [{
                    "ResourceId": TRAIL_ARN,
                    "TagsList": [
                        {"Key": "team", "Value": "security"},
                        {"Key": "env", "Value": "prod"}
                    ]
                }]
            }),
        )
        .respond(
            "get-event-selectors",
            json!({
                "TrailARN": TRAIL_ARN,
                "AdvancedEventSelectors": [{
                    "Name": "management events",
                    "FieldSelectors": [
                        {"Field": "eventCategory", "Equals": ["Management"]}
                    ]
                }]
            }),
        )
        .respond(
            "get-insight-selectors",
            json!({
                "TrailARN": TRAIL_ARN,
                "InsightSelectors": [{"InsightType": "ApiCallRateInsight"}]
            }),
        )
}

//! Integration tests for the provider HTTP clients using wiremock
//!
//! These tests verify the AWS JSON 1.1 and Kubernetes REST clients against
//! mocked endpoints: request shape, pagination and error codes.

use cloudgraph::api::{ApiClient, ApiError, ApiRequest};
use cloudgraph::aws::auth::BearerSigner;
use cloudgraph::aws::client::AwsClient;
use cloudgraph::k8s::client::KubeClient;
use serde_json::json;
use wiremock::matchers::{bearer_token, body_json, body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TRAIL_TARGET_PREFIX: &str = "com.amazonaws.cloudtrail.v20131101.CloudTrail_20131101";

/// Test module for the AWS JSON protocol client
mod aws_client_tests {
    use super::*;

    fn client(server: &MockServer) -> AwsClient {
        AwsClient::new(
            "us-east-1",
            Some(&server.uri()),
            BearerSigner::from_config(Some("proxy-token")),
        )
        .expect("client")
    }

    /// Operation names become PascalCase targets and params the JSON body
    #[tokio::test]
    async fn test_get_sends_target_header_and_json_body() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/"))
            .and(header("X-Amz-Target", format!("{}.GetTrailStatus", TRAIL_TARGET_PREFIX).as_str()))
            .and(header("Content-Type", "application/x-amz-json-1.1"))
            .and(bearer_token("proxy-token"))
            .and(body_json(json!({"Name": "arn:aws:cloudtrail:us-east-1:1:trail/t"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"IsLogging": true})))
            .expect(1)
            .mount(&server)
            .await;

        let request = ApiRequest::new("cloudtrail", "get-trail-status")
            .param("Name", "arn:aws:cloudtrail:us-east-1:1:trail/t");
        let status = client(&server).get(&request).await.expect("get");

        assert_eq!(status, Some(json!({"IsLogging": true})));
    }

    /// `list` follows NextToken until the provider stops sending one
    #[tokio::test]
    async fn test_list_follows_next_token() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(body_partial_json(json!({"NextToken": "page-2"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "Trails": [{"Name": "second"}]
            })))
            .with_priority(1)
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(header("X-Amz-Target", format!("{}.ListTrails", TRAIL_TARGET_PREFIX).as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "Trails": [{"Name": "first"}],
                "NextToken": "page-2"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let request = ApiRequest::new("cloudtrail", "list-trails").result("Trails");
        let trails = client(&server).list(&request).await.expect("list");

        let names: Vec<&str> = trails.iter().filter_map(|t| t["Name"].as_str()).collect();
        assert_eq!(names, vec!["first", "second"]);
    }

    /// Error codes come from `__type`, after the namespace separator
    #[tokio::test]
    async fn test_expected_error_code_yields_empty_result() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "__type": "com.amazonaws.cloudtrail.v20131101#InsightNotEnabledException",
                "message": "Trail has no insight selectors"
            })))
            .mount(&server)
            .await;

        let request = ApiRequest::new("cloudtrail", "get-insight-selectors")
            .result("InsightSelectors")
            .param("TrailName", "t");

        let err = client(&server).list(&request).await.unwrap_err();
        assert_eq!(err.code(), Some("InsightNotEnabledException"));
        assert_eq!(err.status(), Some(400));

        let allowed = request.expect_errors(&["InsightNotEnabledException"]);
        let selectors = client(&server).list(&allowed).await.expect("expected error");
        assert!(selectors.is_empty());
    }

    /// Without a body, the error code comes from the x-amzn-ErrorType header
    #[tokio::test]
    async fn test_error_code_from_header() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(404).insert_header("x-amzn-ErrorType", "TrailNotFoundException"))
            .mount(&server)
            .await;

        let request = ApiRequest::new("cloudtrail", "get-trail")
            .result("Trail")
            .param("Name", "gone")
            .expect_errors(&["TrailNotFoundException"]);

        assert_eq!(client(&server).get(&request).await.expect("get"), None);
    }

    #[tokio::test]
    async fn test_unknown_service_is_rejected_before_sending() {
        let server = MockServer::start().await;

        let request = ApiRequest::new("ec2", "describe-instances");
        let err = client(&server).get(&request).await.unwrap_err();

        assert!(matches!(err, ApiError::UnknownOperation { .. }));
        assert!(server.received_requests().await.unwrap_or_default().is_empty());
    }
}

/// Test module for the Kubernetes REST client
mod kube_client_tests {
    use super::*;

    fn client(server: &MockServer) -> KubeClient {
        KubeClient::new(&server.uri(), Some("k8s-token".to_string()), "prod").expect("client")
    }

    fn deployment(name: &str) -> serde_json::Value {
        json!({"metadata": {"name": name, "namespace": "default", "uid": format!("uid-{}", name)}})
    }

    /// `list` follows metadata.continue
    #[tokio::test]
    async fn test_list_follows_continue_token() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/apis/apps/v1/deployments"))
            .and(query_param("continue", "next-page"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [deployment("api")],
                "metadata": {}
            })))
            .with_priority(1)
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/apis/apps/v1/deployments"))
            .and(query_param("limit", "500"))
            .and(bearer_token("k8s-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [deployment("web")],
                "metadata": {"continue": "next-page"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let request = ApiRequest::new("apps", "list_deployment_for_all_namespaces")
            .result("items")
            .param("limit", 500);
        let items = client(&server).list(&request).await.expect("list");

        let names: Vec<&str> = items
            .iter()
            .filter_map(|d| d["metadata"]["name"].as_str())
            .collect();
        assert_eq!(names, vec!["web", "api"]);
    }

    #[tokio::test]
    async fn test_patch_uses_merge_patch() {
        let server = MockServer::start().await;

        Mock::given(method("PATCH"))
            .and(path("/apis/apps/v1/namespaces/default/deployments/web"))
            .and(header("Content-Type", "application/merge-patch+json"))
            .and(body_json(json!({"metadata": {"labels": {"team": null}}})))
            .respond_with(ResponseTemplate::new(200).set_body_json(deployment("web")))
            .expect(1)
            .mount(&server)
            .await;

        let request = ApiRequest::new("apps", "patch_namespaced_deployment")
            .param("namespace", "default")
            .param("name", "web")
            .param("body", json!({"metadata": {"labels": {"team": null}}}));

        let patched = client(&server).call(&request).await.expect("patch");
        assert_eq!(patched.unwrap()["metadata"]["name"], "web");
    }

    /// Error codes come from the Status object's reason
    #[tokio::test]
    async fn test_status_reason_is_error_code() {
        let server = MockServer::start().await;

        Mock::given(method("DELETE"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "kind": "Status",
                "status": "Failure",
                "reason": "NotFound",
                "message": "deployments.apps \"web\" not found",
                "code": 404
            })))
            .mount(&server)
            .await;

        let request = ApiRequest::new("apps", "delete_namespaced_deployment")
            .param("namespace", "default")
            .param("name", "web");
        let err = client(&server).call(&request).await.unwrap_err();

        assert_eq!(err.code(), Some("NotFound"));
        assert_eq!(err.status(), Some(404));
    }

    #[tokio::test]
    async fn test_version_endpoint() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/version"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "gitVersion": "v1.29.2",
                "platform": "linux/amd64"
            })))
            .mount(&server)
            .await;

        let version = client(&server)
            .get(&ApiRequest::new("core", "get_code"))
            .await
            .expect("version")
            .expect("body");
        assert_eq!(version["gitVersion"], "v1.29.2");
    }
}

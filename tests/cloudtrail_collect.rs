//! CloudTrail collection against a scripted client
//!
//! Each test runs a full pass (list, collect, wait, link, resolve) and
//! inspects the resulting graph snapshot and the calls the collector made.

mod common;

use cloudgraph::api::ApiClient;
use cloudgraph::collector::CollectionPass;
use cloudgraph::graph::{Direction, GraphSnapshot, MatchKey};
use cloudgraph::resource::cloudtrail::AwsCloudTrail;
use cloudgraph::resource::{Enrichment, NodeVariant, ResourceNode};
use common::{trail_client, trail_listing, FakeClient, REGION, TRAIL_ARN};
use serde_json::json;
use std::sync::Arc;

async fn run_pass(client: &Arc<FakeClient>) -> GraphSnapshot {
    let pass = CollectionPass::new(&["aws_cloud_trail".to_string()]).unwrap();
    let clients: Vec<Arc<dyn ApiClient>> = vec![client.clone()];
    pass.run(clients, 4).await
}

fn only_trail(snapshot: &GraphSnapshot) -> &AwsCloudTrail {
    assert_eq!(snapshot.nodes.len(), 1, "expected exactly one node");
    AwsCloudTrail::from_node(&snapshot.nodes[0].resource).expect("trail node")
}

mod scope {
    use super::*;

    #[tokio::test]
    async fn test_trail_from_other_region_produces_no_node() {
        let client = Arc::new(
            trail_client(false, false).respond("list-trails", json!({ "Trails": [trail_listing("eu-west-1")] })),
        );

        let snapshot = run_pass(&client).await;

        assert!(snapshot.nodes.is_empty());
        assert_eq!(client.calls("get-trail"), 0);
    }

    #[tokio::test]
    async fn test_each_trail_collected_once_across_regions() {
        let listing = json!({ "Trails": [trail_listing(REGION)] });
        let east = Arc::new(trail_client(false, false).respond("list-trails", listing.clone()));
        let west = Arc::new(FakeClient::aws("us-west-2").respond("list-trails", listing));

        let pass = CollectionPass::new(&[]).unwrap();
        let clients: Vec<Arc<dyn ApiClient>> = vec![east.clone(), west.clone()];
        let snapshot = pass.run(clients, 4).await;

        assert_eq!(snapshot.nodes.len(), 1);
        assert_eq!(snapshot.nodes[0].scope, REGION);
        assert_eq!(east.calls("get-trail"), 1);
        assert_eq!(west.calls("get-trail"), 0);
    }
}

mod enrichment {
    use super::*;

    #[tokio::test]
    async fn test_end_to_end_single_trail() {
        let client = Arc::new(trail_client(false, false));

        let snapshot = run_pass(&client).await;
        let trail = only_trail(&snapshot);

        assert_eq!(trail.base.id, "management");
        assert_eq!(trail.base.name, "management");
        assert_eq!(trail.base.arn.as_deref(), Some(TRAIL_ARN));
        assert_eq!(trail.base.ctime.map(|t| t.timestamp()), Some(1_704_067_200));
        assert_eq!(trail.base.mtime.map(|t| t.timestamp()), Some(1_706_745_600));
        assert_eq!(
            trail.trail_status.as_ref().and_then(|s| s.is_logging),
            Some(true)
        );
        assert!(snapshot.failures.is_empty());

        assert_eq!(snapshot.nodes[0].raw["TrailARN"], TRAIL_ARN);

        let get = client.requests("get-trail");
        assert_eq!(get.len(), 1);
        assert_eq!(get[0].params["Name"], TRAIL_ARN);
    }

    #[tokio::test]
    async fn test_tags_equal_listing() {
        let client = Arc::new(trail_client(false, false));

        let snapshot = run_pass(&client).await;
        let trail = only_trail(&snapshot);

        assert_eq!(trail.base.tags.len(), 2);
        assert_eq!(trail.base.tags["team"], "security");
        assert_eq!(trail.base.tags["env"], "prod");
        assert!(snapshot.nodes[0].populated.contains(&Enrichment::Tags));

        let list_tags = client.requests("list-tags");
        assert_eq!(list_tags[0].params["ResourceIdList"], json!([TRAIL_ARN]));
    }

    #[tokio::test]
    async fn test_no_tags_yields_empty_tag_set() {
        let client = Arc::new(trail_client(false, false).respond("list-tags", json!({ "ResourceTagList": [] })));

        let snapshot = run_pass(&client).await;

        assert!(only_trail(&snapshot).base.tags.is_empty());
        assert!(snapshot.nodes[0].populated.contains(&Enrichment::Tags));
    }

    #[tokio::test]
    async fn test_false_selector_flags_issue_no_selector_calls() {
        let client = Arc::new(trail_client(false, false));

        let snapshot = run_pass(&client).await;
        let trail = only_trail(&snapshot);

        assert_eq!(client.calls("get-event-selectors"), 0);
        assert_eq!(client.calls("get-insight-selectors"), 0);
        assert_eq!(trail.trail_event_selectors, None);
        assert_eq!(trail.trail_insight_selectors, None);
    }

    #[tokio::test]
    async fn test_selectors_collected_when_flagged() {
        let client = Arc::new(trail_client(true, true));

        let snapshot = run_pass(&client).await;
        let trail = only_trail(&snapshot);

        let selectors = trail.trail_event_selectors.as_ref().expect("event selectors");
        assert_eq!(selectors.len(), 1);
        assert_eq!(selectors[0].name.as_deref(), Some("management events"));
        let fields = selectors[0].field_selectors.as_ref().expect("field selectors");
        assert_eq!(
            fields["eventCategory"].equals,
            Some(vec!["Management".to_string()])
        );

        assert_eq!(
            trail.trail_insight_selectors,
            Some(vec!["ApiCallRateInsight".to_string()])
        );
        assert_eq!(client.calls("get-event-selectors"), 1);
        assert_eq!(client.calls("get-insight-selectors"), 1);
    }

    #[tokio::test]
    async fn test_insight_not_enabled_yields_empty_list() {
        let client = Arc::new(
            trail_client(false, true).fail("get-insight-selectors", 400, "InsightNotEnabledException"),
        );

        let snapshot = run_pass(&client).await;

        assert_eq!(only_trail(&snapshot).trail_insight_selectors, Some(vec![]));
        assert!(snapshot.failures.is_empty());
    }

    #[tokio::test]
    async fn test_vanished_trail_is_skipped_silently() {
        let client = Arc::new(trail_client(false, false).fail("get-trail", 400, "TrailNotFoundException"));

        let snapshot = run_pass(&client).await;

        assert!(snapshot.nodes.is_empty());
        assert!(snapshot.failures.is_empty());
        assert_eq!(client.calls("get-trail-status"), 0);
    }

    #[tokio::test]
    async fn test_enrichment_failure_keeps_node_and_other_enrichments() {
        let client = Arc::new(trail_client(false, false).fail("get-trail-status", 500, "InternalFailure"));

        let snapshot = run_pass(&client).await;
        let trail = only_trail(&snapshot);

        assert_eq!(trail.trail_status, None);
        assert_eq!(trail.base.ctime, None);
        assert_eq!(trail.base.tags["team"], "security");
        assert!(!snapshot.nodes[0].populated.contains(&Enrichment::Status));

        assert_eq!(snapshot.failures.len(), 1);
        assert!(snapshot.failures[0].error.contains("status"));
    }

    #[tokio::test]
    async fn test_unexpected_detail_error_is_reported_as_failure() {
        let client = Arc::new(trail_client(false, false).fail("get-trail", 403, "AccessDeniedException"));

        let snapshot = run_pass(&client).await;

        assert!(snapshot.nodes.is_empty());
        assert_eq!(snapshot.failures.len(), 1);
        assert!(snapshot.failures[0].task.contains(TRAIL_ARN));
    }

    #[tokio::test]
    async fn test_list_failure_is_reported_per_scope() {
        let client = Arc::new(FakeClient::aws(REGION).fail("list-trails", 403, "AccessDeniedException"));

        let snapshot = run_pass(&client).await;

        assert!(snapshot.nodes.is_empty());
        assert_eq!(snapshot.failures.len(), 1);
        assert!(snapshot.failures[0].task.contains(REGION));
    }
}

mod linking {
    use super::*;

    #[tokio::test]
    async fn test_bucket_name_declares_one_bucket_edge() {
        let client = Arc::new(trail_client(false, false));

        let snapshot = run_pass(&client).await;

        let buckets: Vec<_> = snapshot
            .dangling
            .iter()
            .filter(|d| d.other_kind == "aws_s3_bucket")
            .collect();
        assert_eq!(buckets.len(), 1);
        assert_eq!(buckets[0].key, MatchKey::Name("audit-logs".to_string()));
        assert_eq!(buckets[0].direction, Direction::Outgoing);
        assert_eq!(buckets[0].node, snapshot.nodes[0].id);
    }

    #[tokio::test]
    async fn test_absent_attributes_declare_no_edges() {
        let client = Arc::new(trail_client(false, false).respond(
            "get-trail",
            json!({
                "Trail": {
                    "Name": "management",
                    "TrailARN": TRAIL_ARN,
                    "S3BucketName": "",
                    "HomeRegion": REGION
                }
            }),
        ));

        let snapshot = run_pass(&client).await;

        assert_eq!(snapshot.nodes.len(), 1);
        assert!(snapshot.dangling.is_empty());
        assert!(snapshot.edges.is_empty());
    }

    #[tokio::test]
    async fn test_kms_key_arn_is_matched_by_key_id() {
        let client = Arc::new(trail_client(false, false).respond(
            "get-trail",
            json!({
                "Trail": {
                    "Name": "management",
                    "TrailARN": TRAIL_ARN,
                    "HomeRegion": REGION,
                    "SnsTopicARN": "arn:aws:sns:us-east-1:123456789012:trail-events",
                    "KmsKeyId": "arn:aws:kms:us-east-1:123456789012:key/1234abcd-12ab"
                }
            }),
        ));

        let snapshot = run_pass(&client).await;

        let kinds: Vec<(&str, &MatchKey)> = snapshot
            .dangling
            .iter()
            .map(|d| (d.other_kind.as_str(), &d.key))
            .collect();
        assert!(kinds.contains(&("aws_kms_key", &MatchKey::Id("1234abcd-12ab".to_string()))));
        assert!(kinds.contains(&(
            "aws_sns_topic",
            &MatchKey::Arn("arn:aws:sns:us-east-1:123456789012:trail-events".to_string())
        )));
        assert_eq!(kinds.len(), 2);
    }
}

mod mutators {
    use super::*;

    #[tokio::test]
    async fn test_tag_untag_and_delete_trail() {
        let client = FakeClient::aws(REGION);
        let trail = ResourceNode::from_reference("aws_cloud_trail", TRAIL_ARN).unwrap();

        assert!(trail.update_resource_tag(&client, "team", "security").await.unwrap());
        assert!(trail.delete_resource_tag(&client, "team").await.unwrap());
        assert!(trail.delete_resource(&client).await.unwrap());

        let add = client.requests("add-tags");
        assert_eq!(add[0].params["ResourceId"], TRAIL_ARN);
        assert_eq!(add[0].params["TagsList"], json!([{"Key": "team", "Value": "security"}]));

        let remove = client.requests("remove-tags");
        assert_eq!(remove[0].params["TagsList"], json!([{"Key": "team"}]));

        let delete = client.requests("delete-trail");
        assert_eq!(delete[0].params["Name"], TRAIL_ARN);
    }

    #[tokio::test]
    async fn test_mutator_error_propagates() {
        let client = FakeClient::aws(REGION).fail("delete-trail", 400, "TrailNotFoundException");
        let trail = ResourceNode::from_reference("aws_cloud_trail", TRAIL_ARN).unwrap();

        let err = trail.delete_resource(&client).await.unwrap_err();
        assert!(format!("{:#}", err).contains("TrailNotFoundException"));
    }
}

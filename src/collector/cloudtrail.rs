//! CloudTrail collector
//!
//! `list-trails` returns every trail visible to the account, in every
//! region. Each trail is collected only by the pass whose region equals the
//! trail's home region. Per trail: `get-trail`, register, then the status,
//! tag and (flag-gated) selector enrichments.

use super::{in_scope, Collector};
use crate::api::{ApiClient, ApiRequest, Provider};
use crate::graph::{GraphBuilder, NodeHandle};
use crate::resource::cloudtrail::{AwsCloudTrail, AwsCloudTrailEventSelector, AwsCloudTrailStatus, SERVICE};
use crate::resource::{mapper, Enrichment};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;

const DEFAULT_SCOPE_FIELD: &str = "HomeRegion";

/// Expected when a trail has no insight selectors configured
pub const INSIGHT_NOT_ENABLED: &str = "InsightNotEnabledException";
/// Expected when a trail is deleted between list and get
pub const TRAIL_NOT_FOUND: &str = "TrailNotFoundException";

pub struct CloudTrailCollector;

#[async_trait]
impl Collector for CloudTrailCollector {
    fn kind(&self) -> &'static str {
        AwsCloudTrail::KIND
    }

    fn provider(&self) -> Provider {
        Provider::Aws
    }

    async fn collect(&self, items: Vec<Value>, builder: &GraphBuilder) -> Result<()> {
        let scope_field = self
            .definition()?
            .scope_field
            .as_deref()
            .unwrap_or(DEFAULT_SCOPE_FIELD);

        for item in items {
            if !in_scope(&item, scope_field, builder.scope()) {
                continue;
            }
            let Some(arn) = item.get("TrailARN").and_then(|v| v.as_str()) else {
                tracing::warn!("Skipping trail listing entry without TrailARN");
                continue;
            };

            let arn = arn.to_string();
            let task_builder = builder.clone();
            builder.submit_work(format!("{} {}", AwsCloudTrail::KIND, arn), async move {
                collect_trail(&task_builder, &arn).await
            });
        }

        Ok(())
    }
}

/// Collect one trail: fetch, register, enrich
pub async fn collect_trail(builder: &GraphBuilder, arn: &str) -> Result<()> {
    let client = builder.client().as_ref();

    let request = ApiRequest::new(SERVICE, "get-trail")
        .result("Trail")
        .param("Name", arn)
        .expect_errors(&[TRAIL_NOT_FOUND]);
    let Some(raw) = client
        .get(&request)
        .await
        .with_context(|| format!("Failed to get trail {}", arn))?
    else {
        tracing::debug!("Trail {} disappeared before it could be fetched", arn);
        return Ok(());
    };

    let trail: AwsCloudTrail = mapper().decode(AwsCloudTrail::KIND, &raw)?;
    let has_event_selectors = trail.trail_has_custom_event_selectors == Some(true);
    let has_insight_selectors = trail.trail_has_insight_selectors == Some(true);

    // Registered first: enrichment failures below cannot lose the node
    let node = builder.add_node(trail, raw).await;

    let (status, tags, event_selectors, insight_selectors) = tokio::join!(
        collect_status(client, &node, arn),
        collect_tags(client, &node, arn),
        async {
            if has_event_selectors {
                collect_event_selectors(client, &node, arn).await
            } else {
                Ok(())
            }
        },
        async {
            if has_insight_selectors {
                collect_insight_selectors(client, &node, arn).await
            } else {
                Ok(())
            }
        },
    );

    let failed: Vec<String> = [
        ("status", status),
        ("tags", tags),
        ("event selectors", event_selectors),
        ("insight selectors", insight_selectors),
    ]
    .into_iter()
    .filter_map(|(what, result)| {
        result.err().map(|e| {
            tracing::warn!("Failed to collect {} of trail {}: {:#}", what, arn, e);
            format!("{}: {:#}", what, e)
        })
    })
    .collect();

    if !failed.is_empty() {
        anyhow::bail!("Trail {} registered with partial data ({})", arn, failed.join("; "));
    }
    Ok(())
}

async fn collect_status(client: &dyn ApiClient, node: &NodeHandle, arn: &str) -> Result<()> {
    let request = ApiRequest::new(SERVICE, "get-trail-status").param("Name", arn);
    let Some(raw) = client.get(&request).await? else {
        return Ok(());
    };

    let status: AwsCloudTrailStatus = mapper().decode("aws_cloud_trail_status", &raw)?;
    node.enrich(Enrichment::Status, |trail: &mut AwsCloudTrail| trail.set_status(status))
        .await;
    Ok(())
}

#[derive(Deserialize)]
struct TagList {
    #[serde(default)]
    tags: BTreeMap<String, Option<String>>,
}

async fn collect_tags(client: &dyn ApiClient, node: &NodeHandle, arn: &str) -> Result<()> {
    let request = ApiRequest::new(SERVICE, "list-tags")
        .result("ResourceTagList")
        .param("ResourceIdList", json!([arn]));

    let mut tags = BTreeMap::new();
    for item in client.list(&request).await? {
        let list: TagList = mapper().decode("aws_cloud_trail_tags", &item)?;
        tags.extend(
            list.tags
                .into_iter()
                .map(|(k, v)| (k, v.unwrap_or_default())),
        );
    }

    node.enrich(Enrichment::Tags, |trail: &mut AwsCloudTrail| trail.base.tags = tags)
        .await;
    Ok(())
}

async fn collect_event_selectors(
    client: &dyn ApiClient,
    node: &NodeHandle,
    arn: &str,
) -> Result<()> {
    let request = ApiRequest::new(SERVICE, "get-event-selectors")
        .result("AdvancedEventSelectors")
        .param("TrailName", arn);

    let selectors = client
        .list(&request)
        .await?
        .iter()
        .map(|item| mapper().decode::<AwsCloudTrailEventSelector>("aws_cloud_trail_event_selector", item))
        .collect::<Result<Vec<_>>>()?;

    node.enrich(Enrichment::EventSelectors, |trail: &mut AwsCloudTrail| {
        trail.trail_event_selectors = Some(selectors)
    })
    .await;
    Ok(())
}

async fn collect_insight_selectors(
    client: &dyn ApiClient,
    node: &NodeHandle,
    arn: &str,
) -> Result<()> {
    let request = ApiRequest::new(SERVICE, "get-insight-selectors")
        .result("InsightSelectors")
        .param("TrailName", arn)
        .expect_errors(&[INSIGHT_NOT_ENABLED]);

    let selectors: Vec<String> = client
        .list(&request)
        .await?
        .iter()
        .filter_map(|item| item.get("InsightType").and_then(|v| v.as_str()))
        .map(str::to_string)
        .collect();

    node.enrich(Enrichment::InsightSelectors, |trail: &mut AwsCloudTrail| {
        trail.trail_insight_selectors = Some(selectors)
    })
    .await;
    Ok(())
}

//! AWS CloudTrail trails

use super::model::ResourceBase;
use crate::api::{ApiClient, ApiRequest};
use crate::graph::{GraphBuilder, MatchKey, NodeHandle};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;

pub const SERVICE: &str = "cloudtrail";

/// Kinds a trail links to
pub const S3_BUCKET_KIND: &str = "aws_s3_bucket";
pub const SNS_TOPIC_KIND: &str = "aws_sns_topic";
pub const KMS_KEY_KIND: &str = "aws_kms_key";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AwsCloudTrailAdvancedFieldSelector {
    pub field: Option<String>,
    pub equals: Option<Vec<String>>,
    pub starts_with: Option<Vec<String>>,
    pub ends_with: Option<Vec<String>>,
    pub not_equals: Option<Vec<String>>,
    pub not_starts_with: Option<Vec<String>>,
    pub not_ends_with: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AwsCloudTrailEventSelector {
    pub name: Option<String>,
    /// Field selectors keyed by their field
    pub field_selectors: Option<BTreeMap<String, AwsCloudTrailAdvancedFieldSelector>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AwsCloudTrailStatus {
    pub is_logging: Option<bool>,
    pub latest_delivery_error: Option<String>,
    pub latest_notification_error: Option<String>,
    pub latest_delivery_time: Option<DateTime<Utc>>,
    pub latest_notification_time: Option<DateTime<Utc>>,
    pub start_logging_time: Option<DateTime<Utc>>,
    pub stop_logging_time: Option<DateTime<Utc>>,
    pub latest_cloud_watch_logs_delivery_error: Option<String>,
    pub latest_cloud_watch_logs_delivery_time: Option<DateTime<Utc>>,
    pub latest_digest_delivery_time: Option<DateTime<Utc>>,
    pub latest_digest_delivery_error: Option<String>,
    pub latest_delivery_attempt_time: Option<DateTime<Utc>>,
    pub latest_notification_attempt_time: Option<DateTime<Utc>>,
    // Provider-formatted strings, kept verbatim
    pub latest_notification_attempt_succeeded: Option<String>,
    pub latest_delivery_attempt_succeeded: Option<String>,
    pub time_logging_started: Option<DateTime<Utc>>,
    pub time_logging_stopped: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AwsCloudTrail {
    #[serde(flatten)]
    pub base: ResourceBase,
    pub trail_s3_bucket_name: Option<String>,
    pub trail_s3_key_prefix: Option<String>,
    pub trail_sns_topic_name: Option<String>,
    pub trail_sns_topic_arn: Option<String>,
    pub trail_include_global_service_events: Option<bool>,
    pub trail_is_multi_region_trail: Option<bool>,
    pub trail_home_region: Option<String>,
    pub trail_log_file_validation_enabled: Option<bool>,
    pub trail_cloud_watch_logs_log_group_arn: Option<String>,
    pub trail_cloud_watch_logs_role_arn: Option<String>,
    pub trail_kms_key_id: Option<String>,
    pub trail_has_custom_event_selectors: Option<bool>,
    pub trail_has_insight_selectors: Option<bool>,
    pub trail_is_organization_trail: Option<bool>,
    pub trail_status: Option<AwsCloudTrailStatus>,
    pub trail_event_selectors: Option<Vec<AwsCloudTrailEventSelector>>,
    pub trail_insight_selectors: Option<Vec<String>>,
}

impl AwsCloudTrail {
    pub const KIND: &'static str = "aws_cloud_trail";

    /// Trail addressed only by its ARN
    pub fn from_arn(arn: &str) -> Self {
        let name = arn.rsplit('/').next().unwrap_or(arn).to_string();
        Self {
            base: ResourceBase {
                id: name.clone(),
                name,
                arn: Some(arn.to_string()),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Apply the trail status; it is also the source of ctime and mtime
    pub fn set_status(&mut self, status: AwsCloudTrailStatus) {
        self.base.ctime = status.start_logging_time;
        self.base.mtime = status.latest_delivery_time;
        self.trail_status = Some(status);
    }

    fn arn(&self) -> Result<&str> {
        self.base
            .arn
            .as_deref()
            .with_context(|| format!("Trail {} has no ARN", self.base.name))
    }

    pub async fn connect_in_graph(&self, node: &NodeHandle, builder: &GraphBuilder) {
        if let Some(key) = MatchKey::name(self.trail_s3_bucket_name.as_deref()) {
            builder.add_edge(node, S3_BUCKET_KIND, key).await;
        }
        if let Some(key) = MatchKey::arn(self.trail_sns_topic_arn.as_deref()) {
            builder.add_edge(node, SNS_TOPIC_KIND, key).await;
        }
        let kms_id = self.trail_kms_key_id.as_deref().map(normalise_kms_id);
        if let Some(key) = MatchKey::id(kms_id) {
            builder.add_edge(node, KMS_KEY_KIND, key).await;
        }
    }

    pub async fn update_resource_tag(
        &self,
        client: &dyn ApiClient,
        key: &str,
        value: &str,
    ) -> Result<bool> {
        let request = ApiRequest::new(SERVICE, "add-tags")
            .param("ResourceId", self.arn()?)
            .param("TagsList", json!([{ "Key": key, "Value": value }]));
        client
            .call(&request)
            .await
            .with_context(|| format!("Failed to tag trail {}", self.base.name))?;
        Ok(true)
    }

    pub async fn delete_resource_tag(&self, client: &dyn ApiClient, key: &str) -> Result<bool> {
        let request = ApiRequest::new(SERVICE, "remove-tags")
            .param("ResourceId", self.arn()?)
            .param("TagsList", json!([{ "Key": key }]));
        client
            .call(&request)
            .await
            .with_context(|| format!("Failed to untag trail {}", self.base.name))?;
        Ok(true)
    }

    pub async fn delete_resource(&self, client: &dyn ApiClient) -> Result<bool> {
        let request = ApiRequest::new(SERVICE, "delete-trail").param("Name", self.arn()?);
        client
            .call(&request)
            .await
            .with_context(|| format!("Failed to delete trail {}", self.base.name))?;
        Ok(true)
    }
}

/// KMS keys are matched by key id; key ARNs carry it as the last path segment
pub fn normalise_kms_id(id: &str) -> &str {
    if id.starts_with("arn:") {
        id.rsplit('/').next().unwrap_or(id)
    } else {
        id
    }
}

/// Region field of an ARN; trails are only mutable from their home region
pub fn arn_region(arn: &str) -> Option<&str> {
    if !arn.starts_with("arn:") {
        return None;
    }
    arn.split(':').nth(3).filter(|region| !region.is_empty())
}

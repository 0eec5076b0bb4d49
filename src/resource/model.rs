//! Resource model
//!
//! [`ResourceNode`] is the closed set of resource kinds this crate knows.
//! Linking and mutators dispatch on it; kind-specific behavior lives next to
//! each kind's struct.

use super::cloudtrail::AwsCloudTrail;
use super::kubernetes::{KubernetesCluster, KubernetesDeployment};
use crate::api::ApiClient;
use crate::graph::{GraphBuilder, MatchKey, NodeHandle};
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub type Tags = BTreeMap<String, String>;

/// Attributes every resource carries
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceBase {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub arn: Option<String>,
    #[serde(default)]
    pub ctime: Option<DateTime<Utc>>,
    #[serde(default)]
    pub mtime: Option<DateTime<Utc>>,
    #[serde(default)]
    pub tags: Tags,
}

/// Follow-up data written into a node after registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Enrichment {
    Status,
    Tags,
    EventSelectors,
    InsightSelectors,
    Version,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind")]
pub enum ResourceNode {
    #[serde(rename = "aws_cloud_trail")]
    AwsCloudTrail(AwsCloudTrail),
    #[serde(rename = "kubernetes_cluster")]
    KubernetesCluster(KubernetesCluster),
    #[serde(rename = "kubernetes_deployment")]
    KubernetesDeployment(KubernetesDeployment),
}

impl ResourceNode {
    pub fn kind(&self) -> &'static str {
        match self {
            ResourceNode::AwsCloudTrail(_) => AwsCloudTrail::KIND,
            ResourceNode::KubernetesCluster(_) => KubernetesCluster::KIND,
            ResourceNode::KubernetesDeployment(_) => KubernetesDeployment::KIND,
        }
    }

    pub fn base(&self) -> &ResourceBase {
        match self {
            ResourceNode::AwsCloudTrail(r) => &r.base,
            ResourceNode::KubernetesCluster(r) => &r.base,
            ResourceNode::KubernetesDeployment(r) => &r.base,
        }
    }

    pub fn id(&self) -> &str {
        &self.base().id
    }

    pub fn name(&self) -> &str {
        &self.base().name
    }

    pub fn arn(&self) -> Option<&str> {
        self.base().arn.as_deref()
    }

    pub fn tags(&self) -> &Tags {
        &self.base().tags
    }

    /// Whether this resource is the one a match key refers to
    pub fn matches(&self, key: &MatchKey) -> bool {
        match key {
            MatchKey::Id(id) => self.id() == id,
            MatchKey::Name(name) => self.name() == name,
            MatchKey::Arn(arn) => self.arn() == Some(arn.as_str()),
        }
    }

    /// Declare this resource's edges; runs after all nodes are registered
    pub async fn connect_in_graph(&self, node: &NodeHandle, builder: &GraphBuilder) {
        match self {
            ResourceNode::AwsCloudTrail(r) => r.connect_in_graph(node, builder).await,
            ResourceNode::KubernetesCluster(_) => {}
            ResourceNode::KubernetesDeployment(r) => r.connect_in_graph(node, builder).await,
        }
    }

    /// Set one tag at the provider
    pub async fn update_resource_tag(
        &self,
        client: &dyn ApiClient,
        key: &str,
        value: &str,
    ) -> Result<bool> {
        match self {
            ResourceNode::AwsCloudTrail(r) => r.update_resource_tag(client, key, value).await,
            ResourceNode::KubernetesDeployment(r) => {
                r.update_resource_tag(client, key, value).await
            }
            ResourceNode::KubernetesCluster(_) => Ok(unsupported(self, "tag update")),
        }
    }

    /// Remove one tag at the provider
    pub async fn delete_resource_tag(&self, client: &dyn ApiClient, key: &str) -> Result<bool> {
        match self {
            ResourceNode::AwsCloudTrail(r) => r.delete_resource_tag(client, key).await,
            ResourceNode::KubernetesDeployment(r) => r.delete_resource_tag(client, key).await,
            ResourceNode::KubernetesCluster(_) => Ok(unsupported(self, "tag removal")),
        }
    }

    /// Delete the resource at the provider
    pub async fn delete_resource(&self, client: &dyn ApiClient) -> Result<bool> {
        match self {
            ResourceNode::AwsCloudTrail(r) => r.delete_resource(client).await,
            ResourceNode::KubernetesDeployment(r) => r.delete_resource(client).await,
            ResourceNode::KubernetesCluster(_) => Ok(unsupported(self, "deletion")),
        }
    }

    /// Minimal resource addressing an existing provider object, for mutators
    ///
    /// Trails are addressed by ARN, deployments by `namespace/name`.
    pub fn from_reference(kind: &str, id: &str) -> Result<Self> {
        match kind {
            AwsCloudTrail::KIND => Ok(AwsCloudTrail::from_arn(id).into()),
            KubernetesDeployment::KIND => {
                let Some((namespace, name)) = id.split_once('/') else {
                    anyhow::bail!("Deployments are addressed as namespace/name, got {}", id);
                };
                Ok(KubernetesDeployment::reference(namespace, name).into())
            }
            _ => anyhow::bail!("Mutators are not supported for {}", kind),
        }
    }
}

fn unsupported(resource: &ResourceNode, what: &str) -> bool {
    tracing::warn!("{} does not support {}", resource.kind(), what);
    false
}

/// Typed access to one variant of [`ResourceNode`]
pub trait NodeVariant: Sized + Into<ResourceNode> {
    fn from_node(node: &ResourceNode) -> Option<&Self>;
    fn from_node_mut(node: &mut ResourceNode) -> Option<&mut Self>;
}

impl From<AwsCloudTrail> for ResourceNode {
    fn from(r: AwsCloudTrail) -> Self {
        ResourceNode::AwsCloudTrail(r)
    }
}

impl NodeVariant for AwsCloudTrail {
    fn from_node(node: &ResourceNode) -> Option<&Self> {
        match node {
            ResourceNode::AwsCloudTrail(r) => Some(r),
            _ => None,
        }
    }

    fn from_node_mut(node: &mut ResourceNode) -> Option<&mut Self> {
        match node {
            ResourceNode::AwsCloudTrail(r) => Some(r),
            _ => None,
        }
    }
}

impl From<KubernetesCluster> for ResourceNode {
    fn from(r: KubernetesCluster) -> Self {
        ResourceNode::KubernetesCluster(r)
    }
}

impl NodeVariant for KubernetesCluster {
    fn from_node(node: &ResourceNode) -> Option<&Self> {
        match node {
            ResourceNode::KubernetesCluster(r) => Some(r),
            _ => None,
        }
    }

    fn from_node_mut(node: &mut ResourceNode) -> Option<&mut Self> {
        match node {
            ResourceNode::KubernetesCluster(r) => Some(r),
            _ => None,
        }
    }
}

impl From<KubernetesDeployment> for ResourceNode {
    fn from(r: KubernetesDeployment) -> Self {
        ResourceNode::KubernetesDeployment(r)
    }
}

impl NodeVariant for KubernetesDeployment {
    fn from_node(node: &ResourceNode) -> Option<&Self> {
        match node {
            ResourceNode::KubernetesDeployment(r) => Some(r),
            _ => None,
        }
    }

    fn from_node_mut(node: &mut ResourceNode) -> Option<&mut Self> {
        match node {
            ResourceNode::KubernetesDeployment(r) => Some(r),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matches_by_each_key() {
        let trail: ResourceNode = AwsCloudTrail::from_arn(
            "arn:aws:cloudtrail:us-east-1:123456789012:trail/management",
        )
        .into();

        assert!(trail.matches(&MatchKey::Name("management".into())));
        assert!(trail.matches(&MatchKey::Id("management".into())));
        assert!(trail.matches(&MatchKey::Arn(
            "arn:aws:cloudtrail:us-east-1:123456789012:trail/management".into()
        )));
        assert!(!trail.matches(&MatchKey::Arn("arn:other".into())));
    }

    #[test]
    fn test_from_reference() {
        let deployment = ResourceNode::from_reference("kubernetes_deployment", "default/web").unwrap();
        assert_eq!(deployment.kind(), "kubernetes_deployment");
        assert_eq!(deployment.name(), "web");

        assert!(ResourceNode::from_reference("kubernetes_deployment", "web").is_err());
        assert!(ResourceNode::from_reference("kubernetes_cluster", "prod").is_err());
    }

    #[test]
    fn test_serializes_with_kind_tag() {
        let trail: ResourceNode = AwsCloudTrail::from_arn("arn:aws:cloudtrail:us-east-1:1:trail/t").into();
        let json = serde_json::to_value(&trail).unwrap();
        assert_eq!(json["kind"], "aws_cloud_trail");
        assert_eq!(json["name"], "t");
    }
}

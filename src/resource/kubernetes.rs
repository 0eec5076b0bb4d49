//! Kubernetes clusters and deployments

use super::model::ResourceBase;
use crate::api::{ApiClient, ApiRequest};
use crate::graph::{GraphBuilder, MatchKey, NodeHandle};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KubernetesCluster {
    #[serde(flatten)]
    pub base: ResourceBase,
    pub cluster_version: Option<String>,
    pub cluster_platform: Option<String>,
}

impl KubernetesCluster {
    pub const KIND: &'static str = "kubernetes_cluster";
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KubernetesDeployment {
    #[serde(flatten)]
    pub base: ResourceBase,
    pub namespace: Option<String>,
    /// Cluster the deployment was collected from
    #[serde(default)]
    pub cluster_name: Option<String>,
    pub deployment_replicas: Option<i64>,
    pub deployment_ready_replicas: Option<i64>,
    pub deployment_available_replicas: Option<i64>,
    pub deployment_updated_replicas: Option<i64>,
}

impl KubernetesDeployment {
    pub const KIND: &'static str = "kubernetes_deployment";

    /// Deployment addressed only by namespace and name
    pub fn reference(namespace: &str, name: &str) -> Self {
        Self {
            base: ResourceBase {
                id: format!("{}/{}", namespace, name),
                name: name.to_string(),
                ..Default::default()
            },
            namespace: Some(namespace.to_string()),
            ..Default::default()
        }
    }

    pub async fn connect_in_graph(&self, node: &NodeHandle, builder: &GraphBuilder) {
        if let Some(key) = MatchKey::name(self.cluster_name.as_deref()) {
            builder
                .add_edge_from(node, KubernetesCluster::KIND, key)
                .await;
        }
    }

    fn request(&self, operation: &str) -> Result<ApiRequest> {
        let namespace = self
            .namespace
            .as_deref()
            .with_context(|| format!("Deployment {} has no namespace", self.base.name))?;
        Ok(ApiRequest::new("apps", operation)
            .param("namespace", namespace)
            .param("name", self.base.name.as_str()))
    }

    async fn patch_label(&self, client: &dyn ApiClient, key: &str, value: Value) -> Result<bool> {
        let request = self
            .request("patch_namespaced_deployment")?
            .param("body", json!({ "metadata": { "labels": { key: value } } }));
        client
            .call(&request)
            .await
            .with_context(|| format!("Failed to patch labels of deployment {}", self.base.name))?;
        Ok(true)
    }

    pub async fn update_resource_tag(
        &self,
        client: &dyn ApiClient,
        key: &str,
        value: &str,
    ) -> Result<bool> {
        self.patch_label(client, key, Value::String(value.to_string()))
            .await
    }

    /// A null label in a merge patch removes it
    pub async fn delete_resource_tag(&self, client: &dyn ApiClient, key: &str) -> Result<bool> {
        self.patch_label(client, key, Value::Null).await
    }

    pub async fn delete_resource(&self, client: &dyn ApiClient) -> Result<bool> {
        let request = self.request("delete_namespaced_deployment")?;
        client
            .call(&request)
            .await
            .with_context(|| format!("Failed to delete deployment {}", self.base.name))?;
        Ok(true)
    }
}

//! Kubernetes collectors
//!
//! One client talks to one cluster, so the cluster itself is synthesised
//! from the client's scope and enriched with `/version`. Deployments are
//! listed across all namespaces and stamped with the cluster they came from.

use super::Collector;
use crate::api::{ApiClient, ApiRequest, Provider};
use crate::graph::{GraphBuilder, NodeHandle};
use crate::resource::kubernetes::{KubernetesCluster, KubernetesDeployment};
use crate::resource::{mapper, Enrichment};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

pub struct KubernetesClusterCollector;

#[async_trait]
impl Collector for KubernetesClusterCollector {
    fn kind(&self) -> &'static str {
        KubernetesCluster::KIND
    }

    fn provider(&self) -> Provider {
        Provider::Kubernetes
    }

    async fn list(&self, client: &dyn ApiClient) -> Result<Vec<Value>> {
        Ok(vec![json!({ "name": client.scope() })])
    }

    async fn collect(&self, items: Vec<Value>, builder: &GraphBuilder) -> Result<()> {
        for item in items {
            let cluster: KubernetesCluster = mapper().decode(KubernetesCluster::KIND, &item)?;
            let task = format!("{} {} version", KubernetesCluster::KIND, cluster.base.name);
            let node = builder.add_node(cluster, item).await;

            let client = builder.client().clone();
            builder.submit_work(task, async move {
                collect_version(client.as_ref(), &node).await
            });
        }
        Ok(())
    }
}

#[derive(Deserialize)]
struct ClusterVersion {
    cluster_version: Option<String>,
    cluster_platform: Option<String>,
}

async fn collect_version(client: &dyn ApiClient, node: &NodeHandle) -> Result<()> {
    let request = ApiRequest::new("core", "get_code");
    let Some(raw) = client
        .get(&request)
        .await
        .with_context(|| format!("Failed to read version of cluster {}", client.scope()))?
    else {
        return Ok(());
    };

    let version: ClusterVersion = mapper().decode("kubernetes_cluster_version", &raw)?;
    node.enrich(Enrichment::Version, |cluster: &mut KubernetesCluster| {
        cluster.cluster_version = version.cluster_version;
        cluster.cluster_platform = version.cluster_platform;
    })
    .await;
    Ok(())
}

pub struct KubernetesDeploymentCollector;

#[async_trait]
impl Collector for KubernetesDeploymentCollector {
    fn kind(&self) -> &'static str {
        KubernetesDeployment::KIND
    }

    fn provider(&self) -> Provider {
        Provider::Kubernetes
    }

    async fn collect(&self, items: Vec<Value>, builder: &GraphBuilder) -> Result<()> {
        let mut undecodable = Vec::new();
        for item in items {
            let mut deployment: KubernetesDeployment =
                match mapper().decode(KubernetesDeployment::KIND, &item) {
                    Ok(deployment) => deployment,
                    Err(e) => {
                        let name = deployment_name(&item);
                        tracing::warn!("Skipping undecodable deployment {}: {:#}", name, e);
                        undecodable.push(name);
                        continue;
                    }
                };
            deployment.cluster_name = Some(builder.scope().to_string());
            builder.add_node(deployment, item).await;
        }

        if !undecodable.is_empty() {
            anyhow::bail!(
                "{} deployment(s) could not be decoded: {}",
                undecodable.len(),
                undecodable.join(", ")
            );
        }
        Ok(())
    }
}

/// `namespace/name` of a raw deployment, as far as it is present
fn deployment_name(item: &Value) -> String {
    let metadata = &item["metadata"];
    match (metadata["namespace"].as_str(), metadata["name"].as_str()) {
        (Some(namespace), Some(name)) => format!("{}/{}", namespace, name),
        (None, Some(name)) => name.to_string(),
        _ => "<unnamed>".to_string(),
    }
}

//! Resource collectors
//!
//! A [`Collector`] knows how to turn the raw listing of one resource kind
//! into registered, enriched nodes. Collectors are unit structs kept in a
//! static registry; each declares up front every API operation it may call.
//!
//! - [`cloudtrail`] - AWS CloudTrail trails
//! - [`kubernetes`] - Kubernetes clusters and deployments
//! - [`pass`] - Runs collect, wait and link over a set of scopes

pub mod cloudtrail;
pub mod kubernetes;
pub mod pass;

pub use cloudtrail::CloudTrailCollector;
pub use kubernetes::{KubernetesClusterCollector, KubernetesDeploymentCollector};
pub use pass::CollectionPass;

use crate::api::{ApiClient, ApiRequest, ApiSpec, Provider};
use crate::graph::GraphBuilder;
use crate::resource::{get_resource, ResourceDef};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;

#[async_trait]
pub trait Collector: Send + Sync {
    fn kind(&self) -> &'static str;

    fn provider(&self) -> Provider;

    fn definition(&self) -> Result<&'static ResourceDef> {
        get_resource(self.kind())
            .with_context(|| format!("No resource definition for {}", self.kind()))
    }

    /// Operations a collection pass may call
    fn collect_apis(&self) -> Vec<ApiSpec> {
        self.definition()
            .map(|def| def.collect_apis.clone())
            .unwrap_or_default()
    }

    /// Operations the mutators may call
    fn mutator_apis(&self) -> Vec<ApiSpec> {
        self.definition()
            .map(|def| def.mutator_apis.clone())
            .unwrap_or_default()
    }

    /// Fetch the raw listing (all pages merged) for one pass
    async fn list(&self, client: &dyn ApiClient) -> Result<Vec<Value>> {
        let def = self.definition()?;
        let Some(spec) = &def.list_api else {
            return Ok(Vec::new());
        };

        client
            .list(&ApiRequest::from_spec(spec))
            .await
            .with_context(|| format!("Failed to list {} in {}", self.kind(), client.scope()))
    }

    /// Register one node per in-scope listing entry
    async fn collect(&self, items: Vec<Value>, builder: &GraphBuilder) -> Result<()>;
}

static COLLECTORS: &[&dyn Collector] = &[
    &CloudTrailCollector,
    &KubernetesClusterCollector,
    &KubernetesDeploymentCollector,
];

/// All known collectors
pub fn collectors() -> &'static [&'static dyn Collector] {
    COLLECTORS
}

/// Collector for one resource kind
pub fn collector_for(kind: &str) -> Option<&'static dyn Collector> {
    COLLECTORS.iter().copied().find(|c| c.kind() == kind)
}

/// Whether a listing entry belongs to `scope`
///
/// Entries without the scope field belong to no scope, so globally listed
/// items are collected exactly once: under the scope they name.
pub fn in_scope(item: &Value, scope_field: &str, scope: &str) -> bool {
    item.get(scope_field).and_then(|v| v.as_str()) == Some(scope)
}

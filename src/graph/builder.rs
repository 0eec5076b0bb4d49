//! Graph Builder
//!
//! The handle collectors work against: it owns the scope's API client and
//! shares the graph and the worker pool with the other scopes of a run.

use super::edge::{Direction, EdgeDeclaration, MatchKey};
use super::node::NodeHandle;
use super::pool::WorkerPool;
use super::store::Graph;
use crate::api::ApiClient;
use crate::resource::{get_resource, ResourceNode};
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;

#[derive(Clone)]
pub struct GraphBuilder {
    client: Arc<dyn ApiClient>,
    graph: Arc<Graph>,
    pool: WorkerPool,
}

impl GraphBuilder {
    pub fn new(client: Arc<dyn ApiClient>, graph: Arc<Graph>, pool: WorkerPool) -> Self {
        Self {
            client,
            graph,
            pool,
        }
    }

    pub fn client(&self) -> &Arc<dyn ApiClient> {
        &self.client
    }

    /// Scope this builder collects
    pub fn scope(&self) -> &str {
        self.client.scope()
    }

    /// Register a node; the returned handle receives enrichment writes
    pub async fn add_node(&self, resource: impl Into<ResourceNode>, raw: Value) -> NodeHandle {
        let resource = resource.into();
        tracing::debug!(
            "add_node: kind={}, id={}, scope={}",
            resource.kind(),
            resource.id(),
            self.scope()
        );

        let node = NodeHandle::new(resource, raw, self.scope());
        self.graph.add_node(node.clone()).await;
        node
    }

    /// Declare `source -> (node of target_kind matching key)`
    pub async fn add_edge(&self, source: &NodeHandle, target_kind: &str, key: MatchKey) {
        self.declare(source, target_kind, key, Direction::Outgoing)
            .await;
    }

    /// Declare `(node of source_kind matching key) -> target`
    pub async fn add_edge_from(&self, target: &NodeHandle, source_kind: &str, key: MatchKey) {
        self.declare(target, source_kind, key, Direction::Incoming)
            .await;
    }

    async fn declare(&self, node: &NodeHandle, other_kind: &str, key: MatchKey, direction: Direction) {
        let declared = get_resource(node.kind()).is_some_and(|def| def.links_to(other_kind, direction));
        if !declared {
            tracing::warn!(
                "Ignoring {:?} edge from {} to undeclared kind {}",
                direction,
                node.kind(),
                other_kind
            );
            return;
        }

        tracing::trace!("declare edge {} {} {:?} {} ({})", node.kind(), node.id(), direction, other_kind, key);
        self.graph
            .declare(EdgeDeclaration {
                node: node.id(),
                node_kind: node.kind().to_string(),
                other_kind: other_kind.to_string(),
                key,
                direction,
            })
            .await;
    }

    /// Schedule a unit of work on the shared pool
    pub fn submit_work<F>(&self, task: impl Into<String>, work: F)
    where
        F: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.pool.submit(task, work);
    }
}

//! In-process graph store
//!
//! Holds registered nodes and edge declarations for one collection run and
//! resolves declarations into edges once all nodes are known. Declarations
//! whose target was never registered are kept as dangling; they are not
//! errors.

use super::edge::{Edge, EdgeDeclaration};
use super::node::{NodeHandle, NodeSnapshot};
use super::pool::TaskFailure;
use crate::resource::ResourceNode;
use serde::Serialize;
use std::collections::HashSet;
use tokio::sync::{Mutex, RwLock};

#[derive(Debug, Default)]
pub struct Graph {
    nodes: RwLock<Vec<NodeHandle>>,
    declarations: Mutex<Vec<EdgeDeclaration>>,
}

/// Result of matching declarations against registered nodes
#[derive(Debug, Clone, Default, Serialize)]
pub struct Resolution {
    pub edges: Vec<Edge>,
    pub dangling: Vec<EdgeDeclaration>,
}

/// Serializable result of a collection run
#[derive(Debug, Clone, Default, Serialize)]
pub struct GraphSnapshot {
    pub nodes: Vec<NodeSnapshot>,
    pub edges: Vec<Edge>,
    pub dangling: Vec<EdgeDeclaration>,
    pub failures: Vec<TaskFailure>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_node(&self, node: NodeHandle) {
        self.nodes.write().await.push(node);
    }

    pub async fn declare(&self, declaration: EdgeDeclaration) {
        self.declarations.lock().await.push(declaration);
    }

    pub async fn nodes(&self) -> Vec<NodeHandle> {
        self.nodes.read().await.clone()
    }

    pub async fn declarations(&self) -> Vec<EdgeDeclaration> {
        self.declarations.lock().await.clone()
    }

    /// Match every declaration against the registered nodes
    pub async fn resolve(&self) -> Resolution {
        let mut resources: Vec<(NodeHandle, ResourceNode)> = Vec::new();
        for node in self.nodes().await {
            let resource = node.resource().await;
            resources.push((node, resource));
        }

        let mut seen = HashSet::new();
        let mut resolution = Resolution::default();

        for declaration in self.declarations().await {
            let mut matched = false;
            for (node, resource) in &resources {
                if node.kind() != declaration.other_kind || !resource.matches(&declaration.key) {
                    continue;
                }
                matched = true;
                let edge = declaration.edge_to(node.id());
                if seen.insert(edge) {
                    resolution.edges.push(edge);
                }
            }

            if !matched {
                tracing::debug!(
                    "dangling edge from {} {} to {} ({})",
                    declaration.node_kind,
                    declaration.node,
                    declaration.other_kind,
                    declaration.key
                );
                resolution.dangling.push(declaration);
            }
        }

        resolution
    }

    /// Resolve and snapshot the whole graph
    pub async fn snapshot(&self, failures: Vec<TaskFailure>) -> GraphSnapshot {
        let Resolution { edges, dangling } = self.resolve().await;

        let mut nodes = Vec::new();
        for node in self.nodes().await {
            nodes.push(node.snapshot().await);
        }

        GraphSnapshot {
            nodes,
            edges,
            dangling,
            failures,
        }
    }
}

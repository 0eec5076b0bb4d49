//! Node cells
//!
//! A registered node is shared between the graph and the task that
//! collected it. The task keeps writing enrichment results through its
//! [`NodeHandle`]; each write records which [`Enrichment`] it populated, so
//! readers can tell a finished node from a partially enriched one.

use crate::resource::{Enrichment, NodeVariant, ResourceNode};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

pub type NodeId = Uuid;

/// Mutable part of a node
#[derive(Debug)]
struct NodeState {
    resource: ResourceNode,
    populated: BTreeSet<Enrichment>,
}

#[derive(Debug)]
struct NodeCell {
    id: NodeId,
    kind: &'static str,
    scope: String,
    raw: Value,
    state: RwLock<NodeState>,
}

/// Shared handle to a registered node
#[derive(Debug, Clone)]
pub struct NodeHandle {
    cell: Arc<NodeCell>,
}

impl NodeHandle {
    pub(crate) fn new(resource: ResourceNode, raw: Value, scope: &str) -> Self {
        Self {
            cell: Arc::new(NodeCell {
                id: Uuid::new_v4(),
                kind: resource.kind(),
                scope: scope.to_string(),
                raw,
                state: RwLock::new(NodeState {
                    resource,
                    populated: BTreeSet::new(),
                }),
            }),
        }
    }

    pub fn id(&self) -> NodeId {
        self.cell.id
    }

    pub fn kind(&self) -> &'static str {
        self.cell.kind
    }

    pub fn scope(&self) -> &str {
        &self.cell.scope
    }

    /// Raw JSON the node was built from
    pub fn raw(&self) -> &Value {
        &self.cell.raw
    }

    /// Copy of the current resource
    pub async fn resource(&self) -> ResourceNode {
        self.cell.state.read().await.resource.clone()
    }

    pub async fn is_populated(&self, enrichment: Enrichment) -> bool {
        self.cell.state.read().await.populated.contains(&enrichment)
    }

    /// Write an enrichment result into the node and mark it populated
    ///
    /// Returns false (and writes nothing) if the node is not a `T`.
    pub async fn enrich<T, F>(&self, enrichment: Enrichment, f: F) -> bool
    where
        T: NodeVariant,
        F: FnOnce(&mut T),
    {
        let mut guard = self.cell.state.write().await;
        let state = &mut *guard;
        match T::from_node_mut(&mut state.resource) {
            Some(resource) => {
                f(resource);
                state.populated.insert(enrichment);
                true
            }
            None => {
                tracing::warn!(
                    "Cannot apply {:?} to {} node {}",
                    enrichment,
                    self.cell.kind,
                    self.cell.id
                );
                false
            }
        }
    }

    pub async fn snapshot(&self) -> NodeSnapshot {
        let state = self.cell.state.read().await;
        NodeSnapshot {
            id: self.cell.id,
            scope: self.cell.scope.clone(),
            populated: state.populated.iter().copied().collect(),
            resource: state.resource.clone(),
            raw: self.cell.raw.clone(),
        }
    }
}

/// Serializable view of a node
#[derive(Debug, Clone, Serialize)]
pub struct NodeSnapshot {
    pub id: NodeId,
    pub scope: String,
    pub populated: Vec<Enrichment>,
    #[serde(flatten)]
    pub resource: ResourceNode,
    /// Raw JSON the node was built from; dropped unless requested
    #[serde(skip_serializing_if = "Value::is_null")]
    pub raw: Value,
}

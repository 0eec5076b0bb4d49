//! Collection pass
//!
//! A run over any number of scopes (regions, clusters) that share one graph
//! and one worker pool:
//!
//! 1. list and collect every selected kind in every scope
//! 2. wait for the pool to drain
//! 3. link every registered node
//! 4. resolve edge declarations into a snapshot
//!
//! Linking starts only after step 2, so a node never misses a target that
//! another scope had not registered yet.

use super::{collector_for, collectors, Collector};
use crate::api::ApiClient;
use crate::graph::{Graph, GraphBuilder, GraphSnapshot, TaskFailure, WorkerPool};
use anyhow::Result;
use futures::future::join_all;
use std::sync::Arc;

pub struct CollectionPass {
    collectors: Vec<&'static dyn Collector>,
}

impl CollectionPass {
    /// Pass over the given kinds; all known kinds when empty
    pub fn new(kinds: &[String]) -> Result<Self> {
        if kinds.is_empty() {
            return Ok(Self {
                collectors: collectors().to_vec(),
            });
        }

        let collectors = kinds
            .iter()
            .map(|kind| {
                collector_for(kind).ok_or_else(|| {
                    let known: Vec<&str> = collectors().iter().map(|c| c.kind()).collect();
                    anyhow::anyhow!("Unknown resource kind '{}' (known: {})", kind, known.join(", "))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { collectors })
    }

    pub fn collectors(&self) -> &[&'static dyn Collector] {
        &self.collectors
    }

    /// List and collect every selected kind the builder's provider serves
    ///
    /// Returns the kinds that could not be listed or collected; work
    /// submitted by the collectors reports its failures through the pool.
    pub async fn collect_scope(&self, builder: &GraphBuilder) -> Vec<TaskFailure> {
        let provider = builder.client().provider();
        let mut failures = Vec::new();

        for collector in self.collectors.iter().filter(|c| c.provider() == provider) {
            let task = format!("{} in {}", collector.kind(), builder.scope());
            let outcome = async {
                let items = collector.list(builder.client().as_ref()).await?;
                tracing::debug!("{}: {} listing entries", task, items.len());
                collector.collect(items, builder).await
            }
            .await;

            if let Err(e) = outcome {
                tracing::warn!("Failed to collect {}: {:#}", task, e);
                failures.push(TaskFailure {
                    task,
                    error: format!("{:#}", e),
                });
            }
        }

        failures
    }

    /// Collect, link and snapshot one run over `clients`
    pub async fn run(&self, clients: Vec<Arc<dyn ApiClient>>, workers: usize) -> GraphSnapshot {
        let graph = Arc::new(Graph::new());
        let pool = WorkerPool::new(workers);
        let builders: Vec<GraphBuilder> = clients
            .into_iter()
            .map(|client| GraphBuilder::new(client, graph.clone(), pool.clone()))
            .collect();

        tracing::info!(
            "Collecting {} kind(s) across {} scope(s) with {} workers",
            self.collectors.len(),
            builders.len(),
            workers
        );

        let mut failures: Vec<TaskFailure> = join_all(builders.iter().map(|b| self.collect_scope(b)))
            .await
            .into_iter()
            .flatten()
            .collect();
        failures.extend(pool.wait().await);

        link(&graph, &builders).await;

        let snapshot = graph.snapshot(failures).await;
        tracing::info!(
            "Collected {} nodes, {} edges, {} dangling, {} failures",
            snapshot.nodes.len(),
            snapshot.edges.len(),
            snapshot.dangling.len(),
            snapshot.failures.len()
        );
        snapshot
    }
}

/// Let every registered node declare its edges
pub async fn link(graph: &Graph, builders: &[GraphBuilder]) {
    for node in graph.nodes().await {
        let Some(builder) = builders
            .iter()
            .find(|b| b.scope() == node.scope())
            .or_else(|| builders.first())
        else {
            return;
        };

        let resource = node.resource().await;
        resource.connect_in_graph(&node, builder).await;
    }
}

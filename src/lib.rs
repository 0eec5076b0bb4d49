//! cloudgraph
//!
//! Collects AWS CloudTrail trails and Kubernetes clusters and deployments
//! into a typed resource graph.
//!
//! - [`api`] - Provider-neutral client trait, requests and errors
//! - [`aws`] - AWS JSON 1.1 client
//! - [`k8s`] - Kubernetes REST client
//! - [`resource`] - Typed resources, field mapper and resource registry
//! - [`collector`] - Per-kind collectors and the collection pass
//! - [`graph`] - Node store, worker pool and edge resolution
//! - [`config`] - Persistent configuration

pub mod api;
pub mod aws;
pub mod collector;
pub mod config;
pub mod graph;
pub mod k8s;
pub mod resource;

/// Version injected at compile time via CLOUDGRAPH_VERSION env var (set by CI/CD),
/// or "dev" for local builds.
pub const VERSION: &str = match option_env!("CLOUDGRAPH_VERSION") {
    Some(v) => v,
    None => "dev",
};

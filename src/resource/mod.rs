//! Resource abstraction layer
//!
//! Typed resources and the data-driven definitions behind them. Field
//! mappings and per-kind API declarations are loaded from JSON files at
//! compile time; the typed structs decide what a mapped record means.
//!
//! # Architecture
//!
//! - [`registry`] - Loads and caches resource definitions from embedded JSON
//! - [`mapper`] - Applies field mappings to raw provider JSON
//! - [`model`] - [`ResourceNode`], the closed set of known kinds
//! - [`cloudtrail`] - AWS CloudTrail trails
//! - [`kubernetes`] - Kubernetes clusters and deployments
//!
//! # Resource Definitions
//!
//! Resources are defined in JSON files under `src/resources/`:
//! - `aws_cloudtrail.json` - CloudTrail trails, status and selectors
//! - `kubernetes.json` - Kubernetes clusters and deployments
//!
//! # Example
//!
//! ```ignore
//! use cloudgraph::resource::{mapper, cloudtrail::AwsCloudTrail};
//!
//! fn decode(raw: &serde_json::Value) -> anyhow::Result<AwsCloudTrail> {
//!     mapper().decode(AwsCloudTrail::KIND, raw)
//! }
//! ```

pub mod cloudtrail;
pub mod kubernetes;
pub mod mapper;
pub mod model;
pub mod registry;

pub use model::{Enrichment, NodeVariant, ResourceBase, ResourceNode, Tags};
pub use registry::*;

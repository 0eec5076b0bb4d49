//! Resource Registry - Load resource definitions from JSON
//!
//! This module loads all resource definitions and field mappings from
//! embedded JSON files and provides lookup functions for the collectors.

use super::mapper::{Mapper, Mapping};
use crate::api::ApiSpec;
use crate::graph::Direction;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::OnceLock;

/// Embedded resource JSON files (compiled into the binary)
const RESOURCE_FILES: &[&str] = &[
    include_str!("../resources/aws_cloudtrail.json"),
    include_str!("../resources/kubernetes.json"),
];

/// Resource definition from JSON
#[derive(Debug, Clone, Deserialize)]
pub struct ResourceDef {
    pub display_name: String,
    pub service: String,
    /// List call returning the raw listing for a collection pass
    #[serde(default)]
    pub list_api: Option<ApiSpec>,
    /// Name of the mapping used to decode the detail record
    pub mapping: String,
    /// Attribute of a listing entry naming the scope that owns it
    #[serde(default)]
    pub scope_field: Option<String>,
    /// Kinds this resource declares edges to
    #[serde(default)]
    pub successors: Vec<String>,
    /// Kinds that declare edges to this resource
    #[serde(default)]
    pub predecessors: Vec<String>,
    /// Every API operation a collection pass may call
    #[serde(default)]
    pub collect_apis: Vec<ApiSpec>,
    /// Every API operation the mutators may call
    #[serde(default)]
    pub mutator_apis: Vec<ApiSpec>,
}

impl ResourceDef {
    /// Whether this kind declares edges toward (outgoing) or from (incoming) `kind`
    pub fn links_to(&self, kind: &str, direction: Direction) -> bool {
        let kinds = match direction {
            Direction::Outgoing => &self.successors,
            Direction::Incoming => &self.predecessors,
        };
        kinds.iter().any(|k| k == kind)
    }
}

/// Root structure of resources/*.json
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResourceConfig {
    #[serde(default)]
    pub mappings: HashMap<String, Mapping>,
    #[serde(default)]
    pub resources: HashMap<String, ResourceDef>,
}

/// Global registry loaded from JSON
static REGISTRY: OnceLock<ResourceConfig> = OnceLock::new();

/// Get the resource registry (loads from embedded JSON on first access)
pub fn get_registry() -> &'static ResourceConfig {
    REGISTRY.get_or_init(|| {
        let mut final_config = ResourceConfig::default();

        for content in RESOURCE_FILES {
            let partial: ResourceConfig = serde_json::from_str(content)
                .unwrap_or_else(|e| panic!("Failed to parse embedded resource JSON: {}", e));
            final_config.mappings.extend(partial.mappings);
            final_config.resources.extend(partial.resources);
        }

        final_config
    })
}

/// Get a resource definition by kind
pub fn get_resource(kind: &str) -> Option<&'static ResourceDef> {
    get_registry().resources.get(kind)
}

/// Get all resource kinds, sorted
pub fn get_all_resource_kinds() -> Vec<&'static str> {
    let mut kinds: Vec<&'static str> = get_registry()
        .resources
        .keys()
        .map(|s| s.as_str())
        .collect();
    kinds.sort_unstable();
    kinds
}

/// Mapper over all registered mappings
pub fn mapper() -> Mapper<'static> {
    Mapper::new(&get_registry().mappings)
}

//! Resource graph
//!
//! - [`builder`] - What collectors register nodes and declare edges through
//! - [`node`] - Thread-safe node cells
//! - [`edge`] - Edge declarations and resolved edges
//! - [`pool`] - Bounded worker pool with completion tracking
//! - [`store`] - Node/edge storage and edge resolution

pub mod builder;
pub mod edge;
pub mod node;
pub mod pool;
pub mod store;

pub use builder::GraphBuilder;
pub use edge::{Direction, Edge, EdgeDeclaration, MatchKey};
pub use node::{NodeHandle, NodeId, NodeSnapshot};
pub use pool::{TaskFailure, WorkerPool};
pub use store::{Graph, GraphSnapshot, Resolution};

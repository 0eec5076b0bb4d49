//! Kubernetes API interaction module
//!
//! - [`client`] - Cluster client implementing [`crate::api::ApiClient`]
//! - [`dispatch`] - Maps operation names to REST calls

pub mod client;
pub mod dispatch;

//! AWS API interaction module
//!
//! # Module Structure
//!
//! - [`auth`] - Request signing seam
//! - [`client`] - Regional client implementing [`crate::api::ApiClient`]
//! - [`http`] - HTTP utilities for the AWS JSON 1.1 protocol
//!
//! # Example
//!
//! ```ignore
//! use cloudgraph::api::{ApiClient, ApiRequest};
//! use cloudgraph::aws::{auth::BearerSigner, client::AwsClient};
//!
//! async fn example() -> anyhow::Result<()> {
//!     let client = AwsClient::new("us-east-1", None, BearerSigner::from_config(None))?;
//!     let trails = client
//!         .list(&ApiRequest::new("cloudtrail", "list-trails").result("Trails"))
//!         .await?;
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod client;
pub mod http;

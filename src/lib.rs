//! Collect deployment metadata from a CloudFormation-compatible metadata server.
//!
//! This crate implements the `cfn` collector of a cloud orchestration agent. For every
//! configured path it sends a signed `DescribeStackResource` query, pulls a JSON
//! document out of the XML response, and merges the results. Deployment lists found
//! in the merged metadata are split into one named output each, ready for
//! deployment-handler plugins.
//!
//! # Example
//!
//! ```ignore
//! use cfn_collect::{CfnConfig, CfnError, Collector};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), CfnError> {
//!     let config = CfnConfig::default()
//!         .with_metadata_url("http://192.0.2.1:8000/v1/")
//!         .with_stack_name("overcloud-controller")
//!         .with_path("controller.Metadata")
//!         .with_credentials("access-key-id", "secret-access-key");
//!
//!     let outputs = Collector::new(config)?.collect().await?;
//!     assert_eq!(outputs[0].name, "cfn");
//!     Ok(())
//! }
//! ```
//!
//! # Paths
//!
//! | Path | Request | Value |
//! |------|---------|-------|
//! | `foo.Metadata` | `LogicalResourceId=foo` | JSON text of `Metadata` |
//! | `foo.Metadata.a.b` | `LogicalResourceId=foo` | key `a`, then key `b` inside it |
//!
//! # Errors
//!
//! [`CfnError::MetadataNotConfigured`] means the collector cannot run as configured.
//! [`CfnError::MetadataNotAvailable`] means the server or its data was not usable
//! this time; the caller decides whether to retry.

mod client;
mod collector;
mod config;
mod deployments;
mod error;
mod path;
mod response;
mod signer;

pub use client::MetadataClient;
pub use collector::Collector;
pub use config::{
    CfnConfig, Credentials, DEFAULT_DEPLOYMENT_KEY, DEFAULT_METADATA_HINT, DEFAULT_TIMEOUT,
};
pub use deployments::{split_deployments, CollectedOutput, COLLECTOR_NAME};
pub use error::CfnError;
pub use path::MetadataPath;
pub use signer::{canonical_query, QueryParams, Signer};

//! The `cfn` collector.

use serde_json::{Map, Value};
use tracing::{debug, warn};
use url::Url;

use crate::client::MetadataClient;
use crate::config::CfnConfig;
use crate::deployments::{split_deployments, CollectedOutput};
use crate::error::CfnError;
use crate::path::MetadataPath;
use crate::response::extract_field;
use crate::signer::{QueryParams, Signer};

/// Query API action describing a single stack resource.
const DESCRIBE_ACTION: &str = "DescribeStackResource";

/// Signature version understood by the metadata server.
const SIGNATURE_VERSION: &str = "2";

/// Collects resource metadata from a CloudFormation-compatible metadata server.
///
/// # Example
///
/// ```ignore
/// use cfn_collect::{CfnConfig, Collector};
///
/// #[tokio::main]
/// async fn main() -> Result<(), cfn_collect::CfnError> {
///     let config = CfnConfig::default()
///         .with_stack_name("overcloud")
///         .with_path("controller.Metadata")
///         .with_credentials("access", "secret");
///
///     for output in Collector::new(config)?.collect().await? {
///         println!("{}: {}", output.name, output.content);
///     }
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct Collector {
    config: CfnConfig,
    client: MetadataClient,
}

impl Collector {
    /// Create a collector using an HTTP client built from the configured timeout.
    pub fn new(config: CfnConfig) -> Result<Self, CfnError> {
        let client = MetadataClient::new(config.request_timeout())?;
        Ok(Self { config, client })
    }

    /// Create a collector with an existing HTTP client.
    pub fn with_client(config: CfnConfig, client: MetadataClient) -> Self {
        Self { config, client }
    }

    /// Get the configuration this collector runs with.
    pub fn config(&self) -> &CfnConfig {
        &self.config
    }

    /// Run one collection pass.
    ///
    /// Paths are fetched strictly in order and merged into one mapping, later
    /// paths overwriting earlier keys. Deployment lists are then split out.
    /// The first output is always named `cfn`.
    ///
    /// # Errors
    ///
    /// Returns `CfnError::MetadataNotConfigured` before any request is made if
    /// the configuration is incomplete, and `CfnError::MetadataNotAvailable` as
    /// soon as any path cannot be fetched or resolved.
    pub async fn collect(&self) -> Result<Vec<CollectedOutput>, CfnError> {
        let url = self.config.resolve_metadata_url()?;
        let credentials = self.config.validate()?;
        let paths = self.config.metadata_paths()?;

        let signer = Signer::new(credentials.secret_access_key);
        let mut final_content = Map::new();

        for path in &paths {
            let mut params = self.request_params(path, credentials.access_key_id);
            signer.sign("GET", &url, &mut params);

            let value = self.fetch_path(&url, &params, path).await?;
            match value {
                Value::Object(map) => final_content.extend(map),
                _ => {
                    warn!("Path {} does not resolve to a mapping.", path);
                    return Err(CfnError::not_available(format!(
                        "path {} does not resolve to a mapping",
                        path
                    )));
                }
            }
        }

        Ok(split_deployments(final_content, &self.config.deployment_key))
    }

    fn request_params(&self, path: &MetadataPath, access_key_id: &str) -> QueryParams {
        let stack_name = self.config.stack_name.as_deref().unwrap_or_default();
        [
            ("Action", DESCRIBE_ACTION),
            ("StackName", stack_name),
            ("LogicalResourceId", path.resource.as_str()),
            ("AWSAccessKeyId", access_key_id),
            ("SignatureVersion", SIGNATURE_VERSION),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
    }

    async fn fetch_path(
        &self,
        url: &Url,
        params: &QueryParams,
        path: &MetadataPath,
    ) -> Result<Value, CfnError> {
        let body = self.client.get(url, params).await?;

        let text = extract_field(&body, &path.field).inspect_err(|e| {
            warn!("Path {} does not exist. ({})", path, e);
        })?;

        let value: Value = serde_json::from_str(&text).map_err(|e| {
            warn!("Path {} failed to parse as json. ({})", path, e);
            CfnError::not_available(format!("path {} failed to parse as json: {}", path, e))
        })?;

        debug!("Resolved {} from {}", path, url);
        path.resolve(value).inspect_err(|e| warn!("{}", e))
    }
}

//! Collector configuration.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Deserializer};
use tracing::{debug, error, warn};
use url::Url;

use crate::error::CfnError;
use crate::path::MetadataPath;

/// Default local file naming the metadata server when no URL is configured.
pub const DEFAULT_METADATA_HINT: &str = "/var/lib/heat-cfntools/cfn-metadata-server";

/// Default key whose list is exploded into one output per deployment.
pub const DEFAULT_DEPLOYMENT_KEY: &str = "deployments";

/// Default timeout for metadata requests.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Immutable configuration for one [`Collector`](crate::Collector).
///
/// Every field mirrors one option of the `cfn` collector. Nothing here is
/// modified by a collection pass.
#[derive(Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CfnConfig {
    /// URL to query for CloudFormation metadata.
    pub metadata_url: Option<String>,
    /// Local file to read for the metadata URL if not explicitly specified.
    pub heat_metadata_hint: Option<PathBuf>,
    /// Stack name to describe.
    pub stack_name: Option<String>,
    /// Paths to metadata, `resource.field[.x.y]`.
    pub path: Vec<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    /// Keys to explode into multiple collected outputs.
    pub deployment_key: Vec<String>,
    /// Request timeout, given in (possibly fractional) seconds when deserialized.
    #[serde(deserialize_with = "deserialize_timeout_secs")]
    pub timeout: Option<Duration>,
}

impl Default for CfnConfig {
    fn default() -> Self {
        Self {
            metadata_url: None,
            heat_metadata_hint: Some(PathBuf::from(DEFAULT_METADATA_HINT)),
            stack_name: None,
            path: Vec::new(),
            access_key_id: None,
            secret_access_key: None,
            deployment_key: vec![DEFAULT_DEPLOYMENT_KEY.to_string()],
            timeout: None,
        }
    }
}

impl fmt::Debug for CfnConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CfnConfig")
            .field("metadata_url", &self.metadata_url)
            .field("heat_metadata_hint", &self.heat_metadata_hint)
            .field("stack_name", &self.stack_name)
            .field("path", &self.path)
            .field("access_key_id", &self.access_key_id)
            .field(
                "secret_access_key",
                &self.secret_access_key.as_ref().map(|_| "<redacted>"),
            )
            .field("deployment_key", &self.deployment_key)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl CfnConfig {
    pub fn with_metadata_url(mut self, url: impl Into<String>) -> Self {
        self.metadata_url = Some(url.into());
        self
    }

    /// Set or clear the hint file consulted when no metadata URL is set.
    pub fn with_metadata_hint(mut self, hint: Option<impl Into<PathBuf>>) -> Self {
        self.heat_metadata_hint = hint.map(Into::into);
        self
    }

    pub fn with_stack_name(mut self, stack_name: impl Into<String>) -> Self {
        self.stack_name = Some(stack_name.into());
        self
    }

    /// Append a metadata path.
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path.push(path.into());
        self
    }

    pub fn with_credentials(
        mut self,
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
    ) -> Self {
        self.access_key_id = Some(access_key_id.into());
        self.secret_access_key = Some(secret_access_key.into());
        self
    }

    /// Replace the deployment keys.
    pub fn with_deployment_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.deployment_key = keys.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Request timeout, falling back to [`DEFAULT_TIMEOUT`].
    pub fn request_timeout(&self) -> Duration {
        self.timeout.unwrap_or(DEFAULT_TIMEOUT)
    }

    /// Resolve the metadata URL, reading the hint file when none is configured.
    ///
    /// # Errors
    ///
    /// Returns `CfnError::MetadataNotConfigured` when neither source yields a URL
    /// or the URL does not parse.
    pub fn resolve_metadata_url(&self) -> Result<Url, CfnError> {
        let raw = match (&self.metadata_url, &self.heat_metadata_hint) {
            (Some(url), _) => url.clone(),
            (None, Some(hint)) if hint.exists() => read_hint(hint)?,
            _ => {
                warn!("No metadata_url configured.");
                return Err(CfnError::not_configured("no metadata_url configured"));
            }
        };

        Url::parse(&raw).map_err(|e| {
            warn!("Invalid metadata_url {}: {}", raw, e);
            CfnError::not_configured(format!("invalid metadata_url {}: {}", raw, e))
        })
    }

    /// Check that credentials and at least one path are present.
    ///
    /// # Errors
    ///
    /// Returns `CfnError::MetadataNotConfigured` for the first missing or
    /// malformed setting.
    pub fn validate(&self) -> Result<Credentials<'_>, CfnError> {
        let Some(access_key_id) = non_empty(&self.access_key_id) else {
            warn!("No Access Key ID configured.");
            return Err(CfnError::not_configured("no access key id configured"));
        };
        let Some(secret_access_key) = non_empty(&self.secret_access_key) else {
            warn!("No Secret Access Key configured.");
            return Err(CfnError::not_configured("no secret access key configured"));
        };
        if self.path.is_empty() {
            warn!("No path configured");
            return Err(CfnError::not_configured("no path configured"));
        }
        Ok(Credentials {
            access_key_id,
            secret_access_key,
        })
    }

    /// Parse every configured path.
    ///
    /// # Errors
    ///
    /// Returns `CfnError::MetadataNotConfigured` for the first malformed path.
    pub fn metadata_paths(&self) -> Result<Vec<MetadataPath>, CfnError> {
        self.path
            .iter()
            .map(|p| {
                p.parse::<MetadataPath>().inspect_err(|_| {
                    error!("Path not in format resource.field[.x.y] ({})", p);
                })
            })
            .collect()
    }
}

/// Credentials borrowed from a validated configuration.
pub struct Credentials<'a> {
    pub access_key_id: &'a str,
    pub secret_access_key: &'a str,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

fn deserialize_timeout_secs<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<f64>::deserialize(deserializer)?
        .map(|secs| Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom))
        .transpose()
}

fn read_hint(hint: &Path) -> Result<String, CfnError> {
    let content = std::fs::read_to_string(hint).map_err(|e| {
        warn!("Could not read metadata hint {}: {}", hint.display(), e);
        CfnError::not_configured(format!(
            "could not read metadata hint {}: {}",
            hint.display(),
            e
        ))
    })?;
    let url = format!("{}/v1/", content.trim());
    debug!("Using metadata_url {} from {}", url, hint.display());
    Ok(url)
}

//! Error types for metadata collection.

use thiserror::Error;

/// Errors that can occur while collecting CloudFormation metadata.
///
/// There are only two kinds. A configuration error will not go away on its own,
/// while an availability error depends on the remote side and may be retried.
#[derive(Debug, Error)]
pub enum CfnError {
    /// Required configuration is missing or malformed.
    #[error("cfn metadata not configured: {0}")]
    MetadataNotConfigured(String),

    /// The metadata server could not be reached or returned unusable data.
    #[error("cfn metadata not available: {0}")]
    MetadataNotAvailable(String),
}

impl CfnError {
    pub(crate) fn not_configured(reason: impl Into<String>) -> Self {
        CfnError::MetadataNotConfigured(reason.into())
    }

    pub(crate) fn not_available(reason: impl Into<String>) -> Self {
        CfnError::MetadataNotAvailable(reason.into())
    }

    /// Whether a later collection pass could succeed without operator intervention.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CfnError::MetadataNotAvailable(_))
    }
}

//! Metadata path expressions of the form `resource.field[.subkey...]`.

use std::fmt;
use std::str::FromStr;

use serde_json::Value;

use crate::error::CfnError;

/// A parsed metadata path.
///
/// `resource` is the logical resource id to describe, `field` the element of the
/// resource detail whose text holds JSON, and `subkeys` the chain of object keys
/// to follow inside that JSON.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataPath {
    pub resource: String,
    pub field: String,
    pub subkeys: Vec<String>,
}

impl MetadataPath {
    /// Follow the sub-key chain into `value`.
    ///
    /// # Errors
    ///
    /// Returns `CfnError::MetadataNotAvailable` naming the first key that is missing.
    pub fn resolve(&self, value: Value) -> Result<Value, CfnError> {
        let mut current = value;
        for subkey in &self.subkeys {
            current = match current {
                Value::Object(mut map) => map.remove(subkey),
                _ => None,
            }
            .ok_or_else(|| {
                CfnError::not_available(format!("sub-key {} does not exist ({})", subkey, self))
            })?;
        }
        Ok(current)
    }
}

impl FromStr for MetadataPath {
    type Err = CfnError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed =
            || CfnError::not_configured(format!("path not in format resource.field[.x.y] ({})", s));

        let (resource, rest) = s.split_once('.').ok_or_else(malformed)?;
        let (field, sub_path) = match rest.split_once('.') {
            Some((field, sub_path)) => (field, Some(sub_path)),
            None => (rest, None),
        };
        if resource.is_empty() || field.is_empty() {
            return Err(malformed());
        }

        let subkeys = sub_path
            .map(|p| p.split('.').map(str::to_string).collect())
            .unwrap_or_default();

        Ok(Self {
            resource: resource.to_string(),
            field: field.to_string(),
            subkeys,
        })
    }
}

impl fmt::Display for MetadataPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.resource, self.field)?;
        for subkey in &self.subkeys {
            write!(f, ".{}", subkey)?;
        }
        Ok(())
    }
}

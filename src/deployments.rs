//! Splitting deployment lists into individually named outputs.

use serde_json::{Map, Value};
use tracing::{debug, warn};

/// Name of the output carrying the merged metadata.
pub const COLLECTOR_NAME: &str = "cfn";

/// One named payload produced by a collection pass.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectedOutput {
    pub name: String,
    pub content: Value,
}

impl CollectedOutput {
    pub fn new(name: impl Into<String>, content: Value) -> Self {
        Self {
            name: name.into(),
            content,
        }
    }
}

/// Explode the lists found under `deployment_keys` into named outputs.
///
/// The first output is always [`COLLECTOR_NAME`] carrying `content` with every
/// deployment key that was found removed, even one whose value was not a list.
/// One output follows per named deployment, in key order then list order.
/// A deployment without a `config` field gets a `null` payload.
pub fn split_deployments(
    mut content: Map<String, Value>,
    deployment_keys: &[String],
) -> Vec<CollectedOutput> {
    let mut outputs = Vec::new();

    for key in deployment_keys {
        let Some(deployments) = content.remove(key) else {
            continue;
        };
        let Value::Array(deployments) = deployments else {
            warn!("Deployment-key {} was found but does not contain a list.", key);
            continue;
        };

        debug!("Deployment found for {}", key);
        for mut deployment in deployments {
            let name = match deployment.get("name") {
                Some(Value::String(name)) => name.clone(),
                _ => {
                    warn!("No name found for a deployment under {}.", key);
                    continue;
                }
            };
            let config = deployment
                .get_mut("config")
                .map(Value::take)
                .unwrap_or(Value::Null);
            outputs.push(CollectedOutput::new(name, config));
        }
    }

    outputs.insert(0, CollectedOutput::new(COLLECTOR_NAME, Value::Object(content)));
    outputs
}

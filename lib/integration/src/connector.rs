//! Connector trait and the declarative operation catalogue types.
//!
//! A connector describes what it can do ([`ConnectorInfo`]) and executes
//! [`Operation`]s named `"<resource>.<operation>"`.

use crate::error::ConnectorError;
use async_trait::async_trait;
use rootcause::Report;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Description of a connector and everything it exposes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectorInfo {
    /// Stable connector identifier.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// What the connector talks to.
    pub description: String,
    /// Base URL of the remote API.
    pub base_url: String,
    /// Available operations.
    pub operations: Vec<OperationInfo>,
    /// Capabilities of this connector.
    pub capabilities: Vec<ConnectorCapability>,
}

impl ConnectorInfo {
    /// Finds an operation by its full name.
    #[must_use]
    pub fn operation(&self, name: &str) -> Option<&OperationInfo> {
        self.operations.iter().find(|op| op.name == name)
    }
}

/// Description of one operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationInfo {
    /// Full name, `"<resource>.<operation>"`.
    pub name: String,
    /// Resource the operation acts on.
    pub resource: String,
    /// Short action label.
    pub action: String,
    /// JSON schema for the parameters.
    pub input_schema: JsonValue,
}

/// Capabilities a connector may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectorCapability {
    /// Reads records from the service.
    Read,
    /// Creates records in the service.
    Write,
    /// Modifies existing records.
    Update,
    /// Deletes records.
    Delete,
    /// Can be polled for new records.
    Poll,
    /// Authenticates with a bearer API key.
    ApiKey,
}

/// An operation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Operation {
    /// Full operation name.
    pub name: String,
    /// Parameter object.
    pub parameters: JsonValue,
}

impl Operation {
    /// Creates an operation with no parameters.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parameters: JsonValue::Object(Default::default()),
        }
    }

    /// Adds a parameter.
    #[must_use]
    pub fn with_param(mut self, key: impl Into<String>, value: JsonValue) -> Self {
        if let JsonValue::Object(ref mut map) = self.parameters {
            map.insert(key.into(), value);
        }
        self
    }

    /// Replaces all parameters.
    #[must_use]
    pub fn with_parameters(mut self, parameters: JsonValue) -> Self {
        self.parameters = parameters;
        self
    }
}

/// The result of an operation that reached the API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationResult {
    /// Parsed response body (`null` when the API returned none).
    pub data: JsonValue,
    /// Metadata about the execution.
    pub metadata: OperationMetadata,
}

/// Metadata about an operation execution.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OperationMetadata {
    /// Wall-clock latency in milliseconds.
    pub latency_ms: u64,
    /// Number of API calls made.
    pub api_calls: u32,
}

/// Trait for integration connectors.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Returns the connector description.
    fn info(&self) -> ConnectorInfo;

    /// Executes an operation.
    ///
    /// # Errors
    ///
    /// Returns an error if the operation is unknown, its parameters are
    /// invalid, or the API request fails.
    async fn execute(&self, operation: Operation) -> Result<OperationResult, Report<ConnectorError>>;

    /// Checks that the configured credential is accepted.
    ///
    /// # Errors
    ///
    /// Returns an error if the check could not be performed.
    async fn health_check(&self) -> Result<bool, Report<ConnectorError>>;

    /// Checks if this connector declares a capability.
    fn supports(&self, capability: ConnectorCapability) -> bool {
        self.info().capabilities.contains(&capability)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn operation_builder() {
        let op = Operation::new("call.get_all")
            .with_param("limit", json!(10))
            .with_param("call_status", json!("ended"));

        assert_eq!(op.name, "call.get_all");
        assert_eq!(op.parameters, json!({"limit": 10, "call_status": "ended"}));
    }

    #[test]
    fn capability_serializes_snake_case() {
        let json = serde_json::to_string(&ConnectorCapability::ApiKey).expect("serialize");
        assert_eq!(json, "\"api_key\"");
    }
}

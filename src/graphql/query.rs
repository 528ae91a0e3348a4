//! GraphQL request payloads
//!
//! Builds the `{"query", "variables", "operationName"}` document sent over
//! HTTP and inside graphql-transport-ws `subscribe` messages.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};

use crate::errors::{ApiFlowError, Result};
use crate::models::GraphQlRequest;

/// A GraphQL operation ready to serialize
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphQlPayload {
    pub query: String,

    #[serde(rename = "operationName", skip_serializing_if = "Option::is_none")]
    pub operation_name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub variables: Option<JsonValue>,
}

impl GraphQlPayload {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            operation_name: None,
            variables: None,
        }
    }

    /// Build from a resolved request; invalid variables JSON is rejected
    pub fn from_request(request: &GraphQlRequest) -> Result<Self> {
        Ok(Self {
            query: request.query.clone(),
            operation_name: request
                .operation_name
                .as_deref()
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .map(String::from),
            variables: parse_variables(request.variables.as_deref())?,
        })
    }

    /// Convert to JSON value
    pub fn to_json(&self) -> JsonValue {
        let mut obj = json!({
            "query": self.query
        });

        if let Some(ref op_name) = self.operation_name {
            obj["operationName"] = json!(op_name);
        }

        if let Some(ref vars) = self.variables {
            obj["variables"] = vars.clone();
        }

        obj
    }

    /// Convert to JSON string
    pub fn to_json_string(&self) -> String {
        self.to_json().to_string()
    }
}

/// Parse the JSON-encoded variables string
///
/// Blank input and `null` mean "no variables". Anything other than an object
/// is rejected.
pub fn parse_variables(raw: Option<&str>) -> Result<Option<JsonValue>> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };

    let value: JsonValue = serde_json::from_str(raw).map_err(|e| {
        ApiFlowError::InvalidRequest(format!("GraphQL variables are not valid JSON: {}", e))
    })?;

    match value {
        JsonValue::Null => Ok(None),
        JsonValue::Object(ref map) if map.is_empty() => Ok(None),
        JsonValue::Object(_) => Ok(Some(value)),
        _ => Err(ApiFlowError::InvalidRequest(
            "GraphQL variables must be a JSON object".to_string(),
        )),
    }
}

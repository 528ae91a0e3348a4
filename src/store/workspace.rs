//! Workspace files
//!
//! A workspace is a single YAML, JSON or TOML document listing requests,
//! collections, environments and flows. Loading one seeds a [`Store`];
//! secret values found in the file go to the secret store, not the entities.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fs;
use std::path::Path;
use tracing::debug;

use crate::errors::{ApiFlowError, Result};
use crate::models::{Collection, Environment, Flow, Request, RequestKind};
use super::Store;

/// Largest workspace file accepted (1 MiB)
pub const MAX_WORKSPACE_SIZE: u64 = 1024 * 1024;

const REQUEST_KINDS: [RequestKind; 3] =
    [RequestKind::Rest, RequestKind::GraphQl, RequestKind::WebSocket];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkspaceFile {
    #[serde(default)]
    pub requests: Vec<Request>,
    #[serde(default)]
    pub collections: Vec<Collection>,
    #[serde(default)]
    pub environments: Vec<Environment>,
    #[serde(default)]
    pub flows: Vec<Flow>,
}

impl WorkspaceFile {
    /// Parse workspace text; `format` is a file extension
    pub fn parse(content: &str, format: &str) -> Result<Self> {
        let raw: JsonValue = match format.to_lowercase().as_str() {
            "json" => serde_json::from_str(content)?,
            "yaml" | "yml" => serde_yaml::from_str(content)?,
            "toml" => toml::from_str(content)?,
            // YAML is a superset of JSON; fall back to TOML
            _ => match serde_yaml::from_str(content) {
                Ok(value) => value,
                Err(_) => toml::from_str(content)?,
            },
        };
        check_request_types(&raw)?;
        let workspace: WorkspaceFile = serde_json::from_value(raw)?;
        workspace.validate()?;
        Ok(workspace)
    }

    fn validate(&self) -> Result<()> {
        let ids = self
            .requests
            .iter()
            .map(|r| ("request", r.id()))
            .chain(self.collections.iter().map(|c| ("collection", c.id.as_str())))
            .chain(self.environments.iter().map(|e| ("environment", e.id.as_str())))
            .chain(self.flows.iter().map(|f| ("flow", f.id.as_str())));
        for (kind, id) in ids {
            if id.trim().is_empty() {
                return Err(ApiFlowError::Config(format!("Workspace {} has an empty id", kind)));
            }
        }
        Ok(())
    }

    /// Write every entity into `store`
    pub async fn seed(self, store: &Store) -> Result<()> {
        debug!(
            requests = self.requests.len(),
            collections = self.collections.len(),
            environments = self.environments.len(),
            flows = self.flows.len(),
            "seeding store from workspace"
        );
        for request in self.requests {
            store.requests.add(request).await?;
        }
        for collection in &self.collections {
            store.save_collection(collection).await?;
        }
        for environment in &self.environments {
            store.save_environment(environment).await?;
        }
        for flow in self.flows {
            store.flows.add(flow).await?;
        }
        Ok(())
    }

    /// Seed a fresh in-memory store
    pub async fn into_store(self) -> Result<Store> {
        let store = Store::in_memory();
        self.seed(&store).await?;
        Ok(store)
    }
}

/// Read and parse a workspace file, choosing the format by extension
pub fn load_workspace(path: &Path) -> Result<WorkspaceFile> {
    let size = fs::metadata(path)?.len();
    if size > MAX_WORKSPACE_SIZE {
        return Err(ApiFlowError::Config(format!(
            "Workspace file too large: {} bytes (max {} bytes)",
            size, MAX_WORKSPACE_SIZE
        )));
    }

    let content = fs::read_to_string(path)?;
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    WorkspaceFile::parse(&content, extension)
}

/// Reject request variants this engine cannot run before serde sees them
fn check_request_types(raw: &JsonValue) -> Result<()> {
    let Some(requests) = raw.get("requests").and_then(JsonValue::as_array) else {
        return Ok(());
    };
    for request in requests {
        let kind = request.get("type").and_then(JsonValue::as_str).unwrap_or("");
        if !REQUEST_KINDS.iter().any(|k| k.as_str() == kind) {
            return Err(ApiFlowError::UnsupportedRequestType(if kind.is_empty() {
                "<missing>".to_string()
            } else {
                kind.to_string()
            }));
        }
    }
    Ok(())
}

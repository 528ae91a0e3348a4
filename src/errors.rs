//! Error types for apiflow

use thiserror::Error;

/// Main error type for apiflow
#[derive(Error, Debug)]
pub enum ApiFlowError {
    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Unsupported request type: {0}")]
    UnsupportedRequestType(String),

    #[error("No executor found for request type: {0}")]
    NoExecutorFound(String),

    #[error("{kind} not found: {id}")]
    NotFound {
        kind: &'static str,
        id: String,
    },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("WebSocket error: {0}")]
    WebSocket(String),

    #[error("GraphQL error: {0}")]
    GraphQl(String),

    #[error("Timeout after {0:.1} seconds")]
    Timeout(f64),

    #[error("Operation cancelled")]
    Cancelled,
}

impl ApiFlowError {
    /// Shorthand for a missing entity
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        ApiFlowError::NotFound { kind, id: id.into() }
    }

    /// True when the error is a cancellation rather than a failure
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ApiFlowError::Cancelled)
    }

    /// Configuration errors are programming mistakes and are never retried
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            ApiFlowError::UnsupportedRequestType(_) | ApiFlowError::NoExecutorFound(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, ApiFlowError>;

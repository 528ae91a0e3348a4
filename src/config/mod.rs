//! Engine configuration

#[allow(clippy::module_inception)]
mod config;

pub use config::{EngineConfig, ENV_INSECURE, ENV_TIMEOUT};

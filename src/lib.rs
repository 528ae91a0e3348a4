//! apiflow library interface
//!
//! Request execution and flow orchestration for API testing.
//!
//! # Module Organization
//!
//! - [`variables`] - `{{name}}` resolution, secrets, dynamic generators
//! - [`request`] - resolved request clones
//! - [`executor`] - REST, GraphQL and WebSocket executors and their factory
//! - [`extract`] - JSONPath / XPath response extraction
//! - [`pipeline`] - flow runner, single request runner, reports
//! - [`store`] - repositories, secret store, workspace files
//! - [`errors`] - Error types (ApiFlowError, Result)
//! - [`status`] - Exit status codes (ExitStatus)

pub mod auth;
pub mod cli;
pub mod client;
pub mod config;
pub mod errors;
pub mod executor;
pub mod extract;
pub mod graphql;
pub mod history;
pub mod models;
pub mod pipeline;
pub mod request;
pub mod status;
pub mod store;
pub mod variables;
pub mod websocket;

pub use errors::{ApiFlowError, Result};

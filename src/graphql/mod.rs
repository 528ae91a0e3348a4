//! GraphQL support module
//!
//! Payload building for HTTP operations and the graphql-transport-ws
//! subscription protocol.

pub mod query;
pub mod transport_ws;

pub use query::{parse_variables, GraphQlPayload};
pub use transport_ws::{ClientMessage, ServerMessage};

//! WebSocket support module

pub mod client;
pub mod types;

pub use client::WsClient;
pub use types::{SessionEnd, WsMessage, WsOptions};

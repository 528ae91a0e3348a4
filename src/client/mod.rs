//! HTTP client functionality

pub mod http;
pub mod sse;

pub use http::{build_client, collect_response, send};
pub use sse::{SseParser, StreamLimits};

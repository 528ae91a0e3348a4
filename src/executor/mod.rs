//! Protocol executors
//!
//! Each executor runs one kind of resolved request and reports what was sent
//! and received. Executors are stateless and never mutate their input.

pub mod factory;
pub mod graphql;
pub mod rest;
pub mod websocket;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::errors::Result;
use crate::models::{Request, RequestResponse};

pub use factory::ExecutorFactory;
pub use graphql::GraphQlExecutor;
pub use rest::RestExecutor;
pub use websocket::WebSocketExecutor;

/// Runs resolved requests of the kinds it accepts
#[async_trait]
pub trait RequestExecutor: Send + Sync {
    /// Name used in logs
    fn name(&self) -> &'static str;

    fn can_execute(&self, request: &Request) -> bool;

    /// Execute a resolved request
    ///
    /// Transport failures are `Err`; HTTP error statuses are successful
    /// executions with the status recorded in the response.
    async fn execute(
        &self,
        request: &Request,
        cancel: &CancellationToken,
    ) -> Result<RequestResponse>;
}

//! Executor selection with a per-kind cache

use dashmap::DashMap;
use std::sync::Arc;
use tracing::debug;

use crate::config::EngineConfig;
use crate::errors::{ApiFlowError, Result};
use crate::models::{Request, RequestKind};
use super::{GraphQlExecutor, RequestExecutor, RestExecutor, WebSocketExecutor};

/// Maps a request to the executor able to run it
///
/// The executor list is fixed at construction. The first executor whose
/// `can_execute` accepts a request kind is cached for that kind.
pub struct ExecutorFactory {
    executors: Vec<Arc<dyn RequestExecutor>>,
    cache: DashMap<RequestKind, Arc<dyn RequestExecutor>>,
}

impl ExecutorFactory {
    pub fn new(executors: Vec<Arc<dyn RequestExecutor>>) -> Self {
        Self {
            executors,
            cache: DashMap::new(),
        }
    }

    /// REST, GraphQL and WebSocket executors sharing one HTTP client
    pub fn with_defaults(config: &EngineConfig) -> Result<Self> {
        let client = crate::client::build_client(config)?;
        Ok(Self::new(vec![
            Arc::new(RestExecutor::new(client.clone())),
            Arc::new(GraphQlExecutor::new(client, config)),
            Arc::new(WebSocketExecutor::new(config)),
        ]))
    }

    pub fn get_executor(&self, request: &Request) -> Result<Arc<dyn RequestExecutor>> {
        let kind = request.kind();
        if let Some(cached) = self.cache.get(&kind) {
            return Ok(Arc::clone(cached.value()));
        }

        let found = self
            .executors
            .iter()
            .find(|e| e.can_execute(request))
            .cloned()
            .ok_or_else(|| ApiFlowError::NoExecutorFound(kind.to_string()))?;

        debug!(kind = %kind, executor = found.name(), "executor cache miss");
        let entry = self.cache.entry(kind).or_insert(found);
        Ok(Arc::clone(entry.value()))
    }

    pub fn cached_kinds(&self) -> usize {
        self.cache.len()
    }
}

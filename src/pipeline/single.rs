//! Single request execution
//!
//! Unlike flows, a single execution persists what its extractions write and
//! propagates every error to the caller.

use chrono::Utc;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::errors::Result;
use crate::executor::ExecutorFactory;
use crate::extract::apply_extractions;
use crate::history::{HistoryEntry, HistorySink, NoHistory};
use crate::models::RequestResponse;
use crate::request::resolve_request;
use crate::store::Store;

pub struct RequestRunner {
    store: Store,
    factory: Arc<ExecutorFactory>,
    history: Arc<dyn HistorySink>,
}

impl RequestRunner {
    pub fn new(store: Store, factory: Arc<ExecutorFactory>) -> Self {
        Self {
            store,
            factory,
            history: Arc::new(NoHistory),
        }
    }

    pub fn with_history(mut self, history: Arc<dyn HistorySink>) -> Self {
        self.history = history;
        self
    }

    /// Resolve, execute and extract for one stored request
    ///
    /// `collection_id` defaults to the request's own collection. Variables
    /// resolve against that collection flattened with its ancestors, while
    /// extraction writes go to the collection itself.
    pub async fn execute(
        &self,
        request_id: &str,
        environment_id: &str,
        collection_id: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<RequestResponse> {
        let request = self.store.get_request(request_id).await?;
        let mut environment = self.store.load_environment(environment_id).await?;

        let collection_id = collection_id.or(request.collection_id()).map(String::from);
        let (mut collection, flattened) = match collection_id.as_deref() {
            Some(id) => (
                Some(self.store.load_collection(id).await?),
                Some(self.store.load_collection_chain(id).await?),
            ),
            None => (None, None),
        };

        let resolved = resolve_request(&request, &environment, flattened.as_ref());
        let executor = self.factory.get_executor(&resolved)?;
        debug!(request = %request_id, executor = executor.name(), "executing request");
        let response = executor.execute(&resolved, cancel).await?;

        let written = apply_extractions(
            &request.common().extractions,
            &response,
            &mut environment,
            collection.as_mut(),
        );
        if !written.is_empty() {
            info!(request = %request_id, variables = ?written, "saving extracted variables");
            self.store.save_environment(&environment).await?;
            if let Some(ref collection) = collection {
                self.store.save_collection(collection).await?;
            }
        }

        if let Some(ref sent) = response.sent_request {
            self.history.record(HistoryEntry {
                timestamp: Utc::now(),
                request_id: request.id().to_string(),
                request_name: request.name().to_string(),
                request_kind: request.kind(),
                environment_id: environment.id.clone(),
                collection_id,
                sent_request: sent.clone(),
                response: response.clone(),
            });
        }

        Ok(response)
    }
}

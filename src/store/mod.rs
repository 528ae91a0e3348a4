//! Entity persistence
//!
//! The engine reads and writes entities through [`Repository`] and keeps
//! secret variable values in a separate [`SecretStore`]. [`Store`] bundles both
//! and applies the secret split on every save and the merge on every load.

pub mod memory;
pub mod workspace;

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::errors::{ApiFlowError, Result};
use crate::models::{Collection, Environment, Flow, Request, VariableScope};
use crate::variables::{restore_secrets, strip_secrets};

pub use memory::{MemoryRepository, MemorySecretStore};
pub use workspace::{load_workspace, WorkspaceFile, MAX_WORKSPACE_SIZE};

/// An entity addressable by id
pub trait Entity: Clone + Send + Sync + 'static {
    /// Name used in "not found" errors
    const KIND: &'static str;

    fn entity_id(&self) -> &str;
}

impl Entity for Request {
    const KIND: &'static str = "Request";

    fn entity_id(&self) -> &str {
        self.id()
    }
}

impl Entity for Environment {
    const KIND: &'static str = "Environment";

    fn entity_id(&self) -> &str {
        &self.id
    }
}

impl Entity for Collection {
    const KIND: &'static str = "Collection";

    fn entity_id(&self) -> &str {
        &self.id
    }
}

impl Entity for Flow {
    const KIND: &'static str = "Flow";

    fn entity_id(&self) -> &str {
        &self.id
    }
}

/// CRUD access to one entity type
#[async_trait]
pub trait Repository<T: Entity>: Send + Sync {
    async fn get_by_id(&self, id: &str) -> Result<Option<T>>;

    async fn add(&self, entity: T) -> Result<T>;

    /// Replace an existing entity; `NotFound` when the id is unknown
    async fn update(&self, entity: T) -> Result<T>;

    /// Returns whether anything was removed
    async fn delete(&self, id: &str) -> Result<bool>;

    async fn list(&self) -> Result<Vec<T>>;
}

/// Which entity type a set of secrets belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SecretScope {
    Environment,
    Collection,
}

impl SecretScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            SecretScope::Environment => "environment",
            SecretScope::Collection => "collection",
        }
    }
}

impl fmt::Display for SecretScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Secret variable values, stored apart from their entity
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Empty map when nothing was saved
    async fn get(&self, scope: SecretScope, id: &str) -> Result<HashMap<String, String>>;

    async fn save(
        &self,
        scope: SecretScope,
        id: &str,
        secrets: HashMap<String, String>,
    ) -> Result<()>;

    async fn delete(&self, scope: SecretScope, id: &str) -> Result<()>;
}

/// All repositories the engine uses
#[derive(Clone)]
pub struct Store {
    pub requests: Arc<dyn Repository<Request>>,
    pub environments: Arc<dyn Repository<Environment>>,
    pub collections: Arc<dyn Repository<Collection>>,
    pub flows: Arc<dyn Repository<Flow>>,
    pub secrets: Arc<dyn SecretStore>,
}

impl Store {
    /// A store backed entirely by memory
    pub fn in_memory() -> Self {
        Self {
            requests: Arc::new(MemoryRepository::<Request>::new()),
            environments: Arc::new(MemoryRepository::<Environment>::new()),
            collections: Arc::new(MemoryRepository::<Collection>::new()),
            flows: Arc::new(MemoryRepository::<Flow>::new()),
            secrets: Arc::new(MemorySecretStore::new()),
        }
    }

    pub async fn get_request(&self, id: &str) -> Result<Request> {
        self.requests
            .get_by_id(id)
            .await?
            .ok_or_else(|| ApiFlowError::not_found(Request::KIND, id))
    }

    pub async fn get_flow(&self, id: &str) -> Result<Flow> {
        self.flows
            .get_by_id(id)
            .await?
            .ok_or_else(|| ApiFlowError::not_found(Flow::KIND, id))
    }

    /// Load an environment with its secret values merged back in
    pub async fn load_environment(&self, id: &str) -> Result<Environment> {
        let mut environment = self
            .environments
            .get_by_id(id)
            .await?
            .ok_or_else(|| ApiFlowError::not_found(Environment::KIND, id))?;
        let secrets = self.secrets.get(SecretScope::Environment, id).await?;
        restore_secrets(&mut environment, &secrets);
        Ok(environment)
    }

    /// Load a collection with its secret values merged back in
    pub async fn load_collection(&self, id: &str) -> Result<Collection> {
        let mut collection = self
            .collections
            .get_by_id(id)
            .await?
            .ok_or_else(|| ApiFlowError::not_found(Collection::KIND, id))?;
        let secrets = self.secrets.get(SecretScope::Collection, id).await?;
        restore_secrets(&mut collection, &secrets);
        Ok(collection)
    }

    /// Load a collection flattened with its ancestors
    ///
    /// Variables, secret names and dynamic definitions of the nearest
    /// collection win over those of its parents. A missing parent ends the
    /// chain with a warning; a cycle ends it at the first repeated id.
    pub async fn load_collection_chain(&self, id: &str) -> Result<Collection> {
        let mut flattened = self.load_collection(id).await?;
        let mut visited = HashSet::from([flattened.id.clone()]);
        let mut parent_id = flattened.parent_collection_id.clone();

        while let Some(pid) = parent_id {
            if !visited.insert(pid.clone()) {
                warn!(collection = %id, parent = %pid, "collection parent cycle");
                break;
            }
            let parent = match self.load_collection(&pid).await {
                Ok(parent) => parent,
                Err(ApiFlowError::NotFound { .. }) => {
                    warn!(collection = %id, parent = %pid, "parent collection not found");
                    break;
                }
                Err(e) => return Err(e),
            };
            inherit(&mut flattened, &parent);
            parent_id = parent.parent_collection_id.clone();
        }

        Ok(flattened)
    }

    /// Persist an environment, routing secret values to the secret store
    pub async fn save_environment(&self, environment: &Environment) -> Result<()> {
        let mut plain = environment.clone();
        let secrets = strip_secrets(&mut plain);
        upsert(self.environments.as_ref(), plain).await?;
        self.secrets
            .save(SecretScope::Environment, &environment.id, secrets)
            .await
    }

    /// Persist a collection, routing secret values to the secret store
    pub async fn save_collection(&self, collection: &Collection) -> Result<()> {
        let mut plain = collection.clone();
        let secrets = strip_secrets(&mut plain);
        upsert(self.collections.as_ref(), plain).await?;
        self.secrets
            .save(SecretScope::Collection, &collection.id, secrets)
            .await
    }
}

async fn upsert<T: Entity>(repository: &dyn Repository<T>, entity: T) -> Result<T> {
    match repository.update(entity.clone()).await {
        Err(ApiFlowError::NotFound { .. }) => {
            debug!(kind = T::KIND, id = %entity.entity_id(), "adding new entity");
            repository.add(entity).await
        }
        other => other,
    }
}

fn inherit(child: &mut Collection, parent: &Collection) {
    for (name, value) in parent.variables() {
        if child.variables.contains_key(name) {
            continue;
        }
        child.variables.insert(name.clone(), value.clone());
        if parent.secret_variable_names().contains(name) {
            child.secret_variable_names.insert(name.clone());
        }
    }
    for dynamic in parent.dynamic_variables() {
        if child.find_dynamic(&dynamic.name).is_none() {
            child.dynamic_variables.push(dynamic.clone());
        }
    }
}

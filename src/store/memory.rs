//! In-memory repositories backed by `DashMap`

use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::HashMap;

use crate::errors::{ApiFlowError, Result};
use super::{Entity, Repository, SecretScope, SecretStore};

pub struct MemoryRepository<T: Entity> {
    items: DashMap<String, T>,
}

impl<T: Entity> MemoryRepository<T> {
    pub fn new() -> Self {
        Self { items: DashMap::new() }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<T: Entity> Default for MemoryRepository<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<T: Entity> Repository<T> for MemoryRepository<T> {
    async fn get_by_id(&self, id: &str) -> Result<Option<T>> {
        Ok(self.items.get(id).map(|entry| entry.value().clone()))
    }

    /// Inserts, replacing any entity already stored under the same id
    async fn add(&self, entity: T) -> Result<T> {
        self.items.insert(entity.entity_id().to_string(), entity.clone());
        Ok(entity)
    }

    async fn update(&self, entity: T) -> Result<T> {
        match self.items.get_mut(entity.entity_id()) {
            Some(mut slot) => {
                *slot = entity.clone();
                Ok(entity)
            }
            None => Err(ApiFlowError::not_found(T::KIND, entity.entity_id())),
        }
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        Ok(self.items.remove(id).is_some())
    }

    /// Sorted by id
    async fn list(&self) -> Result<Vec<T>> {
        let mut all: Vec<T> = self.items.iter().map(|e| e.value().clone()).collect();
        all.sort_by(|a, b| a.entity_id().cmp(b.entity_id()));
        Ok(all)
    }
}

#[derive(Default)]
pub struct MemorySecretStore {
    secrets: DashMap<(SecretScope, String), HashMap<String, String>>,
}

impl MemorySecretStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SecretStore for MemorySecretStore {
    async fn get(&self, scope: SecretScope, id: &str) -> Result<HashMap<String, String>> {
        Ok(self
            .secrets
            .get(&(scope, id.to_string()))
            .map(|e| e.value().clone())
            .unwrap_or_default())
    }

    async fn save(
        &self,
        scope: SecretScope,
        id: &str,
        secrets: HashMap<String, String>,
    ) -> Result<()> {
        let key = (scope, id.to_string());
        if secrets.is_empty() {
            self.secrets.remove(&key);
        } else {
            self.secrets.insert(key, secrets);
        }
        Ok(())
    }

    async fn delete(&self, scope: SecretScope, id: &str) -> Result<()> {
        self.secrets.remove(&(scope, id.to_string()));
        Ok(())
    }
}

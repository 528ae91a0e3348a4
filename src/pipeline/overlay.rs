//! Transient variables shared by the steps of one flow run

use std::collections::HashMap;

use crate::models::{Collection, Environment};

/// Flow-local variable map layered over environment and collection
///
/// Built from the environment's variables overlaid with the collection's, so
/// a name present in both carries the collection value. Steps never see the
/// stored entities directly: each one gets fresh copies with the overlay
/// merged in, and values its extractions write are folded back here.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VariableOverlay {
    values: HashMap<String, String>,
}

/// Environment and collection copies a single step resolves against
pub struct StepScope {
    pub environment: Environment,
    pub collection: Option<Collection>,
}

impl VariableOverlay {
    pub fn new(environment: &Environment, collection: Option<&Collection>) -> Self {
        let mut values = environment.variables.clone();
        if let Some(collection) = collection {
            values.extend(collection.variables.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
        Self { values }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Copies of the originals with the overlay merged into both maps
    pub fn scope(&self, environment: &Environment, collection: Option<&Collection>) -> StepScope {
        let mut environment = environment.clone();
        environment.variables.extend(self.values.clone());
        let collection = collection.map(|c| {
            let mut c = c.clone();
            c.variables.extend(self.values.clone());
            c
        });
        StepScope { environment, collection }
    }

    /// Absorb values a step wrote into its scope copies
    ///
    /// Returns the names that changed. Collection writes are folded last so
    /// they win when both scopes wrote the same name.
    pub fn fold(&mut self, before: &StepScope, after: &StepScope) -> Vec<String> {
        let mut changed =
            self.fold_map(&before.environment.variables, &after.environment.variables);
        if let (Some(b), Some(a)) = (&before.collection, &after.collection) {
            changed.extend(self.fold_map(&b.variables, &a.variables));
        }
        changed.sort();
        changed.dedup();
        changed
    }

    fn fold_map(
        &mut self,
        before: &HashMap<String, String>,
        after: &HashMap<String, String>,
    ) -> Vec<String> {
        let mut changed = Vec::new();
        for (name, value) in after {
            if before.get(name) != Some(value) {
                self.values.insert(name.clone(), value.clone());
                changed.push(name.clone());
            }
        }
        changed
    }
}

impl StepScope {
    pub fn snapshot(&self) -> StepScope {
        StepScope {
            environment: self.environment.clone(),
            collection: self.collection.clone(),
        }
    }
}

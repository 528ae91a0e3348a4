//! Secret variable separation
//!
//! Secret values never sit in an entity's main variable map at rest. Callers
//! persist the plain and secret halves through different channels and merge
//! them back in memory after load.

use std::collections::{HashMap, HashSet};

use crate::models::VariableScope;

/// Split `variables` into `(secret, plain)` according to `secret_names`
pub fn separate(
    variables: &HashMap<String, String>,
    secret_names: &HashSet<String>,
) -> (HashMap<String, String>, HashMap<String, String>) {
    variables
        .iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .partition(|(k, _)| secret_names.contains(k))
}

/// Overlay secret values onto `target`
pub fn merge(target: &mut HashMap<String, String>, secrets: &HashMap<String, String>) {
    for (name, value) in secrets {
        target.insert(name.clone(), value.clone());
    }
}

/// Split an entity in place: its map keeps only plain values, secrets are returned
pub fn strip_secrets<S: VariableScope>(scope: &mut S) -> HashMap<String, String> {
    let (secret, plain) = separate(scope.variables(), scope.secret_variable_names());
    *scope.variables_mut() = plain;
    secret
}

/// Recombine secrets loaded from the secret channel into an entity
pub fn restore_secrets<S: VariableScope>(scope: &mut S, secrets: &HashMap<String, String>) {
    merge(scope.variables_mut(), secrets);
}

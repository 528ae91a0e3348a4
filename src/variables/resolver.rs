//! `{{name}}` placeholder resolution against the variable scope chain
//!
//! Lookup order, first hit wins:
//! 1. collection static variable
//! 2. environment static variable
//! 3. request dynamic variable
//! 4. collection dynamic variable
//! 5. environment dynamic variable
//!
//! Unresolved placeholders are left verbatim.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::collections::BTreeSet;

use crate::models::{Collection, DynamicVariable, Environment, RequestCommon, VariableScope};
use super::dynamic;

static VARIABLE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_]*)\s*\}\}").expect("Invalid variable regex")
});

/// Borrowed view of the scopes a template resolves against
#[derive(Clone, Copy)]
pub struct ResolveContext<'a> {
    pub environment: &'a Environment,
    pub collection: Option<&'a Collection>,
    pub request_dynamic: &'a [DynamicVariable],
}

impl<'a> ResolveContext<'a> {
    pub fn new(environment: &'a Environment, collection: Option<&'a Collection>) -> Self {
        Self {
            environment,
            collection,
            request_dynamic: &[],
        }
    }

    pub fn with_request(mut self, request: &'a RequestCommon) -> Self {
        self.request_dynamic = &request.dynamic_variables;
        self
    }

    /// Resolve a single variable name, generating dynamic values fresh
    pub fn lookup(&self, name: &str) -> Option<String> {
        if let Some(value) = self.collection.and_then(|c| c.get_variable(name)) {
            return Some(value.to_string());
        }
        if let Some(value) = self.environment.get_variable(name) {
            return Some(value.to_string());
        }

        self.request_dynamic
            .iter()
            .find(|d| d.name == name)
            .or_else(|| self.collection.and_then(|c| c.find_dynamic(name)))
            .or_else(|| self.environment.find_dynamic(name))
            .map(dynamic::generate)
    }

    pub fn resolve(&self, text: &str) -> String {
        resolve(text, self)
    }
}

/// Replace every `{{name}}` in `text`; unknown names stay as written
pub fn resolve(text: &str, ctx: &ResolveContext<'_>) -> String {
    if !text.contains("{{") {
        return text.to_string();
    }

    VARIABLE_RE
        .replace_all(text, |caps: &Captures| {
            ctx.lookup(&caps[1]).unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

/// True when `text` holds at least one placeholder
pub fn contains_variables(text: &str) -> bool {
    VARIABLE_RE.is_match(text)
}

/// Distinct placeholder names referenced by `text`, sorted
pub fn extract_variable_names(text: &str) -> BTreeSet<String> {
    VARIABLE_RE
        .captures_iter(text)
        .map(|caps| caps[1].to_string())
        .collect()
}

/// Names referenced by `text` that no scope can satisfy
pub fn unresolved_variable_names(text: &str, ctx: &ResolveContext<'_>) -> BTreeSet<String> {
    extract_variable_names(text)
        .into_iter()
        .filter(|name| {
            ctx.collection.is_none_or(|c| c.get_variable(name).is_none())
                && ctx.environment.get_variable(name).is_none()
                && !ctx.request_dynamic.iter().any(|d| &d.name == name)
                && ctx.collection.is_none_or(|c| c.find_dynamic(name).is_none())
                && ctx.environment.find_dynamic(name).is_none()
        })
        .collect()
}

/// Write a variable into the environment, or into the collection when asked
/// and one is present
pub fn set_variable_value(
    name: &str,
    value: &str,
    environment: &mut Environment,
    collection: Option<&mut Collection>,
    save_to_collection: bool,
) {
    match collection {
        Some(collection) if save_to_collection => collection.set_variable(name, value),
        _ => environment.set_variable(name, value),
    }
}

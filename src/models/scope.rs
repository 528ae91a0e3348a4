//! Variable scopes: environments and collections

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Generator backing a dynamic variable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DynamicGenerator {
    Uuid,
    UuidV7,
    RandomEmail,
    RandomName,
    RandomFirstName,
    RandomLastName,
    RandomUsername,
    RandomInt,
    RandomFloat,
    RandomString,
    RandomHex,
    RandomBool,
    Timestamp,
    TimestampMs,
    IsoDateTime,
    Date,
    Pick,
}

/// Optional knobs for a generator; each generator reads only the ones it understands
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeneratorConstraints {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<usize>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
    /// chrono format string for date/time generators
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suffix: Option<String>,
}

/// Named generator evaluated fresh on every resolution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DynamicVariable {
    pub name: String,
    pub generator: DynamicGenerator,
    #[serde(flatten)]
    pub constraints: GeneratorConstraints,
}

impl DynamicVariable {
    pub fn new(name: impl Into<String>, generator: DynamicGenerator) -> Self {
        Self {
            name: name.into(),
            generator,
            constraints: GeneratorConstraints::default(),
        }
    }
}

/// Behavior shared by every entity owning a variable map
///
/// Secret separation, merging and extraction writes go through this trait so
/// environments and collections share one implementation.
pub trait VariableScope {
    fn variables(&self) -> &HashMap<String, String>;
    fn variables_mut(&mut self) -> &mut HashMap<String, String>;
    fn secret_variable_names(&self) -> &HashSet<String>;
    fn dynamic_variables(&self) -> &[DynamicVariable];

    fn get_variable(&self, name: &str) -> Option<&str> {
        self.variables().get(name).map(String::as_str)
    }

    fn set_variable(&mut self, name: impl Into<String>, value: impl Into<String>)
    where
        Self: Sized,
    {
        self.variables_mut().insert(name.into(), value.into());
    }

    fn find_dynamic(&self, name: &str) -> Option<&DynamicVariable> {
        self.dynamic_variables().iter().find(|d| d.name == name)
    }
}

/// Named set of variables chosen at execution time
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Environment {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub variables: HashMap<String, String>,
    #[serde(default, skip_serializing_if = "HashSet::is_empty")]
    pub secret_variable_names: HashSet<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dynamic_variables: Vec<DynamicVariable>,
}

impl Environment {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_variable(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.variables.insert(name.into(), value.into());
        self
    }
}

impl VariableScope for Environment {
    fn variables(&self) -> &HashMap<String, String> {
        &self.variables
    }

    fn variables_mut(&mut self) -> &mut HashMap<String, String> {
        &mut self.variables
    }

    fn secret_variable_names(&self) -> &HashSet<String> {
        &self.secret_variable_names
    }

    fn dynamic_variables(&self) -> &[DynamicVariable] {
        &self.dynamic_variables
    }
}

/// Group of requests sharing variables; collections nest via `parent_collection_id`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Collection {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub variables: HashMap<String, String>,
    #[serde(default, skip_serializing_if = "HashSet::is_empty")]
    pub secret_variable_names: HashSet<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dynamic_variables: Vec<DynamicVariable>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_collection_id: Option<String>,
}

impl Collection {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_variable(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.variables.insert(name.into(), value.into());
        self
    }
}

impl VariableScope for Collection {
    fn variables(&self) -> &HashMap<String, String> {
        &self.variables
    }

    fn variables_mut(&mut self) -> &mut HashMap<String, String> {
        &mut self.variables
    }

    fn secret_variable_names(&self) -> &HashSet<String> {
        &self.secret_variable_names
    }

    fn dynamic_variables(&self) -> &[DynamicVariable] {
        &self.dynamic_variables
    }
}

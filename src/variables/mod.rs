//! Variable resolution, secret handling and dynamic generators

pub mod dynamic;
pub mod resolver;
pub mod secrets;

pub use resolver::{
    contains_variables, extract_variable_names, resolve, set_variable_value,
    unresolved_variable_names, ResolveContext,
};
pub use secrets::{merge, restore_secrets, separate, strip_secrets};

//! Request preparation
//!
//! Turns stored requests into resolved, ready-to-send copies.

mod template;

pub use template::resolve_request;

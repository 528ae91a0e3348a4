//! CLI argument parsing and command dispatch

pub mod args;
pub mod commands;

pub use args::{Args, Command, LogFormat};
pub use commands::run;

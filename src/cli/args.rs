//! CLI argument definitions using clap

use clap::{ArgAction, Args as ClapArgs, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// apiflow - run API requests and multi-step flows from a workspace file
#[derive(Parser, Debug, Clone)]
#[command(name = "apiflow", version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Log output format
    #[arg(long = "log-format", value_enum, default_value_t = LogFormat::Text, global = true)]
    pub log_format: LogFormat,

    /// Engine config file (defaults to <config dir>/apiflow/config.toml)
    #[arg(long = "config", value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Request timeout in seconds, overriding config and APIFLOW_TIMEOUT
    #[arg(long = "timeout", value_name = "SECONDS", global = true)]
    pub timeout: Option<f64>,

    /// Skip TLS certificate verification for HTTP requests
    #[arg(short = 'k', long = "insecure", action = ArgAction::SetTrue, global = true)]
    pub insecure: bool,

    /// Append a JSON line per executed request to this file
    #[arg(long = "history", value_name = "FILE", global = true)]
    pub history: Option<PathBuf>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run a flow
    Run(RunArgs),
    /// Execute a single request
    Send(SendArgs),
    /// Resolve a template against an environment and collection
    Resolve(ResolveArgs),
    /// Check a flow for duplicate orders and missing requests
    Validate(ValidateArgs),
}

#[derive(ClapArgs, Debug, Clone)]
pub struct RunArgs {
    /// Workspace file (YAML, JSON or TOML)
    #[arg(value_name = "WORKSPACE")]
    pub workspace: PathBuf,

    /// Flow id
    #[arg(short = 'f', long = "flow", value_name = "ID")]
    pub flow: String,

    /// Environment id
    #[arg(short = 'e', long = "env", value_name = "ID")]
    pub env: String,

    /// Print the result as JSON
    #[arg(long = "json", action = ArgAction::SetTrue)]
    pub json: bool,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct SendArgs {
    #[arg(value_name = "WORKSPACE")]
    pub workspace: PathBuf,

    /// Request id
    #[arg(short = 'r', long = "request", value_name = "ID")]
    pub request: String,

    #[arg(short = 'e', long = "env", value_name = "ID")]
    pub env: String,

    /// Collection id (defaults to the request's collection)
    #[arg(short = 'c', long = "collection", value_name = "ID")]
    pub collection: Option<String>,

    /// Print the response as JSON
    #[arg(long = "json", action = ArgAction::SetTrue)]
    pub json: bool,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct ResolveArgs {
    #[arg(value_name = "WORKSPACE")]
    pub workspace: PathBuf,

    #[arg(short = 'e', long = "env", value_name = "ID")]
    pub env: String,

    #[arg(short = 'c', long = "collection", value_name = "ID")]
    pub collection: Option<String>,

    /// Text containing {{variables}}
    #[arg(value_name = "TEXT")]
    pub text: String,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct ValidateArgs {
    #[arg(value_name = "WORKSPACE")]
    pub workspace: PathBuf,

    #[arg(short = 'f', long = "flow", value_name = "ID")]
    pub flow: String,
}

/// Log output format
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Plain text output (default)
    #[default]
    Text,
    /// JSON Lines format for parsing
    Json,
}

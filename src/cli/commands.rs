//! Subcommand handlers

use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::config::EngineConfig;
use crate::errors::Result;
use crate::executor::ExecutorFactory;
use crate::history::{HistorySink, JsonlHistory, NoHistory};
use crate::models::{FlowStatus, RequestResponse};
use crate::pipeline::{format_flow_result, format_flow_result_json, FlowRunner, RequestRunner};
use crate::status::ExitStatus;
use crate::store::{load_workspace, Store};
use crate::variables::{extract_variable_names, unresolved_variable_names, ResolveContext};
use super::args::{Args, Command, ResolveArgs, RunArgs, SendArgs, ValidateArgs};

/// Execute the parsed command; output goes to stdout
pub async fn run(args: Args, cancel: CancellationToken) -> Result<ExitStatus> {
    let config = load_config(&args)?;
    let history: Arc<dyn HistorySink> = match args.history.clone().or(config.history_file.clone()) {
        Some(path) => Arc::new(JsonlHistory::new(path)),
        None => Arc::new(NoHistory),
    };

    match args.command {
        Command::Run(ref run) => run_flow(run, &config, &cancel).await,
        Command::Send(ref send) => send_request(send, &config, history, &cancel).await,
        Command::Resolve(ref resolve) => resolve_text(resolve).await,
        Command::Validate(ref validate) => validate_flow(validate, &config).await,
    }
}

fn load_config(args: &Args) -> Result<EngineConfig> {
    let mut config = EngineConfig::load(args.config.as_deref())?;
    if let Some(timeout) = args.timeout {
        config.timeout_secs = timeout;
    }
    if args.insecure {
        config.insecure = true;
    }
    debug!(?config, "engine configuration");
    Ok(config)
}

async fn open_store(path: &Path) -> Result<Store> {
    load_workspace(path)?.into_store().await
}

async fn run_flow(
    args: &RunArgs,
    config: &EngineConfig,
    cancel: &CancellationToken,
) -> Result<ExitStatus> {
    let store = open_store(&args.workspace).await?;
    let factory = Arc::new(ExecutorFactory::with_defaults(config)?);
    let runner = FlowRunner::new(store, factory);

    let result = runner.execute(&args.flow, &args.env, cancel).await;
    if args.json {
        println!("{}", format_flow_result_json(&result));
    } else {
        print!("{}", format_flow_result(&result));
    }

    // A flow that could not even load is an error, not a failed run
    if result.status == FlowStatus::Failed && result.steps.is_empty() {
        return Ok(ExitStatus::Error);
    }
    Ok(result.status.into())
}

async fn send_request(
    args: &SendArgs,
    config: &EngineConfig,
    history: Arc<dyn HistorySink>,
    cancel: &CancellationToken,
) -> Result<ExitStatus> {
    let store = open_store(&args.workspace).await?;
    let factory = Arc::new(ExecutorFactory::with_defaults(config)?);
    let runner = RequestRunner::new(store, factory).with_history(history);

    let response = runner
        .execute(&args.request, &args.env, args.collection.as_deref(), cancel)
        .await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else {
        print!("{}", format_response(&response));
    }
    Ok(ExitStatus::Success)
}

async fn resolve_text(args: &ResolveArgs) -> Result<ExitStatus> {
    let store = open_store(&args.workspace).await?;
    let environment = store.load_environment(&args.env).await?;
    let collection = match args.collection.as_deref() {
        Some(id) => Some(store.load_collection_chain(id).await?),
        None => None,
    };

    let ctx = ResolveContext::new(&environment, collection.as_ref());
    println!("{}", ctx.resolve(&args.text));

    let names = extract_variable_names(&args.text);
    if !names.is_empty() {
        eprintln!("Variables: {}", names.into_iter().collect::<Vec<_>>().join(", "));
    }
    let unresolved = unresolved_variable_names(&args.text, &ctx);
    if !unresolved.is_empty() {
        eprintln!("Unresolved: {}", unresolved.into_iter().collect::<Vec<_>>().join(", "));
    }
    Ok(ExitStatus::Success)
}

async fn validate_flow(args: &ValidateArgs, config: &EngineConfig) -> Result<ExitStatus> {
    let store = open_store(&args.workspace).await?;
    let flow = store.get_flow(&args.flow).await?;
    let runner = FlowRunner::new(store, Arc::new(ExecutorFactory::with_defaults(config)?));

    eprintln!("Validating flow: {}", flow.name);
    let warnings = runner.validate(&flow).await;
    if warnings.is_empty() {
        eprintln!("  Flow is valid");
    } else {
        eprintln!("  Flow is valid with {} warning(s):", warnings.len());
        for warning in &warnings {
            eprintln!("    - {}", warning);
        }
    }
    Ok(ExitStatus::Success)
}

fn format_response(response: &RequestResponse) -> String {
    let mut output = String::new();
    if let Some(ref sent) = response.sent_request {
        output.push_str(&format!("{} {}\n", sent.method, sent.url));
    }
    output.push_str(&format!(
        "{} {} ({}ms, {} bytes)\n",
        response.status_code, response.status_message, response.elapsed_ms, response.size_bytes
    ));
    for (name, value) in &response.headers {
        output.push_str(&format!("{}: {}\n", name, value));
    }
    output.push('\n');
    if response.is_streaming {
        for event in &response.stream_events {
            match event.event_type {
                Some(ref kind) => output.push_str(&format!("[{}] {}\n", kind, event.data)),
                None => output.push_str(&format!("{}\n", event.data)),
            }
        }
    } else if !response.body.is_empty() {
        output.push_str(&response.body);
        output.push('\n');
    }
    output
}

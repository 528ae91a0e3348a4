use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use apiflow::cli::{self, Args, LogFormat};
use apiflow::status::ExitStatus;

const LOG_ENV: &str = "APIFLOW_LOG";

/// Entry point - Ctrl+C cancels the running flow or request
///
/// Returns ExitStatus directly, which implements std::process::Termination.
fn main() -> ExitStatus {
    let args = Args::parse();
    init_logging(args.verbose, args.log_format);

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("apiflow: error: failed to start runtime: {}", e);
            return ExitStatus::Error;
        }
    };

    let cancel = CancellationToken::new();
    let handler_token = cancel.clone();
    ctrlc::set_handler(move || {
        // Second interrupt - force exit without cleanup
        if handler_token.is_cancelled() {
            std::process::exit(ExitStatus::Interrupted as i32);
        }
        eprintln!("\nInterrupted");
        handler_token.cancel();
    })
    .ok();

    match runtime.block_on(cli::run(args, cancel.clone())) {
        Ok(_) if cancel.is_cancelled() => ExitStatus::Interrupted,
        Ok(status) => status,
        Err(e) if e.is_cancelled() => ExitStatus::Interrupted,
        Err(e) => {
            eprintln!("apiflow: error: {}", e);
            ExitStatus::Error
        }
    }
}

/// `-v` flags win over APIFLOW_LOG / RUST_LOG; the default level is warn
fn init_logging(verbose: u8, format: LogFormat) {
    let filter = match verbose {
        0 => EnvFilter::try_from_env(LOG_ENV)
            .or_else(|_| EnvFilter::try_from_default_env())
            .unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.with_target(false).init(),
    }
}

mod cli;
mod commands;

use anyhow::{Context, Result};
use clap::Parser;
use cli::Cli;
use tracing_subscriber::EnvFilter;
use zmqc::bridge::EXIT_FAILURE;
use zmqc::ZmqcError;

fn main() {
  let cli_args = Cli::parse(); // Usage errors exit with status 2 here
  init_tracing(cli_args.verbose);

  let code = match run(cli_args) {
    Ok(code) => code,
    Err(e) => report_failure(&e),
  };
  std::process::exit(code);
}

/// Prints the error chain once on stderr and picks the exit status.
fn report_failure(e: &anyhow::Error) -> i32 {
  eprintln!("zmqc: {:#}", e);
  e.downcast_ref::<ZmqcError>()
    .map(ZmqcError::exit_code)
    .unwrap_or(EXIT_FAILURE)
}

fn run(cli_args: Cli) -> Result<i32> {
  let runtime = tokio::runtime::Builder::new_multi_thread()
    .enable_all()
    .build()
    .context("Failed to start the async runtime")?;

  let result = runtime.block_on(commands::bridge::run(cli_args));
  // A stdin read parked on a blocking thread must not keep the process alive.
  runtime.shutdown_background();
  result
}

/// Logs go to stderr; stdout carries only message data.
fn init_tracing(verbose: bool) {
  let filter = if verbose {
    EnvFilter::new("zmqc=debug,zmqc_cli=debug")
  } else {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
  };
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .with_target(false)
    .init();
}

use crate::cli::Cli;

use anyhow::{Context as AnyhowContext, Result};
use zmqc::{run_bridge, ShutdownController, ZmqTransport};

/// The whole bridge command: validate, open the socket, pump, report.
///
/// Returns the process exit code for runs that did not fail.
pub async fn run(cli_args: Cli) -> Result<i32> {
  let config = cli_args.bridge_config();

  // Fail fast: nothing is opened for an impossible socket/flag combination.
  let mode = config.validate()?;
  tracing::debug!(
    socket_type = %config.socket.kind,
    behavior = %config.socket.behavior,
    %mode,
    delimiter = %config.delimiter,
    limit = ?config.budget.remaining(),
    "Configuration accepted"
  );

  // Listen before opening so an early interrupt still drains instead of killing the process.
  let controller = ShutdownController::new();
  let signals = controller.spawn_signal_listener();

  let transport = ZmqTransport::open(&config.socket)
    .with_context(|| format!("Failed to open {} socket", config.socket.kind))?;

  let outcome = run_bridge(transport, tokio::io::stdin(), tokio::io::stdout(), &config, &controller).await;
  signals.abort();

  let outcome = outcome?;
  let stats = outcome.stats();
  tracing::debug!(sent = stats.sent, received = stats.received, exit_code = outcome.exit_code(), "Exiting");
  Ok(outcome.exit_code())
}

// core/src/bridge.rs

//! Runs one pump to completion under the shutdown controller.
//!
//! Whatever ends the run (end of input, budget, interrupt, fatal error or a
//! forced stop) the transport is closed before this returns, and the
//! controller always finishes in `Stopped`. A forced stop closes without
//! lingering on queued messages.

use crate::budget::MessageBudget;
use crate::codec::Delimiter;
use crate::error::ZmqcError;
use crate::mode::{select_mode, Mode};
use crate::pump::{Pump, PumpConfig, PumpStats, Turn};
use crate::shutdown::ShutdownController;
use crate::transport::{SocketConfig, Transport};

use tokio::io::{AsyncRead, AsyncWrite};

// --- Process exit codes ---
pub const EXIT_OK: i32 = 0;
pub const EXIT_FAILURE: i32 = 1;
pub const EXIT_USAGE: i32 = 2;
pub const EXIT_FORCED: i32 = 130; // 128 + SIGINT

/// Everything a run needs, fixed at startup.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
  pub socket: SocketConfig,
  pub delimiter: Delimiter,
  pub mode: Mode,
  pub budget: MessageBudget,
  pub pump: PumpConfig,
}

impl BridgeConfig {
  /// Derives the mode from the socket kind and the read/write flags.
  pub fn new(socket: SocketConfig, read: bool, write: bool) -> Self {
    let mode = select_mode(socket.kind, read, write);
    Self {
      socket,
      delimiter: Delimiter::default(),
      mode,
      budget: MessageBudget::unbounded(),
      pump: PumpConfig::default(),
    }
  }

  pub fn with_delimiter(mut self, delimiter: Delimiter) -> Self {
    self.delimiter = delimiter;
    self
  }

  pub fn with_budget(mut self, budget: MessageBudget) -> Self {
    self.budget = budget;
    self
  }

  pub fn with_pump_config(mut self, pump: PumpConfig) -> Self {
    self.pump = pump;
    self
  }

  /// Fails with a configuration error if the mode cannot work. Call before opening the socket.
  pub fn validate(&self) -> Result<Mode, ZmqcError> {
    self.mode.require_valid()
  }
}

/// How a run that did not fail ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
  /// Input ended, the budget ran out, output closed or a single interrupt drained the run.
  Completed { stats: PumpStats },
  /// A second interrupt arrived while draining.
  Forced { stats: PumpStats },
}

impl RunOutcome {
  pub fn stats(&self) -> PumpStats {
    match self {
      RunOutcome::Completed { stats } | RunOutcome::Forced { stats } => *stats,
    }
  }

  pub fn exit_code(&self) -> i32 {
    match self {
      RunOutcome::Completed { .. } => EXIT_OK,
      RunOutcome::Forced { .. } => EXIT_FORCED,
    }
  }
}

/// Moves the controller to `Running`, pumps until the run ends, then closes the transport.
pub async fn run_bridge<T, R, W>(
  transport: T,
  input: R,
  output: W,
  config: &BridgeConfig,
  controller: &ShutdownController,
) -> Result<RunOutcome, ZmqcError>
where
  T: Transport,
  R: AsyncRead + Unpin,
  W: AsyncWrite + Unpin,
{
  let mode = config.validate()?;
  let mut pump = Pump::new(transport, input, output, mode, controller.clone())
    .with_delimiter(config.delimiter)
    .with_budget(config.budget)
    .with_first_turn(Turn::opening_for(config.socket.kind))
    .with_config(config.pump.clone());

  controller.mark_running();
  tracing::info!(%mode, delimiter = %config.delimiter, transport = %pump.transport().describe(), "Bridge running");

  // `None` means a forced stop abandoned the pump mid-flight.
  let result = tokio::select! {
    biased;
    _ = controller.forced_stop() => None,
    res = pump.run() => Some(res),
  };

  let stats = pump.stats();
  let forced = controller.is_forced();
  if forced {
    pump.abort().await;
  } else {
    pump.close().await;
  }
  controller.finish();

  match result {
    None => {
      tracing::warn!(sent = stats.sent, received = stats.received, "Run forced to stop");
      Ok(RunOutcome::Forced { stats })
    }
    Some(Ok(stats)) if forced => Ok(RunOutcome::Forced { stats }),
    Some(Ok(stats)) => {
      tracing::info!(
        sent = stats.sent,
        received = stats.received,
        reason = ?controller.drain_reason(),
        "Run completed"
      );
      Ok(RunOutcome::Completed { stats })
    }
    Some(Err(e)) => {
      tracing::error!(error = %e, "Run failed");
      Err(e)
    }
  }
}

//! Run-state tracking and orderly termination.
//!
//! One [`ShutdownController`] exists per run. The pump observes it at every
//! suspension point; the bridge runner races the pump against a forced stop.
//! A first interrupt asks for a graceful drain, a second one while draining
//! stops immediately and abandons whatever was in flight.

use std::io;
use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Lifecycle of a run. Only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RunState {
  /// Socket and streams are being acquired.
  Starting,
  /// The pump is moving messages.
  Running,
  /// No new work is started; the in-flight message completes or is abandoned.
  Draining,
  /// Resources released (or about to be). Terminal.
  Stopped,
}

/// Why the run left `Running`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainReason {
  /// SIGINT / SIGTERM (or an explicit `interrupt()` call).
  Interrupted,
  /// stdin reached end of file.
  EndOfInput,
  /// The message budget reached zero.
  BudgetExhausted,
  /// Whoever reads our stdout went away.
  OutputClosed,
  /// A transport or stream error ended the run.
  Fatal,
}

#[derive(Debug, Clone, Copy)]
struct Status {
  state: RunState,
  reason: Option<DrainReason>,
  forced: bool,
}

/// Cloneable handle to the single run-state of the process.
#[derive(Debug, Clone)]
pub struct ShutdownController {
  tx: Arc<watch::Sender<Status>>,
}

impl Default for ShutdownController {
  fn default() -> Self {
    Self::new()
  }
}

impl ShutdownController {
  pub fn new() -> Self {
    let (tx, _rx) = watch::channel(Status {
      state: RunState::Starting,
      reason: None,
      forced: false,
    });
    Self { tx: Arc::new(tx) }
  }

  pub fn state(&self) -> RunState {
    self.tx.borrow().state
  }

  pub fn drain_reason(&self) -> Option<DrainReason> {
    self.tx.borrow().reason
  }

  /// True if the run was stopped by a second interrupt rather than finishing its drain.
  pub fn is_forced(&self) -> bool {
    self.tx.borrow().forced
  }

  /// `Starting -> Running`, once socket and streams are acquired.
  pub fn mark_running(&self) {
    let changed = self.tx.send_if_modified(|status| {
      if status.state == RunState::Starting {
        status.state = RunState::Running;
        true
      } else {
        false
      }
    });
    if changed {
      tracing::debug!("Run state: Starting -> Running");
    }
  }

  /// Moves to `Draining` for `reason`, unless already draining or stopped.
  /// Returns `true` if this call started the drain.
  pub fn begin_drain(&self, reason: DrainReason) -> bool {
    let changed = self.tx.send_if_modified(|status| {
      if status.state < RunState::Draining {
        status.state = RunState::Draining;
        status.reason = Some(reason);
        true
      } else {
        false
      }
    });
    if changed {
      tracing::debug!(?reason, "Run state: -> Draining");
    }
    changed
  }

  /// Handles one interrupt request and returns the resulting state.
  ///
  /// The first interrupt starts a graceful drain. A second one while
  /// draining stops immediately and marks the stop as forced.
  pub fn interrupt(&self) -> RunState {
    let mut escalated = false;
    self.tx.send_if_modified(|status| match status.state {
      RunState::Starting | RunState::Running => {
        status.state = RunState::Draining;
        status.reason = Some(DrainReason::Interrupted);
        true
      }
      RunState::Draining => {
        status.state = RunState::Stopped;
        status.forced = true;
        escalated = true;
        true
      }
      RunState::Stopped => false,
    });

    let state = self.state();
    if escalated {
      tracing::warn!("Second interrupt while draining; stopping immediately");
    } else if state == RunState::Draining {
      tracing::info!("Interrupt received; draining (interrupt again to force)");
    }
    state
  }

  /// Final transition to `Stopped` after resources are released.
  pub fn finish(&self) {
    let changed = self.tx.send_if_modified(|status| {
      if status.state != RunState::Stopped {
        status.state = RunState::Stopped;
        true
      } else {
        false
      }
    });
    if changed {
      tracing::debug!("Run state: -> Stopped");
    }
  }

  /// Resolves once the run is `Draining` or later. Cancel-safe.
  pub async fn draining(&self) {
    self.wait_until(|status| status.state >= RunState::Draining).await
  }

  /// Resolves once the run is `Stopped`.
  pub async fn stopped(&self) {
    self.wait_until(|status| status.state == RunState::Stopped).await
  }

  /// Resolves only when a second interrupt forces the stop.
  pub async fn forced_stop(&self) {
    self.wait_until(|status| status.forced).await
  }

  async fn wait_until(&self, condition: impl Fn(&Status) -> bool) {
    let mut rx = self.tx.subscribe();
    // The sender lives as long as `self`, so this only returns once the condition holds.
    let _ = rx.wait_for(|status| condition(status)).await;
  }

  /// Spawns a task forwarding SIGINT (and SIGTERM on unix) to [`interrupt`](Self::interrupt)
  /// until the run stops.
  pub fn spawn_signal_listener(&self) -> JoinHandle<()> {
    let controller = self.clone();
    tokio::spawn(async move {
      if let Err(e) = listen_for_signals(&controller).await {
        tracing::warn!(error = %e, "Failed to install signal handlers; interrupts will not drain gracefully");
      }
    })
  }
}

#[cfg(unix)]
async fn listen_for_signals(controller: &ShutdownController) -> io::Result<()> {
  use tokio::signal::unix::{signal, SignalKind};

  let mut interrupt = signal(SignalKind::interrupt())?;
  let mut terminate = signal(SignalKind::terminate())?;
  loop {
    let name = tokio::select! {
      _ = controller.stopped() => return Ok(()),
      _ = interrupt.recv() => "SIGINT",
      _ = terminate.recv() => "SIGTERM",
    };
    tracing::debug!(signal = name, "Signal received");
    controller.interrupt();
  }
}

#[cfg(not(unix))]
async fn listen_for_signals(controller: &ShutdownController) -> io::Result<()> {
  loop {
    tokio::select! {
      _ = controller.stopped() => return Ok(()),
      res = tokio::signal::ctrl_c() => res?,
    }
    tracing::debug!(signal = "ctrl-c", "Signal received");
    controller.interrupt();
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::time::Duration;
  use tokio::time::timeout;

  #[test]
  fn states_move_forward_only() {
    let controller = ShutdownController::new();
    assert_eq!(controller.state(), RunState::Starting);

    controller.mark_running();
    assert_eq!(controller.state(), RunState::Running);

    assert!(controller.begin_drain(DrainReason::EndOfInput));
    assert_eq!(controller.state(), RunState::Draining);
    assert_eq!(controller.drain_reason(), Some(DrainReason::EndOfInput));

    // Already draining: reason is kept, running cannot come back.
    assert!(!controller.begin_drain(DrainReason::BudgetExhausted));
    controller.mark_running();
    assert_eq!(controller.state(), RunState::Draining);
    assert_eq!(controller.drain_reason(), Some(DrainReason::EndOfInput));

    controller.finish();
    assert_eq!(controller.state(), RunState::Stopped);
    assert!(!controller.begin_drain(DrainReason::Fatal));
    assert!(!controller.is_forced());
  }

  #[test]
  fn first_interrupt_drains_second_forces() {
    let controller = ShutdownController::new();
    controller.mark_running();

    assert_eq!(controller.interrupt(), RunState::Draining);
    assert_eq!(controller.drain_reason(), Some(DrainReason::Interrupted));
    assert!(!controller.is_forced());

    assert_eq!(controller.interrupt(), RunState::Stopped);
    assert!(controller.is_forced());

    // Further interrupts change nothing.
    assert_eq!(controller.interrupt(), RunState::Stopped);
  }

  #[test]
  fn interrupt_after_natural_drain_forces() {
    let controller = ShutdownController::new();
    controller.mark_running();
    controller.begin_drain(DrainReason::EndOfInput);
    assert_eq!(controller.interrupt(), RunState::Stopped);
    assert!(controller.is_forced());
  }

  #[tokio::test]
  async fn draining_future_resolves_on_interrupt() {
    let controller = ShutdownController::new();
    controller.mark_running();

    let waiter = {
      let controller = controller.clone();
      tokio::spawn(async move { controller.draining().await })
    };
    tokio::task::yield_now().await;
    assert!(!waiter.is_finished());

    controller.interrupt();
    timeout(Duration::from_secs(1), waiter)
      .await
      .expect("draining() should resolve after interrupt")
      .unwrap();
  }

  #[tokio::test]
  async fn forced_stop_only_resolves_after_second_interrupt() {
    let controller = ShutdownController::new();
    controller.mark_running();
    controller.interrupt();

    assert!(timeout(Duration::from_millis(50), controller.forced_stop()).await.is_err());

    controller.interrupt();
    timeout(Duration::from_secs(1), controller.forced_stop())
      .await
      .expect("forced_stop() should resolve after second interrupt");
    timeout(Duration::from_secs(1), controller.stopped())
      .await
      .expect("stopped() should resolve once forced");
  }

  #[cfg(unix)]
  #[tokio::test]
  async fn signal_listener_forwards_sigterm_as_interrupt() {
    use tokio::signal::unix::{signal, SignalKind};

    // Holding our own registration keeps SIGTERM from killing the test binary.
    let _keep_alive = signal(SignalKind::terminate()).unwrap();
    let controller = ShutdownController::new();
    controller.mark_running();
    let listener = controller.spawn_signal_listener();

    // The listener registers asynchronously, so keep signalling until it reacts.
    timeout(Duration::from_secs(5), async {
      while controller.state() == RunState::Running {
        unsafe { libc::raise(libc::SIGTERM) };
        tokio::time::sleep(Duration::from_millis(50)).await;
      }
    })
    .await
    .expect("SIGTERM was never forwarded");

    assert!(controller.state() >= RunState::Draining);
    assert_eq!(controller.drain_reason(), Some(DrainReason::Interrupted));

    controller.finish();
    timeout(Duration::from_secs(1), listener)
      .await
      .expect("listener should exit once the run stops")
      .unwrap();
  }
}

// core/src/pump.rs

//! The event loop that moves messages between standard I/O and the socket.
//!
//! A [`Pump`] runs exactly one [`Mode`] for its whole life. Every place it can
//! suspend (waiting for the socket, backing off on a full peer queue, waiting
//! for the next stdin record) is raced against the shutdown controller, so a
//! drain request is noticed promptly without preempting half-done work.

use crate::budget::MessageBudget;
use crate::codec::{DelimitedCodec, Delimiter};
use crate::error::{Direction, ZmqcError};
use crate::message::Message;
use crate::mode::Mode;
use crate::shutdown::{DrainReason, ShutdownController};
use crate::socket::SocketKind;
use crate::transport::Transport;

use futures::{SinkExt, StreamExt};
use std::io;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::{Decoder, FramedRead, FramedWrite};

/// Tuning knobs for the loop. The defaults suit interactive and piped use.
#[derive(Debug, Clone)]
pub struct PumpConfig {
  /// Upper bound on one readiness wait before the loop re-checks its state.
  pub poll_interval: Duration,
  /// First delay after a `WouldBlock` send.
  pub initial_backoff: Duration,
  /// Ceiling for the doubling backoff delay.
  pub max_backoff: Duration,
  /// `None` retries a blocked send for as long as it takes.
  pub max_send_retries: Option<u32>,
}

impl Default for PumpConfig {
  fn default() -> Self {
    Self {
      poll_interval: Duration::from_millis(100),
      initial_backoff: Duration::from_millis(1),
      max_backoff: Duration::from_millis(100),
      max_send_retries: None,
    }
  }
}

/// Messages moved during a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PumpStats {
  /// stdin -> socket
  pub sent: u64,
  /// socket -> stdout
  pub received: u64,
}

/// Whose move it is in request/reply alternation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Turn {
  Send,
  Receive,
}

impl Turn {
  /// The step a request/reply socket has to take first.
  pub fn opening_for(kind: SocketKind) -> Turn {
    if kind.opens_with_send() {
      Turn::Send
    } else {
      Turn::Receive
    }
  }

  fn flip(self) -> Turn {
    match self {
      Turn::Send => Turn::Receive,
      Turn::Receive => Turn::Send,
    }
  }
}

// Result of one step that may be cut short by a drain.
enum Flow {
  Continue,
  Stop,
}

pub struct Pump<T, R, W> {
  transport: T,
  input: FramedRead<R, DelimitedCodec>,
  output: FramedWrite<W, DelimitedCodec>,
  mode: Mode,
  budget: MessageBudget,
  first_turn: Turn,
  config: PumpConfig,
  controller: ShutdownController,
  stats: PumpStats,
}

impl<T, R, W> Pump<T, R, W>
where
  T: Transport,
  R: AsyncRead + Unpin,
  W: AsyncWrite + Unpin,
{
  /// Newline-delimited, unbounded, default tuning. REQ-style alternation opens with a send.
  pub fn new(transport: T, input: R, output: W, mode: Mode, controller: ShutdownController) -> Self {
    Self {
      transport,
      input: FramedRead::new(input, DelimitedCodec::new(Delimiter::Newline)),
      output: FramedWrite::new(output, DelimitedCodec::new(Delimiter::Newline)),
      mode,
      budget: MessageBudget::unbounded(),
      first_turn: Turn::Send,
      config: PumpConfig::default(),
      controller,
      stats: PumpStats::default(),
    }
  }

  pub fn with_delimiter(mut self, delimiter: Delimiter) -> Self {
    *self.input.decoder_mut() = DelimitedCodec::new(delimiter);
    *self.output.encoder_mut() = DelimitedCodec::new(delimiter);
    self
  }

  pub fn with_budget(mut self, budget: MessageBudget) -> Self {
    self.budget = budget;
    self
  }

  pub fn with_first_turn(mut self, turn: Turn) -> Self {
    self.first_turn = turn;
    self
  }

  pub fn with_config(mut self, config: PumpConfig) -> Self {
    self.config = config;
    self
  }

  pub fn stats(&self) -> PumpStats {
    self.stats
  }

  pub fn transport(&self) -> &T {
    &self.transport
  }

  /// Closes the socket. Safe to call after `run` was cancelled.
  pub async fn close(&mut self) {
    self.transport.close().await;
  }

  /// Closes the socket and drops anything still queued for sending.
  pub async fn abort(&mut self) {
    self.transport.abort().await;
  }

  /// Runs the selected mode until input ends, the budget is used up, output
  /// closes, a drain is requested or a fatal error occurs.
  ///
  /// Cancelling the returned future abandons the in-flight message but keeps
  /// the counts in [`stats`](Self::stats) accurate for everything completed.
  pub async fn run(&mut self) -> Result<PumpStats, ZmqcError> {
    let mode = self.mode.require_valid()?;
    tracing::debug!(%mode, budget = ?self.budget.remaining(), transport = %self.transport.describe(), "Pump starting");

    if self.budget.is_exhausted() {
      self.controller.begin_drain(DrainReason::BudgetExhausted);
      return Ok(self.stats);
    }

    let result = match mode {
      Mode::ReadOnly => self.run_read_only().await,
      Mode::WriteOnly => self.run_write_only().await,
      Mode::RequestReplyAlternating => self.run_alternating().await,
      Mode::Invalid { reason } => Err(ZmqcError::Configuration(reason.to_string())),
    };

    match result {
      Ok(()) => {
        tracing::debug!(sent = self.stats.sent, received = self.stats.received, "Pump finished");
        Ok(self.stats)
      }
      Err(e) => {
        self.controller.begin_drain(DrainReason::Fatal);
        Err(e)
      }
    }
  }

  // --- Modes ---

  async fn run_read_only(&mut self) -> Result<(), ZmqcError> {
    loop {
      if self.stop_if_budget_exhausted() {
        return Ok(());
      }
      if let Flow::Stop = self.receive_step().await? {
        return Ok(());
      }
      if self.consume_budget() {
        return Ok(());
      }
    }
  }

  async fn run_write_only(&mut self) -> Result<(), ZmqcError> {
    loop {
      if self.stop_if_budget_exhausted() {
        return Ok(());
      }
      if let Flow::Stop = self.send_step(true).await? {
        return Ok(());
      }
      if self.consume_budget() {
        return Ok(());
      }
    }
  }

  async fn run_alternating(&mut self) -> Result<(), ZmqcError> {
    let mut turn = self.first_turn;
    loop {
      // A new exchange only starts while budget remains.
      if turn == self.first_turn && self.stop_if_budget_exhausted() {
        return Ok(());
      }

      let flow = match turn {
        Turn::Send => self.send_step(false).await?,
        Turn::Receive => self.receive_step().await?,
      };
      if let Flow::Stop = flow {
        return Ok(());
      }

      turn = turn.flip();
      tracing::debug!(next = ?turn, "Request/reply direction change");

      // Back at the opening step means one full exchange completed.
      if turn == self.first_turn && self.consume_budget() {
        return Ok(());
      }
    }
  }

  // --- Steps ---

  /// Reads one stdin record and sends it.
  ///
  /// With `flush_on_drain`, records that are already fully buffered when a
  /// drain begins are still sent before stopping.
  async fn send_step(&mut self, flush_on_drain: bool) -> Result<Flow, ZmqcError> {
    let next = tokio::select! {
      biased;
      _ = self.controller.draining() => None,
      item = self.input.next() => Some(item),
    };

    let message = match next {
      None => {
        if flush_on_drain {
          self.flush_buffered_records().await?;
        }
        return Ok(Flow::Stop);
      }
      Some(None) => {
        tracing::debug!("Input reached end of file");
        self.controller.begin_drain(DrainReason::EndOfInput);
        return Ok(Flow::Stop);
      }
      Some(Some(item)) => item?,
    };

    if !self.send_with_backoff(&message).await? {
      return Ok(Flow::Stop);
    }
    Ok(Flow::Continue)
  }

  /// Waits for one socket message and writes it to stdout.
  async fn receive_step(&mut self) -> Result<Flow, ZmqcError> {
    let message = loop {
      let readable = tokio::select! {
        biased;
        _ = self.controller.draining() => return Ok(Flow::Stop),
        ready = self.transport.poll_readable(self.config.poll_interval) => ready?,
      };
      if !readable {
        continue;
      }
      let received = tokio::select! {
        biased;
        _ = self.controller.draining() => return Ok(Flow::Stop),
        msg = self.transport.recv() => msg?,
      };
      break received;
    };

    tracing::trace!(frames = message.len(), bytes = message.size(), "Received message");
    match self.output.send(&message).await {
      Ok(()) => {
        self.stats.received += 1;
        Ok(Flow::Continue)
      }
      Err(ZmqcError::Io(e)) if e.kind() == io::ErrorKind::BrokenPipe => {
        tracing::info!("Output closed by reader; stopping");
        self.controller.begin_drain(DrainReason::OutputClosed);
        Ok(Flow::Stop)
      }
      Err(e) => Err(e),
    }
  }

  /// Sends `message`, retrying with exponential backoff while the peer queue is full.
  ///
  /// Returns `Ok(false)` if a drain started while backing off; the message is
  /// then abandoned. Exceeding `max_send_retries` is a transport error.
  async fn send_with_backoff(&mut self, message: &Message) -> Result<bool, ZmqcError> {
    let mut delay = self.config.initial_backoff;
    let mut retries: u32 = 0;

    loop {
      match self.transport.send(message).await {
        Ok(()) => {
          tracing::trace!(frames = message.len(), bytes = message.size(), retries, "Sent message");
          self.stats.sent += 1;
          return Ok(true);
        }
        Err(e) if e.is_would_block() => {}
        Err(e) => return Err(e),
      }

      if let Some(max) = self.config.max_send_retries {
        if retries >= max {
          return Err(ZmqcError::transport(
            Direction::Send,
            self.transport.describe(),
            format!("peer queue still full after {} retries", retries),
          ));
        }
      }
      retries += 1;
      if retries == 1 {
        tracing::debug!("Peer queue full; backing off");
      }

      tokio::select! {
        biased;
        _ = self.controller.draining() => {
          tracing::warn!(retries, "Drain requested while send was blocked; abandoning message");
          return Ok(false);
        }
        _ = tokio::time::sleep(delay) => {}
      }
      delay = (delay * 2).min(self.config.max_backoff);
    }
  }

  /// Sends complete records still sitting in the stdin buffer. Best effort:
  /// stops at the budget or at the first blocked send.
  async fn flush_buffered_records(&mut self) -> Result<(), ZmqcError> {
    let mut buffered = std::mem::take(self.input.read_buffer_mut());
    let mut flushed = 0u64;
    while let Some(message) = self.input.decoder_mut().decode(&mut buffered)? {
      if self.budget.is_exhausted() || !self.send_with_backoff(&message).await? {
        break;
      }
      flushed += 1;
      if self.budget.consume() {
        break;
      }
    }
    if flushed > 0 {
      tracing::debug!(flushed, "Sent records buffered before the drain");
    }
    if !buffered.is_empty() {
      tracing::debug!(len = buffered.len(), "Discarding incomplete record at drain");
    }
    Ok(())
  }

  // --- Budget ---

  fn stop_if_budget_exhausted(&self) -> bool {
    if self.budget.is_exhausted() {
      self.controller.begin_drain(DrainReason::BudgetExhausted);
      return true;
    }
    false
  }

  /// Counts one processed unit; true when that used up the budget.
  fn consume_budget(&mut self) -> bool {
    if self.budget.consume() {
      tracing::debug!("Message budget reached");
      self.controller.begin_drain(DrainReason::BudgetExhausted);
      return true;
    }
    false
  }
}

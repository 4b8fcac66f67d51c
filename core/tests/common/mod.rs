// tests/common/mod.rs
#![allow(dead_code)] // Not every test file uses every helper

use async_trait::async_trait;
use bytes::Bytes;
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use zmqc::{Direction, Message, ShutdownController, Transport, ZmqcError};

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

pub const LONG_TIMEOUT: Duration = Duration::from_secs(5);

static TRACING_INIT: Once = Once::new();

pub fn setup_tracing() {
  TRACING_INIT.call_once(|| {
    let default_filter = "zmqc=trace,warn";
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let subscriber = FmtSubscriber::builder()
      .with_env_filter(env_filter)
      .with_target(true)
      .with_line_number(true)
      .with_test_writer() // Write to test output capture
      .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set global tracing subscriber");
  });
}

/// One completed socket operation, as seen by the mock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
  Send(Vec<Vec<u8>>),
  Recv(Vec<Vec<u8>>),
}

impl Op {
  pub fn send(frames: &[&str]) -> Op {
    Op::Send(frames.iter().map(|f| f.as_bytes().to_vec()).collect())
  }

  pub fn recv(frames: &[&str]) -> Op {
    Op::Recv(frames.iter().map(|f| f.as_bytes().to_vec()).collect())
  }
}

/// What the test keeps after handing the mock to the pump.
#[derive(Clone, Default)]
pub struct MockHandle {
  log: Arc<Mutex<Vec<Op>>>,
  calls: Arc<AtomicUsize>,
  send_attempts: Arc<AtomicUsize>,
  closes: Arc<AtomicUsize>,
  aborts: Arc<AtomicUsize>,
}

impl MockHandle {
  pub fn ops(&self) -> Vec<Op> {
    self.log.lock().unwrap().clone()
  }

  pub fn sends(&self) -> Vec<Vec<Vec<u8>>> {
    self
      .ops()
      .into_iter()
      .filter_map(|op| match op {
        Op::Send(frames) => Some(frames),
        Op::Recv(_) => None,
      })
      .collect()
  }

  /// send/recv/poll calls of any outcome.
  pub fn calls(&self) -> usize {
    self.calls.load(Ordering::SeqCst)
  }

  pub fn send_attempts(&self) -> usize {
    self.send_attempts.load(Ordering::SeqCst)
  }

  pub fn close_count(&self) -> usize {
    self.closes.load(Ordering::SeqCst)
  }

  /// Closes that discarded queued messages.
  pub fn abort_count(&self) -> usize {
    self.aborts.load(Ordering::SeqCst)
  }
}

/// Scripted in-memory transport.
///
/// Incoming messages are handed out in order; once they run out, `recv`
/// waits forever and `poll_readable` times out, like a quiet socket.
pub struct MockTransport {
  handle: MockHandle,
  incoming: VecDeque<Message>,
  would_block: u64,
  fail_sends_with: Option<String>,
  interrupt_after_sends: Option<(usize, ShutdownController)>,
  closed: bool,
}

impl MockTransport {
  pub fn new() -> (Self, MockHandle) {
    let handle = MockHandle::default();
    let mock = Self {
      handle: handle.clone(),
      incoming: VecDeque::new(),
      would_block: 0,
      fail_sends_with: None,
      interrupt_after_sends: None,
      closed: false,
    };
    (mock, handle)
  }

  /// Queues a multipart message for `recv`.
  pub fn with_incoming(mut self, frames: &[&str]) -> Self {
    let frames: Vec<Bytes> = frames.iter().map(|f| Bytes::copy_from_slice(f.as_bytes())).collect();
    self.incoming.push_back(Message::from_frames(frames).unwrap());
    self
  }

  /// The next `count` send attempts report a full peer queue.
  pub fn with_would_block(mut self, count: u64) -> Self {
    self.would_block = count;
    self
  }

  pub fn with_failing_sends(mut self, reason: &str) -> Self {
    self.fail_sends_with = Some(reason.to_string());
    self
  }

  /// Calls `controller.interrupt()` right after the `count`-th successful send.
  pub fn interrupt_after_sends(mut self, count: usize, controller: ShutdownController) -> Self {
    self.interrupt_after_sends = Some((count, controller));
    self
  }

  fn record(&self, op: Op) {
    self.handle.log.lock().unwrap().push(op);
  }

  fn successful_sends(&self) -> usize {
    self.handle.sends().len()
  }
}

fn frames_to_vecs(msg: &Message) -> Vec<Vec<u8>> {
  msg.frames().iter().map(|f| f.to_vec()).collect()
}

#[async_trait]
impl Transport for MockTransport {
  async fn send(&mut self, msg: &Message) -> Result<(), ZmqcError> {
    self.handle.calls.fetch_add(1, Ordering::SeqCst);
    self.handle.send_attempts.fetch_add(1, Ordering::SeqCst);
    if let Some(reason) = &self.fail_sends_with {
      return Err(ZmqcError::transport(Direction::Send, self.describe(), reason));
    }
    if self.would_block > 0 {
      self.would_block -= 1;
      return Err(ZmqcError::WouldBlock);
    }
    self.record(Op::Send(frames_to_vecs(msg)));

    if let Some((count, controller)) = &self.interrupt_after_sends {
      if self.successful_sends() == *count {
        controller.interrupt();
      }
    }
    Ok(())
  }

  async fn recv(&mut self) -> Result<Message, ZmqcError> {
    self.handle.calls.fetch_add(1, Ordering::SeqCst);
    match self.incoming.pop_front() {
      Some(msg) => {
        self.record(Op::Recv(frames_to_vecs(&msg)));
        Ok(msg)
      }
      None => std::future::pending().await,
    }
  }

  async fn poll_readable(&mut self, timeout: Duration) -> Result<bool, ZmqcError> {
    self.handle.calls.fetch_add(1, Ordering::SeqCst);
    if !self.incoming.is_empty() {
      return Ok(true);
    }
    tokio::time::sleep(timeout).await;
    Ok(!self.incoming.is_empty())
  }

  async fn close(&mut self) {
    if !self.closed {
      self.closed = true;
      self.handle.closes.fetch_add(1, Ordering::SeqCst);
    }
  }

  async fn abort(&mut self) {
    if !self.closed {
      self.handle.aborts.fetch_add(1, Ordering::SeqCst);
    }
    self.close().await;
  }

  fn describe(&self) -> String {
    "mock://test".to_string()
  }
}

/// True if no two consecutive operations go the same way.
pub fn strictly_alternating(ops: &[Op]) -> bool {
  ops.windows(2).all(|pair| {
    !matches!(
      (&pair[0], &pair[1]),
      (Op::Send(_), Op::Send(_)) | (Op::Recv(_), Op::Recv(_))
    )
  })
}

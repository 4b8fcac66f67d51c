//! The socket capability the pump is written against.
//!
//! The pump never sees the messaging library directly. It only needs four
//! operations (plus a description for error context), so any transport that
//! implements [`Transport`] can stand in for a real socket. The libzmq-backed
//! implementation lives in [`libzmq`].

pub mod libzmq;

use crate::error::ZmqcError;
use crate::message::Message;

use async_trait::async_trait;
use std::time::Duration;

pub use libzmq::{Behavior, SocketConfig, ZmqTransport};

/// The narrow set of socket operations used by the pump.
#[async_trait]
pub trait Transport: Send {
  /// Sends all frames of `msg` atomically as one multipart message.
  ///
  /// Must not block: when the peer queue is full the call returns
  /// `ZmqcError::WouldBlock` and nothing has been sent, so the caller can
  /// retry with the same message. Any other error is fatal for the run.
  async fn send(&mut self, msg: &Message) -> Result<(), ZmqcError>;

  /// Waits until one multipart message is available and returns all of its frames.
  ///
  /// Must be cancel-safe: dropping the future before it completes must not
  /// consume a message.
  async fn recv(&mut self) -> Result<Message, ZmqcError>;

  /// Waits up to `timeout` for the socket to become readable.
  /// Returns `Ok(false)` if the timeout elapsed first.
  async fn poll_readable(&mut self, timeout: Duration) -> Result<bool, ZmqcError>;

  /// Releases the socket. Calling it more than once is a no-op.
  async fn close(&mut self);

  /// Releases the socket without waiting for queued outgoing messages.
  async fn abort(&mut self) {
    self.close().await
  }

  /// Human-readable endpoint list, used as context in transport errors and logs.
  fn describe(&self) -> String;
}

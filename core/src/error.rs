use std::fmt;
use std::io;
use thiserror::Error;

/// Which way a message was travelling when a transport operation failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
  /// stdin -> socket
  Send,
  /// socket -> stdout
  Receive,
}

impl fmt::Display for Direction {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Direction::Send => f.write_str("send"),
      Direction::Receive => f.write_str("receive"),
    }
  }
}

#[derive(Error, Debug)]
#[non_exhaustive] // Allows adding more variants later without breaking change
pub enum ZmqcError {
  // --- Configuration Errors (reported before any socket I/O) ---
  #[error("Invalid configuration: {0}")]
  Configuration(String),

  // --- Socket Setup Errors ---
  #[error("Socket setup failed for {endpoint}: {source}")]
  Setup {
    endpoint: String, // Endpoint or option name being applied
    #[source]
    source: zmq::Error,
  },

  // --- Transport Errors (fatal for the run) ---
  #[error("Transport {direction} failed on {endpoint}: {reason}")]
  Transport {
    direction: Direction,
    endpoint: String,
    reason: String,
  },

  // --- Backpressure ---
  #[error("Send would block (peer queue full)")]
  WouldBlock, // EAGAIN on a non-blocking send

  // --- Message Invariants ---
  #[error("A message must contain at least one frame")]
  EmptyMessage,

  // --- Standard Stream Errors ---
  #[error("I/O error: {0}")]
  Io(#[from] io::Error), // stdin / stdout failures
}

impl ZmqcError {
  /// True for the backpressure condition the pump retries instead of failing.
  pub fn is_would_block(&self) -> bool {
    matches!(self, ZmqcError::WouldBlock)
  }

  /// True for errors caused by the command line rather than the environment.
  pub fn is_configuration(&self) -> bool {
    matches!(self, ZmqcError::Configuration(_))
  }

  /// Process exit status for a run that ended with this error.
  pub fn exit_code(&self) -> i32 {
    match self {
      ZmqcError::Configuration(_) => crate::bridge::EXIT_USAGE,
      _ => crate::bridge::EXIT_FAILURE,
    }
  }

  pub fn setup(endpoint: impl Into<String>, source: zmq::Error) -> Self {
    ZmqcError::Setup {
      endpoint: endpoint.into(),
      source,
    }
  }

  pub fn transport(direction: Direction, endpoint: impl Into<String>, reason: impl fmt::Display) -> Self {
    ZmqcError::Transport {
      direction,
      endpoint: endpoint.into(),
      reason: reason.to_string(),
    }
  }
}

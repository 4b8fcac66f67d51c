//! Deciding, once and up front, which way data flows for a run.

use crate::error::ZmqcError;
use crate::socket::SocketKind;
use std::fmt;

/// The behaviour the pump runs with for the whole process lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
  /// socket -> stdout
  ReadOnly,
  /// stdin -> socket
  WriteOnly,
  /// send, receive, send, receive ... (REQ and REP)
  RequestReplyAlternating,
  /// The topology/flag combination cannot work. Carries the reason shown to the user.
  Invalid { reason: &'static str },
}

impl Mode {
  /// Turns `Invalid` into a configuration error; valid modes pass through.
  pub fn require_valid(self) -> Result<Mode, ZmqcError> {
    match self {
      Mode::Invalid { reason } => Err(ZmqcError::Configuration(reason.to_string())),
      valid => Ok(valid),
    }
  }
}

impl fmt::Display for Mode {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Mode::ReadOnly => f.write_str("read"),
      Mode::WriteOnly => f.write_str("write"),
      Mode::RequestReplyAlternating => f.write_str("request/reply"),
      Mode::Invalid { reason } => write!(f, "invalid ({})", reason),
    }
  }
}

/// Derives the run mode from the socket topology and the requested read/write flags.
///
/// Pure: the same inputs always give the same `Mode`. REQ and REP ignore the
/// flags because the pattern itself dictates both directions.
pub fn select_mode(kind: SocketKind, read: bool, write: bool) -> Mode {
  match (kind, read, write) {
    (kind, _, _) if kind.is_request_reply() => Mode::RequestReplyAlternating,
    (SocketKind::Pub, true, _) => Mode::Invalid {
      reason: "Cannot read from a PUB socket",
    },
    (SocketKind::Sub, _, true) => Mode::Invalid {
      reason: "Cannot write to a SUB socket",
    },
    (_, true, true) => Mode::Invalid {
      reason: "Choose one of --read or --write, not both",
    },
    (_, false, false) => Mode::Invalid {
      reason: "One of --read or --write is required for this socket type",
    },
    (_, true, false) => Mode::ReadOnly,
    (_, false, true) => Mode::WriteOnly,
  }
}

use crate::error::ZmqcError;
use std::fmt;
use std::str::FromStr;

/// The socket topologies the bridge can drive from standard I/O.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SocketKind {
  /// **PUSH:** Distributes messages to connected PULL peers in a round-robin fashion.
  Push,
  /// **PULL:** Collects messages from connected PUSH peers in a fair-queued manner.
  Pull,
  /// **PUB (Publish):** Distributes messages to all connected subscribers. Never receives.
  Pub,
  /// **SUB (Subscribe):** Receives messages from PUB peers matching its subscriptions. Never sends.
  /// The bridge subscribes to everything unless a `SUBSCRIBE` option is given.
  Sub,
  /// **REQ (Request):** Must `send()` then `recv()`, then `send()` again, and so on.
  Req,
  /// **REP (Reply):** Must `recv()` then `send()`, then `recv()` again, and so on.
  Rep,
  /// **PAIR:** Exclusive connection to exactly one peer; may send and receive.
  Pair,
}

impl SocketKind {
  pub const ALL: [SocketKind; 7] = [
    SocketKind::Push,
    SocketKind::Pull,
    SocketKind::Pub,
    SocketKind::Sub,
    SocketKind::Req,
    SocketKind::Rep,
    SocketKind::Pair,
  ];

  pub fn as_str(self) -> &'static str {
    match self {
      SocketKind::Push => "PUSH",
      SocketKind::Pull => "PULL",
      SocketKind::Pub => "PUB",
      SocketKind::Sub => "SUB",
      SocketKind::Req => "REQ",
      SocketKind::Rep => "REP",
      SocketKind::Pair => "PAIR",
    }
  }

  /// The libzmq socket type to create for this topology.
  pub fn to_zmq(self) -> zmq::SocketType {
    match self {
      SocketKind::Push => zmq::PUSH,
      SocketKind::Pull => zmq::PULL,
      SocketKind::Pub => zmq::PUB,
      SocketKind::Sub => zmq::SUB,
      SocketKind::Req => zmq::REQ,
      SocketKind::Rep => zmq::REP,
      SocketKind::Pair => zmq::PAIR,
    }
  }

  /// Whether the request/reply alternation starts by sending.
  ///
  /// REQ sends the request first; REP has to receive one before it may reply.
  pub fn opens_with_send(self) -> bool {
    !matches!(self, SocketKind::Rep)
  }

  pub fn is_request_reply(self) -> bool {
    matches!(self, SocketKind::Req | SocketKind::Rep)
  }
}

impl fmt::Display for SocketKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for SocketKind {
  type Err = ZmqcError;

  /// Case-insensitive: `push`, `Push` and `PUSH` all parse.
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let upper = s.trim().to_ascii_uppercase();
    SocketKind::ALL
      .into_iter()
      .find(|kind| kind.as_str() == upper)
      .ok_or_else(|| {
        ZmqcError::Configuration(format!(
          "Unsupported socket type '{}': must be one of PUSH, PULL, PUB, SUB, REQ, REP or PAIR",
          s
        ))
      })
  }
}

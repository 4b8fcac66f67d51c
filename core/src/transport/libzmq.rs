// core/src/transport/libzmq.rs

//! `Transport` implementation on top of a libzmq socket.
//!
//! libzmq exposes readiness through `ZMQ_FD`, an edge-triggered descriptor
//! that only tells us "something changed". The real state always comes from
//! `ZMQ_EVENTS`, so every wait re-checks it before and after parking on the fd.

use crate::error::{Direction, ZmqcError};
use crate::message::Message;
use crate::socket::{SocketKind, SocketOption};
use crate::transport::Transport;

use async_trait::async_trait;
use std::fmt;
use std::io;
use std::os::unix::io::{AsRawFd, RawFd};
use std::time::Duration;
use tokio::io::unix::AsyncFd;
use tokio::io::Interest;

/// Default linger applied when the socket is closed.
pub const DEFAULT_LINGER: Duration = Duration::from_millis(1000);

/// Whether the socket binds to its addresses or connects to them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behavior {
  Bind,
  Connect,
}

impl fmt::Display for Behavior {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Behavior::Bind => f.write_str("bind"),
      Behavior::Connect => f.write_str("connect"),
    }
  }
}

/// Everything needed to create and attach the single socket of a run.
#[derive(Debug, Clone)]
pub struct SocketConfig {
  pub kind: SocketKind,
  pub behavior: Behavior,
  pub endpoints: Vec<String>,
  /// Applied in order, before any bind/connect.
  pub options: Vec<SocketOption>,
  /// Linger set on the socket when it is closed. An explicit `LINGER` option takes precedence.
  pub linger: Duration,
}

impl SocketConfig {
  pub fn new(kind: SocketKind, behavior: Behavior, endpoints: Vec<String>) -> Self {
    Self {
      kind,
      behavior,
      endpoints,
      options: Vec::new(),
      linger: DEFAULT_LINGER,
    }
  }

  pub fn with_options(mut self, options: Vec<SocketOption>) -> Self {
    self.options = options;
    self
  }

  pub fn with_linger(mut self, linger: Duration) -> Self {
    self.linger = linger;
    self
  }

  fn endpoints_label(&self) -> String {
    self.endpoints.join(", ")
  }

  /// Milliseconds of linger to apply at close; the last `LINGER` option wins.
  fn close_linger_ms(&self) -> i32 {
    self
      .options
      .iter()
      .rev()
      .find_map(|option| match option {
        SocketOption::Linger(ms) => Some(*ms),
        _ => None,
      })
      .unwrap_or_else(|| i32::try_from(self.linger.as_millis()).unwrap_or(i32::MAX))
  }
}

// AsyncFd needs an AsRawFd owner. The descriptor itself belongs to libzmq,
// so this wrapper must never close it.
#[derive(Debug)]
struct ZmqFd(RawFd);

impl AsRawFd for ZmqFd {
  fn as_raw_fd(&self) -> RawFd {
    self.0
  }
}

struct OpenSocket {
  // Declared first so it is deregistered before the socket closes the fd.
  readiness: AsyncFd<ZmqFd>,
  socket: zmq::Socket,
}

/// A configured libzmq socket driven asynchronously through its `ZMQ_FD`.
pub struct ZmqTransport {
  inner: Option<OpenSocket>,
  kind: SocketKind,
  behavior: Behavior,
  endpoints: String,
  linger_ms: i32,
}

impl fmt::Debug for ZmqTransport {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ZmqTransport")
      .field("kind", &self.kind)
      .field("behavior", &self.behavior)
      .field("endpoints", &self.endpoints)
      .field("open", &self.inner.is_some())
      .finish()
  }
}

impl ZmqTransport {
  /// Creates the socket, applies options and binds/connects every endpoint.
  ///
  /// SUB sockets with no explicit `SUBSCRIBE` option are subscribed to
  /// everything, otherwise they would silently receive nothing.
  /// Must be called from within a tokio runtime (the fd is registered with its reactor).
  pub fn open(config: &SocketConfig) -> Result<Self, ZmqcError> {
    if config.endpoints.is_empty() {
      return Err(ZmqcError::Configuration(
        "At least one address is required".to_string(),
      ));
    }

    let context = zmq::Context::new();
    let socket = context
      .socket(config.kind.to_zmq())
      .map_err(|e| ZmqcError::setup(config.kind.as_str(), e))?;

    for option in &config.options {
      tracing::debug!(option = %option, "Applying socket option");
      option
        .apply(&socket)
        .map_err(|e| ZmqcError::setup(option.name(), e))?;
    }

    if config.kind == SocketKind::Sub && !config.options.iter().any(SocketOption::is_subscribe) {
      tracing::debug!("No SUBSCRIBE option given; subscribing to all messages");
      socket
        .set_subscribe(b"")
        .map_err(|e| ZmqcError::setup("SUBSCRIBE", e))?;
    }

    for endpoint in &config.endpoints {
      let result = match config.behavior {
        Behavior::Bind => socket.bind(endpoint),
        Behavior::Connect => socket.connect(endpoint),
      };
      result.map_err(|e| ZmqcError::setup(endpoint.as_str(), e))?;
      tracing::info!(socket_type = %config.kind, behavior = %config.behavior, %endpoint, "Socket attached");
    }

    let fd = socket.get_fd().map_err(|e| ZmqcError::setup("ZMQ_FD", e))?;
    // SAFETY: the fd stays open until `socket` is dropped, and `readiness` is
    // always dropped first (see `OpenSocket` field order and `close`).
    let readiness =
      unsafe { AsyncFd::register_with_interest(ZmqFd(fd), Interest::READABLE) }.map_err(io::Error::from)?;

    Ok(Self {
      inner: Some(OpenSocket { readiness, socket }),
      kind: config.kind,
      behavior: config.behavior,
      endpoints: config.endpoints_label(),
      linger_ms: config.close_linger_ms(),
    })
  }

  pub fn kind(&self) -> SocketKind {
    self.kind
  }

  /// The endpoint libzmq resolved for the most recent bind/connect
  /// (e.g. the concrete port chosen for `tcp://127.0.0.1:*`).
  pub fn last_endpoint(&self) -> Option<String> {
    let open = self.inner.as_ref()?;
    match open.socket.get_last_endpoint() {
      Ok(Ok(endpoint)) => Some(endpoint),
      _ => None,
    }
  }
}

fn closed(direction: Direction, endpoints: &str) -> ZmqcError {
  ZmqcError::transport(direction, endpoints, "socket is closed")
}

// zmq::Socket is Send but not Sync, so async code only ever holds it through `&mut`.
impl OpenSocket {
  fn has_events(&self, wanted: zmq::PollEvents) -> io::Result<bool> {
    let events = self.socket.get_events().map_err(io::Error::from)?;
    Ok(events.contains(wanted))
  }

  /// Parks until `ZMQ_EVENTS` reports `wanted`. Cancel-safe: nothing is consumed.
  async fn wait_for(&mut self, wanted: zmq::PollEvents) -> io::Result<()> {
    loop {
      if self.has_events(wanted)? {
        return Ok(());
      }
      let mut guard = self.readiness.readable().await?;
      // Reading ZMQ_EVENTS resets the edge, so check again before clearing.
      if self.has_events(wanted)? {
        return Ok(());
      }
      guard.clear_ready();
    }
  }
}

#[async_trait]
impl Transport for ZmqTransport {
  async fn send(&mut self, msg: &Message) -> Result<(), ZmqcError> {
    let endpoints = &self.endpoints;
    let open = self.inner.as_mut().ok_or_else(|| closed(Direction::Send, endpoints))?;
    let frames = msg.frames().iter().map(|frame| &frame[..]);
    match open.socket.send_multipart(frames, zmq::DONTWAIT) {
      Ok(()) => Ok(()),
      Err(zmq::Error::EAGAIN) => Err(ZmqcError::WouldBlock),
      Err(e) => Err(ZmqcError::transport(Direction::Send, endpoints.as_str(), e)),
    }
  }

  async fn recv(&mut self) -> Result<Message, ZmqcError> {
    let endpoints = &self.endpoints;
    let open = self.inner.as_mut().ok_or_else(|| closed(Direction::Receive, endpoints))?;
    loop {
      match open.socket.recv_multipart(zmq::DONTWAIT) {
        Ok(frames) => return Message::from_frames(frames),
        Err(zmq::Error::EAGAIN) => {}
        Err(e) => {
          return Err(ZmqcError::transport(Direction::Receive, endpoints.as_str(), e));
        }
      }
      open
        .wait_for(zmq::POLLIN)
        .await
        .map_err(|e| ZmqcError::transport(Direction::Receive, endpoints.as_str(), e))?;
    }
  }

  async fn poll_readable(&mut self, timeout: Duration) -> Result<bool, ZmqcError> {
    let endpoints = &self.endpoints;
    let open = self.inner.as_mut().ok_or_else(|| closed(Direction::Receive, endpoints))?;
    match tokio::time::timeout(timeout, open.wait_for(zmq::POLLIN)).await {
      Ok(Ok(())) => Ok(true),
      Ok(Err(e)) => Err(ZmqcError::transport(Direction::Receive, endpoints.as_str(), e)),
      Err(_elapsed) => Ok(false),
    }
  }

  async fn close(&mut self) {
    let Some(open) = self.inner.take() else {
      return;
    };
    let OpenSocket { readiness, socket } = open;
    drop(readiness);

    let linger_ms = self.linger_ms;
    if let Err(e) = socket.set_linger(linger_ms) {
      tracing::warn!(error = %e, "Failed to set linger before close");
    }
    // Dropping the last socket terminates the context, which blocks for up to the linger period.
    let endpoints = self.endpoints.clone();
    match tokio::task::spawn_blocking(move || drop(socket)).await {
      Ok(()) => tracing::debug!(%endpoints, linger_ms, "Socket closed"),
      Err(e) => tracing::warn!(%endpoints, error = %e, "Socket close task failed"),
    }
  }

  async fn abort(&mut self) {
    self.linger_ms = 0;
    self.close().await;
  }

  fn describe(&self) -> String {
    format!("{} {} {}", self.kind, self.behavior, self.endpoints)
  }
}

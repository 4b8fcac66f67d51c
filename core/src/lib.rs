// src/lib.rs

//! zmqc - bridge standard input/output to a ZeroMQ socket.
//!
//! Records read from stdin become messages on the socket, messages received
//! from the socket are written to stdout, and request/reply sockets alternate
//! between the two. The library holds the whole engine; the `zmqc` binary
//! only parses arguments and wires signals.

/// Runs a pump under the shutdown controller and reports the outcome.
pub mod bridge;
/// Optional limit on the number of messages a run processes.
pub mod budget;
/// Delimiter-based framing of stdin and stdout.
pub mod codec;
/// Custom error types used throughout the library.
pub mod error;
/// Multipart message representation.
pub mod message;
/// Chooses the data direction from socket type and flags.
pub mod mode;
/// The event loop moving data between standard I/O and the socket.
pub mod pump;
/// Run-state machine, interrupt escalation and signal handling.
pub mod shutdown;
/// Socket types and socket option parsing.
pub mod socket;
/// The `Transport` capability and its libzmq implementation.
pub mod transport;

// Re-export core types for convenience (e.g. `zmqc::ZmqcError`, `zmqc::Message`).
pub use bridge::{run_bridge, BridgeConfig, RunOutcome};
pub use budget::MessageBudget;
pub use codec::{DelimitedCodec, Delimiter};
pub use error::{Direction, ZmqcError};
pub use message::Message;
pub use mode::{select_mode, Mode};
pub use pump::{Pump, PumpConfig, PumpStats, Turn};
pub use shutdown::{DrainReason, RunState, ShutdownController};
pub use socket::{SocketKind, SocketOption};
pub use transport::{Behavior, SocketConfig, Transport, ZmqTransport};

// --- Top-Level Library Information Functions ---

/// Returns the library version as a tuple (major, minor, patch).
///
/// # Examples
///
/// ```
/// let (major, minor, _patch) = zmqc::version();
/// assert_eq!((major, minor), (0, 1));
/// ```
pub fn version() -> (u32, u32, u32) {
  (VERSION_MAJOR, VERSION_MINOR, VERSION_PATCH)
}

/// Version of the linked libzmq as (major, minor, patch).
pub fn libzmq_version() -> (i32, i32, i32) {
  zmq::version()
}

const VERSION_MAJOR: u32 = 0;
const VERSION_MINOR: u32 = 1;
const VERSION_PATCH: u32 = 0;

// src/socket/mod.rs

/// Parsing and application of `NAME=VALUE` socket options.
pub mod options;
/// Defines the `SocketKind` topology enum.
pub mod types;

pub use options::SocketOption;
pub use types::SocketKind;

//! Message-related types (`Message`).

mod msg;

pub use msg::Message;

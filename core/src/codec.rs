use crate::error::ZmqcError;
use crate::message::Message;
use bytes::{Buf, BufMut, BytesMut};
use std::fmt;
use tokio_util::codec::{Decoder, Encoder};

/// Byte that separates records on stdin and messages on stdout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Delimiter {
  /// `\n`, the default.
  #[default]
  Newline,
  /// `\0`, for payloads that may themselves contain newlines (pairs with `xargs -0`).
  Null,
}

impl Delimiter {
  pub fn byte(self) -> u8 {
    match self {
      Delimiter::Newline => b'\n',
      Delimiter::Null => b'\0',
    }
  }
}

impl fmt::Display for Delimiter {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Delimiter::Newline => f.write_str("newline"),
      Delimiter::Null => f.write_str("null"),
    }
  }
}

/// Codec for delimiter-framed standard I/O.
///
/// Decoding turns each delimited record into a single-frame [`Message`].
/// Encoding writes every frame of a message joined by the delimiter and
/// terminated by one more delimiter, so `["x", "y"]` becomes `x\ny\n`.
#[derive(Debug, Default)]
pub struct DelimitedCodec {
  delimiter: Delimiter,
  // Index into the buffer up to which we have already searched for the
  // delimiter. Avoids rescanning a long partial record on every read.
  next_index: usize,
}

impl DelimitedCodec {
  pub fn new(delimiter: Delimiter) -> Self {
    Self {
      delimiter,
      next_index: 0,
    }
  }

  pub fn delimiter(&self) -> Delimiter {
    self.delimiter
  }
}

// --- Decoder Implementation (BytesMut -> Message) ---
impl Decoder for DelimitedCodec {
  type Item = Message;
  type Error = ZmqcError;

  fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
    let delimiter = self.delimiter.byte();
    let search_from = self.next_index.min(src.len());

    match src[search_from..].iter().position(|b| *b == delimiter) {
      Some(offset) => {
        let record_len = search_from + offset;
        self.next_index = 0;
        let record = src.split_to(record_len).freeze();
        src.advance(1); // Drop the delimiter itself
        Ok(Some(Message::single(record)))
      }
      None => {
        // Need more data; remember how far we looked.
        self.next_index = src.len();
        Ok(None)
      }
    }
  }

  fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
    if let Some(message) = self.decode(src)? {
      return Ok(Some(message));
    }
    if src.is_empty() {
      return Ok(None); // Clean end of input
    }

    // Input ended without a final delimiter: the remainder is the last record.
    self.next_index = 0;
    let trailing = src.split().freeze();
    tracing::debug!(
      len = trailing.len(),
      delimiter = %self.delimiter,
      "Input ended without a trailing delimiter; treating remainder as final record"
    );
    Ok(Some(Message::single(trailing)))
  }
}

// --- Encoder Implementation (&Message -> BytesMut) ---
impl<'a> Encoder<&'a Message> for DelimitedCodec {
  type Error = ZmqcError;

  fn encode(&mut self, item: &'a Message, dst: &mut BytesMut) -> Result<(), Self::Error> {
    let delimiter = self.delimiter.byte();
    // Payload plus one delimiter per frame (joins + terminator).
    dst.reserve(item.size() + item.len());
    for frame in item.frames() {
      dst.put_slice(frame);
      dst.put_u8(delimiter);
    }
    Ok(())
  }
}

use crate::error::ZmqcError;
use bytes::Bytes;
use std::fmt;

/// One logical multipart message: an ordered, non-empty list of frames.
///
/// Frames are `Bytes`, so cloning a message or handing a frame to the socket
/// is cheap (reference counted). A `Message` is never mutated once built.
#[derive(Clone, PartialEq, Eq)]
pub struct Message {
  // Invariant: never empty.
  frames: Vec<Bytes>,
}

impl Message {
  /// Creates a single-frame message. This is what one stdin record becomes.
  pub fn single(frame: impl Into<Bytes>) -> Self {
    Self {
      frames: vec![frame.into()],
    }
  }

  /// Creates a message from the frames of a multipart read, in order.
  ///
  /// Returns `ZmqcError::EmptyMessage` for an empty list: a zero-frame
  /// message has no meaning on either side of the bridge.
  pub fn from_frames<I, F>(frames: I) -> Result<Self, ZmqcError>
  where
    I: IntoIterator<Item = F>,
    F: Into<Bytes>,
  {
    let frames: Vec<Bytes> = frames.into_iter().map(Into::into).collect();
    if frames.is_empty() {
      return Err(ZmqcError::EmptyMessage);
    }
    Ok(Self { frames })
  }

  /// The frames in transmission order.
  pub fn frames(&self) -> &[Bytes] {
    &self.frames
  }

  /// Number of frames; always at least one.
  pub fn len(&self) -> usize {
    self.frames.len()
  }

  /// Always `false`; present for API symmetry with `len`.
  pub fn is_empty(&self) -> bool {
    false
  }

  /// Total payload size across all frames, in bytes.
  pub fn size(&self) -> usize {
    self.frames.iter().map(Bytes::len).sum()
  }
}

impl fmt::Debug for Message {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Message")
      .field("frames", &self.frames.len())
      .field("size", &self.size()) // Avoid printing large data
      .finish()
  }
}

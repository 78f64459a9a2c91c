/// Whether a [`TextBuffer`] is collecting chunks or has just emitted a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferState {
  /// Chunks of the current text node are being collected.
  Accumulating,
  /// The last chunk arrived and the node was emitted; the next chunk starts a new node.
  Flushed,
}

/// Reassembles a text node that the streaming parser delivers in pieces.
///
/// One buffer serves every node of its kind in a document, so it resets itself when a chunk
/// arrives after a flush.
#[derive(Debug, Default)]
pub struct TextBuffer {
  buffer: String,
  is_flushed: bool,
}

impl TextBuffer {
  /// Create an empty buffer.
  pub fn new() -> Self {
    Self::default()
  }

  /// Append a chunk. Returns the whole node once `last` is set.
  pub fn push(&mut self, chunk: &str, last: bool) -> Option<String> {
    if self.is_flushed {
      self.buffer.clear();
      self.is_flushed = false;
    }
    self.buffer.push_str(chunk);

    if !last {
      return None;
    }
    self.is_flushed = true;
    Some(std::mem::take(&mut self.buffer))
  }

  /// Current state of the buffer.
  pub fn state(&self) -> BufferState {
    if self.is_flushed {
      BufferState::Flushed
    } else {
      BufferState::Accumulating
    }
  }

  /// Bytes collected for the node in progress.
  pub fn pending(&self) -> &str {
    if self.is_flushed { "" } else { &self.buffer }
  }
}

//! Record types flowing through the consumer pipeline.
//!
//! A [`RawRecord`] is what an event source hands the driver loop: opaque
//! payload bytes plus a position marker used only for diagnostics. The
//! decoder turns the payload into an [`AuthorMessage`].

/// Author key used when a record carries no author.
pub const UNKNOWN_AUTHOR: &str = "unknown";

/// One undecoded record pulled from an event source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    /// Monotonically increasing position within the source (offset, line
    /// number, delivery sequence). Logged, never aggregated.
    pub position: u64,
    /// The serialized record.
    pub payload: Vec<u8>,
}

impl RawRecord {
    /// Create a record at `position` holding `payload`.
    pub fn new(position: u64, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            position,
            payload: payload.into(),
        }
    }

    /// The payload as text, with invalid UTF-8 replaced, for log output.
    pub fn payload_lossy(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.payload)
    }
}

/// A successfully decoded event: who wrote it and what they wrote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorMessage {
    /// Author key. [`UNKNOWN_AUTHOR`] when the record had none.
    pub author: String,
    /// Message body. Empty when the record had none.
    pub message: String,
    /// Fields the decoder had to substitute defaults for.
    pub defaulted: DefaultedFields,
}

impl AuthorMessage {
    /// Create a message with both fields present.
    pub fn new(author: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            author: author.into(),
            message: message.into(),
            defaulted: DefaultedFields::default(),
        }
    }
}

/// Which fields of a decoded record were missing and replaced by defaults.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DefaultedFields {
    /// The author was absent or null.
    pub author: bool,
    /// The message was absent or null.
    pub message: bool,
}

impl DefaultedFields {
    /// True when nothing was defaulted.
    pub const fn is_none(&self) -> bool {
        !self.author && !self.message
    }
}

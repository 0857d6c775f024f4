//! Payload decoding.
//!
//! The [`Decoder`] trait turns raw payload bytes into an [`AuthorMessage`].
//! [`JsonDecoder`] is the production implementation: it expects a JSON
//! object with optional `author` and `message` fields.

use serde_json::Value;

use crate::error::DecodeError;
use crate::event::{AuthorMessage, DefaultedFields, UNKNOWN_AUTHOR};

/// Converts raw payload bytes into a decoded event.
///
/// A decode failure must be distinguishable from a record that decoded fine
/// but carried empty fields: the former is an error, the latter an
/// [`AuthorMessage`] with defaults filled in.
pub trait Decoder {
    /// Decode one payload.
    fn decode(&self, payload: &[u8]) -> Result<AuthorMessage, DecodeError>;
}

/// Decodes JSON objects of the form `{"author": "...", "message": "..."}`.
///
/// Missing or `null` fields are defaulted (`"unknown"` for the author, the
/// empty string for the message). Non-string values are kept as their
/// compact JSON text. Other keys are ignored.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonDecoder;

impl JsonDecoder {
    /// Create a JSON decoder.
    pub const fn new() -> Self {
        Self
    }
}

impl Decoder for JsonDecoder {
    fn decode(&self, payload: &[u8]) -> Result<AuthorMessage, DecodeError> {
        let value: Value = serde_json::from_slice(payload)?;
        let fields = match value {
            Value::Object(fields) => fields,
            other => {
                return Err(DecodeError::NotAnObject {
                    found: json_type_name(&other),
                });
            }
        };

        let author = field_text(fields.get("author"));
        let message = field_text(fields.get("message"));
        let defaulted = DefaultedFields {
            author: author.is_none(),
            message: message.is_none(),
        };

        Ok(AuthorMessage {
            author: author.unwrap_or_else(|| UNKNOWN_AUTHOR.to_owned()),
            message: message.unwrap_or_default(),
            defaulted,
        })
    }
}

/// Text of an optional field; `None` when absent or null.
fn field_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Null => None,
        Value::String(text) => Some(text.clone()),
        other => Some(other.to_string()),
    }
}

const fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

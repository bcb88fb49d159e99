//! JSON wire codec. One message per line on text transports.

use crate::error::ProtocolError;
use crate::events::{Command, Event};

/// Decode a caller message.
///
/// # Errors
/// Returns [`ProtocolError::Malformed`] for invalid JSON, unknown `type`
/// values, or payloads of the wrong shape.
pub fn decode_command(text: &str) -> Result<Command, ProtocolError> {
    Ok(serde_json::from_str(text.trim())?)
}

/// Encode a caller message.
///
/// # Errors
/// Serialization of these types does not fail in practice; the error is
/// surfaced rather than unwrapped.
pub fn encode_command(command: &Command) -> Result<String, ProtocolError> {
    Ok(serde_json::to_string(command)?)
}

/// Decode an engine message.
///
/// # Errors
/// Returns [`ProtocolError::Malformed`] if `text` is not a known event.
pub fn decode_event(text: &str) -> Result<Event, ProtocolError> {
    Ok(serde_json::from_str(text.trim())?)
}

/// Encode an engine message as a single line.
///
/// # Errors
/// See [`encode_command`].
pub fn encode_event(event: &Event) -> Result<String, ProtocolError> {
    Ok(serde_json::to_string(event)?)
}

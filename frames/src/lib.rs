//! Shared wire model for the realtime board transport.
//!
//! This crate owns the representation used by both the server and `client`:
//! board/chat/presence records, HTTP request bodies, and the closed event
//! enums carried over websocket text frames.
//!
//! DESIGN
//! ======
//! Every websocket message is one JSON frame `{"event": <name>, "data": {...}}`.
//! Decoding first reads the raw envelope and checks the event name against
//! the closed set for that direction, so an unknown event fails fast with
//! [`CodecError::UnknownEvent`] instead of being silently ignored. Only then
//! is the payload parsed into the typed variant.

pub mod api;
pub mod event;
pub mod model;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

pub use event::{ClientEvent, ServerEvent};
pub use model::{Actor, Card, CardStatus, Column, Message, MoveIntent, Position, PresenceMember};

/// Error returned by the frame codec.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The text is not a JSON object with an `event` string.
    #[error("malformed frame: {0}")]
    Malformed(String),
    /// The event name is not part of the protocol for this direction.
    #[error("unknown event: {0}")]
    UnknownEvent(String),
    /// The event is known but its `data` does not match the expected shape.
    #[error("invalid payload for {event}: {source}")]
    Payload {
        event: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to encode frame: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Grepable error code for structured error frames and logs.
pub trait ErrorCode: std::fmt::Display {
    fn error_code(&self) -> &'static str;
}

impl ErrorCode for CodecError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Malformed(_) | Self::Payload { .. } => "E_INVALID_FRAME",
            Self::UnknownEvent(_) => "E_UNKNOWN_EVENT",
            Self::Encode(_) => "E_ENCODE",
        }
    }
}

/// Decode an inbound frame sent by a client.
///
/// # Errors
///
/// Returns [`CodecError::Malformed`] for non-frame text,
/// [`CodecError::UnknownEvent`] for names outside [`ClientEvent::NAMES`], and
/// [`CodecError::Payload`] when the data does not fit the event.
pub fn decode_client_event(text: &str) -> Result<ClientEvent, CodecError> {
    decode(text, ClientEvent::NAMES)
}

/// Decode a frame broadcast by the server.
///
/// # Errors
///
/// Same failure modes as [`decode_client_event`], against [`ServerEvent::NAMES`].
pub fn decode_server_event(text: &str) -> Result<ServerEvent, CodecError> {
    decode(text, ServerEvent::NAMES)
}

/// Encode an event into a JSON text frame.
///
/// # Errors
///
/// Returns [`CodecError::Encode`] if serialization fails.
pub fn encode_event<E: Serialize>(event: &E) -> Result<String, CodecError> {
    Ok(serde_json::to_string(event)?)
}

fn decode<E: DeserializeOwned>(text: &str, known: &[&str]) -> Result<E, CodecError> {
    let value: Value = serde_json::from_str(text).map_err(|e| CodecError::Malformed(e.to_string()))?;
    let Some(name) = value.get("event").and_then(Value::as_str) else {
        return Err(CodecError::Malformed("missing event name".into()));
    };
    if !known.contains(&name) {
        return Err(CodecError::UnknownEvent(name.to_owned()));
    }
    let event = name.to_owned();
    serde_json::from_value(value).map_err(|source| CodecError::Payload { event, source })
}

#[cfg(test)]
#[path = "lib_test.rs"]
mod tests;

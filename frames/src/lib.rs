//! Shared wire model for the lobby websocket protocol.
//!
//! This crate owns the wire representation used by `server`, `client` and
//! `cli`. Every message is a [`Frame`]: a named event plus a flat JSON
//! payload. Binary websocket messages carry the protobuf encoding; text
//! messages carry the JSON encoding. Typed views over frames live in
//! [`events`], the mirrored lobby records in [`lobby`] and the per-recipient
//! game records in [`game`].
//!
//! DESIGN
//! ======
//! There is no request/response pairing on this wire. Clients fire events
//! and the server pushes events back; the event name alone decides how the
//! payload is read.

pub mod events;
pub mod game;
pub mod lobby;

use prost::Message;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub use events::{ClientEvent, DEFAULT_MAX_PLAYERS, EventError, ServerEvent};
pub use game::{CardColor, GameView, Hand, PlayerColor, Seat, Ticket, Track};
pub use lobby::{Lobby, LobbySummary, Player};

/// Error returned by the frame decoders.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The raw bytes could not be decoded as a protobuf `WireFrame`.
    #[error("failed to decode protobuf frame: {0}")]
    Decode(#[from] prost::DecodeError),
    /// The text could not be parsed as a JSON frame.
    #[error("failed to decode json frame: {0}")]
    Json(#[from] serde_json::Error),
    /// The frame carried no event name.
    #[error("frame has no event name")]
    MissingEvent,
}

/// A single message on the realtime wire protocol.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    /// Event name, e.g. `"join_lobby"` or `"player_left"`.
    pub event: String,
    /// Event payload. Always an object on the wire; empty when the event has no fields.
    #[serde(default = "empty_object")]
    pub data: Value,
}

impl Frame {
    /// Build a frame from an event name and payload.
    pub fn new(event: impl Into<String>, data: Value) -> Self {
        Self { event: event.into(), data }
    }

    /// Build a frame whose payload is an empty object.
    pub fn bare(event: impl Into<String>) -> Self {
        Self::new(event, empty_object())
    }
}

fn empty_object() -> Value {
    Value::Object(Map::new())
}

/// Encode a frame into protobuf bytes.
#[must_use]
pub fn encode_frame(frame: &Frame) -> Vec<u8> {
    let wire = WireFrame {
        event: frame.event.clone(),
        data: Some(json_to_proto_value(&frame.data)),
    };

    let mut out = Vec::with_capacity(wire.encoded_len());
    // Encoding into a growable Vec cannot run out of buffer space.
    wire.encode(&mut out).unwrap_or_default();
    out
}

/// Decode protobuf bytes into a frame.
///
/// # Errors
///
/// Returns [`CodecError::Decode`] for malformed bytes and
/// [`CodecError::MissingEvent`] when the event name is empty.
pub fn decode_frame(bytes: &[u8]) -> Result<Frame, CodecError> {
    let wire = WireFrame::decode(bytes)?;
    if wire.event.is_empty() {
        return Err(CodecError::MissingEvent);
    }
    Ok(Frame {
        event: wire.event,
        data: wire.data.map_or_else(empty_object, |v| proto_to_json_value(&v)),
    })
}

/// Encode a frame as a JSON text message.
#[must_use]
pub fn encode_json(frame: &Frame) -> String {
    serde_json::to_string(frame).unwrap_or_default()
}

/// Decode a JSON text message into a frame.
///
/// # Errors
///
/// Returns [`CodecError::Json`] for malformed text and
/// [`CodecError::MissingEvent`] when the event name is empty.
pub fn decode_json(text: &str) -> Result<Frame, CodecError> {
    let frame: Frame = serde_json::from_str(text)?;
    if frame.event.is_empty() {
        return Err(CodecError::MissingEvent);
    }
    Ok(frame)
}

fn json_to_proto_value(value: &Value) -> prost_types::Value {
    use prost_types::value::Kind;

    let kind = match value {
        Value::Null => Kind::NullValue(prost_types::NullValue::NullValue as i32),
        Value::Bool(v) => Kind::BoolValue(*v),
        Value::Number(v) => Kind::NumberValue(v.as_f64().unwrap_or(0.0)),
        Value::String(v) => Kind::StringValue(v.clone()),
        Value::Array(items) => Kind::ListValue(prost_types::ListValue {
            values: items.iter().map(json_to_proto_value).collect(),
        }),
        Value::Object(fields) => Kind::StructValue(prost_types::Struct {
            fields: fields
                .iter()
                .map(|(k, v)| (k.clone(), json_to_proto_value(v)))
                .collect(),
        }),
    };

    prost_types::Value { kind: Some(kind) }
}

fn proto_to_json_value(value: &prost_types::Value) -> Value {
    use prost_types::value::Kind;

    let Some(kind) = &value.kind else {
        return Value::Null;
    };

    match kind {
        Kind::NullValue(_) => Value::Null,
        Kind::NumberValue(v) => serde_json::Number::from_f64(*v).map_or(Value::Null, Value::Number),
        Kind::StringValue(v) => Value::String(v.clone()),
        Kind::BoolValue(v) => Value::Bool(*v),
        Kind::StructValue(s) => Value::Object(
            s.fields
                .iter()
                .map(|(k, v)| (k.clone(), proto_to_json_value(v)))
                .collect(),
        ),
        Kind::ListValue(list) => Value::Array(list.values.iter().map(proto_to_json_value).collect()),
    }
}

#[derive(Clone, PartialEq, Message)]
struct WireFrame {
    #[prost(string, tag = "1")]
    event: String,
    #[prost(message, optional, tag = "2")]
    data: Option<prost_types::Value>,
}

#[cfg(test)]
#[path = "lib_test.rs"]
mod tests;

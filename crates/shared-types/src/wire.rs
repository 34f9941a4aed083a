//! Delegate wire protocol.
//!
//! Messages cross the upgraded delegate connection as JSON text:
//!
//! - Downstream (coordinator → delegate): `{"type": ..., "id": ..., ...payload}`
//! - Upstream (delegate → coordinator): `{"action": "ack" | "commit", "eventId": ...}`
//!
//! Upstream parsing is explicit about *why* a message is rejected: a frame
//! that is not JSON at all and a well-formed frame with an unrecognized
//! action are different failures, even though both are discarded.

use crate::events::{Event, EventId};
use serde::{Deserialize, Serialize};

/// Acknowledgment actions a delegate may send for an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AckAction {
    /// The delegate has received the event.
    Ack,
    /// The delegate has durably processed the event.
    Commit,
}

/// A parsed upstream acknowledgment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Acknowledgment {
    pub event_id: EventId,
    pub action: AckAction,
}

/// Why an upstream delegate message was rejected.
#[derive(Debug, thiserror::Error)]
pub enum AckParseError {
    /// The message body was not JSON.
    #[error("malformed JSON: {0}")]
    Malformed(#[from] serde_json::Error),
    /// Valid JSON without an `action` field.
    #[error("missing action field")]
    MissingAction,
    /// Valid JSON whose `action` is neither `ack` nor `commit`.
    #[error("unrecognized action: {0}")]
    UnrecognizedAction(String),
    /// Valid JSON without any field identifying the event.
    #[error("missing event id")]
    MissingEventId,
}

/// Encode an event as a downstream frame.
///
/// Payload object fields are flattened beside `type` and `id`; a non-object
/// payload is carried under a `payload` key instead. Payload keys never
/// shadow `type` or `id`.
pub fn encode_event_frame(event: &Event) -> String {
    let mut frame = serde_json::Map::new();
    if let serde_json::Value::Object(fields) = &event.payload {
        for (key, value) in fields {
            if key != "type" && key != "id" {
                frame.insert(key.clone(), value.clone());
            }
        }
    } else if !event.payload.is_null() {
        frame.insert("payload".to_string(), event.payload.clone());
    }
    frame.insert(
        "type".to_string(),
        serde_json::Value::String(event.event_type.clone()),
    );
    frame.insert(
        "id".to_string(),
        serde_json::Value::String(event.id.as_str().to_string()),
    );
    serde_json::Value::Object(frame).to_string()
}

/// Parse an upstream delegate message into an [`Acknowledgment`].
///
/// The documented field is `eventId`; a bare `id` is accepted as an alias.
pub fn parse_ack(text: &str) -> Result<Acknowledgment, AckParseError> {
    let value: serde_json::Value = serde_json::from_str(text)?;

    let action = match value.get("action") {
        Some(serde_json::Value::String(action)) => match action.as_str() {
            "ack" => AckAction::Ack,
            "commit" => AckAction::Commit,
            other => return Err(AckParseError::UnrecognizedAction(other.to_string())),
        },
        Some(other) => return Err(AckParseError::UnrecognizedAction(other.to_string())),
        None => return Err(AckParseError::MissingAction),
    };

    let event_id = value
        .get("eventId")
        .or_else(|| value.get("id"))
        .and_then(|v| v.as_str())
        .ok_or(AckParseError::MissingEventId)?;

    Ok(Acknowledgment {
        event_id: EventId::new(event_id),
        action,
    })
}

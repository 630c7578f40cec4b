//! Hub WebSocket wire protocol.
//!
//! Outbound control frames are typed [`ClientFrame`]s; inbound text frames
//! are classified into [`HubFrame`] by [`parse_frame`]. Anything the hub
//! sends that we do not understand becomes [`HubFrame::Other`] so the
//! connection can keep going.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::Error;

/// Event type every connection subscribes to.
pub const APP_EVENT_TYPE: &str = "app_notify";

/// Path of the hub's WebSocket API below the base URL.
pub const WEBSOCKET_PATH: &str = "/api/websocket";

/// The `data` object of an event, forwarded untouched to the dispatcher.
pub type EventData = Map<String, Value>;

// ── Outbound ────────────────────────────────────────────────────────

/// Control frames the client sends to the hub.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame<'a> {
    Auth {
        access_token: &'a str,
    },
    SubscribeEvents {
        id: u64,
        event_type: &'a str,
    },
}

impl ClientFrame<'_> {
    /// Serialize to the JSON text sent on the wire.
    pub fn to_text(&self) -> Result<String, Error> {
        serde_json::to_string(self).map_err(|e| Error::Protocol(format!("encode frame: {e}")))
    }
}

// ── Inbound ─────────────────────────────────────────────────────────

/// A classified inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub enum HubFrame {
    /// Hub greeting asking for credentials.
    AuthRequired,
    /// Token accepted.
    AuthOk,
    /// Token rejected.
    AuthInvalid { message: String },
    /// Command result, e.g. the answer to `subscribe_events`.
    Result { id: Option<u64>, success: bool },
    /// An event. `data` is `None` when the event carries no data object.
    Event {
        event_type: Option<String>,
        data: Option<EventData>,
    },
    /// Any other frame type.
    Other(String),
}

/// Parse a text frame.
///
/// Fails only when the text is not a JSON object with a string `type`;
/// callers drop such frames.
pub fn parse_frame(text: &str) -> Result<HubFrame, Error> {
    let root: Value =
        serde_json::from_str(text).map_err(|e| Error::Protocol(format!("invalid JSON: {e}")))?;

    let frame_type = root
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| Error::Protocol("frame has no type".into()))?;

    let frame = match frame_type {
        "auth_required" => HubFrame::AuthRequired,
        "auth_ok" => HubFrame::AuthOk,
        "auth_invalid" => HubFrame::AuthInvalid {
            message: root
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("invalid access token")
                .to_owned(),
        },
        "result" => HubFrame::Result {
            id: root.get("id").and_then(Value::as_u64),
            success: root.get("success").and_then(Value::as_bool).unwrap_or(false),
        },
        "event" => {
            let event = root.get("event");
            HubFrame::Event {
                event_type: event
                    .and_then(|e| e.get("event_type"))
                    .and_then(Value::as_str)
                    .map(String::from),
                data: event
                    .and_then(|e| e.get("data"))
                    .and_then(Value::as_object)
                    .cloned(),
            }
        }
        other => HubFrame::Other(other.to_owned()),
    };

    Ok(frame)
}

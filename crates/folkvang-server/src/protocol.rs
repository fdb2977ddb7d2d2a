//! Event-channel wire format
//!
//! Every WebSocket text frame is a JSON envelope `{"event": ..., "data": ...}`.
//! `data` may be omitted on client messages that carry no payload.

use chrono::{DateTime, Utc};
use folkvang_core::{BossState, Error as CoreError, KillEvent, KillReport};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Message sent by a client
#[derive(Debug, Clone, PartialEq)]
pub enum ClientMessage {
    BossKill(KillReport),
    Ping,
    GetState,
}

#[derive(Debug, Deserialize)]
struct Envelope {
    event: String,
    #[serde(default)]
    data: serde_json::Value,
}

impl ClientMessage {
    /// Parse a text frame
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        let envelope: Envelope =
            serde_json::from_str(text).map_err(|e| ProtocolError::Malformed(e.to_string()))?;
        match envelope.event.as_str() {
            "boss_kill" => {
                let report = if envelope.data.is_null() {
                    KillReport::default()
                } else {
                    serde_json::from_value(envelope.data)
                        .map_err(|e| ProtocolError::Malformed(e.to_string()))?
                };
                Ok(ClientMessage::BossKill(report))
            }
            "ping" => Ok(ClientMessage::Ping),
            "get_state" => Ok(ClientMessage::GetState),
            other => Err(ProtocolError::UnknownEvent(other.to_string())),
        }
    }
}

/// Problem decoding an inbound frame
#[derive(Debug, Error, PartialEq)]
pub enum ProtocolError {
    #[error("Malformed message: {0}")]
    Malformed(String),
    #[error("Unknown event: {0}")]
    UnknownEvent(String),
}

/// Message sent by the server
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Greeting, sent once right after the upgrade
    Connected(Welcome),
    /// Snapshot sent right after `Connected`
    InitialState(BossState),
    /// Kill broadcast
    BossUpdate(KillEvent),
    /// Reply to the client that reported a kill
    KillConfirmed(KillConfirmation),
    Pong(Pong),
    /// Snapshot in reply to `get_state`
    StateUpdate(BossState),
    /// All slots were reset by an admin
    ResetAll(ResetNotice),
    Error(ErrorReply),
}

impl ServerMessage {
    /// Event name as it appears on the wire
    pub fn event_name(&self) -> &'static str {
        match self {
            ServerMessage::Connected(_) => "connected",
            ServerMessage::InitialState(_) => "initial_state",
            ServerMessage::BossUpdate(_) => "boss_update",
            ServerMessage::KillConfirmed(_) => "kill_confirmed",
            ServerMessage::Pong(_) => "pong",
            ServerMessage::StateUpdate(_) => "state_update",
            ServerMessage::ResetAll(_) => "reset_all",
            ServerMessage::Error(_) => "error",
        }
    }

    pub fn pong(timestamp: DateTime<Utc>) -> Self {
        ServerMessage::Pong(Pong { timestamp })
    }

    pub fn reset_all() -> Self {
        ServerMessage::ResetAll(ResetNotice {})
    }

    pub fn error(error: impl Into<String>) -> Self {
        ServerMessage::Error(ErrorReply {
            error: error.into(),
        })
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Welcome {
    pub message: String,
    pub server_time: DateTime<Utc>,
    pub client_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KillConfirmation {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<KillEvent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl KillConfirmation {
    pub fn accepted(event: KillEvent) -> Self {
        Self {
            success: true,
            data: Some(event),
            error: None,
        }
    }

    pub fn rejected(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Pong {
    pub timestamp: DateTime<Utc>,
}

/// Serializes as `{}`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResetNotice {}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorReply {
    pub error: String,
}

/// Client-facing text for a rejected kill report
pub fn rejection_message(err: &CoreError) -> String {
    match err {
        CoreError::MissingField(_) => "Missing floor or boss".to_string(),
        CoreError::InvalidSlot { .. } => "Invalid floor or boss".to_string(),
        CoreError::InvalidField { .. } => err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use folkvang_core::FloorInput;
    use serde_json::json;

    #[test]
    fn test_parse_boss_kill() {
        let msg = ClientMessage::parse(
            r#"{"event":"boss_kill","data":{"floor":2,"boss":"healer","player":"Alice"}}"#,
        )
        .unwrap();
        let ClientMessage::BossKill(report) = msg else {
            panic!("expected boss_kill");
        };
        assert_eq!(report.floor, Some(FloorInput::Number(2)));
        assert_eq!(report.boss.as_deref(), Some("healer"));
        assert_eq!(report.player.as_deref(), Some("Alice"));
    }

    #[test]
    fn test_parse_payloadless_events() {
        assert_eq!(ClientMessage::parse(r#"{"event":"ping"}"#), Ok(ClientMessage::Ping));
        assert_eq!(
            ClientMessage::parse(r#"{"event":"get_state","data":{}}"#),
            Ok(ClientMessage::GetState)
        );
        assert_eq!(
            ClientMessage::parse(r#"{"event":"boss_kill"}"#),
            Ok(ClientMessage::BossKill(KillReport::default()))
        );
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            ClientMessage::parse("not json"),
            Err(ProtocolError::Malformed(_))
        ));
        assert_eq!(
            ClientMessage::parse(r#"{"event":"dance"}"#),
            Err(ProtocolError::UnknownEvent("dance".to_string()))
        );
        assert!(matches!(
            ClientMessage::parse(r#"{"event":"boss_kill","data":{"boss":42}}"#),
            Err(ProtocolError::Malformed(_))
        ));
    }

    #[test]
    fn test_server_message_envelope() {
        let value = serde_json::to_value(ServerMessage::reset_all()).unwrap();
        assert_eq!(value, json!({"event": "reset_all", "data": {}}));

        let value = serde_json::to_value(ServerMessage::KillConfirmed(
            KillConfirmation::rejected("Invalid floor or boss"),
        ))
        .unwrap();
        assert_eq!(
            value,
            json!({
                "event": "kill_confirmed",
                "data": {"success": false, "error": "Invalid floor or boss"}
            })
        );

        let msg = ServerMessage::error("oops");
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["event"], msg.event_name());
    }

    #[test]
    fn test_rejection_message() {
        assert_eq!(
            rejection_message(&CoreError::MissingField("floor")),
            "Missing floor or boss"
        );
        assert_eq!(
            rejection_message(&CoreError::InvalidSlot {
                floor: 9,
                boss: "mage".to_string()
            }),
            "Invalid floor or boss"
        );
    }
}

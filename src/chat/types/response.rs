use bon::Builder;
use serde::Deserialize;
use serde_json::{Map, Value};
use serde_with::serde_as;

use crate::serde_helpers::{StringFromAny, deserialize_with_warnings};
use crate::ws::{MessageParser, WsError};

/// Inbound chat event, discriminated on the wire by its `type` field.
///
/// Types this client does not know, and known types whose payload does not
/// decode, are delivered as [`ServerEvent::Unknown`] carrying the raw object.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServerEvent {
    /// A message was posted to the current room
    NewMessage(ChatMessage),
    /// A message was removed by its author
    #[serde(rename_all = "camelCase")]
    MessageDeleted { message_id: i64 },
    /// Number of participants in the room
    UserCount(UserCount),
    /// Recent history of the current room
    RegionMessages {
        #[serde(default)]
        messages: Vec<HistoryEntry>,
    },
    /// The join request was accepted
    JoinSuccess(JoinSuccess),
    /// The leave request was accepted
    LeaveSuccess,
    /// A report was recorded
    #[serde(rename_all = "camelCase")]
    ReportConfirmed { message_id: i64 },
    /// The server rejected a command
    Error {
        #[serde(default)]
        message: Option<String>,
    },
    /// Any other event, unmodified
    #[serde(skip)]
    Unknown(Value),
}

impl ServerEvent {
    /// The wire `type` tag of this event, if it has one.
    #[must_use]
    pub fn kind(&self) -> Option<&str> {
        Some(match self {
            Self::NewMessage(_) => "NEW_MESSAGE",
            Self::MessageDeleted { .. } => "MESSAGE_DELETED",
            Self::UserCount(_) => "USER_COUNT",
            Self::RegionMessages { .. } => "REGION_MESSAGES",
            Self::JoinSuccess(_) => "JOIN_SUCCESS",
            Self::LeaveSuccess => "LEAVE_SUCCESS",
            Self::ReportConfirmed { .. } => "REPORT_CONFIRMED",
            Self::Error { .. } => "ERROR",
            Self::Unknown(value) => return value.get("type").and_then(Value::as_str),
        })
    }
}

/// A message broadcast to a region's room.
#[serde_as]
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Builder)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    /// Server-assigned message id
    pub id: i64,
    pub content: String,
    /// Author's display name
    pub nickname: String,
    /// Author's user id; numeric ids are converted to strings
    #[serde_as(as = "Option<StringFromAny>")]
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    /// Server-local creation time as sent (e.g., `2024-05-01T12:30:00.123`)
    #[serde(default)]
    pub timestamp: Option<String>,
}

#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Builder)]
pub struct UserCount {
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub region: Option<String>,
}

#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Deserialize, Builder)]
#[serde(rename_all = "camelCase")]
pub struct JoinSuccess {
    pub region: String,
    /// Room history, when the server includes it
    #[serde(default)]
    pub messages: Option<Vec<HistoryEntry>>,
    #[serde(default)]
    pub user_count: Option<u64>,
}

/// One historical message, kept as the raw JSON object the server sent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct HistoryEntry(Map<String, Value>);

impl HistoryEntry {
    #[must_use]
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// Message id, accepting numeric strings.
    #[must_use]
    pub fn id(&self) -> Option<i64> {
        match self.0.get("id")? {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.parse().ok(),
            _ => None,
        }
    }

    /// Author's user id, accepting numbers.
    #[must_use]
    pub fn user_id(&self) -> Option<String> {
        match self.0.get("userId")? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    /// Message text, from `content` or the stored-history `message` field.
    #[must_use]
    pub fn content(&self) -> Option<&str> {
        self.str_field("content").or_else(|| self.str_field("message"))
    }

    /// Author's display name, from `nickname` or `userNickname`.
    #[must_use]
    pub fn nickname(&self) -> Option<&str> {
        self.str_field("nickname").or_else(|| self.str_field("userNickname"))
    }

    /// Creation time as sent, from `timestamp` or `createdAt`.
    #[must_use]
    pub fn timestamp(&self) -> Option<&str> {
        self.str_field("timestamp").or_else(|| self.str_field("createdAt"))
    }

    /// Look up any field by its wire name.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    #[must_use]
    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    fn str_field(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }
}

/// Parses inbound text frames into [`ServerEvent`]s.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, Default)]
pub struct EventParser;

impl MessageParser<ServerEvent> for EventParser {
    fn parse(&self, bytes: &[u8]) -> crate::Result<Vec<ServerEvent>> {
        parse_events(bytes)
    }
}

/// Parse a text frame into events.
///
/// Whitespace-only frames are keepalives and yield no events. A frame may hold
/// a single event object or an array of them. Invalid JSON is an error.
pub fn parse_events(bytes: &[u8]) -> crate::Result<Vec<ServerEvent>> {
    let trimmed = bytes
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .map_or(&[][..], |start| &bytes[start..]);

    if trimmed.is_empty() {
        return Ok(Vec::new());
    }

    match serde_json::from_slice::<Value>(trimmed).map_err(WsError::MessageParse)? {
        Value::Array(values) => Ok(values.into_iter().map(decode_event).collect()),
        value => Ok(vec![decode_event(value)]),
    }
}

fn decode_event(value: Value) -> ServerEvent {
    match deserialize_with_warnings::<ServerEvent>(&value) {
        Ok(event) => event,
        Err(e) => {
            #[cfg(feature = "tracing")]
            tracing::debug!(
                kind = ?value.get("type"),
                error = %e,
                "passing through unrecognized server event"
            );
            #[cfg(not(feature = "tracing"))]
            let _ = &e;
            ServerEvent::Unknown(value)
        }
    }
}

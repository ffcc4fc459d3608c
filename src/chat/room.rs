use super::types::response::{ChatMessage, HistoryEntry, ServerEvent};
use crate::ws::ConnectionState;

/// Message recorded when the connection fails or gives up.
pub const CONNECTION_PROBLEM: &str = "connection problem, reconnect to continue";
/// Message recorded for an `ERROR` event without text.
pub const UNKNOWN_ERROR: &str = "unknown error";

/// A message as shown in a room.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomMessage {
    pub id: Option<i64>,
    pub content: Option<String>,
    pub nickname: Option<String>,
    pub user_id: Option<String>,
    pub timestamp: Option<String>,
    /// Whether the viewer wrote this message
    pub is_own: bool,
}

/// Local view of the current room, folded from inbound events and status
/// changes.
///
/// Feed it from a message observer and a status observer, or from
/// [`Client::events`](super::Client::events).
#[derive(Debug, Clone, Default)]
pub struct RoomView {
    viewer_id: Option<String>,
    status: Option<ConnectionState>,
    messages: Vec<RoomMessage>,
    online_users: u64,
    last_error: Option<String>,
}

impl RoomView {
    /// Create an empty view for the user `viewer_id`.
    #[must_use]
    pub fn new(viewer_id: &str) -> Self {
        Self {
            viewer_id: Some(viewer_id.to_owned()),
            ..Self::default()
        }
    }

    pub fn apply_event(&mut self, event: &ServerEvent) {
        match event {
            ServerEvent::NewMessage(message) => {
                if self.messages.iter().any(|m| m.id == Some(message.id)) {
                    return;
                }
                let message = self.room_message(message);
                self.messages.push(message);
            }
            ServerEvent::MessageDeleted { message_id } => {
                self.messages.retain(|m| m.id != Some(*message_id));
            }
            ServerEvent::UserCount(count) => self.online_users = count.count,
            ServerEvent::RegionMessages { messages } => self.replace_history(messages),
            ServerEvent::JoinSuccess(join) => {
                if let Some(messages) = &join.messages {
                    self.replace_history(messages);
                }
                if let Some(count) = join.user_count.filter(|count| *count > 0) {
                    self.online_users = count;
                }
            }
            ServerEvent::LeaveSuccess => {
                self.messages.clear();
                self.online_users = 0;
            }
            ServerEvent::Error { message } => {
                self.last_error = Some(message.clone().unwrap_or_else(|| UNKNOWN_ERROR.to_owned()));
            }
            ServerEvent::ReportConfirmed { .. } | ServerEvent::Unknown(_) => {}
        }
    }

    pub fn apply_status(&mut self, status: ConnectionState) {
        self.status = Some(status);
        match status {
            ConnectionState::Error | ConnectionState::MaxRetriesExceeded => {
                self.last_error = Some(CONNECTION_PROBLEM.to_owned());
                self.messages.clear();
                self.online_users = 0;
            }
            ConnectionState::Disconnected => self.online_users = 0,
            _ => {}
        }
    }

    #[must_use]
    pub fn messages(&self) -> &[RoomMessage] {
        &self.messages
    }

    #[must_use]
    pub fn online_users(&self) -> u64 {
        self.online_users
    }

    /// Last status applied, if any.
    #[must_use]
    pub fn status(&self) -> Option<ConnectionState> {
        self.status
    }

    #[must_use]
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn clear_error(&mut self) {
        self.last_error = None;
    }

    fn is_own(&self, user_id: Option<&str>) -> bool {
        user_id.is_some() && user_id == self.viewer_id.as_deref()
    }

    fn room_message(&self, message: &ChatMessage) -> RoomMessage {
        RoomMessage {
            id: Some(message.id),
            content: Some(message.content.clone()),
            nickname: Some(message.nickname.clone()),
            user_id: message.user_id.clone(),
            timestamp: message.timestamp.clone(),
            is_own: self.is_own(message.user_id.as_deref()),
        }
    }

    fn history_message(&self, entry: &HistoryEntry) -> RoomMessage {
        let user_id = entry.user_id();
        RoomMessage {
            id: entry.id(),
            content: entry.content().map(str::to_owned),
            nickname: entry.nickname().map(str::to_owned),
            is_own: self.is_own(user_id.as_deref()),
            user_id,
            timestamp: entry.timestamp().map(str::to_owned),
        }
    }

    fn replace_history(&mut self, entries: &[HistoryEntry]) {
        self.messages = entries.iter().map(|e| self.history_message(e)).collect();
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::chat::types::response::parse_events;

    fn event(value: serde_json::Value) -> ServerEvent {
        parse_events(value.to_string().as_bytes())
            .unwrap()
            .remove(0)
    }

    fn new_message(id: i64, user_id: &str) -> ServerEvent {
        event(json!({
            "type": "NEW_MESSAGE",
            "id": id,
            "content": format!("message {id}"),
            "nickname": "someone",
            "userId": user_id
        }))
    }

    #[test]
    fn new_messages_are_deduplicated_and_flagged() {
        let mut room = RoomView::new("u1");

        room.apply_event(&new_message(1, "u1"));
        room.apply_event(&new_message(2, "u2"));
        room.apply_event(&new_message(1, "u1"));

        let ids: Vec<_> = room.messages().iter().map(|m| m.id).collect();
        assert_eq!(ids, [Some(1), Some(2)]);
        assert!(room.messages()[0].is_own);
        assert!(!room.messages()[1].is_own);
    }

    #[test]
    fn deleted_messages_are_removed() {
        let mut room = RoomView::new("u1");
        room.apply_event(&new_message(1, "u1"));
        room.apply_event(&new_message(2, "u2"));

        room.apply_event(&event(json!({ "type": "MESSAGE_DELETED", "messageId": 1 })));

        assert_eq!(room.messages().len(), 1);
        assert_eq!(room.messages()[0].id, Some(2));
    }

    #[test]
    fn join_success_replaces_history_and_count() {
        let mut room = RoomView::new("7");
        room.apply_event(&new_message(99, "u2"));

        room.apply_event(&event(json!({
            "type": "JOIN_SUCCESS",
            "region": "Seoul",
            "userCount": 3,
            "messages": [
                { "id": 1, "content": "a", "nickname": "A", "userId": 7 },
                { "id": 2, "content": "b", "nickname": "B", "userId": "8" }
            ]
        })));

        assert_eq!(room.online_users(), 3);
        assert_eq!(room.messages().len(), 2);
        assert!(room.messages()[0].is_own);
        assert_eq!(room.messages()[1].content.as_deref(), Some("b"));
    }

    #[test]
    fn join_success_without_extras_keeps_state() {
        let mut room = RoomView::new("u1");
        room.apply_event(&new_message(1, "u1"));
        room.apply_event(&event(json!({ "type": "USER_COUNT", "count": 5 })));

        room.apply_event(&event(json!({ "type": "JOIN_SUCCESS", "region": "Seoul" })));

        assert_eq!(room.messages().len(), 1);
        assert_eq!(room.online_users(), 5);
    }

    #[test]
    fn region_messages_replace_history() {
        let mut room = RoomView::new("u1");
        room.apply_event(&new_message(1, "u1"));

        room.apply_event(&event(json!({
            "type": "REGION_MESSAGES",
            "messages": [{ "id": 10, "content": "old", "nickname": "C", "userId": "u3" }]
        })));

        assert_eq!(room.messages().len(), 1);
        assert_eq!(room.messages()[0].id, Some(10));
    }

    #[test]
    fn stored_history_field_names_are_understood() {
        let mut room = RoomView::new("u1");

        room.apply_event(&event(json!({
            "type": "REGION_MESSAGES",
            "messages": [{
                "id": 11,
                "region": "Seoul",
                "message": "from the archive",
                "userNickname": "Dana",
                "createdAt": "2024-05-01T09:15:00"
            }]
        })));

        let message = &room.messages()[0];
        assert_eq!(message.content.as_deref(), Some("from the archive"));
        assert_eq!(message.nickname.as_deref(), Some("Dana"));
        assert_eq!(message.timestamp.as_deref(), Some("2024-05-01T09:15:00"));
        assert!(!message.is_own);
    }

    #[test]
    fn leave_success_clears_room() {
        let mut room = RoomView::new("u1");
        room.apply_event(&new_message(1, "u1"));
        room.apply_event(&event(json!({ "type": "USER_COUNT", "count": 2 })));

        room.apply_event(&ServerEvent::LeaveSuccess);

        assert!(room.messages().is_empty());
        assert_eq!(room.online_users(), 0);
    }

    #[test]
    fn error_event_records_message() {
        let mut room = RoomView::new("u1");

        room.apply_event(&event(json!({ "type": "ERROR", "message": "banned word" })));
        assert_eq!(room.last_error(), Some("banned word"));

        room.apply_event(&event(json!({ "type": "ERROR" })));
        assert_eq!(room.last_error(), Some(UNKNOWN_ERROR));

        room.clear_error();
        assert_eq!(room.last_error(), None);
    }

    #[test]
    fn connection_failure_clears_room() {
        let mut room = RoomView::new("u1");
        room.apply_event(&new_message(1, "u1"));
        room.apply_event(&event(json!({ "type": "USER_COUNT", "count": 2 })));

        room.apply_status(ConnectionState::MaxRetriesExceeded);

        assert!(room.messages().is_empty());
        assert_eq!(room.online_users(), 0);
        assert_eq!(room.last_error(), Some(CONNECTION_PROBLEM));
        assert_eq!(room.status(), Some(ConnectionState::MaxRetriesExceeded));
    }

    #[test]
    fn disconnect_only_zeroes_count() {
        let mut room = RoomView::new("u1");
        room.apply_event(&new_message(1, "u1"));
        room.apply_event(&event(json!({ "type": "USER_COUNT", "count": 2 })));

        room.apply_status(ConnectionState::Disconnected);

        assert_eq!(room.messages().len(), 1);
        assert_eq!(room.online_users(), 0);
        assert_eq!(room.last_error(), None);
    }

    #[test]
    fn messages_without_user_are_not_own() {
        let mut room = RoomView::default();

        room.apply_event(&event(json!({
            "type": "NEW_MESSAGE", "id": 1, "content": "x", "nickname": "anon"
        })));

        assert!(!room.messages()[0].is_own);
    }
}

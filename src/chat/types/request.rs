use bon::Builder;
use chrono::{DateTime, SubsecRound as _, Utc};
use serde::Serialize;

/// The room a caller last asked to join.
///
/// Retained across reconnects so the client can rejoin without caller involvement.
#[non_exhaustive]
#[derive(Clone, Debug, PartialEq, Eq, Builder)]
pub struct Membership {
    /// Region whose chat room was joined (e.g., `Seoul`)
    #[builder(into)]
    pub region: String,
    /// Caller's user id
    #[builder(into)]
    pub user_id: String,
    /// Display name shown to other participants
    #[builder(into)]
    pub nickname: String,
}

impl Membership {
    #[must_use]
    pub fn new(region: String, user_id: String, nickname: String) -> Self {
        Self {
            region,
            user_id,
            nickname,
        }
    }
}

/// Outbound chat command, discriminated on the wire by its `type` field.
#[non_exhaustive]
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClientCommand {
    /// Enter a region's room
    #[serde(rename_all = "camelCase")]
    JoinRegion {
        region: String,
        user_id: String,
        nickname: String,
    },
    /// Leave the current room
    LeaveRegion,
    /// Post a message to a region's room
    #[serde(rename_all = "camelCase")]
    SendMessage {
        content: String,
        region: String,
        user_id: String,
        nickname: String,
        /// Generation time; serialized as ISO-8601 with millisecond precision
        timestamp: DateTime<Utc>,
    },
    /// Delete one of the caller's messages
    #[serde(rename_all = "camelCase")]
    DeleteMessage { message_id: i64, user_id: String },
    /// Flag a message for moderation
    #[serde(rename_all = "camelCase")]
    ReportMessage {
        message_id: i64,
        reason: String,
        reporter_id: String,
        reporter_nickname: String,
    },
}

impl ClientCommand {
    #[must_use]
    pub fn join(membership: &Membership) -> Self {
        Self::JoinRegion {
            region: membership.region.clone(),
            user_id: membership.user_id.clone(),
            nickname: membership.nickname.clone(),
        }
    }

    /// Build a `SEND_MESSAGE` command stamped with the current time.
    #[must_use]
    pub fn message(content: String, region: String, user_id: String, nickname: String) -> Self {
        Self::SendMessage {
            content,
            region,
            user_id,
            nickname,
            timestamp: Utc::now().trunc_subsecs(3),
        }
    }

    /// The wire `type` tag of this command.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::JoinRegion { .. } => "JOIN_REGION",
            Self::LeaveRegion => "LEAVE_REGION",
            Self::SendMessage { .. } => "SEND_MESSAGE",
            Self::DeleteMessage { .. } => "DELETE_MESSAGE",
            Self::ReportMessage { .. } => "REPORT_MESSAGE",
        }
    }
}

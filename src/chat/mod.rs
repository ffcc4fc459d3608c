#![expect(
    clippy::module_name_repetitions,
    reason = "Re-exported names intentionally match their modules for API clarity"
)]

//! Client for the regional chat service.
//!
//! Each region (e.g., `Seoul`, `Busan`) has one chat room. A [`Client`] keeps a
//! single WebSocket connection to the service, joins at most one room at a
//! time and rejoins it automatically after a reconnect.
//!
//! # Wire protocol
//!
//! JSON text frames discriminated by a `type` field:
//!
//! - Outbound: [`ClientCommand`] (`JOIN_REGION`, `LEAVE_REGION`,
//!   `SEND_MESSAGE`, `DELETE_MESSAGE`, `REPORT_MESSAGE`)
//! - Inbound: [`ServerEvent`] (`NEW_MESSAGE`, `MESSAGE_DELETED`, `USER_COUNT`,
//!   `REGION_MESSAGES`, `JOIN_SUCCESS`, `LEAVE_SUCCESS`, `REPORT_CONFIRMED`,
//!   `ERROR`); anything else arrives as [`ServerEvent::Unknown`]
//!
//! # Example
//!
//! ```rust, no_run
//! use std::sync::{Arc, Mutex};
//!
//! use regional_chat_client::chat::{Client, RoomView, ServerEvent};
//! use regional_chat_client::ws::Observer;
//! use regional_chat_client::ws::config::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = Client::from_env(Config::default())?;
//!     let room = Arc::new(Mutex::new(RoomView::new("u1")));
//!
//!     let view = Arc::clone(&room);
//!     client.add_message_observer(Observer::new(move |event: &ServerEvent| {
//!         view.lock().unwrap().apply_event(event);
//!     }));
//!
//!     client.join_region("Seoul", "u1", "Alice").await?;
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod room;
pub mod types;

pub use client::Client;
pub use room::{RoomMessage, RoomView};
pub use types::request::{ClientCommand, Membership};
pub use types::response::{
    ChatMessage, EventParser, HistoryEntry, JoinSuccess, ServerEvent, UserCount, parse_events,
};

//! Join a regional room, post a message and print the conversation.
//!
//! Connects to `CHAT_WS_URL` (default `ws://localhost:8080`). Run with:
//! ```sh
//! RUST_LOG=info CHAT_WS_URL=ws://localhost:8080 cargo run --example regional_chat --features tracing
//! ```

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use futures::StreamExt as _;
use regional_chat_client::chat::{Client, RoomView, ServerEvent};
use regional_chat_client::ws::config::Config;
use regional_chat_client::ws::{ConnectionState, Observer};
use tokio::time::timeout;
use tracing::{info, warn};

const REGION: &str = "Seoul";
const USER_ID: &str = "demo-user";
const NICKNAME: &str = "Demo";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let client = Client::from_env(Config::default())?;
    info!(endpoint = client.endpoint(), "created chat client");

    let room = Arc::new(Mutex::new(RoomView::new(USER_ID)));
    let status_room = Arc::clone(&room);
    client.add_status_observer(Observer::new(move |status: &ConnectionState| {
        info!(%status, "connection status changed");
        status_room
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .apply_status(*status);
    }));

    let mut events = Box::pin(client.events());

    client.join_region(REGION, USER_ID, NICKNAME).await?;
    client
        .send_message("Hello from the demo client", REGION, USER_ID, NICKNAME)
        .await?;

    while let Ok(Some(event)) = timeout(Duration::from_secs(10), events.next()).await {
        match &event {
            ServerEvent::NewMessage(message) => info!(
                id = message.id,
                nickname = %message.nickname,
                content = %message.content,
                "new message"
            ),
            ServerEvent::UserCount(count) => info!(count = count.count, "users online"),
            ServerEvent::Error { message } => warn!(?message, "server error"),
            other => info!(kind = ?other.kind(), "event"),
        }

        room.lock()
            .unwrap_or_else(PoisonError::into_inner)
            .apply_event(&event);
    }

    {
        let room = room.lock().unwrap_or_else(PoisonError::into_inner);
        info!(
            messages = room.messages().len(),
            online = room.online_users(),
            "room summary"
        );
    }

    client.leave_region().await?;
    client.disconnect();

    Ok(())
}

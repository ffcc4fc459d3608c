use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use async_stream::stream;
use futures::Stream;
use serde::Serialize;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, watch};
use tokio::task::AbortHandle;
use tokio::time::sleep;
use url::Url;

use super::types::request::{ClientCommand, Membership};
use super::types::response::{EventParser, ServerEvent};
use crate::Result;
use crate::ws::config::Config;
use crate::ws::{ConnectionManager, ConnectionState, Connector, Observer};

/// Path of the chat channel, appended to the base URL.
pub const CHAT_PATH: &str = "/ws/chat";
/// Environment variable read by [`Client::from_env`].
pub const ENDPOINT_ENV: &str = "CHAT_WS_URL";
/// Base URL used when [`ENDPOINT_ENV`] is unset.
pub const DEFAULT_BASE_URL: &str = "ws://localhost:8080";

/// Delay between a (re)connect and the automatic `JOIN_REGION`, giving
/// observers a chance to settle on the new connection first.
const REJOIN_DELAY: Duration = Duration::from_millis(100);

type Connection = ConnectionManager<ServerEvent, EventParser>;
type SharedMembership = Arc<RwLock<Option<Membership>>>;

/// Regional chat client.
///
/// Owns one [`ConnectionManager`] and the room-membership snapshot. Clones
/// share the same connection, so construct one per process and hand clones to
/// every consumer.
///
/// After a connection is (re)established the client rejoins the last room
/// passed to [`join_region`](Self::join_region), until
/// [`leave_region`](Self::leave_region) or [`disconnect`](Self::disconnect)
/// clears it.
///
/// Must be created inside a Tokio runtime; construction fails otherwise.
///
/// # Examples
///
/// ```rust, no_run
/// use futures::StreamExt as _;
/// use regional_chat_client::chat::Client;
/// use regional_chat_client::ws::config::Config;
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let client = Client::new("ws://localhost:8080", Config::default())?;
///     let mut events = Box::pin(client.events());
///
///     client.join_region("Seoul", "u1", "Alice").await?;
///     client.send_message("hello", "Seoul", "u1", "Alice").await?;
///
///     while let Some(event) = events.next().await {
///         println!("{event:?}");
///     }
///
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    connection: Connection,
    membership: SharedMembership,
    rejoin: AbortHandle,
}

impl Drop for ClientInner {
    fn drop(&mut self) {
        self.rejoin.abort();
    }
}

impl Client {
    /// Create a client for the chat service at `base_url` using WebSockets.
    ///
    /// The endpoint is `base_url` without its trailing `/`, followed by
    /// [`CHAT_PATH`]. No connection is opened until the first connect or send.
    #[cfg(feature = "ws")]
    pub fn new(base_url: &str, config: Config) -> Result<Self> {
        Self::with_connector(
            base_url,
            config,
            Arc::new(crate::ws::TungsteniteConnector),
        )
    }

    /// Like [`new`](Self::new), with the base URL taken from `CHAT_WS_URL`.
    #[cfg(feature = "ws")]
    pub fn from_env(config: Config) -> Result<Self> {
        let base_url =
            std::env::var(ENDPOINT_ENV).unwrap_or_else(|_| DEFAULT_BASE_URL.to_owned());
        Self::new(&base_url, config)
    }

    /// Create a client that opens connections through `connector`.
    ///
    /// Fails with [`Kind::Internal`](crate::error::Kind::Internal) when called
    /// outside a Tokio runtime.
    pub fn with_connector<C: Connector>(
        base_url: &str,
        config: Config,
        connector: Arc<C>,
    ) -> Result<Self> {
        let endpoint = chat_endpoint(base_url)?;
        let runtime = Handle::try_current()?;
        let connection = ConnectionManager::new(endpoint, config, EventParser, connector);
        let membership = SharedMembership::default();

        let rejoin = runtime.spawn(rejoin_on_connect(
            connection.clone(),
            connection.state_receiver(),
            Arc::clone(&membership),
        ))
        .abort_handle();

        Ok(Self {
            inner: Arc::new(ClientInner {
                connection,
                membership,
                rejoin,
            }),
        })
    }

    /// Open the connection, or wait for the attempt already in flight.
    pub async fn connect(&self) -> Result<()> {
        self.inner.connection.connect().await
    }

    /// Clear the membership snapshot and close the connection normally.
    ///
    /// Observers stay registered.
    pub fn disconnect(&self) {
        self.set_membership(None);
        self.inner.connection.disconnect();
    }

    /// [`disconnect`](Self::disconnect), drop every observer and stop rejoining.
    ///
    /// The client is not meant to be used afterwards.
    pub fn destroy(&self) {
        self.inner.rejoin.abort();
        self.set_membership(None);
        self.inner.connection.destroy();
    }

    /// Send any serializable command. See [`ConnectionManager::send`].
    pub async fn send<R: Serialize + ?Sized>(&self, request: &R) -> Result<()> {
        self.inner.connection.send(request).await
    }

    pub async fn send_text(&self, payload: String) -> Result<()> {
        self.inner.connection.send_text(payload).await
    }

    /// Join a region's room and remember it for automatic rejoin.
    pub async fn join_region(&self, region: &str, user_id: &str, nickname: &str) -> Result<()> {
        let membership = Membership::new(
            region.to_owned(),
            user_id.to_owned(),
            nickname.to_owned(),
        );
        let command = ClientCommand::join(&membership);

        #[cfg(feature = "tracing")]
        tracing::debug!(region = %membership.region, "joining region");

        self.set_membership(Some(membership));
        self.send(&command).await
    }

    /// Leave the current room.
    ///
    /// The membership snapshot is cleared whether or not the command is sent.
    pub async fn leave_region(&self) -> Result<()> {
        let outcome = self.send(&ClientCommand::LeaveRegion).await;
        self.set_membership(None);
        outcome
    }

    /// Post `content` to a region's room, stamped with the current time.
    pub async fn send_message(
        &self,
        content: &str,
        region: &str,
        user_id: &str,
        nickname: &str,
    ) -> Result<()> {
        let command = ClientCommand::message(
            content.to_owned(),
            region.to_owned(),
            user_id.to_owned(),
            nickname.to_owned(),
        );
        self.send(&command).await
    }

    pub async fn delete_message(&self, message_id: i64, user_id: &str) -> Result<()> {
        let command = ClientCommand::DeleteMessage {
            message_id,
            user_id: user_id.to_owned(),
        };
        self.send(&command).await
    }

    pub async fn report_message(
        &self,
        message_id: i64,
        reason: &str,
        reporter_id: &str,
        reporter_nickname: &str,
    ) -> Result<()> {
        let command = ClientCommand::ReportMessage {
            message_id,
            reason: reason.to_owned(),
            reporter_id: reporter_id.to_owned(),
            reporter_nickname: reporter_nickname.to_owned(),
        };
        self.send(&command).await
    }

    pub fn add_message_observer(&self, observer: Observer<ServerEvent>) {
        self.inner.connection.add_message_observer(observer);
    }

    pub fn remove_message_observer(&self, observer: &Observer<ServerEvent>) {
        self.inner.connection.remove_message_observer(observer);
    }

    pub fn add_status_observer(&self, observer: Observer<ConnectionState>) {
        self.inner.connection.add_status_observer(observer);
    }

    pub fn remove_status_observer(&self, observer: &Observer<ConnectionState>) {
        self.inner.connection.remove_status_observer(observer);
    }

    /// Stream every inbound event from now on.
    ///
    /// Backed by a message observer that is removed when the stream is dropped.
    /// The stream ends if the client is destroyed.
    pub fn events(&self) -> impl Stream<Item = ServerEvent> + Send + 'static {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let observer = Observer::new(move |event: &ServerEvent| {
            _ = tx.send(event.clone());
        });
        let guard = ObserverGuard {
            connection: self.inner.connection.clone(),
            id: observer.id(),
        };
        self.add_message_observer(observer);

        stream! {
            let _guard = guard;
            while let Some(event) = rx.recv().await {
                yield event;
            }
        }
    }

    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.inner.connection.state()
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.inner.connection.is_connected()
    }

    /// Subscribe to every connection state change.
    #[must_use]
    pub fn state_receiver(&self) -> watch::Receiver<ConnectionState> {
        self.inner.connection.state_receiver()
    }

    /// The room the client will rejoin after a reconnect, if any.
    #[must_use]
    pub fn membership(&self) -> Option<Membership> {
        self.inner
            .membership
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    #[must_use]
    pub fn reconnect_attempts(&self) -> u32 {
        self.inner.connection.reconnect_attempts()
    }

    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.inner.connection.pending_len()
    }

    /// The full WebSocket URL this client connects to.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        self.inner.connection.endpoint()
    }

    /// The underlying connection, for callers that need its full surface.
    #[must_use]
    pub fn connection(&self) -> &ConnectionManager<ServerEvent, EventParser> {
        &self.inner.connection
    }

    fn set_membership(&self, membership: Option<Membership>) {
        *self
            .inner
            .membership
            .write()
            .unwrap_or_else(PoisonError::into_inner) = membership;
    }
}

/// Removes a stream's observer when the stream is dropped.
///
/// Holds only the id, so the registry owns the sending half of the stream.
struct ObserverGuard {
    connection: Connection,
    id: u64,
}

impl Drop for ObserverGuard {
    fn drop(&mut self) {
        self.connection.remove_message_observer_id(self.id);
    }
}

fn chat_endpoint(base_url: &str) -> Result<String> {
    let endpoint = format!("{}{CHAT_PATH}", base_url.trim_end_matches('/'));
    Url::parse(&endpoint)?;
    Ok(endpoint)
}

/// Re-send `JOIN_REGION` shortly after every transition into `connected`.
async fn rejoin_on_connect(
    connection: Connection,
    mut state_rx: watch::Receiver<ConnectionState>,
    membership: SharedMembership,
) {
    let mut was_connected = state_rx.borrow_and_update().is_connected();

    while state_rx.changed().await.is_ok() {
        let connected = state_rx.borrow_and_update().is_connected();
        if connected && !was_connected {
            tokio::spawn(rejoin(connection.clone(), Arc::clone(&membership)));
        }
        was_connected = connected;
    }
}

async fn rejoin(connection: Connection, membership: SharedMembership) {
    sleep(REJOIN_DELAY).await;

    let snapshot = membership
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone();
    let Some(snapshot) = snapshot else {
        return;
    };

    #[cfg(feature = "tracing")]
    tracing::debug!(region = %snapshot.region, "rejoining region after reconnect");

    if let Err(e) = connection.send(&ClientCommand::join(&snapshot)).await {
        #[cfg(feature = "tracing")]
        tracing::warn!(error = %e, region = %snapshot.region, "failed to rejoin region");
        #[cfg(not(feature = "tracing"))]
        let _ = &e;
    }
}

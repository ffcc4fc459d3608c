#![expect(
    clippy::module_name_repetitions,
    reason = "Connection types expose their domain in the name for clarity"
)]

use std::collections::VecDeque;
use std::fmt::Debug;
use std::marker::PhantomData;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use backoff::ExponentialBackoff;
use backoff::backoff::Backoff as _;
use futures::{SinkExt as _, StreamExt as _};
use serde::Serialize;
use strum_macros::Display;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::AbortHandle;
use tokio::time::{sleep, timeout};
use url::Url;

use super::config::Config;
use super::error::WsError;
use super::observer::{Observer, Registry};
use super::traits::{Connector, Frame, MessageParser, Transport, TransportEvent};
use crate::Result;

/// Close code for a normal, caller-initiated closure.
pub const CLOSE_NORMAL: u16 = 1000;
/// Close code sent by a peer that is going away (server shutdown, page unload).
pub const CLOSE_GOING_AWAY: u16 = 1001;
/// Close code used when a transport stream ends without a close frame.
pub const CLOSE_ABNORMAL: u16 = 1006;

const DISCONNECT_REASON: &str = "User disconnected";

/// Connection state tracking.
///
/// Status observers are notified with [`Connected`](Self::Connected),
/// [`Disconnected`](Self::Disconnected), [`Error`](Self::Error) and
/// [`MaxRetriesExceeded`](Self::MaxRetriesExceeded). The remaining states are
/// only visible through [`ConnectionManager::state`] and
/// [`ConnectionManager::state_receiver`].
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ConnectionState {
    /// Not connected
    Disconnected,
    /// Attempting to connect
    Connecting,
    /// Successfully connected
    Connected,
    /// Closing after an explicit disconnect
    Closing,
    /// The last attempt or connection failed
    Error,
    /// Automatic reconnection gave up
    MaxRetriesExceeded,
}

impl ConnectionState {
    /// Check if the connection is currently active.
    #[must_use]
    pub const fn is_connected(self) -> bool {
        matches!(self, Self::Connected)
    }
}

/// Whether a close code ends the session without scheduling a reconnect.
#[must_use]
pub const fn is_normal_closure(code: u16) -> bool {
    matches!(code, CLOSE_NORMAL | CLOSE_GOING_AWAY)
}

/// Why a connection attempt did not open.
#[derive(Debug, Clone, PartialEq, Eq)]
enum OpenFailure {
    Timeout,
    Refused(String),
    Cancelled,
}

impl From<OpenFailure> for WsError {
    fn from(failure: OpenFailure) -> Self {
        match failure {
            OpenFailure::Timeout => WsError::Timeout,
            OpenFailure::Refused(reason) => WsError::ConnectFailed(reason),
            OpenFailure::Cancelled => WsError::Cancelled,
        }
    }
}

/// Progress of one connection attempt, shared by everyone waiting on it.
#[derive(Debug, Clone, PartialEq, Eq)]
enum AttemptStatus {
    Pending,
    Open,
    Failed(OpenFailure),
}

/// Command for the task that owns an open transport.
enum Outbound {
    Text {
        payload: String,
        ack: oneshot::Sender<Result<()>>,
    },
    Close {
        code: u16,
        reason: String,
    },
}

/// How an open connection ended.
enum Ending {
    Closed(u16),
    Failed(String),
    Requested,
}

/// Where a send goes, decided under the lock.
enum Route {
    Direct {
        writer: Option<mpsc::UnboundedSender<Outbound>>,
        payload: String,
    },
    Queued {
        id: u64,
        attempt: watch::Receiver<AttemptStatus>,
    },
}

struct Queued {
    id: u64,
    payload: String,
}

/// The attempt in flight: its outcome channel and the task opening it.
struct Attempt {
    status: Arc<watch::Sender<AttemptStatus>>,
    task: AbortHandle,
}

impl Attempt {
    fn cancel(self) {
        self.status
            .send_replace(AttemptStatus::Failed(OpenFailure::Cancelled));
        self.task.abort();
    }
}

/// Mutable connection state. Only touched under the manager's lock, never
/// across an await.
struct Inner {
    state: ConnectionState,
    /// Bumped by every new attempt and by `disconnect`; tasks holding a stale
    /// epoch stand down.
    epoch: u64,
    attempt: Option<Attempt>,
    writer: Option<mpsc::UnboundedSender<Outbound>>,
    pending: VecDeque<Queued>,
    next_queued_id: u64,
    reconnect_attempts: u32,
    backoff: ExponentialBackoff,
    retry: Option<AbortHandle>,
}

impl Inner {
    fn enqueue(&mut self, payload: String) -> u64 {
        let id = self.next_queued_id;
        self.next_queued_id = self.next_queued_id.wrapping_add(1);
        self.pending.push_back(Queued { id, payload });
        id
    }

    fn cancel_retry(&mut self) {
        if let Some(retry) = self.retry.take() {
            retry.abort();
        }
    }
}

struct Shared<M, P> {
    endpoint: String,
    config: Config,
    parser: P,
    connector: Arc<dyn Connector>,
    inner: Mutex<Inner>,
    state_tx: watch::Sender<ConnectionState>,
    message_observers: Registry<M>,
    status_observers: Registry<ConnectionState>,
}

/// Manages WebSocket connection lifecycle, outbound buffering, reconnection
/// and observer fan-out.
///
/// One manager owns at most one physical connection. Clones are cheap handles
/// onto the same connection; hand them to every consumer instead of keeping a
/// global.
///
/// - Concurrent [`connect`](Self::connect) calls attach to the attempt already
///   in flight.
/// - [`send`](Self::send) transmits immediately when connected, otherwise
///   queues the payload and waits for (or starts) a connection attempt. Queued
///   payloads are delivered in FIFO order once the connection opens.
/// - Abnormal closures and transport errors schedule a reconnect after an
///   exponential backoff, up to [`ReconnectConfig::max_attempts`](super::config::ReconnectConfig).
///
/// # Type Parameters
///
/// - `M`: Inbound message type delivered to message observers
/// - `P`: Parser type that implements [`MessageParser<M>`]
///
/// # Example
///
/// ```ignore
/// let connection = ConnectionManager::new(endpoint, Config::default(), parser, connector);
///
/// connection.add_message_observer(Observer::new(|msg: &MyMessage| println!("{msg:?}")));
/// connection.send(&json!({ "type": "PING" })).await?;
/// ```
pub struct ConnectionManager<M, P> {
    shared: Arc<Shared<M, P>>,
    _message: PhantomData<fn() -> M>,
}

impl<M, P> Clone for ConnectionManager<M, P> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            _message: PhantomData,
        }
    }
}

impl<M, P> ConnectionManager<M, P>
where
    M: Debug + Send + Sync + 'static,
    P: MessageParser<M>,
{
    /// Create a manager in the `disconnected` state.
    ///
    /// No connection is opened until [`connect`](Self::connect) or a send is
    /// issued. The `endpoint` is parsed afresh on every attempt.
    #[must_use]
    pub fn new<C: Connector>(
        endpoint: String,
        config: Config,
        parser: P,
        connector: Arc<C>,
    ) -> Self {
        let connector: Arc<dyn Connector> = connector;
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);
        let backoff = config.reconnect.clone().into();

        Self {
            shared: Arc::new(Shared {
                endpoint,
                config,
                parser,
                connector,
                inner: Mutex::new(Inner {
                    state: ConnectionState::Disconnected,
                    epoch: 0,
                    attempt: None,
                    writer: None,
                    pending: VecDeque::new(),
                    next_queued_id: 0,
                    reconnect_attempts: 0,
                    backoff,
                    retry: None,
                }),
                state_tx,
                message_observers: Registry::new("message"),
                status_observers: Registry::new("status"),
            }),
            _message: PhantomData,
        }
    }

    /// Open the connection, or wait for the attempt already in flight.
    ///
    /// Returns immediately when already connected. Every caller that attaches
    /// to the same attempt observes the same outcome.
    pub async fn connect(&self) -> Result<()> {
        let attempt = {
            let mut inner = self.lock();
            match self.begin_attempt(&mut inner) {
                Some(attempt) => attempt,
                None => return Ok(()),
            }
        };

        wait_for_attempt(attempt).await
    }

    /// Serialize `request` and send it, queueing it across a connection gap.
    ///
    /// - Connected: the frame is written immediately.
    /// - Connecting: the frame is queued and the call resolves with the
    ///   outcome of the attempt in flight.
    /// - Otherwise: the frame is queued and a new attempt is started.
    ///
    /// If the attempt fails, the frame is dropped from the queue and the error
    /// is returned; it is never retried on a later connection.
    pub async fn send<R: Serialize + ?Sized>(&self, request: &R) -> Result<()> {
        let payload = serde_json::to_string(request)?;
        self.send_text(payload).await
    }

    /// Send a pre-serialized text frame with the same semantics as [`send`](Self::send).
    pub async fn send_text(&self, payload: String) -> Result<()> {
        let route = {
            let mut inner = self.lock();
            let in_flight = inner.attempt.is_some();

            match self.begin_attempt(&mut inner) {
                None => Route::Direct {
                    writer: inner.writer.clone(),
                    payload,
                },
                Some(attempt) => {
                    #[cfg(feature = "tracing")]
                    tracing::debug!(
                        in_flight,
                        "not connected, queueing message until the connection opens"
                    );
                    #[cfg(not(feature = "tracing"))]
                    let _ = in_flight;

                    Route::Queued {
                        id: inner.enqueue(payload),
                        attempt,
                    }
                }
            }
        };

        let (id, attempt) = match route {
            Route::Direct {
                writer: Some(writer),
                payload,
            } => return transmit(&writer, payload).await,
            Route::Direct { writer: None, .. } => return Err(WsError::ConnectionClosed.into()),
            Route::Queued { id, attempt } => (id, attempt),
        };

        let outcome = wait_for_attempt(attempt).await;
        if outcome.is_err() {
            self.lock().pending.retain(|queued| queued.id != id);
        }
        outcome
    }

    /// Close the connection with the normal-closure code and stop reconnecting.
    ///
    /// Clears the outbound queue and the reconnect counter. An attempt in
    /// flight is abandoned and its waiters fail with [`WsError::Cancelled`].
    /// Observers stay registered, so a later [`connect`](Self::connect)
    /// resumes delivery.
    pub fn disconnect(&self) {
        {
            let mut inner = self.lock();
            inner.epoch = inner.epoch.wrapping_add(1);
            inner.cancel_retry();
            if let Some(attempt) = inner.attempt.take() {
                attempt.cancel();
            }
            inner.reconnect_attempts = 0;
            inner.backoff.reset();
            inner.pending.clear();

            let closing = inner.writer.take().is_some_and(|writer| {
                writer
                    .send(Outbound::Close {
                        code: CLOSE_NORMAL,
                        reason: DISCONNECT_REASON.to_owned(),
                    })
                    .is_ok()
            });

            #[cfg(feature = "tracing")]
            tracing::debug!(closing, "disconnect requested");

            let state = if closing {
                ConnectionState::Closing
            } else {
                ConnectionState::Disconnected
            };
            self.set_state(&mut inner, state);
        }

        self.shared
            .status_observers
            .notify(&ConnectionState::Disconnected);
    }

    /// [`disconnect`](Self::disconnect), then drop every observer.
    pub fn destroy(&self) {
        self.disconnect();
        self.shared.message_observers.clear();
        self.shared.status_observers.clear();
    }

    /// Register a callback for every parsed inbound message.
    pub fn add_message_observer(&self, observer: Observer<M>) {
        self.shared.message_observers.add(observer);
    }

    pub fn remove_message_observer(&self, observer: &Observer<M>) {
        self.shared.message_observers.remove(observer);
    }

    /// Unregister by [`Observer::id`], for owners that no longer hold the handle.
    pub(crate) fn remove_message_observer_id(&self, id: u64) {
        self.shared.message_observers.remove_id(id);
    }

    /// Register a callback for status transitions.
    pub fn add_status_observer(&self, observer: Observer<ConnectionState>) {
        self.shared.status_observers.add(observer);
    }

    pub fn remove_status_observer(&self, observer: &Observer<ConnectionState>) {
        self.shared.status_observers.remove(observer);
    }

    /// Get the current connection state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.lock().state
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state().is_connected()
    }

    /// Subscribe to connection state changes.
    ///
    /// Unlike status observers this channel also carries `connecting` and
    /// `closing`. Intermediate states may be coalesced.
    #[must_use]
    pub fn state_receiver(&self) -> watch::Receiver<ConnectionState> {
        self.shared.state_tx.subscribe()
    }

    /// Consecutive reconnects scheduled since the last successful open.
    #[must_use]
    pub fn reconnect_attempts(&self) -> u32 {
        self.lock().reconnect_attempts
    }

    /// Number of payloads waiting for a connection.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.lock().pending.len()
    }

    #[must_use]
    pub fn message_observer_count(&self) -> usize {
        self.shared.message_observers.len()
    }

    #[must_use]
    pub fn status_observer_count(&self) -> usize {
        self.shared.status_observers.len()
    }

    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.shared.endpoint
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.shared
            .inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn set_state(&self, inner: &mut Inner, state: ConnectionState) {
        inner.state = state;
        self.shared.state_tx.send_replace(state);
    }

    /// Start a connection attempt unless one is open or in flight.
    ///
    /// Returns `None` when already connected, otherwise a handle on the attempt
    /// (new or existing) to wait on.
    fn begin_attempt(&self, inner: &mut Inner) -> Option<watch::Receiver<AttemptStatus>> {
        if inner.state.is_connected() {
            return None;
        }
        if let Some(attempt) = &inner.attempt {
            return Some(attempt.status.subscribe());
        }

        inner.epoch = inner.epoch.wrapping_add(1);
        inner.cancel_retry();

        let (status, attempt_rx) = watch::channel(AttemptStatus::Pending);
        let status = Arc::new(status);
        self.set_state(inner, ConnectionState::Connecting);

        let this = self.clone();
        let epoch = inner.epoch;
        let attempt_tx = Arc::clone(&status);
        let task = tokio::spawn(async move {
            this.run_connection(epoch, attempt_tx).await;
        })
        .abort_handle();

        inner.attempt = Some(Attempt { status, task });
        Some(attempt_rx)
    }

    /// Drive one attempt from open through to closure.
    async fn run_connection(self, epoch: u64, attempt: Arc<watch::Sender<AttemptStatus>>) {
        #[cfg(feature = "tracing")]
        tracing::debug!(endpoint = %self.shared.endpoint, "connecting");

        let opened = match Url::parse(&self.shared.endpoint) {
            Ok(url) => {
                match timeout(
                    self.shared.config.open_timeout,
                    self.shared.connector.connect(&url),
                )
                .await
                {
                    Ok(Ok(transport)) => Ok(transport),
                    Ok(Err(e)) => Err(OpenFailure::Refused(e.to_string())),
                    Err(_elapsed) => Err(OpenFailure::Timeout),
                }
            }
            Err(e) => Err(OpenFailure::Refused(e.to_string())),
        };

        let mut transport = match opened {
            Ok(transport) => transport,
            Err(failure) => {
                self.attempt_failed(epoch, &attempt, failure);
                return;
            }
        };

        let Some((writer_rx, queued)) = self.attempt_opened(epoch) else {
            // Superseded by `disconnect` while opening.
            attempt.send_replace(AttemptStatus::Failed(OpenFailure::Cancelled));
            let close = Frame::Close {
                code: CLOSE_NORMAL,
                reason: DISCONNECT_REASON.to_owned(),
            };
            if let Err(e) = transport.sink.send(close).await {
                #[cfg(feature = "tracing")]
                tracing::debug!(error = %e, "failed to close superseded connection");
                #[cfg(not(feature = "tracing"))]
                let _ = &e;
            }
            return;
        };

        self.shared
            .status_observers
            .notify(&ConnectionState::Connected);

        for queued in queued {
            if let Err(e) = transport.sink.send(Frame::Text(queued.payload)).await {
                #[cfg(feature = "tracing")]
                tracing::error!(error = %e, "failed to deliver queued message");
                #[cfg(not(feature = "tracing"))]
                let _ = &e;
            }
        }

        attempt.send_replace(AttemptStatus::Open);
        drop(attempt);

        let ending = self.pump(transport, writer_rx).await;
        self.connection_ended(epoch, ending);
    }

    fn attempt_failed(
        &self,
        epoch: u64,
        attempt: &watch::Sender<AttemptStatus>,
        failure: OpenFailure,
    ) {
        let exhausted = {
            let mut inner = self.lock();
            if inner.epoch != epoch {
                attempt.send_replace(AttemptStatus::Failed(OpenFailure::Cancelled));
                return;
            }

            #[cfg(feature = "tracing")]
            tracing::warn!(?failure, "unable to connect");

            inner.attempt = None;
            self.set_state(&mut inner, ConnectionState::Error);
            attempt.send_replace(AttemptStatus::Failed(failure));
            self.schedule_reconnect(&mut inner)
        };

        self.shared.status_observers.notify(&ConnectionState::Error);
        if exhausted {
            self.shared
                .status_observers
                .notify(&ConnectionState::MaxRetriesExceeded);
        }
    }

    /// Promote the attempt to an open connection and take the queued payloads.
    fn attempt_opened(
        &self,
        epoch: u64,
    ) -> Option<(mpsc::UnboundedReceiver<Outbound>, Vec<Queued>)> {
        let mut inner = self.lock();
        if inner.epoch != epoch {
            return None;
        }

        #[cfg(feature = "tracing")]
        tracing::info!(queued = inner.pending.len(), "connected");

        inner.attempt = None;
        inner.reconnect_attempts = 0;
        inner.backoff.reset();

        let (writer_tx, writer_rx) = mpsc::unbounded_channel();
        inner.writer = Some(writer_tx);
        self.set_state(&mut inner, ConnectionState::Connected);

        let queued = inner.pending.drain(..).collect();
        Some((writer_rx, queued))
    }

    /// Shuttle frames between the transport and the manager until it ends.
    ///
    /// Inbound events are fanned out one at a time, in arrival order.
    async fn pump(
        &self,
        transport: Transport,
        mut writer_rx: mpsc::UnboundedReceiver<Outbound>,
    ) -> Ending {
        let Transport {
            mut sink,
            mut stream,
        } = transport;

        loop {
            tokio::select! {
                event = stream.next() => match event {
                    Some(TransportEvent::Text(text)) => self.dispatch(&text),
                    Some(TransportEvent::Closed { code, reason }) => {
                        #[cfg(feature = "tracing")]
                        tracing::info!(code, %reason, "connection closed by peer");
                        #[cfg(not(feature = "tracing"))]
                        let _ = &reason;
                        return Ending::Closed(code);
                    }
                    Some(TransportEvent::Error(reason)) => return Ending::Failed(reason),
                    None => return Ending::Closed(CLOSE_ABNORMAL),
                },

                command = writer_rx.recv() => match command {
                    Some(Outbound::Text { payload, ack }) => {
                        #[cfg(feature = "tracing")]
                        tracing::trace!(%payload, "sending WebSocket message");
                        let sent = sink.send(Frame::Text(payload)).await;
                        _ = ack.send(sent);
                    }
                    Some(Outbound::Close { code, reason }) => {
                        if let Err(e) = sink.send(Frame::Close { code, reason }).await {
                            #[cfg(feature = "tracing")]
                            tracing::debug!(error = %e, "failed to send close frame");
                            #[cfg(not(feature = "tracing"))]
                            let _ = &e;
                        }
                        return Ending::Requested;
                    }
                    None => return Ending::Requested,
                },
            }
        }
    }

    fn dispatch(&self, text: &str) {
        #[cfg(feature = "tracing")]
        tracing::trace!(%text, "received WebSocket text message");

        match self.shared.parser.parse(text.as_bytes()) {
            Ok(messages) => {
                for message in messages {
                    #[cfg(feature = "tracing")]
                    tracing::trace!(?message, "parsed WebSocket message");
                    self.shared.message_observers.notify(&message);
                }
            }
            Err(e) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(%text, error = %e, "failed to parse WebSocket message");
                #[cfg(not(feature = "tracing"))]
                let _ = &e;
            }
        }
    }

    fn connection_ended(&self, epoch: u64, ending: Ending) {
        let (status, exhausted) = {
            let mut inner = self.lock();
            if inner.epoch != epoch {
                // Closed on purpose; settle `closing` unless a new attempt began.
                if inner.state == ConnectionState::Closing {
                    self.set_state(&mut inner, ConnectionState::Disconnected);
                }
                return;
            }

            inner.writer = None;
            match ending {
                Ending::Closed(code) if is_normal_closure(code) => {
                    self.set_state(&mut inner, ConnectionState::Disconnected);
                    (ConnectionState::Disconnected, false)
                }
                Ending::Closed(code) => {
                    #[cfg(feature = "tracing")]
                    tracing::warn!(code, "connection closed abnormally");
                    #[cfg(not(feature = "tracing"))]
                    let _ = code;
                    self.set_state(&mut inner, ConnectionState::Disconnected);
                    (
                        ConnectionState::Disconnected,
                        self.schedule_reconnect(&mut inner),
                    )
                }
                Ending::Failed(reason) => {
                    #[cfg(feature = "tracing")]
                    tracing::error!(%reason, "connection failed");
                    #[cfg(not(feature = "tracing"))]
                    let _ = &reason;
                    self.set_state(&mut inner, ConnectionState::Error);
                    (ConnectionState::Error, self.schedule_reconnect(&mut inner))
                }
                Ending::Requested => {
                    self.set_state(&mut inner, ConnectionState::Disconnected);
                    (ConnectionState::Disconnected, false)
                }
            }
        };

        self.shared.status_observers.notify(&status);
        if exhausted {
            self.shared
                .status_observers
                .notify(&ConnectionState::MaxRetriesExceeded);
        }
    }

    /// Schedule the next automatic attempt.
    ///
    /// Returns `true` when the retry budget is exhausted instead; the state is
    /// then `max_retries_exceeded` and nothing is scheduled.
    fn schedule_reconnect(&self, inner: &mut Inner) -> bool {
        let max_attempts = self.shared.config.reconnect.max_attempts;
        if max_attempts.is_some_and(|max| inner.reconnect_attempts >= max) {
            #[cfg(feature = "tracing")]
            tracing::warn!(
                attempts = inner.reconnect_attempts,
                "maximum reconnection attempts exceeded"
            );
            self.set_state(inner, ConnectionState::MaxRetriesExceeded);
            return true;
        }

        inner.reconnect_attempts = inner.reconnect_attempts.saturating_add(1);
        let delay = inner
            .backoff
            .next_backoff()
            .unwrap_or(self.shared.config.reconnect.max_backoff);

        #[cfg(feature = "tracing")]
        tracing::info!(
            attempt = inner.reconnect_attempts,
            max_attempts = ?max_attempts,
            ?delay,
            "scheduling reconnect"
        );

        let this = self.clone();
        let epoch = inner.epoch;
        inner.cancel_retry();
        let handle = tokio::spawn(async move {
            sleep(delay).await;
            this.fire_reconnect(epoch);
        });
        inner.retry = Some(handle.abort_handle());

        false
    }

    fn fire_reconnect(&self, epoch: u64) {
        let mut inner = self.lock();
        if inner.epoch != epoch || inner.state.is_connected() || inner.attempt.is_some() {
            #[cfg(feature = "tracing")]
            tracing::debug!("skipping scheduled reconnect");
            return;
        }

        inner.retry = None;
        // Nobody waits on a background retry; its outcome surfaces through status observers.
        drop(self.begin_attempt(&mut inner));
    }
}

async fn wait_for_attempt(mut attempt: watch::Receiver<AttemptStatus>) -> Result<()> {
    let status = attempt
        .wait_for(|status| *status != AttemptStatus::Pending)
        .await
        .map(|status| status.clone())
        .map_err(|_closed| WsError::Cancelled)?;

    match status {
        AttemptStatus::Open => Ok(()),
        AttemptStatus::Failed(failure) => Err(WsError::from(failure).into()),
        AttemptStatus::Pending => Err(WsError::Cancelled.into()),
    }
}

async fn transmit(writer: &mpsc::UnboundedSender<Outbound>, payload: String) -> Result<()> {
    let (ack, acked) = oneshot::channel();
    writer
        .send(Outbound::Text { payload, ack })
        .map_err(|_closed| WsError::ConnectionClosed)?;

    acked.await.map_err(|_closed| WsError::ConnectionClosed)?
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normal_closure_codes() {
        assert!(is_normal_closure(CLOSE_NORMAL));
        assert!(is_normal_closure(CLOSE_GOING_AWAY));
        assert!(!is_normal_closure(CLOSE_ABNORMAL));
        assert!(!is_normal_closure(1011));
    }

    #[test]
    fn state_tags_are_snake_case() {
        assert_eq!(ConnectionState::MaxRetriesExceeded.to_string(), "max_retries_exceeded");
        assert_eq!(
            serde_json::to_string(&ConnectionState::Disconnected).unwrap(),
            r#""disconnected""#
        );
    }

    #[test]
    fn open_failures_map_to_ws_errors() {
        assert!(matches!(WsError::from(OpenFailure::Timeout), WsError::Timeout));
        assert!(matches!(
            WsError::from(OpenFailure::Refused("nope".to_owned())),
            WsError::ConnectFailed(reason) if reason == "nope"
        ));
        assert!(matches!(WsError::from(OpenFailure::Cancelled), WsError::Cancelled));
    }
}

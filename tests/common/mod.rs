#![allow(
    clippy::unwrap_used,
    clippy::missing_panics_doc,
    reason = "Do not need additional syntax for setting up tests"
)]
#![allow(
    unused,
    reason = "Each test crate uses a different subset of these helpers"
)]

use std::collections::VecDeque;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::Duration;

use async_trait::async_trait;
use futures::channel::mpsc as fmpsc;
use futures::{Sink, StreamExt as _, future};
use regional_chat_client::Result;
use regional_chat_client::error::Error;
use regional_chat_client::ws::config::{Config, ReconnectConfig};
use regional_chat_client::ws::{
    ConnectionState, Connector, Frame, Observer, Transport, TransportEvent, WsError,
};
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::time::{Instant, timeout};
use url::Url;

pub const BASE_URL: &str = "ws://chat.test";
pub const ENDPOINT: &str = "ws://chat.test/ws/chat";

/// What the fake does with the next connection attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Plan {
    /// Open a transport and hand its far end to the test
    Accept,
    /// Like `Accept`, but writing this exact text frame fails
    AcceptRejecting(&'static str),
    /// Fail immediately
    Refuse,
    /// Never complete
    Hang,
}

/// The server side of one accepted fake connection.
pub struct ServerEnd {
    frames: fmpsc::UnboundedReceiver<Frame>,
    events: fmpsc::UnboundedSender<TransportEvent>,
}

impl ServerEnd {
    /// Deliver a text frame to the client.
    pub fn push(&self, text: impl Into<String>) {
        self.events
            .unbounded_send(TransportEvent::Text(text.into()))
            .unwrap();
    }

    pub fn push_json(&self, value: &Value) {
        self.push(value.to_string());
    }

    /// Close the connection from the server side with `code`.
    pub fn close(&self, code: u16) {
        self.events
            .unbounded_send(TransportEvent::Closed {
                code,
                reason: String::new(),
            })
            .unwrap();
    }

    /// Report a transport error to the client.
    pub fn fail(&self, reason: &str) {
        self.events
            .unbounded_send(TransportEvent::Error(reason.to_owned()))
            .unwrap();
    }

    /// Next frame written by the client.
    pub async fn next_frame(&mut self) -> Frame {
        timeout(Duration::from_secs(60), self.frames.next())
            .await
            .expect("client should write a frame")
            .expect("client should keep the transport open")
    }

    /// Next text frame written by the client, decoded as JSON.
    pub async fn next_json(&mut self) -> Value {
        match self.next_frame().await {
            Frame::Text(text) => serde_json::from_str(&text).unwrap(),
            other => panic!("expected a text frame, got {other:?}"),
        }
    }

    /// Frames already written by the client and not yet read.
    pub fn written(&mut self) -> Vec<Frame> {
        let mut frames = Vec::new();
        while let Ok(Some(frame)) = self.frames.try_next() {
            frames.push(frame);
        }
        frames
    }
}

/// In-memory [`Connector`] that follows a script of [`Plan`]s.
///
/// Once the script runs out every attempt is accepted.
pub struct FakeConnector {
    plans: Mutex<VecDeque<Plan>>,
    attempts: Mutex<Vec<Instant>>,
    servers: mpsc::UnboundedSender<ServerEnd>,
}

impl FakeConnector {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<ServerEnd>) {
        let (servers, accepted) = mpsc::unbounded_channel();
        let connector = Arc::new(Self {
            plans: Mutex::new(VecDeque::new()),
            attempts: Mutex::new(Vec::new()),
            servers,
        });
        (connector, accepted)
    }

    pub fn script(&self, plans: impl IntoIterator<Item = Plan>) {
        self.plans.lock().unwrap().extend(plans);
    }

    /// When each attempt started, on the Tokio clock.
    pub fn attempts(&self) -> Vec<Instant> {
        self.attempts.lock().unwrap().clone()
    }

    pub fn attempt_count(&self) -> usize {
        self.attempts.lock().unwrap().len()
    }
}

#[async_trait]
impl Connector for FakeConnector {
    async fn connect(&self, url: &Url) -> Result<Transport> {
        assert_eq!(url.as_str(), ENDPOINT);
        self.attempts.lock().unwrap().push(Instant::now());
        let plan = self.plans.lock().unwrap().pop_front().unwrap_or(Plan::Accept);

        let rejected = match plan {
            Plan::Refuse => {
                return Err(WsError::Transport("connection refused".to_owned()).into());
            }
            Plan::Hang => future::pending().await,
            Plan::Accept => None,
            Plan::AcceptRejecting(text) => Some(text),
        };

        let (frames_tx, frames) = fmpsc::unbounded();
        let (events, event_rx) = fmpsc::unbounded();
        _ = self.servers.send(ServerEnd { frames, events });

        let sink = FakeSink {
            frames: frames_tx,
            rejected,
        };
        Ok(Transport::new(sink, event_rx))
    }
}

/// Client half of a fake transport.
struct FakeSink {
    frames: fmpsc::UnboundedSender<Frame>,
    rejected: Option<&'static str>,
}

impl Sink<Frame> for FakeSink {
    type Error = Error;

    fn poll_ready(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn start_send(self: Pin<&mut Self>, frame: Frame) -> Result<()> {
        if let (Frame::Text(text), Some(rejected)) = (&frame, self.rejected)
            && text == rejected
        {
            return Err(WsError::Transport(format!("rejected frame {text}")).into());
        }
        self.frames
            .unbounded_send(frame)
            .map_err(|e| WsError::Transport(e.to_string()).into())
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_close(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<()>> {
        self.frames.close_channel();
        Poll::Ready(Ok(()))
    }
}

/// Accept the next connection the client opens.
pub async fn accept(servers: &mut mpsc::UnboundedReceiver<ServerEnd>) -> ServerEnd {
    timeout(Duration::from_secs(120), servers.recv())
        .await
        .expect("client should open a connection")
        .expect("connector should stay alive")
}

/// Records every status notification.
#[derive(Clone, Default)]
pub struct StatusLog(Arc<Mutex<Vec<ConnectionState>>>);

impl StatusLog {
    pub fn observer(&self) -> Observer<ConnectionState> {
        let log = Arc::clone(&self.0);
        Observer::new(move |state: &ConnectionState| log.lock().unwrap().push(*state))
    }

    pub fn seen(&self) -> Vec<ConnectionState> {
        self.0.lock().unwrap().clone()
    }
}

/// Default configuration, with logs enabled for the test when `RUST_LOG` is set.
pub fn config() -> Config {
    init_tracing();
    Config::default()
}

pub fn config_with_max_attempts(max_attempts: Option<u32>) -> Config {
    config().with_reconnect(ReconnectConfig::default().with_max_attempts(max_attempts))
}

fn init_tracing() {
    _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// The `WsError` behind a crate error.
pub fn ws_error(error: &Error) -> &WsError {
    error
        .downcast_ref::<WsError>()
        .unwrap_or_else(|| panic!("expected a WebSocket error, got {error}"))
}

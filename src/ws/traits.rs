//! Core traits for generic WebSocket infrastructure.

use std::fmt;
use std::pin::Pin;

use async_trait::async_trait;
use futures::{Sink, Stream};
use url::Url;

use crate::error::Error;

/// Message parser trait for converting raw bytes to messages.
///
/// # Example
///
/// ```ignore
/// pub struct SimpleParser;
///
/// impl MessageParser<MyMessage> for SimpleParser {
///     fn parse(&self, bytes: &[u8]) -> crate::Result<Vec<MyMessage>> {
///         let msg: MyMessage = serde_json::from_slice(bytes)?;
///         Ok(vec![msg])
///     }
/// }
/// ```
pub trait MessageParser<M>: Send + Sync + 'static {
    /// Parse incoming bytes into messages.
    ///
    /// May return an empty vec for keepalive frames that carry no event.
    fn parse(&self, bytes: &[u8]) -> crate::Result<Vec<M>>;
}

/// Outbound frame handed to a transport.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// JSON text frame
    Text(String),
    /// Close handshake with a status code
    Close { code: u16, reason: String },
}

/// Inbound event reported by a transport.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// Text frame received from the peer
    Text(String),
    /// The peer closed the connection
    Closed { code: u16, reason: String },
    /// The transport failed; no further events follow
    Error(String),
}

pub type FrameSink = Pin<Box<dyn Sink<Frame, Error = Error> + Send>>;
pub type EventStream = Pin<Box<dyn Stream<Item = TransportEvent> + Send>>;

/// An open physical connection, split into its outbound and inbound halves.
///
/// The stream ending without a [`TransportEvent::Closed`] is treated as an
/// abnormal closure.
pub struct Transport {
    pub(crate) sink: FrameSink,
    pub(crate) stream: EventStream,
}

impl Transport {
    pub fn new<Si, St>(sink: Si, stream: St) -> Self
    where
        Si: Sink<Frame, Error = Error> + Send + 'static,
        St: Stream<Item = TransportEvent> + Send + 'static,
    {
        Self {
            sink: Box::pin(sink),
            stream: Box::pin(stream),
        }
    }
}

impl fmt::Debug for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transport").finish_non_exhaustive()
    }
}

/// Opens physical connections for a [`crate::ws::ConnectionManager`].
///
/// Dropping the returned future must abandon the attempt; the manager relies on
/// this to enforce its open timeout.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    async fn connect(&self, url: &Url) -> crate::Result<Transport>;
}

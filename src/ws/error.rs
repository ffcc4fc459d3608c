#![expect(
    clippy::module_name_repetitions,
    reason = "Error types include the module name to indicate their scope"
)]

use std::error::Error as StdError;
use std::fmt;

/// WebSocket error variants.
#[non_exhaustive]
#[derive(Debug)]
pub enum WsError {
    /// Error connecting to or communicating with the WebSocket server
    #[cfg(feature = "ws")]
    Connection(tokio_tungstenite::tungstenite::Error),
    /// Failure reported by a transport implementation
    Transport(String),
    /// The connection attempt failed before the transport became ready
    ConnectFailed(String),
    /// WebSocket connection was closed
    ConnectionClosed,
    /// The transport did not open within the configured window
    Timeout,
    /// The connection attempt was abandoned by an explicit disconnect
    Cancelled,
    /// Error parsing a WebSocket message
    MessageParse(serde_json::Error),
}

impl fmt::Display for WsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            #[cfg(feature = "ws")]
            Self::Connection(e) => write!(f, "WebSocket connection error: {e}"),
            Self::Transport(reason) => write!(f, "WebSocket transport error: {reason}"),
            Self::ConnectFailed(reason) => write!(f, "WebSocket connection failed: {reason}"),
            Self::ConnectionClosed => write!(f, "WebSocket connection closed"),
            Self::Timeout => write!(f, "WebSocket connection timed out"),
            Self::Cancelled => write!(f, "WebSocket connection attempt cancelled"),
            Self::MessageParse(e) => write!(f, "Failed to parse WebSocket message: {e}"),
        }
    }
}

impl StdError for WsError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            #[cfg(feature = "ws")]
            Self::Connection(e) => Some(e),
            Self::MessageParse(e) => Some(e),
            _ => None,
        }
    }
}

// Integration with main Error type
impl From<WsError> for crate::error::Error {
    fn from(e: WsError) -> Self {
        crate::error::Error::with_source(crate::error::Kind::WebSocket, e)
    }
}

#[cfg(feature = "ws")]
impl From<tokio_tungstenite::tungstenite::Error> for crate::error::Error {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        crate::error::Error::with_source(crate::error::Kind::WebSocket, WsError::Connection(e))
    }
}

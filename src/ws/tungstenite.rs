//! [`Connector`] backed by `tokio-tungstenite`.

use async_trait::async_trait;
use futures::{SinkExt as _, StreamExt as _, future};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use url::Url;

use super::traits::{Connector, Frame, Transport, TransportEvent};
use crate::error::Error;

/// Close code reported when the peer sends a close frame without a status.
const CLOSE_NO_STATUS: u16 = 1005;

/// Opens real WebSocket connections over TCP, with TLS for `wss://` endpoints.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, Default)]
pub struct TungsteniteConnector;

#[async_trait]
impl Connector for TungsteniteConnector {
    async fn connect(&self, url: &Url) -> crate::Result<Transport> {
        let (ws_stream, _) = connect_async(url.as_str()).await?;
        let (write, read) = ws_stream.split();

        let sink = write
            .sink_map_err(Error::from)
            .with(|frame: Frame| future::ready(Ok::<_, Error>(to_message(frame))));

        let stream = read.filter_map(|message| future::ready(to_event(message)));

        Ok(Transport::new(sink, stream))
    }
}

fn to_message(frame: Frame) -> Message {
    match frame {
        Frame::Text(text) => Message::Text(text.into()),
        Frame::Close { code, reason } => Message::Close(Some(CloseFrame {
            code: CloseCode::from(code),
            reason: reason.into(),
        })),
    }
}

fn to_event(
    message: Result<Message, tokio_tungstenite::tungstenite::Error>,
) -> Option<TransportEvent> {
    match message {
        Ok(Message::Text(text)) => Some(TransportEvent::Text(text.to_string())),
        Ok(Message::Close(frame)) => Some(match frame {
            Some(frame) => TransportEvent::Closed {
                code: u16::from(frame.code),
                reason: frame.reason.as_str().to_owned(),
            },
            None => TransportEvent::Closed {
                code: CLOSE_NO_STATUS,
                reason: String::new(),
            },
        }),
        Err(e) => Some(TransportEvent::Error(e.to_string())),
        // Binary frames and ping/pong carry no chat events.
        Ok(_) => None,
    }
}

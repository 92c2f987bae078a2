//! Native websocket transport over `tokio-tungstenite`.
//!
//! The stream is split: a writer task drains an unbounded channel, a reader
//! task turns frames into [`ConnectionEvent`]s. Pings are answered through
//! the writer so frames never interleave.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::{HeaderValue, COOKIE};
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use url::Url;

use super::{ConnectionEvent, TransportError};

enum Outbound {
    Text(String),
    Pong(Vec<u8>),
    Close,
}

/// An open socket.
pub struct NativeConnection {
    outbound: mpsc::UnboundedSender<Outbound>,
    events: mpsc::UnboundedReceiver<ConnectionEvent>,
    reader: JoinHandle<()>,
    writer: JoinHandle<()>,
}

/// Open a socket, presenting the session cookies on the upgrade request.
///
/// The first event on success is always [`ConnectionEvent::Ready`].
pub async fn connect(
    url: &Url,
    cookie: Option<&str>,
    connect_timeout: Duration,
) -> Result<NativeConnection, TransportError> {
    let mut request = url
        .as_str()
        .into_client_request()
        .map_err(|e| TransportError::Request(e.to_string()))?;
    if let Some(cookie) = cookie {
        let value = HeaderValue::from_str(cookie).map_err(|e| TransportError::Request(e.to_string()))?;
        request.headers_mut().insert(COOKIE, value);
    }

    let (stream, response) = timeout(connect_timeout, tokio_tungstenite::connect_async(request))
        .await
        .map_err(|_| TransportError::Timeout)?
        .map_err(|e| TransportError::Connect(e.to_string()))?;
    tracing::debug!(status = %response.status(), "websocket handshake complete");

    let (mut sink, mut source) = stream.split();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Outbound>();
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    event_tx.send(ConnectionEvent::Ready).ok();

    let writer = tokio::spawn(async move {
        while let Some(frame) = outbound_rx.recv().await {
            let (message, last) = match frame {
                Outbound::Text(text) => (Message::Text(text), false),
                Outbound::Pong(data) => (Message::Pong(data), false),
                Outbound::Close => (
                    Message::Close(Some(CloseFrame {
                        code: CloseCode::Normal,
                        reason: "logout".into(),
                    })),
                    true,
                ),
            };
            if let Err(error) = sink.send(message).await {
                tracing::warn!(%error, "websocket write failed");
                break;
            }
            if last {
                break;
            }
        }
    });

    let pong_tx = outbound_tx.clone();
    let reader = tokio::spawn(async move {
        let mut closed = None;
        while let Some(frame) = source.next().await {
            match frame {
                Ok(Message::Text(text)) => {
                    event_tx.send(ConnectionEvent::Message(text)).ok();
                }
                Ok(Message::Binary(data)) => match String::from_utf8(data) {
                    Ok(text) => {
                        event_tx.send(ConnectionEvent::Message(text)).ok();
                    }
                    Err(_) => tracing::debug!("dropping non-utf8 binary frame"),
                },
                Ok(Message::Ping(data)) => {
                    pong_tx.send(Outbound::Pong(data)).ok();
                }
                Ok(Message::Pong(_)) | Ok(Message::Frame(_)) => {}
                Ok(Message::Close(frame)) => {
                    closed = Some(match frame {
                        Some(frame) => (Some(u16::from(frame.code)), frame.reason.into_owned()),
                        None => (None, String::new()),
                    });
                    break;
                }
                Err(error) => {
                    event_tx.send(ConnectionEvent::TransportError(error.to_string())).ok();
                    break;
                }
            }
        }
        let (code, reason) = closed.unwrap_or((None, String::new()));
        event_tx.send(ConnectionEvent::Closed { code, reason }).ok();
    });

    Ok(NativeConnection {
        outbound: outbound_tx,
        events: event_rx,
        reader,
        writer,
    })
}

impl NativeConnection {
    /// Queue one text frame.
    pub fn send_text(&self, text: String) -> Result<(), TransportError> {
        self.outbound
            .send(Outbound::Text(text))
            .map_err(|_| TransportError::NotConnected)
    }

    /// Send a normal close frame. A `Closed` event follows once the peer answers.
    pub fn close(&self) {
        self.outbound.send(Outbound::Close).ok();
    }

    /// Next event; `None` once the reader has finished and all events were taken.
    pub async fn next_event(&mut self) -> Option<ConnectionEvent> {
        self.events.recv().await
    }
}

impl Drop for NativeConnection {
    fn drop(&mut self) {
        self.reader.abort();
        self.writer.abort();
    }
}

impl std::fmt::Debug for NativeConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeConnection")
            .field("reader_finished", &self.reader.is_finished())
            .finish_non_exhaustive()
    }
}

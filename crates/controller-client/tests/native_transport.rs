//! Native transport against a local tungstenite server.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::time::Duration;

use controller_client::transport::native::connect;
use controller_client::{ConnectionEvent, TransportError};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use url::Url;

const WAIT: Duration = Duration::from_secs(5);

async fn listener() -> (TcpListener, Url) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = Url::parse(&format!("ws://{}/ws", listener.local_addr().unwrap())).unwrap();
    (listener, url)
}

async fn next(connection: &mut controller_client::transport::native::NativeConnection) -> ConnectionEvent {
    timeout(WAIT, connection.next_event())
        .await
        .expect("event timed out")
        .expect("event stream ended")
}

#[tokio::test]
async fn test_frames_pings_and_remote_close() {
    let (listener, url) = listener().await;
    let (cookie_tx, cookie_rx) = oneshot::channel::<Option<String>>();

    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let callback = move |request: &Request, response: Response| -> Result<Response, ErrorResponse> {
            let cookie = request
                .headers()
                .get("cookie")
                .and_then(|value| value.to_str().ok())
                .map(str::to_string);
            cookie_tx.send(cookie).ok();
            Ok(response)
        };
        let mut ws = tokio_tungstenite::accept_hdr_async(stream, callback).await.unwrap();

        ws.send(Message::Text(r#"{"context":"ORGANIZATION"}"#.to_string()))
            .await
            .unwrap();
        ws.send(Message::Ping(vec![1, 2, 3])).await.unwrap();

        let mut pong = None;
        let mut text = None;
        while pong.is_none() || text.is_none() {
            match ws.next().await.unwrap().unwrap() {
                Message::Pong(data) => pong = Some(data),
                Message::Text(body) => text = Some(body),
                _ => {}
            }
        }

        ws.send(Message::Close(Some(CloseFrame {
            code: CloseCode::Away,
            reason: "restarting".into(),
        })))
        .await
        .unwrap();
        (pong, text)
    });

    let mut connection = connect(&url, Some("sessionId=abc"), WAIT).await.unwrap();
    assert_eq!(next(&mut connection).await, ConnectionEvent::Ready);
    assert_eq!(
        next(&mut connection).await,
        ConnectionEvent::Message(r#"{"context":"ORGANIZATION"}"#.to_string())
    );
    connection.send_text("outbound".to_string()).unwrap();

    assert_eq!(
        next(&mut connection).await,
        ConnectionEvent::Closed {
            code: Some(1001),
            reason: "restarting".to_string(),
        }
    );

    let (pong, text) = timeout(WAIT, server).await.unwrap().unwrap();
    assert_eq!(pong, Some(vec![1, 2, 3]));
    assert_eq!(text.as_deref(), Some("outbound"));
    assert_eq!(cookie_rx.await.unwrap().as_deref(), Some("sessionId=abc"));
}

#[tokio::test]
async fn test_local_close_sends_normal_close_frame() {
    let (listener, url) = listener().await;

    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        let mut frame = None;
        while let Some(Ok(message)) = ws.next().await {
            if let Message::Close(close) = message {
                frame = close.map(|f| (u16::from(f.code), f.reason.into_owned()));
            }
        }
        frame
    });

    let mut connection = connect(&url, None, WAIT).await.unwrap();
    assert_eq!(next(&mut connection).await, ConnectionEvent::Ready);
    connection.close();

    match next(&mut connection).await {
        ConnectionEvent::Closed { code, .. } => assert_eq!(code, Some(1000)),
        other => panic!("expected close, got {other:?}"),
    }
    let frame = timeout(WAIT, server).await.unwrap().unwrap();
    assert_eq!(frame, Some((1000, "logout".to_string())));
}

#[tokio::test]
async fn test_connect_refused() {
    let (listener, url) = listener().await;
    drop(listener);

    let err = connect(&url, None, WAIT).await.unwrap_err();
    assert!(matches!(err, TransportError::Connect(_)));
}

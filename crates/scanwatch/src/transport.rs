//! Frame transports feeding the progress client.
//!
//! The session only sees `FrameChannel`; the WebSocket connection and the
//! replay file are interchangeable behind it.

use std::future::Future;
use std::time::Duration;

use futures_util::StreamExt;
use thiserror::Error;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::debug;
use url::Url;

use scanwatch_core::CloseInfo;

use crate::replay::ReplayChannel;

/// One inbound frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    Binary(Vec<u8>),
    Close(Option<CloseInfo>),
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("connecting to {endpoint} timed out after {timeout_ms} ms")]
    ConnectTimeout { endpoint: String, timeout_ms: u128 },
    #[error("connecting to {endpoint} failed: {source}")]
    Connect {
        endpoint: String,
        #[source]
        source: WsError,
    },
    #[error("websocket error: {0}")]
    Protocol(#[from] WsError),
    #[error("failed to read replay file {path}: {source}")]
    ReplayRead {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Source of frames for one scan, in arrival order.
pub trait FrameChannel {
    /// Next frame, or `None` once the stream has ended. Dropping the returned
    /// future before it completes must not lose a frame.
    fn next_frame(&mut self) -> impl Future<Output = Option<Result<Frame, TransportError>>>;

    /// Release the connection. Closing twice is a no-op.
    fn close(&mut self) -> impl Future<Output = Result<(), TransportError>>;
}

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Receive-only WebSocket connection to a scan endpoint.
pub struct WsChannel {
    stream: WsStream,
    closed: bool,
}

impl WsChannel {
    pub async fn connect(endpoint: &Url, timeout: Duration) -> Result<Self, TransportError> {
        let attempt = tokio_tungstenite::connect_async(endpoint.as_str());
        let (stream, response) = tokio::time::timeout(timeout, attempt)
            .await
            .map_err(|_| TransportError::ConnectTimeout {
                endpoint: endpoint.to_string(),
                timeout_ms: timeout.as_millis(),
            })?
            .map_err(|source| TransportError::Connect {
                endpoint: endpoint.to_string(),
                source,
            })?;
        debug!(status = %response.status(), "websocket handshake complete");
        Ok(Self {
            stream,
            closed: false,
        })
    }
}

impl FrameChannel for WsChannel {
    async fn next_frame(&mut self) -> Option<Result<Frame, TransportError>> {
        if self.closed {
            return None;
        }
        loop {
            let message = match self.stream.next().await? {
                Ok(message) => message,
                Err(WsError::ConnectionClosed | WsError::AlreadyClosed) => return None,
                Err(err) => return Some(Err(err.into())),
            };
            let frame = match message {
                Message::Text(text) => Frame::Text(text.to_string()),
                Message::Binary(data) => Frame::Binary(data.to_vec()),
                Message::Close(close) => Frame::Close(close.map(|close| CloseInfo {
                    code: Some(u16::from(close.code)),
                    reason: close.reason.to_string(),
                })),
                // Pings are answered by tungstenite itself.
                Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => continue,
            };
            return Some(Ok(frame));
        }
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        match self.stream.close(None).await {
            Ok(()) | Err(WsError::ConnectionClosed | WsError::AlreadyClosed) => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

/// Either transport, chosen at startup.
pub enum AnyChannel {
    Ws(WsChannel),
    Replay(ReplayChannel),
}

impl FrameChannel for AnyChannel {
    async fn next_frame(&mut self) -> Option<Result<Frame, TransportError>> {
        match self {
            AnyChannel::Ws(channel) => channel.next_frame().await,
            AnyChannel::Replay(channel) => channel.next_frame().await,
        }
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        match self {
            AnyChannel::Ws(channel) => channel.close().await,
            AnyChannel::Replay(channel) => channel.close().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::SinkExt;
    use tokio::net::TcpListener;
    use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
    use tokio_tungstenite::tungstenite::protocol::CloseFrame;

    async fn serve(messages: Vec<Message>) -> (Url, tokio::task::JoinHandle<Vec<Message>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        let handle = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.expect("accept");
            let mut ws = tokio_tungstenite::accept_async(socket)
                .await
                .expect("handshake");
            for message in messages {
                ws.send(message).await.expect("send");
            }
            // Collect whatever the client sends back until it goes away.
            let mut received = Vec::new();
            while let Some(Ok(message)) = ws.next().await {
                received.push(message);
            }
            received
        });
        let url = Url::parse(&format!("ws://{addr}/ws/scan/test/")).expect("url");
        (url, handle)
    }

    #[tokio::test]
    async fn receives_text_binary_and_skips_pings() {
        let (url, server) = serve(vec![
            Message::Ping(vec![1, 2].into()),
            Message::Text(r#"{"progress": 10}"#.into()),
            Message::Binary(br#"{"log": "bin"}"#.to_vec().into()),
        ])
        .await;
        let mut channel = WsChannel::connect(&url, Duration::from_secs(5))
            .await
            .expect("connect");

        let first = channel.next_frame().await.expect("frame").expect("ok");
        assert_eq!(first, Frame::Text(r#"{"progress": 10}"#.to_string()));
        let second = channel.next_frame().await.expect("frame").expect("ok");
        assert_eq!(second, Frame::Binary(br#"{"log": "bin"}"#.to_vec()));

        channel.close().await.expect("close");
        channel.close().await.expect("second close is a no-op");
        assert!(channel.next_frame().await.is_none());
        drop(channel);

        // Receive-only: the client never sends application data.
        let received = server.await.expect("server task");
        assert!(!received
            .iter()
            .any(|message| matches!(message, Message::Text(_) | Message::Binary(_))));
    }

    #[tokio::test]
    async fn reports_server_close_details() {
        let (url, server) = serve(vec![Message::Close(Some(CloseFrame {
            code: CloseCode::Error,
            reason: "worker crashed".into(),
        }))])
        .await;
        let mut channel = WsChannel::connect(&url, Duration::from_secs(5))
            .await
            .expect("connect");

        let frame = channel.next_frame().await.expect("frame").expect("ok");
        assert_eq!(
            frame,
            Frame::Close(Some(CloseInfo {
                code: Some(1011),
                reason: "worker crashed".to_string(),
            }))
        );
        drop(channel);
        server.await.expect("server task");
    }

    #[tokio::test]
    async fn connect_failure_is_reported() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        drop(listener);
        let url = Url::parse(&format!("ws://{addr}/ws/scan/none/")).expect("url");
        let err = WsChannel::connect(&url, Duration::from_secs(5))
            .await
            .err()
            .expect("connect should fail");
        assert!(matches!(err, TransportError::Connect { .. }));
    }
}

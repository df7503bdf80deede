use super::EchoMessage;
use crate::common::EchoClient;
use crate::{EchoError, Result};
use async_trait::async_trait;
use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::protocol::WebSocketConfig as ProtocolConfig;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, trace};

/// Configuration for WebSocket clients
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Time allowed for TCP connect plus the opening handshake
    pub connect_timeout: Duration,
    /// Time to wait for each incoming message
    pub read_timeout: Duration,
    /// Time allowed to send a message
    pub write_timeout: Duration,
    /// Maximum response size to prevent memory exhaustion
    pub max_message_size: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            read_timeout: Duration::from_secs(30),
            write_timeout: Duration::from_secs(30),
            max_message_size: 16 * 1024 * 1024, // 16MB
        }
    }
}

/// WebSocket client for talking to an echo server
///
/// # Examples
///
/// ```no_run
/// use wsecho::WebSocketEchoClient;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let mut client = WebSocketEchoClient::connect("ws://localhost:9001/").await?;
///
///     client.send_text("hello").await?;
///     let reply = client.receive().await?;
///     assert_eq!(reply.as_text(), Some("hello"));
///
///     client.close().await?;
///     Ok(())
/// }
/// ```
pub struct WebSocketEchoClient {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
    config: ClientConfig,
}

impl WebSocketEchoClient {
    /// Connect to a `ws://` URL with custom configuration
    pub async fn connect_with_config(url: &str, config: ClientConfig) -> Result<Self> {
        let mut protocol = ProtocolConfig::default();
        protocol.max_message_size = Some(config.max_message_size);

        let (stream, response) = timeout(
            config.connect_timeout,
            tokio_tungstenite::connect_async_with_config(url, Some(protocol), true),
        )
        .await
        .map_err(|_| EchoError::Timeout(format!("Connecting to {url} timed out")))??;

        debug!(url, status = %response.status(), "Connected");
        Ok(Self { stream, config })
    }

    /// Connect with default configuration
    pub async fn connect(url: &str) -> Result<Self> {
        Self::connect_with_config(url, ClientConfig::default()).await
    }

    pub async fn send(&mut self, message: EchoMessage) -> Result<()> {
        let frame = Message::try_from(message)?;
        self.send_frame(frame).await
    }

    pub async fn send_text(&mut self, text: &str) -> Result<()> {
        self.send(EchoMessage::text(text)).await
    }

    pub async fn send_binary(&mut self, data: impl Into<Bytes>) -> Result<()> {
        self.send(EchoMessage::binary(data)).await
    }

    /// Sends a ping and waits for the pong carrying the same payload
    ///
    /// Data messages that arrive before the pong are treated as an error,
    /// so only ping when no replies are outstanding.
    pub async fn ping(&mut self, payload: impl Into<Bytes>) -> Result<()> {
        let payload = payload.into();
        self.send_frame(Message::Ping(payload.clone())).await?;

        loop {
            match self.next_frame().await? {
                Message::Pong(pong) if pong == payload => return Ok(()),
                Message::Pong(_) | Message::Ping(_) => continue,
                Message::Close(_) => return Err(EchoError::ConnectionClosed),
                other => {
                    return Err(EchoError::UnexpectedMessage(format!(
                        "expected pong, got {other:?}"
                    )));
                }
            }
        }
    }

    /// Waits for the next data message, skipping control frames
    pub async fn receive(&mut self) -> Result<EchoMessage> {
        loop {
            match EchoMessage::try_from(self.next_frame().await?) {
                Ok(message) => return Ok(message),
                Err(Message::Close(frame)) => {
                    debug!(?frame, "Peer closed while a message was expected");
                    return Err(EchoError::ConnectionClosed);
                }
                Err(control) => trace!(frame = ?control, "Skipping control frame"),
            }
        }
    }

    /// Performs the closing handshake and waits for the server to hang up
    pub async fn close(mut self) -> Result<()> {
        match self.stream.close(None).await {
            Ok(())
            | Err(tungstenite::Error::ConnectionClosed)
            | Err(tungstenite::Error::AlreadyClosed) => {}
            Err(e) => return Err(e.into()),
        }

        loop {
            let next = timeout(self.config.read_timeout, self.stream.next())
                .await
                .map_err(|_| EchoError::Timeout("Close handshake timeout".to_string()))?;
            match next {
                None
                | Some(Err(tungstenite::Error::ConnectionClosed))
                | Some(Err(tungstenite::Error::AlreadyClosed)) => break,
                Some(Ok(frame)) => trace!(?frame, "Draining after close"),
                Some(Err(e)) => return Err(e.into()),
            }
        }

        debug!("Connection closed");
        Ok(())
    }

    async fn send_frame(&mut self, frame: Message) -> Result<()> {
        timeout(self.config.write_timeout, self.stream.send(frame))
            .await
            .map_err(|_| EchoError::Timeout("Write timeout".to_string()))??;
        Ok(())
    }

    async fn next_frame(&mut self) -> Result<Message> {
        let next = timeout(self.config.read_timeout, self.stream.next())
            .await
            .map_err(|_| EchoError::Timeout("Read timeout".to_string()))?;
        match next {
            Some(frame) => Ok(frame?),
            None => Err(EchoError::ConnectionClosed),
        }
    }

    /// Sends `message` and checks that the reply comes back with the same framing
    async fn round_trip(&mut self, message: EchoMessage) -> Result<EchoMessage> {
        let kind = message.kind();
        self.send(message).await?;

        let reply = self.receive().await?;
        if reply.kind() != kind {
            return Err(EchoError::UnexpectedMessage(format!(
                "sent {kind:?}, got {:?}",
                reply.kind()
            )));
        }
        Ok(reply)
    }
}

#[async_trait]
impl EchoClient for WebSocketEchoClient {
    async fn echo(&mut self, data: &[u8]) -> Result<Vec<u8>> {
        let reply = self
            .round_trip(EchoMessage::binary(Bytes::copy_from_slice(data)))
            .await?;
        Ok(reply.into_payload().to_vec())
    }

    async fn echo_string(&mut self, data: &str) -> Result<String> {
        let reply = self.round_trip(EchoMessage::text(data)).await?;
        Ok(std::str::from_utf8(reply.payload())?.to_owned())
    }
}

/// Builder for client configuration
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: ClientConfig::default(),
        }
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.config.read_timeout = timeout;
        self
    }

    pub fn write_timeout(mut self, timeout: Duration) -> Self {
        self.config.write_timeout = timeout;
        self
    }

    pub fn max_message_size(mut self, size: usize) -> Self {
        self.config.max_message_size = size;
        self
    }

    pub fn build(self) -> ClientConfig {
        self.config
    }
}

impl Default for ClientConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

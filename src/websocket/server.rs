use super::{CloseInfo, EchoHandler, EchoMessage, MessageHandler, Peer, WebSocketConfig, ws_url};
use crate::common::{EchoServerTrait, Reactor};
use crate::{EchoError, Result};
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use std::io::Write;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::net::{TcpListener, TcpStream};
use tokio::{signal, time::timeout};
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tracing::{Instrument, debug, error, info, trace, warn};

type HandshakeResult = std::result::Result<Response, ErrorResponse>;

/// WebSocket echo server
///
/// Every accepted connection is upgraded and served on its own task. Each
/// complete data message is passed to the handler, and its reply is sent
/// back on the same connection. When a connection ends the handler's
/// `on_close` runs; the stock [`EchoHandler`] stops the reactor there, which
/// ends [`serve`](Self::serve).
///
/// # Examples
///
/// Single-shot fixture that exits after its first client leaves:
///
/// ```no_run
/// use wsecho::{EchoServerTrait, WebSocketConfig, WebSocketEchoServer};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = WebSocketConfig::default().with_announce_ready(true);
///     let server = WebSocketEchoServer::new(config);
///     server.run().await?;
///     Ok(())
/// }
/// ```
///
/// Stopping a long-running server from elsewhere:
///
/// ```no_run
/// use wsecho::{EchoHandler, Reactor, WebSocketConfig, WebSocketEchoServer};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let reactor = Reactor::new();
///     let config = WebSocketConfig::default();
///     let server = WebSocketEchoServer::with_handler(config, EchoHandler::persistent())
///         .with_reactor(reactor.clone());
///
///     let listener = server.bind().await?;
///     let server_handle = tokio::spawn(async move { server.serve(listener).await });
///
///     // Do other work...
///
///     reactor.stop();
///     server_handle.await??;
///     Ok(())
/// }
/// ```
pub struct WebSocketEchoServer<H: MessageHandler = EchoHandler> {
    config: WebSocketConfig,
    handler: Arc<H>,
    reactor: Reactor,
}

impl WebSocketEchoServer<EchoHandler> {
    /// Creates a single-shot echo server with the given configuration
    pub fn new(config: WebSocketConfig) -> Self {
        Self::with_handler(config, EchoHandler::new())
    }
}

impl<H: MessageHandler> WebSocketEchoServer<H> {
    pub fn with_handler(config: WebSocketConfig, handler: H) -> Self {
        Self {
            config,
            handler: Arc::new(handler),
            reactor: Reactor::new(),
        }
    }

    /// Replaces the server's reactor with one owned by the caller
    pub fn with_reactor(mut self, reactor: Reactor) -> Self {
        self.reactor = reactor;
        self
    }

    pub fn config(&self) -> &WebSocketConfig {
        &self.config
    }

    /// Binds the listening socket and, if configured, announces readiness on stdout
    pub async fn bind(&self) -> Result<TcpListener> {
        let listener = TcpListener::bind(self.config.bind_addr)
            .await
            .map_err(|e| {
                EchoError::Config(format!(
                    "Failed to bind WebSocket listener on {}: {}",
                    self.config.bind_addr, e
                ))
            })?;
        let local_addr = listener.local_addr()?;

        info!(
            address = %local_addr,
            max_connections = self.config.max_connections,
            "WebSocket echo server listening"
        );

        if self.config.announce_ready {
            announce_ready(local_addr)?;
        }
        Ok(listener)
    }

    /// Accepts connections until the reactor stops or Ctrl-C is received
    pub async fn serve(&self, listener: TcpListener) -> Result<()> {
        let connection_count = Arc::new(AtomicUsize::new(0));
        let mut next_id: u64 = 0;

        loop {
            tokio::select! {
                accept_result = listener.accept() => {
                    match accept_result {
                        Ok((stream, addr)) => {
                            next_id += 1;
                            let id = next_id;

                            let current_count = connection_count.load(Ordering::SeqCst);
                            if current_count >= self.config.max_connections {
                                warn!(
                                    %addr,
                                    current = current_count,
                                    limit = self.config.max_connections,
                                    "Connection rejected: limit reached"
                                );
                                drop(stream);
                                let peer = Peer::unopened(id, addr);
                                let info = CloseInfo::dropped("connection limit reached");
                                self.handler.on_close(&peer, &info, &self.reactor);
                                continue;
                            }

                            let new_count = connection_count.fetch_add(1, Ordering::SeqCst) + 1;
                            info!(%addr, id, current = new_count, "Accepted connection");

                            let config = self.config.clone();
                            let handler = self.handler.clone();
                            let reactor = self.reactor.clone();
                            let connection_count = connection_count.clone();
                            let span = tracing::info_span!("connection", id, %addr);

                            tokio::spawn(async move {
                                let connection = Self::handle_connection(
                                    stream, addr, id, config, handler, reactor,
                                );
                                let result = connection.instrument(span).await;
                                if let Err(e) = result {
                                    error!(%addr, id, error = %e, "Error handling connection");
                                }
                                let final_count =
                                    connection_count.fetch_sub(1, Ordering::SeqCst) - 1;
                                info!(%addr, id, current = final_count, "Connection finished");
                            });
                        }
                        Err(e) => {
                            error!(error = %e, "Failed to accept connection");
                        }
                    }
                }
                _ = signal::ctrl_c() => {
                    info!("Received shutdown signal, stopping server");
                    self.reactor.stop();
                    break;
                }
                _ = self.reactor.stopped() => {
                    info!("Reactor stopped, no longer accepting connections");
                    break;
                }
            }
        }

        info!("WebSocket echo server stopped");
        Ok(())
    }

    /// Upgrades one TCP connection and echoes until it ends
    ///
    /// `on_close` runs on every exit path, including a failed or timed-out upgrade.
    async fn handle_connection(
        stream: TcpStream,
        addr: SocketAddr,
        id: u64,
        config: WebSocketConfig,
        handler: Arc<H>,
        reactor: Reactor,
    ) -> Result<()> {
        let (path, mut ws) = match Self::upgrade(stream, addr, &config).await {
            Ok(upgraded) => upgraded,
            Err(e) => {
                let peer = Peer::unopened(id, addr);
                let info = CloseInfo::dropped(e.to_string());
                info!(%peer, reason = %info.reason, "Upgrade failed");
                handler.on_close(&peer, &info, &reactor);
                return Err(e);
            }
        };

        let peer = Peer { id, addr, path };
        info!(%peer, "WebSocket connection open");
        handler.on_open(&peer);

        let mut close_frame = None;
        let result =
            Self::echo_messages(&mut ws, &peer, handler.as_ref(), &mut close_frame).await;

        let close_info = match (close_frame, &result) {
            (Some(info), _) => info,
            (None, Err(e)) => CloseInfo::dropped(e.to_string()),
            (None, Ok(())) => CloseInfo::dropped("stream ended without a close frame"),
        };
        info!(
            %peer,
            clean = close_info.was_clean,
            code = ?close_info.code,
            reason = %close_info.reason,
            "WebSocket connection closed"
        );
        handler.on_close(&peer, &close_info, &reactor);

        result
    }

    /// Runs the opening handshake, returning the request path and the upgraded stream
    async fn upgrade(
        stream: TcpStream,
        addr: SocketAddr,
        config: &WebSocketConfig,
    ) -> Result<(String, WebSocketStream<TcpStream>)> {
        let mut path = String::from("/");
        let record_path = |request: &Request, response: Response| -> HandshakeResult {
            path = request.uri().path().to_owned();
            debug!(path = %path, "Upgrade request");
            Ok(response)
        };

        let handshake = tokio_tungstenite::accept_hdr_async_with_config(
            stream,
            record_path,
            Some(config.protocol_config()),
        );
        let ws = timeout(config.handshake_timeout, handshake)
            .await
            .map_err(|_| {
                EchoError::Timeout(format!("WebSocket handshake with {addr} timed out"))
            })??;

        Ok((path, ws))
    }

    /// Reads messages until the stream ends, recording the peer's close frame if one arrives
    async fn echo_messages(
        ws: &mut WebSocketStream<TcpStream>,
        peer: &Peer,
        handler: &H,
        close_frame: &mut Option<CloseInfo>,
    ) -> Result<()> {
        while let Some(frame) = ws.next().await {
            match EchoMessage::try_from(frame?) {
                Ok(message) => {
                    debug!(
                        kind = ?message.kind(),
                        size = message.len(),
                        preview = %message.preview(),
                        "Received message"
                    );

                    if let Some(reply) = handler.on_message(peer, message) {
                        let size = reply.len();
                        ws.send(Message::try_from(reply)?).await?;
                        debug!(size, "Echoed message");
                    }
                }
                Err(Message::Close(frame)) => {
                    let info = match frame {
                        Some(frame) => {
                            CloseInfo::clean(Some(u16::from(frame.code)), frame.reason.to_string())
                        }
                        None => CloseInfo::clean(None, ""),
                    };
                    debug!(code = ?info.code, reason = %info.reason, "Received close frame");
                    *close_frame = Some(info);
                }
                // Ping replies are queued by tungstenite itself.
                Err(control) => trace!(frame = ?control, "Control frame"),
            }
        }

        Ok(())
    }
}

/// Writes the readiness line and flushes both standard streams
fn announce_ready(addr: SocketAddr) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "ready {}", ws_url(addr))?;
    stdout.flush()?;
    std::io::stderr().flush()?;
    Ok(())
}

#[async_trait]
impl<H: MessageHandler> EchoServerTrait for WebSocketEchoServer<H> {
    /// Binds, then serves until the reactor stops
    async fn run(&self) -> Result<()> {
        let listener = self.bind().await?;
        self.serve(listener).await
    }

    fn reactor(&self) -> Reactor {
        self.reactor.clone()
    }
}

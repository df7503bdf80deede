use crate::websocket::{EchoHandler, MessageHandler, WebSocketConfig, WebSocketEchoServer};
use crate::Result;
use std::net::SocketAddr;
use tokio::task::JoinHandle;

/// Spawns an echo server on an ephemeral loopback port for integration tests
///
/// The listener is bound before the task is spawned, so the returned
/// address accepts connections as soon as this function returns.
/// The server stops after the first connection closes.
pub async fn spawn_test_server() -> Result<(JoinHandle<Result<()>>, SocketAddr)> {
    let config = WebSocketConfig::new(SocketAddr::from(([127, 0, 0, 1], 0)));
    spawn_test_server_with_handler(EchoHandler::new(), config).await
}

/// Spawns a test server with a custom handler and configuration
///
/// `config.bind_addr` is honoured as given; use port 0 to let the
/// OS pick a free port.
pub async fn spawn_test_server_with_handler<H: MessageHandler>(
    handler: H,
    config: WebSocketConfig,
) -> Result<(JoinHandle<Result<()>>, SocketAddr)> {
    let server = WebSocketEchoServer::with_handler(config, handler);
    let listener = server.bind().await?;
    let addr = listener.local_addr()?;

    let server_handle = tokio::spawn(async move { server.serve(listener).await });

    Ok((server_handle, addr))
}

//! WebSocket echo server implementation
//!
//! The server accepts WebSocket upgrades and hands every complete data
//! message to a [`MessageHandler`]. Handshake, framing, masking and
//! ping/pong are left to tungstenite.

pub mod client;
pub mod config;
pub mod handler;
pub mod message;
pub mod server;


use std::net::SocketAddr;

pub use client::{ClientConfig, ClientConfigBuilder, WebSocketEchoClient};
pub use config::{DEFAULT_PORT, WebSocketConfig, resolve_bind_addr};
pub use handler::{CloseInfo, EchoHandler, MessageHandler, Peer};
pub use message::{EchoMessage, MessageKind};
pub use server::WebSocketEchoServer;

/// `ws://` URL for a bound address
pub fn ws_url(addr: SocketAddr) -> String {
    format!("ws://{addr}/")
}

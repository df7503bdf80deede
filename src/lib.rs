use thiserror::Error;
use tokio_tungstenite::tungstenite;

/// Error types for the wsecho library
#[derive(Error, Debug)]
pub enum EchoError {
    /// Socket-level errors (bind, accept, connect)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// WebSocket protocol errors reported by tungstenite (handshake, framing, closed streams)
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Timeout errors
    #[error("Timeout error: {0}")]
    Timeout(String),

    /// Text payload that is not valid UTF-8
    #[error("UTF-8 error: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    /// The peer answered with a message of the wrong kind
    #[error("Unexpected message: {0}")]
    UnexpectedMessage(String),

    /// The peer closed the connection while a reply was still expected
    #[error("Connection closed by peer")]
    ConnectionClosed,
}

/// Result type for the wsecho library
pub type Result<T> = std::result::Result<T, EchoError>;

pub mod common;
pub mod websocket;

// Re-export main types for convenience
pub use common::{EchoClient, EchoServerTrait, Reactor};
pub use websocket::{
    ClientConfig, ClientConfigBuilder, CloseInfo, EchoHandler, EchoMessage, MessageHandler,
    MessageKind, Peer, WebSocketConfig, WebSocketEchoClient, WebSocketEchoServer,
};

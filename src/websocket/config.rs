use crate::{EchoError, Result};
use std::net::SocketAddr;
use std::time::Duration;
use tokio_tungstenite::tungstenite::protocol::WebSocketConfig as ProtocolConfig;

/// Port the fixture listens on unless told otherwise
pub const DEFAULT_PORT: u16 = 9001;

/// Resolves a `host:port` listen address
///
/// When a name resolves to several addresses an IPv4 one is chosen, so
/// `localhost` binds `127.0.0.1` only. Clients must then reach the server
/// over IPv4; pass `[::1]:PORT` explicitly to listen on IPv6 loopback.
pub async fn resolve_bind_addr(address: &str) -> Result<SocketAddr> {
    let candidates: Vec<SocketAddr> = tokio::net::lookup_host(address)
        .await
        .map_err(|e| EchoError::Config(format!("Failed to resolve {address}: {e}")))?
        .collect();

    candidates
        .iter()
        .find(|addr| addr.is_ipv4())
        .or_else(|| candidates.first())
        .copied()
        .ok_or_else(|| EchoError::Config(format!("{address} did not resolve to any address")))
}

/// Configuration for the WebSocket echo server
///
/// # Examples
///
/// ```
/// use wsecho::websocket::WebSocketConfig;
/// use std::time::Duration;
///
/// let config = WebSocketConfig::new("127.0.0.1:9001".parse().unwrap())
///     .with_max_connections(1)
///     .with_handshake_timeout(Duration::from_secs(5))
///     .with_announce_ready(true);
///
/// assert_eq!(config.max_connections, 1);
/// assert!(config.announce_ready);
/// ```
#[derive(Debug, Clone)]
pub struct WebSocketConfig {
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Maximum number of concurrent connections
    pub max_connections: usize,
    /// Largest message accepted from a peer; `None` uses tungstenite's default
    pub max_message_size: Option<usize>,
    /// Largest single frame accepted from a peer; `None` uses tungstenite's default
    pub max_frame_size: Option<usize>,
    /// Time allowed for a client to complete the opening handshake
    pub handshake_timeout: Duration,
    /// Print a readiness line on stdout once the listener is bound
    pub announce_ready: bool,
}

impl WebSocketConfig {
    /// Create a new configuration with the given address
    pub fn new(bind_addr: SocketAddr) -> Self {
        Self {
            bind_addr,
            ..Self::default()
        }
    }

    /// Set the connection limit
    pub fn with_max_connections(mut self, max_connections: usize) -> Self {
        self.max_connections = max_connections;
        self
    }

    /// Set the message and frame size limits
    pub fn with_size_limits(mut self, max_message_size: usize, max_frame_size: usize) -> Self {
        self.max_message_size = Some(max_message_size);
        self.max_frame_size = Some(max_frame_size);
        self
    }

    /// Set the opening handshake timeout
    pub fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    /// Enable or disable the stdout readiness line
    pub fn with_announce_ready(mut self, announce_ready: bool) -> Self {
        self.announce_ready = announce_ready;
        self
    }

    /// Protocol-level settings handed to tungstenite for every connection
    pub fn protocol_config(&self) -> ProtocolConfig {
        let mut config = ProtocolConfig::default();
        if let Some(max_message_size) = self.max_message_size {
            config.max_message_size = Some(max_message_size);
        }
        if let Some(max_frame_size) = self.max_frame_size {
            config.max_frame_size = Some(max_frame_size);
        }
        config
    }
}

impl Default for WebSocketConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], DEFAULT_PORT)),
            max_connections: 100,
            max_message_size: None,
            max_frame_size: None,
            handshake_timeout: Duration::from_secs(10),
            announce_ready: false,
        }
    }
}

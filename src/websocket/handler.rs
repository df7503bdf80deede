use super::EchoMessage;
use crate::common::Reactor;
use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

/// The remote end of an accepted WebSocket connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Peer {
    /// Per-server connection number, starting at 1
    pub id: u64,
    pub addr: SocketAddr,
    /// Request path from the upgrade request
    pub path: String,
}

impl Peer {
    /// A connection that never completed the upgrade
    pub fn unopened(id: u64, addr: SocketAddr) -> Self {
        Self {
            id,
            addr,
            path: "/".to_string(),
        }
    }
}

impl fmt::Display for Peer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} {}{}", self.id, self.addr, self.path)
    }
}

/// How a connection ended
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CloseInfo {
    /// True when the peer completed the closing handshake
    pub was_clean: bool,
    /// Close code sent by the peer, if any
    pub code: Option<u16>,
    pub reason: String,
}

impl CloseInfo {
    pub fn clean(code: Option<u16>, reason: impl Into<String>) -> Self {
        Self {
            was_clean: true,
            code,
            reason: reason.into(),
        }
    }

    /// Connection lost without a closing handshake (reset, protocol error, EOF)
    pub fn dropped(reason: impl Into<String>) -> Self {
        Self {
            was_clean: false,
            code: None,
            reason: reason.into(),
        }
    }
}

/// Callbacks the server invokes for each connection
///
/// Implementations are shared between connection tasks, so they must be
/// `Send + Sync`. Callbacks run inline on the connection's task and should
/// not block.
pub trait MessageHandler: Send + Sync + 'static {
    /// Called once the upgrade handshake has completed. Not called for
    /// connections that fail the upgrade or are turned away at the limit.
    fn on_open(&self, _peer: &Peer) {}

    /// Called once per complete data message. The returned message, if any,
    /// is sent back to the same peer.
    fn on_message(&self, peer: &Peer, message: EchoMessage) -> Option<EchoMessage>;

    /// Called exactly once for every accepted connection when it ends: after
    /// a close frame, a reset, a failed or timed-out upgrade, or a rejection
    /// at the connection limit.
    fn on_close(&self, peer: &Peer, info: &CloseInfo, reactor: &Reactor);
}

impl<T: MessageHandler> MessageHandler for Arc<T> {
    fn on_open(&self, peer: &Peer) {
        (**self).on_open(peer)
    }

    fn on_message(&self, peer: &Peer, message: EchoMessage) -> Option<EchoMessage> {
        (**self).on_message(peer, message)
    }

    fn on_close(&self, peer: &Peer, info: &CloseInfo, reactor: &Reactor) {
        (**self).on_close(peer, info, reactor)
    }
}

/// Echoes every message unchanged and, by default, stops the reactor on close
#[derive(Debug, Clone)]
pub struct EchoHandler {
    stop_on_close: bool,
}

impl EchoHandler {
    /// Single-shot handler: the first closed connection stops the server
    pub fn new() -> Self {
        Self {
            stop_on_close: true,
        }
    }

    /// Handler that keeps the server running after connections close
    pub fn persistent() -> Self {
        Self {
            stop_on_close: false,
        }
    }

    pub fn stops_on_close(&self) -> bool {
        self.stop_on_close
    }
}

impl Default for EchoHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageHandler for EchoHandler {
    fn on_message(&self, _peer: &Peer, message: EchoMessage) -> Option<EchoMessage> {
        Some(message)
    }

    fn on_close(&self, peer: &Peer, info: &CloseInfo, reactor: &Reactor) {
        if self.stop_on_close {
            info!(%peer, clean = info.was_clean, "Peer closed, stopping server");
            reactor.stop();
        }
    }
}

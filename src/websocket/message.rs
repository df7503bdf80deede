use crate::{EchoError, Result};
use bytes::Bytes;
use std::fmt;
use tokio_tungstenite::tungstenite::{Message, Utf8Bytes};

/// Framing of a data message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Text,
    Binary,
}

/// A complete data message: payload bytes plus their framing
///
/// Text messages always carry valid UTF-8. Control frames (ping, pong,
/// close) never become an `EchoMessage`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EchoMessage {
    payload: Bytes,
    kind: MessageKind,
}

impl EchoMessage {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            payload: Bytes::from(text.into()),
            kind: MessageKind::Text,
        }
    }

    pub fn binary(payload: impl Into<Bytes>) -> Self {
        Self {
            payload: payload.into(),
            kind: MessageKind::Binary,
        }
    }

    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    pub fn kind(&self) -> MessageKind {
        self.kind
    }

    pub fn is_binary(&self) -> bool {
        self.kind == MessageKind::Binary
    }

    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    /// Returns the payload as text, if this is a text message
    pub fn as_text(&self) -> Option<&str> {
        match self.kind {
            MessageKind::Text => std::str::from_utf8(&self.payload).ok(),
            MessageKind::Binary => None,
        }
    }

    pub fn into_payload(self) -> Bytes {
        self.payload
    }

    /// Short human-readable summary used in log lines
    pub fn preview(&self) -> String {
        const PREVIEW_LEN: usize = 64;
        match self.as_text() {
            Some(text) if text.chars().count() > PREVIEW_LEN => {
                let head: String = text.chars().take(PREVIEW_LEN).collect();
                format!("{head}...")
            }
            Some(text) => text.to_owned(),
            None => format!("<{} bytes>", self.payload.len()),
        }
    }
}

impl fmt::Display for EchoMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}({})", self.kind, self.preview())
    }
}

impl TryFrom<Message> for EchoMessage {
    /// Control and raw frames are handed back unchanged
    type Error = Message;

    fn try_from(message: Message) -> std::result::Result<Self, Message> {
        match message {
            text @ Message::Text(_) => Ok(Self {
                payload: text.into_data(),
                kind: MessageKind::Text,
            }),
            Message::Binary(payload) => Ok(Self::binary(payload)),
            other => Err(other),
        }
    }
}

impl TryFrom<EchoMessage> for Message {
    type Error = EchoError;

    fn try_from(message: EchoMessage) -> Result<Self> {
        match message.kind {
            MessageKind::Text => Ok(Message::Text(Utf8Bytes::try_from(message.payload)?)),
            MessageKind::Binary => Ok(Message::Binary(message.payload)),
        }
    }
}

//! Socket-message abstraction shared by both legs.
//!
//! The telephony leg is an axum WebSocket and the voice-service leg is a
//! tungstenite client socket. Both carry JSON text frames, so the relays only
//! need to build a text frame and tell text, close and everything else apart.

use std::fmt;

/// A frame as the relays see it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Incoming {
    Text(String),
    Close,
    /// Binary, ping, pong or raw frames. Ignored by the relays.
    Other,
}

/// WebSocket message type usable on either leg.
pub trait WireMessage: Send + 'static {
    fn text(text: String) -> Self;
    fn into_incoming(self) -> Incoming;
}

impl WireMessage for axum::extract::ws::Message {
    fn text(text: String) -> Self {
        Self::Text(text.into())
    }

    fn into_incoming(self) -> Incoming {
        match self {
            Self::Text(text) => Incoming::Text(text.as_str().to_owned()),
            Self::Close(_) => Incoming::Close,
            _ => Incoming::Other,
        }
    }
}

impl WireMessage for tokio_tungstenite::tungstenite::Message {
    fn text(text: String) -> Self {
        Self::Text(text.into())
    }

    fn into_incoming(self) -> Incoming {
        match self {
            Self::Text(text) => Incoming::Text(text.as_str().to_owned()),
            Self::Close(_) => Incoming::Close,
            _ => Incoming::Other,
        }
    }
}

/// Which side of the call a frame or task belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Leg {
    Telephony,
    Service,
}

impl fmt::Display for Leg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Leg::Telephony => f.write_str("telephony"),
            Leg::Service => f.write_str("service"),
        }
    }
}

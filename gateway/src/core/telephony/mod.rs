//! Telephony media-stream protocol.
//!
//! The provider opens a WebSocket to `/media-stream` and exchanges JSON
//! text frames carrying base64 G.711 audio.

pub mod messages;

pub use messages::{
    MediaFormat, MediaPayload, StartMetadata, TelephonyInbound, TelephonyOutbound,
};

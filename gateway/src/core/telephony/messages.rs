//! Telephony media-stream wire messages.
//!
//! Frames on the telephony socket are JSON text tagged by `event`. Inbound
//! frames are decoded into a closed set of variants with an [`Unknown`]
//! catch-all, so an unrecognised event never fails the call.
//!
//! [`Unknown`]: TelephonyInbound::Unknown

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

// =============================================================================
// Inbound (provider -> gateway)
// =============================================================================

/// Events sent by the telephony provider over the media stream.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum TelephonyInbound {
    /// Socket handshake acknowledgement, sent before `start`.
    Connected {
        #[serde(default)]
        protocol: Option<String>,
    },

    /// Stream metadata; carries the stream identifier.
    Start { start: StartMetadata },

    /// One chunk of caller audio.
    Media { media: MediaPayload },

    /// Playback marker echoed back by the provider.
    Mark {
        #[serde(default)]
        mark: Option<MarkPayload>,
    },

    /// Keypad digit pressed by the caller.
    Dtmf {
        #[serde(default)]
        dtmf: Option<DtmfPayload>,
    },

    /// The stream has ended.
    Stop,

    /// Any event this gateway does not interpret.
    #[serde(other)]
    Unknown,
}

impl TelephonyInbound {
    /// Decode one text frame.
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

/// Metadata carried by the `start` event.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartMetadata {
    pub stream_sid: String,
    #[serde(default)]
    pub call_sid: Option<String>,
    #[serde(default)]
    pub account_sid: Option<String>,
    #[serde(default)]
    pub tracks: Vec<String>,
    #[serde(default)]
    pub custom_parameters: HashMap<String, String>,
    #[serde(default)]
    pub media_format: Option<MediaFormat>,
}

/// Encoding of the audio carried on the stream.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaFormat {
    pub encoding: String,
    pub sample_rate: u32,
    pub channels: u16,
}

/// Audio chunk carried by the `media` event. `payload` is opaque base64.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct MediaPayload {
    pub payload: String,
    #[serde(default)]
    pub track: Option<String>,
    #[serde(default)]
    pub chunk: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MarkPayload {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DtmfPayload {
    pub digit: String,
}

// =============================================================================
// Outbound (gateway -> provider)
// =============================================================================

/// Commands sent to the telephony provider. Each is tagged with the stream id.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum TelephonyOutbound {
    /// Play an audio chunk to the caller.
    Media {
        #[serde(rename = "streamSid")]
        stream_sid: String,
        media: OutboundMedia,
    },

    /// Discard any audio buffered for playback.
    Clear {
        #[serde(rename = "streamSid")]
        stream_sid: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutboundMedia {
    pub payload: String,
}

impl TelephonyOutbound {
    pub fn media(stream_sid: impl Into<String>, payload: impl Into<String>) -> Self {
        Self::Media {
            stream_sid: stream_sid.into(),
            media: OutboundMedia {
                payload: payload.into(),
            },
        }
    }

    pub fn clear(stream_sid: impl Into<String>) -> Self {
        Self::Clear {
            stream_sid: stream_sid.into(),
        }
    }
}

//! OpenAI Realtime API module.
//!
//! Connector, wire messages and configuration enums for the voice-service
//! leg of a call.
//!
//! # Supported Models
//!
//! - `gpt-4o-realtime-preview-2024-10-01` - October 2024 version (default)
//! - `gpt-4o-realtime-preview` - GPT-4o Realtime Preview
//! - `gpt-4o-realtime-preview-2024-12-17` - December 2024 version
//! - `gpt-4o-mini-realtime-preview` - Mini model for lower latency
//!
//! # Audio Format
//!
//! G.711 u-law at 8kHz by default, matching telephony media streams, so
//! payloads pass between the two legs without transcoding.

mod client;
mod config;
pub mod messages;

pub use client::{OpenAIRealtime, RealtimeSocket};
pub use config::{
    Modality, OPENAI_BETA_HEADER, OPENAI_REALTIME_URL, OpenAIRealtimeAudioFormat,
    OpenAIRealtimeModel, OpenAIRealtimeVoice,
};
pub use messages::{ClientEvent, ServerEvent, SessionConfig, TurnDetection};

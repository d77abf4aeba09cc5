//! Base types for the realtime conversational-audio leg.
//!
//! This module defines the error taxonomy and the provider-agnostic
//! configuration used to negotiate a realtime session for one call.
//!
//! # Audio Format
//!
//! Telephony media streams carry G.711 u-law at 8kHz, so the default
//! audio format for both directions is `g711_ulaw`. Payloads are passed
//! through untouched; no transcoding happens on this leg.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use zeroize::Zeroizing;

/// Placeholder printed instead of secrets.
pub(crate) const REDACTED: &str = "[REDACTED]";

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur on the realtime voice-service leg.
#[derive(Debug, Error)]
pub enum RealtimeError {
    /// Connection to the provider failed
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Authentication failed
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Session negotiation failed before the call was established
    #[error("Session negotiation failed: {0}")]
    NegotiationFailed(String),
}

impl From<serde_json::Error> for RealtimeError {
    fn from(e: serde_json::Error) -> Self {
        RealtimeError::SerializationError(e.to_string())
    }
}

/// Result type for realtime operations.
pub type RealtimeResult<T> = Result<T, RealtimeError>;

// =============================================================================
// Configuration Types
// =============================================================================

/// Base configuration for the realtime provider.
///
/// Built once at startup from [`crate::config::ServerConfig`] and shared by
/// every call. Nothing in the relay looks configuration up globally. The API
/// key is wiped from memory on drop and never printed by `Debug`.
#[derive(Clone)]
pub struct RealtimeConfig {
    /// API key for authentication
    pub api_key: Zeroizing<String>,

    /// Base WebSocket URL of the realtime endpoint (model is appended)
    pub url: String,

    /// Model to use (e.g., "gpt-4o-realtime-preview-2024-10-01")
    pub model: String,

    /// Voice ID for speech output
    pub voice: Option<String>,

    /// System instructions for the assistant
    pub instructions: Option<String>,

    /// Temperature for response generation
    pub temperature: Option<f32>,

    /// Audio format used for both input and output
    pub audio_format: Option<String>,

    /// Turn detection configuration
    pub turn_detection: TurnDetectionConfig,

    /// Response modalities (text, audio, or both)
    pub modalities: Option<Vec<String>>,
}

impl fmt::Debug for RealtimeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RealtimeConfig")
            .field("api_key", &REDACTED)
            .field("url", &self.url)
            .field("model", &self.model)
            .field("voice", &self.voice)
            .field("instructions", &self.instructions)
            .field("temperature", &self.temperature)
            .field("audio_format", &self.audio_format)
            .field("turn_detection", &self.turn_detection)
            .field("modalities", &self.modalities)
            .finish()
    }
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            api_key: Zeroizing::new(String::new()),
            url: super::openai::OPENAI_REALTIME_URL.to_string(),
            model: String::new(),
            voice: None,
            instructions: None,
            temperature: None,
            audio_format: None,
            turn_detection: TurnDetectionConfig::default(),
            modalities: None,
        }
    }
}

/// Configuration for server-side turn detection (VAD).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnDetectionConfig {
    /// Activation threshold (0.0 to 1.0); lower values trigger on quieter speech
    pub threshold: f32,
    /// Amount of audio to include before voice detection (ms)
    #[serde(default)]
    pub prefix_padding_ms: Option<u32>,
    /// Trailing silence before the turn is considered finished (ms)
    pub silence_duration_ms: u32,
    /// Automatically create a response when the caller's turn ends
    pub create_response: bool,
    /// Let the service interrupt its own output when the caller starts talking
    pub interrupt_response: bool,
}

impl Default for TurnDetectionConfig {
    fn default() -> Self {
        Self {
            threshold: 0.3,
            prefix_padding_ms: None,
            silence_duration_ms: 500,
            create_response: true,
            interrupt_response: true,
        }
    }
}

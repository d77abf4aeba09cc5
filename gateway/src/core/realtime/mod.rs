//! Realtime conversational-audio provider module.
//!
//! The call bridge talks to exactly one provider, OpenAI's Realtime API,
//! over a WebSocket speaking JSON events.
//!
//! # Example
//!
//! ```rust,ignore
//! use callbridge_gateway::core::realtime::{OpenAIRealtime, RealtimeConfig};
//!
//! let realtime = OpenAIRealtime::new(RealtimeConfig {
//!     api_key: "sk-...".to_string().into(),
//!     voice: Some("alloy".to_string()),
//!     ..Default::default()
//! })?;
//!
//! let socket = realtime.connect().await?;
//! let session = realtime.session_config();
//! ```

mod base;
pub mod openai;

pub(crate) use base::REDACTED;
pub use base::{RealtimeConfig, RealtimeError, RealtimeResult, TurnDetectionConfig};
pub use openai::{
    ClientEvent, Modality, OPENAI_REALTIME_URL, OpenAIRealtime, OpenAIRealtimeAudioFormat,
    OpenAIRealtimeModel, OpenAIRealtimeVoice, RealtimeSocket, ServerEvent, SessionConfig,
};

//! Mock provider servers for integration tests.
//!
//! - `realtime_mock`: WebSocket server speaking the realtime voice-service
//!   event protocol, scriptable per test.

// Each test binary uses a different subset of these helpers
#![allow(dead_code)]

pub mod realtime_mock;

use callbridge_gateway::ServerConfig;

/// Minimal configuration pointing the realtime leg at `realtime_url`.
pub fn test_config(realtime_url: &str) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        tls: None,
        openai_api_key: "sk-test".to_string(),
        realtime_url: realtime_url.to_string(),
        realtime_model: "gpt-4o-realtime-preview-2024-10-01".to_string(),
        voice: "alloy".to_string(),
        temperature: 0.8,
        audio_format: "g711_ulaw".to_string(),
        vad_threshold: 0.3,
        vad_silence_duration_ms: 500,
        vad_prefix_padding_ms: None,
        system_instructions: "You are a test assistant.".to_string(),
        instructions_file: None,
        reference_document: Some("The shop opens at 9am.".to_string()),
        public_host: None,
        greeting: "Please wait.".to_string(),
        greeting_ready: "You can talk now.".to_string(),
        twiml_language: None,
        cors_allowed_origins: None,
    }
}

//! Configuration module for the Callbridge gateway
//!
//! This module handles server configuration from various sources: .env files, YAML files,
//! and environment variables. Priority: YAML > ENV vars > .env values > defaults.
//!
//! # Modules
//! - `yaml`: YAML configuration file loading
//! - `env`: Environment variable helpers
//! - `merge`: Merging YAML and environment configurations
//! - `validation`: Configuration validation logic
//!
//! # Example
//! ```rust,no_run
//! use callbridge_gateway::config::ServerConfig;
//! use std::path::PathBuf;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Load from environment variables only
//! let config = ServerConfig::from_env()?;
//!
//! // Load from YAML file with environment variable overrides
//! let config_path = PathBuf::from("config.yaml");
//! let config = ServerConfig::from_file(&config_path)?;
//!
//! println!("Server listening on {}", config.address());
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::path::PathBuf;

use zeroize::Zeroizing;

mod env;
mod merge;
mod validation;
mod yaml;

use crate::core::realtime::{REDACTED, RealtimeConfig, TurnDetectionConfig};

pub(crate) const DEFAULT_HOST: &str = "0.0.0.0";
pub(crate) const DEFAULT_PORT: u16 = 8000;
pub(crate) const DEFAULT_TEMPERATURE: f32 = 0.8;
pub(crate) const DEFAULT_VAD_THRESHOLD: f32 = 0.3;
pub(crate) const DEFAULT_VAD_SILENCE_DURATION_MS: u32 = 500;

pub(crate) const DEFAULT_INSTRUCTIONS: &str = "You are a cheerful and helpful voice assistant \
answering phone calls. Speak clearly and warmly, keep answers short and useful, and feel free \
to make a light joke when it fits.";

pub(crate) const DEFAULT_GREETING: &str =
    "Please wait while we connect your call to the voice assistant.";
pub(crate) const DEFAULT_GREETING_READY: &str = "OK, you can start talking now!";

/// TLS configuration for HTTPS and WSS
#[derive(Debug, Clone)]
pub struct TlsConfig {
    /// Path to the TLS certificate file (PEM format)
    pub cert_path: PathBuf,
    /// Path to the TLS private key file (PEM format)
    pub key_path: PathBuf,
}

/// Server configuration
///
/// Built once at startup and passed by reference to everything that needs it:
/// - Server settings (host, port, TLS, public host name)
/// - Realtime voice-service credential and session parameters
/// - Server-side turn detection thresholds
/// - Call-control markup (greetings, language)
/// - Security settings (CORS)
#[derive(Clone)]
pub struct ServerConfig {
    // Server settings
    pub host: String,
    pub port: u16,

    // TLS configuration (optional)
    pub tls: Option<TlsConfig>,

    /// OpenAI API key for the Realtime API
    pub openai_api_key: String,

    // Realtime session
    pub realtime_url: String,
    pub realtime_model: String,
    pub voice: String,
    pub temperature: f32,
    /// Audio format for both directions (`g711_ulaw` matches telephony streams)
    pub audio_format: String,

    // Server VAD
    pub vad_threshold: f32,
    pub vad_silence_duration_ms: u32,
    pub vad_prefix_padding_ms: Option<u32>,

    /// Base system instructions
    pub system_instructions: String,
    /// Document the assistant answers from, if configured
    pub instructions_file: Option<PathBuf>,
    /// Contents of `instructions_file`, loaded at startup
    pub reference_document: Option<String>,

    /// Host used in the media-stream URL; falls back to the request's Host header
    pub public_host: Option<String>,
    pub greeting: String,
    pub greeting_ready: String,
    /// `language` attribute for `<Say>`, e.g. "en-US"
    pub twiml_language: Option<String>,

    // Security settings
    /// Comma-separated list of allowed origins, or "*"
    pub cors_allowed_origins: Option<String>,
}

impl fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("tls", &self.tls)
            .field("openai_api_key", &REDACTED)
            .field("realtime_url", &self.realtime_url)
            .field("realtime_model", &self.realtime_model)
            .field("voice", &self.voice)
            .field("temperature", &self.temperature)
            .field("audio_format", &self.audio_format)
            .field("vad_threshold", &self.vad_threshold)
            .field("vad_silence_duration_ms", &self.vad_silence_duration_ms)
            .field("vad_prefix_padding_ms", &self.vad_prefix_padding_ms)
            .field("system_instructions", &self.system_instructions)
            .field("instructions_file", &self.instructions_file)
            .field("reference_document", &self.reference_document.as_ref().map(String::len))
            .field("public_host", &self.public_host)
            .field("greeting", &self.greeting)
            .field("greeting_ready", &self.greeting_ready)
            .field("twiml_language", &self.twiml_language)
            .field("cors_allowed_origins", &self.cors_allowed_origins)
            .finish()
    }
}

/// Implement Drop to zeroize the secret when ServerConfig is dropped.
impl Drop for ServerConfig {
    fn drop(&mut self) {
        use zeroize::Zeroize;
        self.openai_api_key.zeroize();
    }
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// Note: .env file is loaded in main.rs at application startup.
    ///
    /// # Errors
    /// Returns an error if a variable has an invalid value, the instructions
    /// file cannot be read, or validation fails (e.g. `OPENAI_API_KEY` unset).
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        let config = merge::merge_config(None)?;
        validation::validate_config(&config)?;
        Ok(config)
    }

    /// Load configuration from a YAML file with environment variable fallbacks
    ///
    /// The configuration priority is: YAML > Environment Variables (.env + actual ENV) > Defaults
    pub fn from_file(path: &PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        let yaml_config = yaml::YamlConfig::from_file(path)?;
        let config = merge::merge_config(Some(yaml_config))?;
        validation::validate_config(&config)?;
        Ok(config)
    }

    /// Get the server address as a string
    ///
    /// Returns the address in the format "host:port"
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Check if TLS is enabled
    pub fn is_tls_enabled(&self) -> bool {
        self.tls.is_some()
    }

    /// System instructions sent to the voice service, with the reference
    /// document appended when one is configured.
    pub fn instructions(&self) -> String {
        match &self.reference_document {
            Some(document) => format!(
                "{}\n\nAnswer only from the reference document below. If the answer is not in \
                 the document, say so politely.\n\n--- REFERENCE DOCUMENT ---\n{}\n--- END OF \
                 REFERENCE DOCUMENT ---",
                self.system_instructions, document
            ),
            None => self.system_instructions.clone(),
        }
    }

    /// Realtime provider configuration derived from this server configuration.
    pub fn realtime_config(&self) -> RealtimeConfig {
        RealtimeConfig {
            api_key: Zeroizing::new(self.openai_api_key.clone()),
            url: self.realtime_url.clone(),
            model: self.realtime_model.clone(),
            voice: Some(self.voice.clone()),
            instructions: Some(self.instructions()),
            temperature: Some(self.temperature),
            audio_format: Some(self.audio_format.clone()),
            turn_detection: TurnDetectionConfig {
                threshold: self.vad_threshold,
                prefix_padding_ms: self.vad_prefix_padding_ms,
                silence_duration_ms: self.vad_silence_duration_ms,
                create_response: true,
                interrupt_response: true,
            },
            modalities: None,
        }
    }
}

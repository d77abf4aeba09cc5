//! OpenAI Realtime API connector.
//!
//! Opens the voice-service WebSocket for one call and builds the
//! `session.update` payload the negotiator sends before audio flows.
//!
//! # API Reference
//!
//! - Endpoint: `wss://api.openai.com/v1/realtime?model=<model>`
//! - Protocol: WebSocket with JSON events
//! - Audio: G.711 u-law at 8kHz by default, base64 encoded
//!
//! Unlike a general-purpose realtime client this type does not own a reader
//! task or callbacks. The socket is handed to the call bridge, which runs the
//! read loop itself so that both legs of a call share one lifecycle.

use http::HeaderValue;
use http::header::AUTHORIZATION;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use zeroize::Zeroizing;

use super::config::{
    Modality, OPENAI_BETA_HEADER, OpenAIRealtimeAudioFormat, OpenAIRealtimeModel,
    OpenAIRealtimeVoice,
};
use super::messages::{SessionConfig, TurnDetection};
use crate::core::realtime::base::{RealtimeConfig, RealtimeError, RealtimeResult};

/// WebSocket connection to the realtime service.
pub type RealtimeSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;

// =============================================================================
// OpenAI Realtime Connector
// =============================================================================

/// OpenAI Realtime API connector.
///
/// Cheap to clone; one instance is created at startup and shared by all calls.
#[derive(Debug, Clone)]
pub struct OpenAIRealtime {
    /// Configuration
    config: RealtimeConfig,
    /// Parsed model
    model: OpenAIRealtimeModel,
    /// Parsed voice
    voice: OpenAIRealtimeVoice,
    /// Audio format used for both directions
    audio_format: OpenAIRealtimeAudioFormat,
}

impl OpenAIRealtime {
    /// Create a connector, validating the credential and endpoint up front.
    pub fn new(config: RealtimeConfig) -> RealtimeResult<Self> {
        if config.api_key.trim().is_empty() {
            return Err(RealtimeError::AuthenticationFailed(
                "API key is required".to_string(),
            ));
        }

        let parsed = url::Url::parse(&config.url).map_err(|e| {
            RealtimeError::InvalidConfiguration(format!("Invalid realtime URL '{}': {e}", config.url))
        })?;
        if !matches!(parsed.scheme(), "ws" | "wss") {
            return Err(RealtimeError::InvalidConfiguration(format!(
                "Realtime URL must use ws:// or wss://, got '{}'",
                config.url
            )));
        }

        let model = if config.model.is_empty() {
            OpenAIRealtimeModel::default()
        } else {
            OpenAIRealtimeModel::from_str_or_default(&config.model)
        };

        let voice = config
            .voice
            .as_deref()
            .map(OpenAIRealtimeVoice::from_str_or_default)
            .unwrap_or_default();

        let audio_format = config
            .audio_format
            .as_deref()
            .map(OpenAIRealtimeAudioFormat::from_str_or_default)
            .unwrap_or_default();

        Ok(Self {
            config,
            model,
            voice,
            audio_format,
        })
    }

    /// Get the configured model.
    pub fn model(&self) -> OpenAIRealtimeModel {
        self.model
    }

    /// Get the configured voice.
    pub fn voice(&self) -> OpenAIRealtimeVoice {
        self.voice
    }

    /// Get the configured audio format.
    pub fn audio_format(&self) -> OpenAIRealtimeAudioFormat {
        self.audio_format
    }

    /// Build the WebSocket URL with model parameter.
    pub fn ws_url(&self) -> String {
        let separator = if self.config.url.contains('?') { '&' } else { '?' };
        format!("{}{}model={}", self.config.url, separator, self.model.as_str())
    }

    /// Build the session configuration sent once per call.
    pub fn session_config(&self) -> SessionConfig {
        let td = &self.config.turn_detection;
        SessionConfig {
            turn_detection: Some(TurnDetection::ServerVad {
                threshold: Some(td.threshold),
                prefix_padding_ms: td.prefix_padding_ms,
                silence_duration_ms: Some(td.silence_duration_ms),
                create_response: Some(td.create_response),
                interrupt_response: Some(td.interrupt_response),
            }),
            input_audio_format: Some(self.audio_format.as_str().to_string()),
            output_audio_format: Some(self.audio_format.as_str().to_string()),
            voice: Some(self.voice.as_str().to_string()),
            instructions: self.config.instructions.clone(),
            modalities: Some(
                self.config
                    .modalities
                    .clone()
                    .unwrap_or_else(Modality::text_and_audio),
            ),
            temperature: self.config.temperature,
        }
    }

    /// Open the WebSocket to the realtime service.
    ///
    /// Failure here is fatal to the call; there is no retry.
    pub async fn connect(&self) -> RealtimeResult<RealtimeSocket> {
        let url = self.ws_url();

        let mut request = url
            .as_str()
            .into_client_request()
            .map_err(|e| RealtimeError::ConnectionFailed(e.to_string()))?;

        let bearer = Zeroizing::new(format!("Bearer {}", self.config.api_key.as_str()));
        let mut bearer = HeaderValue::from_str(&bearer)
            .map_err(|e| RealtimeError::InvalidConfiguration(format!("Invalid API key: {e}")))?;
        bearer.set_sensitive(true);
        let headers = request.headers_mut();
        headers.insert(AUTHORIZATION, bearer);
        headers.insert("OpenAI-Beta", HeaderValue::from_static(OPENAI_BETA_HEADER));

        let (socket, _response) = tokio_tungstenite::connect_async(request)
            .await
            .map_err(|e| RealtimeError::ConnectionFailed(e.to_string()))?;

        tracing::info!(model = %self.model, "Connected to OpenAI Realtime API");
        Ok(socket)
    }
}

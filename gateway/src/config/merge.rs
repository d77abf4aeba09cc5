//! Merging environment variables (base) with YAML overrides.

use std::path::PathBuf;

use super::env::{env_var, parse_env};
use super::yaml::YamlConfig;
use super::{
    DEFAULT_GREETING, DEFAULT_GREETING_READY, DEFAULT_HOST, DEFAULT_INSTRUCTIONS, DEFAULT_PORT,
    DEFAULT_TEMPERATURE, DEFAULT_VAD_SILENCE_DURATION_MS, DEFAULT_VAD_THRESHOLD, ServerConfig,
    TlsConfig,
};
use crate::core::realtime::openai::{
    OPENAI_REALTIME_URL, OpenAIRealtimeAudioFormat, OpenAIRealtimeModel, OpenAIRealtimeVoice,
};

/// Build a [`ServerConfig`] from the environment, with `yaml` values taking
/// precedence where present.
///
/// The instructions document, if configured, is read here so a missing or
/// unreadable file stops the process at startup.
pub fn merge_config(yaml: Option<YamlConfig>) -> Result<ServerConfig, Box<dyn std::error::Error>> {
    let yaml = yaml.unwrap_or_default();
    let server = yaml.server.unwrap_or_default();
    let realtime = yaml.realtime.unwrap_or_default();
    let turn = yaml.turn_detection.unwrap_or_default();
    let twiml = yaml.twiml.unwrap_or_default();
    let security = yaml.security.unwrap_or_default();

    let host = server
        .host
        .or_else(|| env_var("HOST"))
        .unwrap_or_else(|| DEFAULT_HOST.to_string());
    let port = match server.port {
        Some(port) => port,
        None => parse_env::<u16>("PORT")?.unwrap_or(DEFAULT_PORT),
    };

    let server_tls = server.tls.unwrap_or_default();
    let cert_path = server_tls
        .cert_path
        .or_else(|| env_var("TLS_CERT_PATH").map(PathBuf::from));
    let key_path = server_tls
        .key_path
        .or_else(|| env_var("TLS_KEY_PATH").map(PathBuf::from));
    let tls = match (cert_path, key_path) {
        (Some(cert_path), Some(key_path)) => Some(TlsConfig {
            cert_path,
            key_path,
        }),
        (None, None) => None,
        _ => {
            return Err("TLS requires both TLS_CERT_PATH and TLS_KEY_PATH to be set".into());
        }
    };

    let openai_api_key = realtime
        .api_key
        .or_else(|| env_var("OPENAI_API_KEY"))
        .unwrap_or_default();
    let realtime_url = realtime
        .url
        .or_else(|| env_var("OPENAI_REALTIME_URL"))
        .unwrap_or_else(|| OPENAI_REALTIME_URL.to_string());
    let realtime_model = realtime
        .model
        .or_else(|| env_var("REALTIME_MODEL"))
        .unwrap_or_else(|| OpenAIRealtimeModel::default().as_str().to_string());
    let voice = realtime
        .voice
        .or_else(|| env_var("REALTIME_VOICE"))
        .unwrap_or_else(|| OpenAIRealtimeVoice::default().as_str().to_string());
    let temperature = match realtime.temperature {
        Some(t) => t,
        None => parse_env::<f32>("REALTIME_TEMPERATURE")?.unwrap_or(DEFAULT_TEMPERATURE),
    };
    let audio_format = realtime
        .audio_format
        .or_else(|| env_var("AUDIO_FORMAT"))
        .unwrap_or_else(|| OpenAIRealtimeAudioFormat::default().as_str().to_string());
    let system_instructions = realtime
        .instructions
        .or_else(|| env_var("SYSTEM_INSTRUCTIONS"))
        .unwrap_or_else(|| DEFAULT_INSTRUCTIONS.to_string());

    let instructions_file = realtime
        .instructions_file
        .or_else(|| env_var("INSTRUCTIONS_FILE").map(PathBuf::from));
    let reference_document = match &instructions_file {
        Some(path) => Some(load_reference_document(path)?),
        None => None,
    };

    let vad_threshold = match turn.threshold {
        Some(t) => t,
        None => parse_env::<f32>("VAD_THRESHOLD")?.unwrap_or(DEFAULT_VAD_THRESHOLD),
    };
    let vad_silence_duration_ms = match turn.silence_duration_ms {
        Some(ms) => ms,
        None => parse_env::<u32>("VAD_SILENCE_DURATION_MS")?
            .unwrap_or(DEFAULT_VAD_SILENCE_DURATION_MS),
    };
    let vad_prefix_padding_ms = match turn.prefix_padding_ms {
        Some(ms) => Some(ms),
        None => parse_env::<u32>("VAD_PREFIX_PADDING_MS")?,
    };

    let public_host = server.public_host.or_else(|| env_var("PUBLIC_HOST"));
    let greeting = twiml
        .greeting
        .or_else(|| env_var("GREETING"))
        .unwrap_or_else(|| DEFAULT_GREETING.to_string());
    let greeting_ready = twiml
        .greeting_ready
        .or_else(|| env_var("GREETING_READY"))
        .unwrap_or_else(|| DEFAULT_GREETING_READY.to_string());
    let twiml_language = twiml.language.or_else(|| env_var("TWIML_VOICE_LANGUAGE"));

    let cors_allowed_origins = security
        .cors_allowed_origins
        .or_else(|| env_var("CORS_ALLOWED_ORIGINS"));

    Ok(ServerConfig {
        host,
        port,
        tls,
        openai_api_key,
        realtime_url,
        realtime_model,
        voice,
        temperature,
        audio_format,
        vad_threshold,
        vad_silence_duration_ms,
        vad_prefix_padding_ms,
        system_instructions,
        instructions_file,
        reference_document,
        public_host,
        greeting,
        greeting_ready,
        twiml_language,
        cors_allowed_origins,
    })
}

fn load_reference_document(path: &PathBuf) -> Result<String, String> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read instructions file {}: {e}", path.display()))?;
    let contents = contents.trim();
    if contents.is_empty() {
        return Err(format!("Instructions file {} is empty", path.display()));
    }
    Ok(contents.to_string())
}

//! Configuration validation logic.

use super::ServerConfig;
use crate::core::realtime::openai::{
    OpenAIRealtimeAudioFormat, OpenAIRealtimeModel, OpenAIRealtimeVoice,
};

/// Temperature range accepted by the realtime API.
const TEMPERATURE_RANGE: std::ops::RangeInclusive<f32> = 0.6..=1.2;

/// Validate the whole configuration.
pub fn validate_config(config: &ServerConfig) -> Result<(), String> {
    validate_api_key(&config.openai_api_key)?;
    validate_realtime_url(&config.realtime_url)?;
    validate_realtime_names(&config.realtime_model, &config.voice, &config.audio_format)?;
    validate_temperature(config.temperature)?;
    validate_turn_detection(config.vad_threshold, config.vad_silence_duration_ms)?;
    Ok(())
}

/// The voice-service credential is mandatory; the process must not start without it.
pub fn validate_api_key(key: &str) -> Result<(), String> {
    if key.trim().is_empty() {
        return Err(
            "OPENAI_API_KEY is required. Set it in the environment, .env, or realtime.api_key in YAML"
                .to_string(),
        );
    }
    Ok(())
}

pub fn validate_realtime_url(url: &str) -> Result<(), String> {
    let parsed =
        url::Url::parse(url).map_err(|e| format!("Invalid OPENAI_REALTIME_URL '{url}': {e}"))?;
    match parsed.scheme() {
        "ws" | "wss" => Ok(()),
        other => Err(format!(
            "OPENAI_REALTIME_URL must use ws:// or wss://, got '{other}://'"
        )),
    }
}

pub fn validate_realtime_names(model: &str, voice: &str, audio_format: &str) -> Result<(), String> {
    if OpenAIRealtimeModel::parse(model).is_none() {
        return Err(format!("Unsupported realtime model '{model}'"));
    }
    if OpenAIRealtimeVoice::parse(voice).is_none() {
        return Err(format!("Unsupported realtime voice '{voice}'"));
    }
    if OpenAIRealtimeAudioFormat::parse(audio_format).is_none() {
        return Err(format!(
            "Unsupported audio format '{audio_format}' (expected g711_ulaw, g711_alaw or pcm16)"
        ));
    }
    Ok(())
}

pub fn validate_temperature(temperature: f32) -> Result<(), String> {
    if !TEMPERATURE_RANGE.contains(&temperature) {
        return Err(format!(
            "Temperature {temperature} is out of range ({}..={})",
            TEMPERATURE_RANGE.start(),
            TEMPERATURE_RANGE.end()
        ));
    }
    Ok(())
}

pub fn validate_turn_detection(threshold: f32, silence_duration_ms: u32) -> Result<(), String> {
    if !(0.0..=1.0).contains(&threshold) {
        return Err(format!("VAD threshold {threshold} must be between 0.0 and 1.0"));
    }
    if silence_duration_ms == 0 {
        return Err("VAD silence duration must be greater than 0 ms".to_string());
    }
    Ok(())
}

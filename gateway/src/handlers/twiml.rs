//! Call-control markup for inbound calls.
//!
//! The telephony provider requests `/incoming-call` when a call arrives. The
//! response greets the caller and connects the call to a bidirectional media
//! stream on this server's `/media-stream` endpoint.

use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, header},
    response::IntoResponse,
};
use http::uri::Authority;
use tracing::info;

use crate::config::ServerConfig;
use crate::errors::app_error::{AppError, AppResult};
use crate::state::AppState;

/// Path the provider connects the media stream to.
pub const MEDIA_STREAM_PATH: &str = "/media-stream";

pub async fn incoming_call(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> AppResult<impl IntoResponse> {
    let host = stream_host(&state.config, &headers)?;
    info!(%host, "Incoming call, connecting media stream");

    let body = build_twiml(&state.config, &host);
    Ok(([(header::CONTENT_TYPE, "application/xml")], body))
}

/// Host for the media-stream URL: the configured public host, otherwise the
/// request's `Host` header without its port.
fn stream_host(config: &ServerConfig, headers: &HeaderMap) -> AppResult<String> {
    if let Some(host) = &config.public_host {
        return Ok(host.clone());
    }

    let raw = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::BadRequest("Missing Host header".to_string()))?;

    let authority: Authority = raw
        .parse()
        .map_err(|_| AppError::BadRequest(format!("Invalid Host header '{raw}'")))?;

    Ok(authority.host().to_string())
}

pub fn build_twiml(config: &ServerConfig, host: &str) -> String {
    let language = config
        .twiml_language
        .as_deref()
        .map(|lang| format!(r#" language="{}""#, escape_xml(lang)))
        .unwrap_or_default();

    let mut twiml = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<Response>\n");
    if !config.greeting.is_empty() {
        twiml.push_str(&format!(
            "  <Say{language}>{}</Say>\n  <Pause length=\"1\"/>\n",
            escape_xml(&config.greeting)
        ));
    }
    if !config.greeting_ready.is_empty() {
        twiml.push_str(&format!(
            "  <Say{language}>{}</Say>\n",
            escape_xml(&config.greeting_ready)
        ));
    }
    twiml.push_str(&format!(
        "  <Connect>\n    <Stream url=\"wss://{}{MEDIA_STREAM_PATH}\"/>\n  </Connect>\n</Response>\n",
        escape_xml(host)
    ));
    twiml
}

fn escape_xml(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

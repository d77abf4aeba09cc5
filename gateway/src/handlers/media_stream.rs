//! Media-stream WebSocket handler
//!
//! The telephony provider connects here after receiving the call-control
//! markup. Each connection is one call: the handler opens the voice-service
//! socket and hands both to a [`CallBridge`] until the call ends.

use std::sync::Arc;

use axum::{
    extract::{
        State,
        ws::{WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use tracing::{error, info, warn};

use crate::core::bridge::CallBridge;
use crate::state::AppState;

/// Maximum WebSocket frame size (1 MB). Media frames are a few hundred bytes.
const MAX_WS_FRAME_SIZE: usize = 1024 * 1024;

/// Maximum WebSocket message size (1 MB)
const MAX_WS_MESSAGE_SIZE: usize = 1024 * 1024;

/// Upgrade the provider's request to the media-stream WebSocket.
pub async fn media_stream_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> Response {
    info!("Media stream WebSocket upgrade requested");

    ws.max_frame_size(MAX_WS_FRAME_SIZE)
        .max_message_size(MAX_WS_MESSAGE_SIZE)
        .on_upgrade(move |socket| handle_media_socket(socket, state))
}

async fn handle_media_socket(mut socket: WebSocket, state: Arc<AppState>) {
    let _call = state.track_call();
    let bridge = CallBridge::new(state.realtime.session_config());
    let call_id = bridge.session().call_id();
    info!(%call_id, active_calls = state.active_calls(), "Media stream connected");

    let service = match state.realtime.connect().await {
        Ok(service) => service,
        Err(e) => {
            error!(%call_id, "Failed to connect to voice service: {}", e);
            let _ = socket.close().await;
            return;
        }
    };

    let (telephony_sink, telephony_stream) = socket.split();
    let (service_sink, service_stream) = service.split();

    match bridge
        .run(telephony_stream, telephony_sink, service_stream, service_sink)
        .await
    {
        Ok(summary) => {
            info!(
                call_id = %summary.call_id,
                stream_sid = ?summary.stream_sid,
                call_sid = ?summary.call_sid,
                inbound_exit = %summary.inbound.exit,
                outbound_exit = %summary.outbound.exit,
                frames_to_service = summary.inbound.frames_forwarded,
                frames_to_caller = summary.outbound.frames_forwarded,
                audio_bytes_to_caller = summary.outbound.audio_bytes,
                frames_dropped = summary.outbound.frames_dropped,
                interruptions = summary.outbound.interruptions,
                responses_interrupted = summary.outbound.responses_interrupted,
                duration_ms = summary.duration.as_millis() as u64,
                "Call ended"
            );
        }
        Err(e) => {
            warn!(%call_id, "Call ended before it was established: {}", e);
        }
    }
}
